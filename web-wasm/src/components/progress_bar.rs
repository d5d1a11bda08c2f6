//! プログレスバーコンポーネント

use leptos::prelude::*;

/// progress は 0〜100
#[component]
pub fn ProgressBar(#[prop(into)] progress: Signal<f32>) -> impl IntoView {
    view! {
        <div class="progress-container">
            <div class="progress-bar">
                <div
                    class="progress-fill"
                    style=move || format!("width: {}%", progress.get())
                />
            </div>
            <p class="progress-text">
                {move || format!("解析中... {:.0}%", progress.get())}
            </p>
        </div>
    }
}
