//! ヘッダーコンポーネント

use leptos::prelude::*;

/// 閉じるボタン付きのナビバーは撮影ステージのみ表示する
#[component]
pub fn Header(#[prop(into)] show_nav: Signal<bool>, on_close: Callback<()>) -> impl IntoView {
    view! {
        <header class="header">
            <h1>"Board Scan - 分電盤スキャン"</h1>
            <Show when=move || show_nav.get()>
                <button class="btn btn-tertiary btn-small" on:click=move |_| on_close.run(())>
                    "閉じる"
                </button>
            </Show>
        </header>
    }
}
