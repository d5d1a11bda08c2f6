//! エクスポートボタンコンポーネント

use board_scan_common::types::ScanCompletion;
use leptos::prelude::*;

#[component]
pub fn ExportButtons(
    accepted: ReadSignal<Option<ScanCompletion>>,
    on_scan: Callback<()>,
    on_export_excel: Callback<()>,
    on_export_json: Callback<()>,
) -> impl IntoView {
    let has_result = move || accepted.with(|a| a.is_some());

    view! {
        <div class="export-buttons">
            <button class="btn btn-primary" on:click=move |_| on_scan.run(())>
                {move || if has_result() { "もう一度スキャン" } else { "スキャン開始" }}
            </button>

            <button class="btn btn-secondary" disabled=move || !has_result() on:click=move |_| on_export_excel.run(())>
                "Excel出力"
            </button>

            <button class="btn btn-secondary" disabled=move || !has_result() on:click=move |_| on_export_json.run(())>
                "JSON出力"
            </button>
        </div>
    }
}
