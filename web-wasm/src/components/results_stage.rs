//! 結果確認ステージ
//!
//! ReviewState（解析結果のコピー）を編集する。表示は index 昇順。

use super::board_summary::BoardSummary;
use super::circuit_edit_sheet::CircuitEditSheet;
use board_scan_common::flow::ScanFlow;
use board_scan_common::review::ReviewState;
use leptos::prelude::*;

/// 確認中の ReviewState を書き換える
pub fn with_review<U>(flow: RwSignal<ScanFlow>, action: impl FnOnce(&mut ReviewState) -> U) -> Option<U> {
    flow.try_update(|f| f.review_mut().map(action)).flatten()
}

#[component]
pub fn ResultsScreen(flow: RwSignal<ScanFlow>, on_accept: Callback<()>, on_rescan: Callback<()>) -> impl IntoView {
    let summary = move || flow.with(|f| f.review().map(|r| r.summary()).unwrap_or_default());
    let rows = move || {
        flow.with(|f| {
            f.review()
                .map(|r| r.sorted_circuits().into_iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        })
    };
    let is_editing = move || flow.with(|f| f.review().is_some_and(|r| r.editing_circuit().is_some()));

    view! {
        <div class="results-stage">
            {move || flow.with(|f| f.review().and_then(|r| r.board().cloned())).map(|board| view! {
                <BoardSummary board=board />
            })}

            <p class="review-summary">
                {move || {
                    let s = summary();
                    format!("{}回路  high {} / medium {} / low {}  三相 {}", s.total, s.high, s.medium, s.low, s.three_phase)
                }}
            </p>

            <table class="circuit-table">
                <thead>
                    <tr>
                        <th>"#"</th>
                        <th>"回路"</th>
                        <th>"保護装置"</th>
                        <th>"相"</th>
                        <th>"確信度"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    {move || {
                        rows()
                            .into_iter()
                            .map(|circuit| {
                                let edit_id = circuit.id.clone();
                                let delete_id = circuit.id.clone();
                                view! {
                                    <tr class=if circuit.is_manual() { "manual" } else { "" }>
                                        <td>{circuit.index}</td>
                                        <td>{circuit.label_text.clone()}</td>
                                        <td>{circuit.device_label()}</td>
                                        <td>{circuit.phase.as_str()}</td>
                                        <td>
                                            <span class=format!("badge confidence-{}", circuit.confidence.as_str())>
                                                {circuit.confidence.as_str()}
                                            </span>
                                        </td>
                                        <td class="row-actions">
                                            <button
                                                class="btn btn-small btn-secondary"
                                                on:click=move |_| {
                                                    with_review(flow, |r| r.open_editor(&edit_id));
                                                }
                                            >
                                                "編集"
                                            </button>
                                            <button
                                                class="btn btn-small btn-tertiary"
                                                on:click=move |_| {
                                                    with_review(flow, |r| r.delete_circuit(&delete_id));
                                                }
                                            >
                                                "削除"
                                            </button>
                                        </td>
                                    </tr>
                                }
                            })
                            .collect_view()
                    }}
                </tbody>
            </table>

            <button
                class="btn btn-secondary"
                on:click=move |_| {
                    with_review(flow, |r| r.add_circuit());
                }
            >
                "+ 回路を追加"
            </button>

            <Show when=is_editing>
                <CircuitEditSheet flow=flow />
            </Show>

            <div class="results-actions">
                <button class="btn btn-tertiary" on:click=move |_| on_rescan.run(())>"再スキャン"</button>
                <button class="btn btn-primary" on:click=move |_| on_accept.run(())>"確定"</button>
            </div>
        </div>
    }
}
