//! 解析ステージ
//!
//! 解析ジョブは持たず、ScanFlow のスナップショットを描画するだけ。
//! エラー時もアンマウントせず、再試行（撮影へ戻る）を出す。

use super::board_summary::BoardSummary;
use super::progress_bar::ProgressBar;
use board_scan_common::flow::ScanFlow;
use board_scan_common::stage::{StepState, STAGES};
use leptos::prelude::*;

fn step_icon(state: StepState) -> &'static str {
    match state {
        StepState::Complete => "✔",
        StepState::InProgress => "◌",
        StepState::Pending => "·",
    }
}

#[component]
pub fn AnalysisScreen(flow: RwSignal<ScanFlow>, on_cancel: Callback<()>, on_retry: Callback<()>) -> impl IntoView {
    let progress = Signal::derive(move || flow.with(|f| f.snapshot().progress));
    let failed = move || flow.with(|f| f.snapshot().is_error());

    let badges = move || {
        flow.with(|f| {
            let (shown, more) = f.snapshot().circuit_preview();
            let shown = shown
                .iter()
                .map(|c| (c.index, c.device_label(), c.confidence.as_str()))
                .collect::<Vec<_>>();
            (shown, more)
        })
    };

    view! {
        <div class="analysis-stage">
            <div class="analysis-preview">
                {move || flow.with(|f| f.images().first().cloned()).map(|src| view! {
                    <img class="primary-image" src=src alt="board" />
                })}
                <span class="text-muted">{move || format!("{}枚", flow.with(|f| f.images().len()))}</span>
            </div>

            <ProgressBar progress=progress />

            <ol class="stage-steps">
                {move || {
                    let states = flow.with(|f| f.snapshot().step_states());
                    STAGES
                        .iter()
                        .zip(states)
                        .map(|(stage, state)| view! {
                            <li class=format!("step {}", state.as_str())>
                                <span class="step-icon">{step_icon(state)}</span>
                                {stage.label}
                            </li>
                        })
                        .collect_view()
                }}
            </ol>

            <p class="stage-message">{move || flow.with(|f| f.snapshot().stage_message.clone())}</p>

            {move || flow.with(|f| f.snapshot().board.clone()).map(|board| view! { <BoardSummary board=board /> })}

            <div class="circuit-badges">
                {move || {
                    let (shown, more) = badges();
                    view! {
                        {shown
                            .into_iter()
                            .map(|(index, label, confidence)| view! {
                                <span class=format!("badge confidence-{}", confidence)>
                                    {format!("{}: {}", index, label)}
                                </span>
                            })
                            .collect_view()}
                        {(more > 0).then(|| view! { <span class="badge badge-muted">{format!("+{} more", more)}</span> })}
                    }
                }}
            </div>

            <ul class="warnings">
                {move || {
                    flow.with(|f| f.snapshot().warnings.clone())
                        .into_iter()
                        .map(|w| view! { <li>{w}</li> })
                        .collect_view()
                }}
            </ul>

            <Show when=failed>
                <div class="error-panel">
                    <p>{move || flow.with(|f| f.snapshot().error.clone().unwrap_or_default())}</p>
                    <button class="btn btn-primary" on:click=move |_| on_retry.run(())>"撮り直す"</button>
                </div>
            </Show>

            <button class="btn btn-tertiary" on:click=move |_| on_cancel.run(())>"キャンセル"</button>
        </div>
    }
}

