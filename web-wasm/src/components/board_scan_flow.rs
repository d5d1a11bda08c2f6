//! スキャンフロー（capture → analyzing → results）
//!
//! ホストに公開する契約は on_complete / on_cancel / hints のみ。
//! 解析中の fetch は AbortController で止め、ScanFlow 側もチケットで古いイベントを捨てる。

use super::analysis_stage::AnalysisScreen;
use super::capture_stage::CaptureScreen;
use super::header::Header;
use super::results_stage::ResultsScreen;
use crate::api::analysis::stream_analysis;
use crate::settings::Settings;
use board_scan_common::flow::{FlowStage, ScanFlow};
use board_scan_common::types::{ScanCompletion, ScanHints};
use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::AbortController;

#[component]
pub fn BoardScanFlow(
    settings: ReadSignal<Settings>,
    #[prop(default = None)] hints: Option<ScanHints>,
    on_complete: Callback<ScanCompletion>,
    on_cancel: Callback<()>,
) -> impl IntoView {
    let flow = RwSignal::new(ScanFlow::new(hints));
    let controller = StoredValue::new_local(None::<AbortController>);
    let stage = Memo::new(move |_| flow.with(|f| f.stage()));

    let abort_fetch = move || {
        controller.update_value(|c| {
            if let Some(c) = c.take() {
                c.abort();
            }
        });
    };

    on_cleanup(move || abort_fetch());

    let start_analysis = Callback::new(move |images: Vec<String>| {
        let (request, ticket) = match flow.try_update(|f| f.complete_capture(images)) {
            Some(Ok(started)) => started,
            Some(Err(e)) => {
                gloo::console::warn!(format!("analysis not started: {}", e));
                return;
            }
            None => return,
        };
        let abort = AbortController::new().ok();
        controller.set_value(abort.clone());
        let settings = settings.get_untracked();

        spawn_local(async move {
            let result = stream_analysis(&settings, &request, abort.as_ref(), ticket.signal(), |update| {
                flow.try_update(|f| f.apply_update(&ticket, update));
            })
            .await;

            // キャンセル済みなら撮影ステージに戻っている
            if ticket.is_aborted() {
                return;
            }
            if let Err(e) = &result {
                gloo::console::warn!(format!("analysis failed: {}", e));
            }
            flow.try_update(|f| f.finish_analysis(&ticket, result));
        });
    });

    let cancel_analysis = Callback::new(move |_: ()| {
        abort_fetch();
        flow.update(|f| {
            if let Err(e) = f.cancel() {
                gloo::console::warn!(e.to_string());
            }
        });
    });

    let rescan = Callback::new(move |_: ()| {
        abort_fetch();
        flow.update(|f| {
            if let Err(e) = f.rescan() {
                gloo::console::warn!(e.to_string());
            }
        });
    });

    let accept = Callback::new(move |_: ()| match flow.try_update(|f| f.accept()) {
        Some(Ok(completion)) => on_complete.run(completion),
        Some(Err(e)) => gloo::console::warn!(e.to_string()),
        None => {}
    });

    let close = Callback::new(move |_: ()| {
        abort_fetch();
        on_cancel.run(());
    });

    view! {
        <div class="board-scan-flow">
            <Header show_nav=Signal::derive(move || flow.with(|f| f.shows_nav_bar())) on_close=close />

            {move || match stage.get() {
                FlowStage::Capture => view! { <CaptureScreen on_submit=start_analysis /> }.into_any(),
                FlowStage::Analyzing => view! {
                    <AnalysisScreen flow=flow on_cancel=cancel_analysis on_retry=rescan />
                }
                .into_any(),
                FlowStage::Results => view! {
                    <ResultsScreen flow=flow on_accept=accept on_rescan=rescan />
                }
                .into_any(),
            }}
        </div>
    }
}
