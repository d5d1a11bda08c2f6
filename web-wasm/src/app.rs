//! メインアプリケーションコンポーネント

use crate::components::{
    board_scan_flow::BoardScanFlow,
    board_summary::BoardSummary,
    export_buttons::ExportButtons,
    settings_panel::SettingsPanel,
};
use crate::export::excel_wasm;
use crate::settings::Settings;
use board_scan_common::types::{ScanCompletion, ScanHints};
use leptos::prelude::*;
use serde::Serialize;
use web_sys::{CustomEvent, CustomEventInit};

/// 確定時に window へ発行するイベント（detail は確定結果）
pub const COMPLETE_EVENT: &str = "board-scan:complete";

/// 確定結果をホストページへ通知する
fn dispatch_completion(completion: &ScanCompletion) {
    let detail = match completion.serialize(&serde_wasm_bindgen::Serializer::json_compatible()) {
        Ok(detail) => detail,
        Err(e) => {
            gloo::console::warn!(format!("completion not dispatched: {}", e));
            return;
        }
    };
    let init = CustomEventInit::new();
    init.set_detail(&detail);
    let Ok(event) = CustomEvent::new_with_event_init_dict(COMPLETE_EVENT, &init) else {
        return;
    };
    if let Some(window) = web_sys::window() {
        let _ = window.dispatch_event(&event);
    }
}

#[component]
pub fn App() -> impl IntoView {
    // アプリケーション状態
    let (settings, set_settings) = signal(Settings::load());
    let (hints, set_hints) = signal(ScanHints::default());
    let (title, set_title) = signal("schedule-of-tests".to_string());
    let (status, set_status) = signal(String::new());
    let (is_scanning, set_is_scanning) = signal(false);
    let (accepted, set_accepted) = signal(None::<ScanCompletion>);

    let on_save = Callback::new(move |_: ()| {
        let message = match settings.get_untracked().save() {
            Ok(()) => "保存しました".to_string(),
            Err(e) => e,
        };
        set_status.set(message);
    });

    let on_clear = Callback::new(move |_: ()| {
        Settings::clear();
        set_settings.set(Settings::default());
        set_status.set("削除しました".to_string());
    });

    let on_scan = Callback::new(move |_: ()| {
        set_is_scanning.set(true);
    });

    let on_complete = Callback::new(move |completion: ScanCompletion| {
        dispatch_completion(&completion);
        set_status.set(format!("{}回路を確定しました", completion.circuits.len()));
        set_accepted.set(Some(completion));
        set_is_scanning.set(false);
    });

    let on_cancel = Callback::new(move |_: ()| {
        set_is_scanning.set(false);
    });

    let export_with = move |export: fn(&ScanCompletion, &str) -> Result<(), String>| {
        let title = title.get_untracked();
        let result = accepted.with_untracked(|a| match a {
            Some(completion) => export(completion, &title),
            None => Err("確定結果がありません".to_string()),
        });
        if let Err(e) = result {
            set_status.set(e);
        }
    };

    let on_export_excel = Callback::new(move |_: ()| export_with(excel_wasm::download_schedule));
    let on_export_json = Callback::new(move |_: ()| export_with(excel_wasm::download_json));

    view! {
        <div class="container">
            <Show
                when=move || is_scanning.get()
                fallback=move || view! {
                    <SettingsPanel
                        settings=settings
                        set_settings=set_settings
                        hints=hints
                        set_hints=set_hints
                        title=title
                        set_title=set_title
                        status=status
                        on_save=on_save
                        on_clear=on_clear
                    />

                    {move || accepted.with(|a| a.as_ref().and_then(|c| c.board.clone())).map(|board| view! {
                        <BoardSummary board=board />
                    })}

                    <ExportButtons
                        accepted=accepted
                        on_scan=on_scan
                        on_export_excel=on_export_excel
                        on_export_json=on_export_json
                    />
                }
            >
                <BoardScanFlow
                    settings=settings
                    hints=Some(hints.get_untracked())
                    on_complete=on_complete
                    on_cancel=on_cancel
                />
            </Show>
        </div>
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_dispatch_completion_carries_detail() {
        let window = web_sys::window().expect("window not available");
        let received = Rc::new(RefCell::new(None::<ScanCompletion>));
        let sink = received.clone();
        let _listener = gloo::events::EventListener::new(&window, COMPLETE_EVENT, move |event| {
            let detail = event.unchecked_ref::<CustomEvent>().detail();
            *sink.borrow_mut() = serde_wasm_bindgen::from_value(detail).ok();
        });

        let completion = ScanCompletion {
            images: vec!["data:image/jpeg;base64,AAAA".to_string()],
            ..Default::default()
        };
        dispatch_completion(&completion);
        assert_eq!(received.borrow().as_ref(), Some(&completion));
    }
}
