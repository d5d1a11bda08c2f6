//! 設定パネルコンポーネント

use crate::settings::Settings;
use board_scan_common::types::ScanHints;
use leptos::prelude::*;

fn parse_ways(value: &str) -> Option<u32> {
    value.trim().parse().ok().filter(|w| *w > 0)
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

#[component]
pub fn SettingsPanel(
    settings: ReadSignal<Settings>,
    set_settings: WriteSignal<Settings>,
    hints: ReadSignal<ScanHints>,
    set_hints: WriteSignal<ScanHints>,
    title: ReadSignal<String>,
    set_title: WriteSignal<String>,
    status: ReadSignal<String>,
    on_save: Callback<()>,
    on_clear: Callback<()>,
) -> impl IntoView {
    view! {
        <div class="settings-panel">
            <div class="settings-grid">
                <div class="form-group">
                    <label for="endpoint">"解析サービスURL"</label>
                    <input
                        type="url"
                        id="endpoint"
                        placeholder=crate::settings::DEFAULT_ENDPOINT
                        prop:value=move || settings.get().endpoint
                        on:input=move |ev| {
                            set_settings.update(|s| s.endpoint = event_target_value(&ev));
                        }
                    />
                </div>

                <div class="form-group">
                    <label for="api-key">"API Key"</label>
                    <input
                        type="password"
                        id="api-key"
                        placeholder="API Keyを入力..."
                        prop:value=move || settings.get().api_key
                        on:input=move |ev| {
                            set_settings.update(|s| s.api_key = event_target_value(&ev));
                        }
                    />
                    <div class="api-actions">
                        <button class="btn btn-primary btn-small" on:click=move |_| on_save.run(())>
                            "保存"
                        </button>
                        <button class="btn btn-tertiary btn-small" on:click=move |_| on_clear.run(())>
                            "削除"
                        </button>
                    </div>
                    <p class="text-muted">{move || status.get()}</p>
                </div>

                <div class="form-group">
                    <label for="expected-ways">"想定回路数"</label>
                    <input
                        type="number"
                        id="expected-ways"
                        min="1"
                        prop:value=move || hints.get().expected_ways.map(|w| w.to_string()).unwrap_or_default()
                        on:input=move |ev| {
                            set_hints.update(|h| h.expected_ways = parse_ways(&event_target_value(&ev)));
                        }
                    />
                </div>

                <div class="form-group">
                    <label for="main-switch-side">"主開閉器の位置"</label>
                    <select
                        id="main-switch-side"
                        on:change=move |ev| {
                            set_hints.update(|h| h.main_switch_side = non_empty(event_target_value(&ev)));
                        }
                    >
                        <option value="">"不明"</option>
                        <option value="left">"左"</option>
                        <option value="right">"右"</option>
                    </select>
                </div>

                <div class="form-group">
                    <label for="board-type">"盤の種類"</label>
                    <input
                        type="text"
                        id="board-type"
                        placeholder="split-load, high-integrity..."
                        prop:value=move || hints.get().board_type.unwrap_or_default()
                        on:input=move |ev| {
                            set_hints.update(|h| h.board_type = non_empty(event_target_value(&ev)));
                        }
                    />
                </div>

                <div class="form-group">
                    <label>
                        <input
                            type="checkbox"
                            prop:checked=move || hints.get().is_three_phase.unwrap_or(false)
                            on:change=move |ev| {
                                set_hints.update(|h| h.is_three_phase = event_target_checked(&ev).then_some(true));
                            }
                        />
                        "三相盤"
                    </label>
                </div>

                <div class="form-group">
                    <label for="title">"ファイル名"</label>
                    <input
                        type="text"
                        id="title"
                        prop:value=move || title.get()
                        on:input=move |ev| {
                            set_title.set(event_target_value(&ev));
                        }
                    />
                </div>
            </div>
        </div>
    }
}
