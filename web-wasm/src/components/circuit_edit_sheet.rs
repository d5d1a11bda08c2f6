//! 回路編集シート
//!
//! 1回路だけに紐づく。変更は正本のリストへ直接書き込むので
//! シートと一覧は常に同じ値を表示する。

use super::results_stage::with_review;
use board_scan_common::flow::ScanFlow;
use board_scan_common::review::CircuitPatch;
use board_scan_common::schedule;
use board_scan_common::types::{Curve, DeviceCategory, Phase};
use leptos::prelude::*;

/// 編集中の回路にパッチを当てる
fn patch_editing(flow: RwSignal<ScanFlow>, patch: CircuitPatch) {
    with_review(flow, |r| {
        if let Some(id) = r.editing_circuit().map(|c| c.id.clone()) {
            r.update_circuit(&id, patch);
        }
    });
}

fn rating_text(rating: Option<u32>) -> String {
    rating.map(|r| r.to_string()).unwrap_or_default()
}

fn parse_phase(value: &str) -> Phase {
    if value == Phase::Three.as_str() {
        Phase::Three
    } else {
        Phase::Single
    }
}

#[component]
pub fn CircuitEditSheet(flow: RwSignal<ScanFlow>) -> impl IntoView {
    let circuit = move || flow.with(|f| f.review().and_then(|r| r.editing_circuit().cloned()));
    let close = move |_| {
        with_review(flow, |r| r.close_editor());
    };
    let delete = move |_| {
        with_review(flow, |r| {
            if let Some(id) = r.editing_circuit().map(|c| c.id.clone()) {
                r.delete_circuit(&id);
            }
        });
    };

    view! {
        {move || circuit().map(|c| {
            let category = c.device.category;
            let curve = c.device.curve;
            let phase = c.phase;
            let current_rating = c.device.rating_amps;
            view! {
                <div class="edit-sheet">
                    <h3>{format!("回路 {}", c.index)}</h3>

                    <div class="form-group">
                        <label>"回路名"</label>
                        <input
                            type="text"
                            prop:value=c.label_text.clone()
                            on:change=move |ev| patch_editing(flow, CircuitPatch::label(event_target_value(&ev)))
                        />
                    </div>

                    <div class="form-group">
                        <label>"種類"</label>
                        <select on:change=move |ev| {
                            if let Some(category) = DeviceCategory::parse(&event_target_value(&ev)) {
                                patch_editing(flow, CircuitPatch::category(category));
                            }
                        }>
                            {DeviceCategory::ALL
                                .iter()
                                .map(|c| view! {
                                    <option value=c.as_str() selected=*c == category>{c.as_str()}</option>
                                })
                                .collect_view()}
                        </select>
                    </div>

                    <div class="form-group">
                        <label>"型式メモ"</label>
                        <input
                            type="text"
                            prop:value=c.device.device_type.clone()
                            on:change=move |ev| patch_editing(flow, CircuitPatch::device_type(event_target_value(&ev)))
                        />
                    </div>

                    <div class="form-group">
                        <label>"定格 (A)"</label>
                        <input
                            type="number"
                            min="0"
                            step="1"
                            prop:value=rating_text(current_rating)
                            on:change=move |ev| {
                                match schedule::parse_rating_input(&event_target_value(&ev)) {
                                    Some(rating) => patch_editing(flow, CircuitPatch::rating(rating)),
                                    // 小数などは受け付けず元の値に戻す
                                    None => event_target::<web_sys::HtmlInputElement>(&ev)
                                        .set_value(&rating_text(current_rating)),
                                }
                            }
                        />
                    </div>

                    <div class="form-group">
                        <label>"カーブ"</label>
                        <select on:change=move |ev| {
                            patch_editing(flow, CircuitPatch::curve(Curve::parse(&event_target_value(&ev))));
                        }>
                            <option value="" selected=curve.is_none()>"-"</option>
                            {Curve::ALL
                                .iter()
                                .map(|c| view! {
                                    <option value=c.as_str() selected=Some(*c) == curve>{c.as_str()}</option>
                                })
                                .collect_view()}
                        </select>
                    </div>

                    <div class="form-group">
                        <label>"相"</label>
                        <select on:change=move |ev| patch_editing(flow, CircuitPatch::phase(parse_phase(&event_target_value(&ev))))>
                            {[Phase::Single, Phase::Three]
                                .into_iter()
                                .map(|p| view! {
                                    <option value=p.as_str() selected=p == phase>{p.as_str()}</option>
                                })
                                .collect_view()}
                        </select>
                    </div>

                    <div class="sheet-actions">
                        <button class="btn btn-tertiary" on:click=delete>"削除"</button>
                        <button class="btn btn-primary" on:click=close>"閉じる"</button>
                    </div>
                </div>
            }
        })}
    }
}
