//! 分電盤情報の表示（解析中プレビューと結果確認で共用）

use board_scan_common::types::BoardInfo;
use leptos::prelude::*;

#[component]
pub fn BoardSummary(board: BoardInfo) -> impl IntoView {
    let (spd_text, tone) = board.spd_badge();
    let main_switch = board.main_switch_badge();
    let ways = board.estimated_total_ways;

    view! {
        <div class="board-summary">
            <h3>{board.display_name()}</h3>
            <div class="badges">
                {main_switch.map(|text| view! { <span class="badge">{text}</span> })}
                <span class=format!("badge badge-{}", tone.as_str())>{spd_text}</span>
                {ways.map(|ways| view! { <span class="badge badge-muted">{format!("{} ways", ways)}</span> })}
            </div>
        </div>
    }
}
