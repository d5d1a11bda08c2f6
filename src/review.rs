//! 対話式の結果確認
//!
//! 解析結果（ReviewState）の一覧表示・編集・追加・削除を行い、
//! Accept / 再スキャン / 中止 のいずれかを返す。

use crate::error::Result;
use board_scan_common::review::{CircuitPatch, ReviewState};
use board_scan_common::schedule;
use board_scan_common::types::{BoardInfo, Curve, DetectedCircuit, DeviceCategory, Phase};
use dialoguer::{Confirm, Input, Select};
use regex::Regex;

/// 確認画面での選択結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Accept,
    Rescan,
    Quit,
}

const MENU: &[&str] = &["回路を編集", "回路を追加", "回路を削除", "Accept（確定）", "再スキャン", "中止"];

/// "B32" / "32A" / "c 16" 形式の略記を (curve, rating) に
pub fn parse_shorthand(input: &str) -> Option<(Option<Curve>, u32)> {
    lazy_static::lazy_static! {
        static ref SHORTHAND_RE: Regex = Regex::new(r"^(?i)\s*([bcd])?\s*(\d{1,4})\s*a?\s*$").unwrap();
    }
    let caps = SHORTHAND_RE.captures(input)?;
    let curve = caps.get(1).and_then(|m| Curve::parse(m.as_str()));
    let rating = caps[2].parse().ok()?;
    Some((curve, rating))
}

/// 盤情報の見出し
pub fn board_header(board: Option<&BoardInfo>) -> String {
    match board {
        Some(board) => {
            let mut parts = vec![board.display_name()];
            if let Some(main) = board.main_switch_badge() {
                parts.push(main);
            }
            parts.push(board.spd_badge().0);
            if let Some(ways) = board.estimated_total_ways {
                parts.push(format!("{} ways", ways));
            }
            parts.join(" | ")
        }
        None => "Unknown board".to_string(),
    }
}

/// 一覧の1行
pub fn format_circuit_row(circuit: &DetectedCircuit) -> String {
    let label = if circuit.label_text.trim().is_empty() {
        "(no label)"
    } else {
        circuit.label_text.trim()
    };
    let manual = if circuit.is_manual() { " *" } else { "" };
    format!(
        "{:>3}  {:<24} {:<8} {:<3} {}{}",
        circuit.index,
        label,
        circuit.device_label(),
        circuit.phase.as_str(),
        circuit.confidence.as_str(),
        manual
    )
}

fn print_overview(state: &ReviewState) {
    let summary = state.summary();
    println!("\n🔌 {}", board_header(state.board()));
    println!(
        "   {}回路 (high {}, medium {}, low {}, 3P {})",
        summary.total, summary.high, summary.medium, summary.low, summary.three_phase
    );
    for circuit in state.sorted_circuits() {
        println!("  {}", format_circuit_row(circuit));
    }
    println!();
}

/// 回路を選ばせてIDを返す
fn pick_circuit(state: &ReviewState, prompt: &str) -> Result<Option<String>> {
    let sorted = state.sorted_circuits();
    if sorted.is_empty() {
        println!("回路がありません");
        return Ok(None);
    }
    let items: Vec<String> = sorted.iter().map(|c| format_circuit_row(c)).collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|i| sorted[i].id.clone()))
}

/// 確認ループ
pub fn run_review(state: &mut ReviewState) -> Result<ReviewAction> {
    loop {
        print_overview(state);
        let choice = Select::new()
            .with_prompt("操作")
            .items(MENU)
            .default(0)
            .interact()?;

        match choice {
            0 => {
                if let Some(id) = pick_circuit(state, "編集する回路")? {
                    state.open_editor(&id);
                    edit_sheet(state)?;
                }
            }
            1 => {
                state.add_circuit();
                edit_sheet(state)?;
            }
            2 => {
                if let Some(id) = pick_circuit(state, "削除する回路")? {
                    let confirmed = Confirm::new()
                        .with_prompt("この回路を削除しますか？")
                        .default(false)
                        .interact()?;
                    if confirmed {
                        state.delete_circuit(&id);
                        tracing::debug!(id = %id, "circuit deleted");
                    }
                }
            }
            3 => return Ok(ReviewAction::Accept),
            4 => return Ok(ReviewAction::Rescan),
            _ => return Ok(ReviewAction::Quit),
        }
    }
}

const SHEET_FIELDS: &[&str] = &["ラベル", "略記 (例: B32)", "装置種別", "定格 (A)", "特性", "相", "型式メモ", "閉じる"];

/// 編集シート。開いている回路を1フィールドずつ更新する
fn edit_sheet(state: &mut ReviewState) -> Result<()> {
    while let Some(circuit) = state.editing_circuit().cloned() {
        println!("\n✏  {}", format_circuit_row(&circuit));
        let field = Select::new()
            .with_prompt("項目")
            .items(SHEET_FIELDS)
            .default(0)
            .interact()?;

        let patch = match field {
            0 => {
                let label: String = Input::new()
                    .with_prompt("ラベル")
                    .with_initial_text(circuit.label_text.clone())
                    .allow_empty(true)
                    .interact_text()?;
                Some(CircuitPatch::label(label.trim()))
            }
            1 => {
                let text: String = Input::new()
                    .with_prompt("略記")
                    .with_initial_text(circuit.device_label())
                    .interact_text()?;
                match parse_shorthand(&text) {
                    Some((curve, rating)) => Some(CircuitPatch {
                        rating_amps: Some(Some(rating)),
                        curve: curve.map(Some),
                        ..Default::default()
                    }),
                    None => {
                        println!("  読み取れません: {}", text);
                        None
                    }
                }
            }
            2 => {
                let labels: Vec<&str> = DeviceCategory::ALL.iter().map(|c| c.as_str()).collect();
                let current = DeviceCategory::ALL
                    .iter()
                    .position(|c| *c == circuit.device.category)
                    .unwrap_or(0);
                let i = Select::new().items(&labels).default(current).interact()?;
                Some(CircuitPatch::category(DeviceCategory::ALL[i]))
            }
            3 => {
                let text: String = Input::new()
                    .with_prompt("定格 (空欄で未設定)")
                    .allow_empty(true)
                    .interact_text()?;
                match schedule::parse_rating_input(&text) {
                    Some(rating) => Some(CircuitPatch::rating(rating)),
                    None => {
                        println!("  読み取れません: {}", text);
                        None
                    }
                }
            }
            4 => {
                let mut labels: Vec<&str> = Curve::ALL.iter().map(|c| c.as_str()).collect();
                labels.push("なし");
                let i = Select::new().items(&labels).default(0).interact()?;
                Some(CircuitPatch::curve(Curve::ALL.get(i).copied()))
            }
            5 => {
                let i = Select::new().items(&["1P", "3P"]).default(0).interact()?;
                Some(CircuitPatch::phase(if i == 0 { Phase::Single } else { Phase::Three }))
            }
            6 => {
                let text: String = Input::new()
                    .with_prompt("型式メモ")
                    .with_initial_text(circuit.device.device_type.clone())
                    .allow_empty(true)
                    .interact_text()?;
                Some(patch_from_device_text(&text))
            }
            _ => {
                state.close_editor();
                None
            }
        };

        if let Some(patch) = patch {
            state.update_circuit(&circuit.id, patch);
        }
    }
    Ok(())
}

/// 型式メモから読み取れる種別・特性も合わせて更新する
pub fn patch_from_device_text(text: &str) -> CircuitPatch {
    let text = schedule::normalise_curve_text(text.trim());
    CircuitPatch {
        category: schedule::device_category_from_text(&text),
        curve: schedule::curve_from_text(&text).map(Some),
        device_type: Some(text),
        ..Default::default()
    }
}
