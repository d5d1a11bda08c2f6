//! 試験表（Schedule of Tests）への変換
//!
//! Acceptされたスキャン結果をEICRの試験表の行に変換する。
//! AI由来の値は正規化し、備考に確認を促す注記を付ける。

use crate::types::{Curve, DetectedCircuit, DeviceCategory, ScanCompletion};
use regex::Regex;
use serde::{Deserialize, Serialize};

const AUTO_FILL_LOCATION: &str = "Consumer Unit";
const DEFAULT_KA_RATING: &str = "6kA";
const DEFAULT_REFERENCE_METHOD: &str = "C";

/// 試験表の1行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRow {
    pub id: String,
    pub circuit_number: String,
    pub circuit_designation: String,
    pub circuit_description: String,
    pub circuit_type: String,
    pub reference_method: String,
    pub live_size: String,
    pub cpc_size: String,
    pub protective_device_type: String,
    pub protective_device_curve: String,
    pub protective_device_rating: String,
    pub protective_device_ka_rating: String,
    pub protective_device_location: String,
    pub bs_standard: String,
    pub max_zs: String,
    pub ring_continuity: String,
    pub insulation_test_voltage: String,
    pub polarity: String,
    pub rcd_rating: String,
    pub functional_testing: String,
    pub notes: String,
    pub auto_filled: bool,
}

impl ScheduleRow {
    /// 空行（未入力の枠）か
    pub fn is_blank(&self) -> bool {
        self.circuit_description.trim().is_empty()
            && self.protective_device_type.trim().is_empty()
            && self.protective_device_rating.trim().is_empty()
    }

    /// 検出回路から行を生成
    pub fn from_circuit(circuit: &DetectedCircuit, circuit_number: usize) -> Self {
        let category = circuit.device.category;
        let curve = circuit
            .device
            .curve
            .or_else(|| curve_from_text(&circuit.device.device_type));
        let rating = circuit
            .device
            .rating_amps
            .or_else(|| normalise_rating(&circuit.device.device_type));

        let circuit_type = circuit_type_for_label(&circuit.label_text);
        let live_size = live_size_for_rating(rating);
        let is_ring = circuit_type == "Ring";

        Self {
            id: format!("circuit-{}", circuit_number),
            circuit_number: circuit_number.to_string(),
            circuit_designation: format!("C{}", circuit_number),
            circuit_description: circuit.label_text.trim().to_string(),
            circuit_type: circuit_type.to_string(),
            reference_method: DEFAULT_REFERENCE_METHOD.to_string(),
            live_size: live_size.to_string(),
            cpc_size: twin_and_earth_cpc(live_size).to_string(),
            protective_device_type: category.to_string(),
            protective_device_curve: curve.map(|c| c.to_string()).unwrap_or_default(),
            protective_device_rating: rating.map(|r| r.to_string()).unwrap_or_default(),
            protective_device_ka_rating: DEFAULT_KA_RATING.to_string(),
            protective_device_location: AUTO_FILL_LOCATION.to_string(),
            bs_standard: bs_standard(category).to_string(),
            max_zs: max_zs(category, curve, rating)
                .map(|z| format!("{:.2}", z))
                .unwrap_or_default(),
            ring_continuity: if is_ring { String::new() } else { "N/A".to_string() },
            insulation_test_voltage: "500V".to_string(),
            polarity: "Satisfactory".to_string(),
            rcd_rating: if requires_rcd(&circuit.label_text, circuit_type, category) {
                "30mA".to_string()
            } else {
                String::new()
            },
            functional_testing: "Satisfactory".to_string(),
            notes: format!(
                "AI detected ({} confidence) - Please verify all values",
                circuit.confidence.as_str()
            ),
            auto_filled: true,
        }
    }
}

/// "Type 1/2/3" 表記を英国式の "Type B/C/D" に直す
pub fn normalise_curve_text(text: &str) -> String {
    lazy_static::lazy_static! {
        static ref TYPE_RE: Regex = Regex::new(r"(?i)type ?([123])").unwrap();
    }
    TYPE_RE
        .replace_all(text, |caps: &regex::Captures| {
            let letter = match &caps[1] {
                "1" => "B",
                "2" => "C",
                _ => "D",
            };
            format!("Type {}", letter)
        })
        .into_owned()
}

/// 自由記述からトリップ特性を取り出す（"Type C", "C32", "b"）
pub fn curve_from_text(text: &str) -> Option<Curve> {
    lazy_static::lazy_static! {
        static ref CURVE_RE: Regex = Regex::new(r"(?i)(?:type ?|\b)([bcd])(?:\d|\b)").unwrap();
    }
    let normalised = normalise_curve_text(text);
    CURVE_RE
        .captures(&normalised)
        .and_then(|caps| Curve::parse(&caps[1]))
}

/// 自由記述から装置種別を判定
pub fn device_category_from_text(text: &str) -> Option<DeviceCategory> {
    let upper = text.to_uppercase();
    if upper.contains("RCBO") {
        Some(DeviceCategory::Rcbo)
    } else if upper.contains("RCD") || upper.contains("RCCB") {
        Some(DeviceCategory::Rcd)
    } else if upper.contains("MCCB") {
        Some(DeviceCategory::Mccb)
    } else if upper.contains("MCB") {
        Some(DeviceCategory::Mcb)
    } else if upper.contains("FUSE") || upper.contains("BS 1361") || upper.contains("BS 3036") {
        Some(DeviceCategory::Fuse)
    } else {
        None
    }
}

/// 定格電流を取り出す（"32A" → 32, "Type 2 32A" → 32, "B16 6kA" → 16）
///
/// アンペア表記、カーブ付き表記（"C40"）、数字のみの順に試す。
/// 小数やそれ以外の数字の並びは定格とみなさない。
pub fn normalise_rating(text: &str) -> Option<u32> {
    lazy_static::lazy_static! {
        static ref AMPS_RE: Regex = Regex::new(r"(?i)(?:^|[^\d.])(\d{1,4})\s*a\b").unwrap();
        static ref CURVE_RATING_RE: Regex = Regex::new(r"(?i)\b[bcd](\d{1,4})\b").unwrap();
        static ref BARE_RE: Regex = Regex::new(r"^\s*(\d{1,4})\s*$").unwrap();
    }
    [&*AMPS_RE, &*CURVE_RATING_RE, &*BARE_RE]
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}

/// 定格の入力欄を解釈する
///
/// 空欄は `Some(None)`（未設定に戻す）、読めない入力は `None`（変更しない）。
pub fn parse_rating_input(text: &str) -> Option<Option<u32>> {
    if text.trim().is_empty() {
        return Some(None);
    }
    normalise_rating(text).map(Some)
}

pub fn bs_standard(category: DeviceCategory) -> &'static str {
    match category {
        DeviceCategory::Mcb => "BS EN 60898",
        DeviceCategory::Rcbo => "BS EN 61009",
        DeviceCategory::Rcd => "BS EN 61008",
        DeviceCategory::Mccb => "BS EN 60947-2",
        DeviceCategory::Fuse => "BS 1361",
    }
}

/// 定格電流からの導体サイズ目安（mm²）
pub fn live_size_for_rating(rating: Option<u32>) -> &'static str {
    match rating {
        Some(r) if r <= 10 => "1.5",
        Some(r) if r <= 20 => "2.5",
        Some(r) if r <= 32 => "4.0",
        _ => "2.5",
    }
}

/// VVF（Twin & Earth）のCPCサイズ
pub fn twin_and_earth_cpc(live_size: &str) -> &'static str {
    match live_size {
        "1.0" | "1.5" => "1.0",
        "2.5" | "4.0" => "1.5",
        "6.0" => "2.5",
        "10" | "10.0" => "4.0",
        "16" | "16.0" => "6.0",
        _ => "",
    }
}

/// ラベルから回路種別を推定
pub fn circuit_type_for_label(label: &str) -> &'static str {
    let lower = label.to_lowercase();
    if lower.contains("ring") {
        "Ring"
    } else if lower.contains("socket") {
        "Sockets"
    } else if lower.contains("light") {
        "Lighting"
    } else if lower.contains("cooker") || lower.contains("oven") {
        "Cooker"
    } else if lower.contains("shower") {
        "Shower"
    } else {
        ""
    }
}

/// 30mA RCD保護が必要か
pub fn requires_rcd(label: &str, circuit_type: &str, category: DeviceCategory) -> bool {
    let lower = label.to_lowercase();
    matches!(circuit_type, "Sockets" | "Ring")
        || lower.contains("bathroom")
        || lower.contains("outdoor")
        || lower.contains("garden")
        || matches!(category, DeviceCategory::Rcd | DeviceCategory::Rcbo)
}

/// 最大Zs（Ω、80%補正後）。MCB/RCBOのみ
pub fn max_zs(category: DeviceCategory, curve: Option<Curve>, rating: Option<u32>) -> Option<f64> {
    if !matches!(category, DeviceCategory::Mcb | DeviceCategory::Rcbo) {
        return None;
    }
    let rating = rating.filter(|r| *r > 0)? as f64;
    // Uo=230V, Cmin=0.95, 瞬時トリップ倍率 B:5 / C:10 / D:20
    let multiplier = match curve? {
        Curve::B => 5.0,
        Curve::C => 10.0,
        Curve::D => 20.0,
    };
    let tabulated = (230.0 * 0.95) / (multiplier * rating);
    Some(tabulated * 0.8)
}

/// スキャン結果を行に変換（index昇順）
pub fn rows_from_completion(completion: &ScanCompletion) -> Vec<ScheduleRow> {
    let mut circuits: Vec<&DetectedCircuit> = completion.circuits.iter().collect();
    circuits.sort_by_key(|c| c.index);
    circuits
        .into_iter()
        .enumerate()
        .map(|(i, c)| ScheduleRow::from_circuit(c, i + 1))
        .collect()
}

/// 既存の試験表に適用。空行を先に埋め、残りは末尾に追加
///
/// 戻り値は (埋めた行数, 追加した行数)
pub fn apply_to_schedule(existing: &mut Vec<ScheduleRow>, rows: Vec<ScheduleRow>) -> (usize, usize) {
    let mut blanks = existing
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_blank())
        .map(|(i, _)| i)
        .collect::<Vec<_>>()
        .into_iter();

    let mut filled = 0;
    let mut appended = 0;
    for row in rows {
        match blanks.next() {
            Some(idx) => {
                let slot = &existing[idx];
                let merged = ScheduleRow {
                    id: slot.id.clone(),
                    circuit_number: slot.circuit_number.clone(),
                    circuit_designation: slot.circuit_designation.clone(),
                    ..row
                };
                existing[idx] = merged;
                filled += 1;
            }
            None => {
                let number = existing.len() + 1;
                existing.push(ScheduleRow {
                    id: format!("circuit-{}", number),
                    circuit_number: number.to_string(),
                    circuit_designation: format!("C{}", number),
                    ..row
                });
                appended += 1;
            }
        }
    }
    (filled, appended)
}
