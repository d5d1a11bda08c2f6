//! ボードスキャンの型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - BoardInfo: 分電盤の識別結果
//! - DetectedCircuit: 回路（ウェイ）1行分
//! - ScanHints / AnalysisOptions: 解析サービスへの入力
//! - ScanCompletion: Accept時に呼び出し元へ渡すペイロード
//!
//! 解析サービスの契約に合わせて、盤・回路レコードは snake_case のまま扱う。

use serde::{Deserialize, Serialize};
use std::fmt;

/// SPD（サージ保護装置）の有無
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpdStatus {
    Present,
    Absent,
    #[default]
    Unknown,
}

impl SpdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpdStatus::Present => "present",
            SpdStatus::Absent => "absent",
            SpdStatus::Unknown => "unknown",
        }
    }
}

/// バッジの表示トーン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Confirmed,
    Warning,
    Muted,
}

impl BadgeTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTone::Confirmed => "confirmed",
            BadgeTone::Warning => "warning",
            BadgeTone::Muted => "muted",
        }
    }
}

/// 分電盤情報
///
/// 解析中は部分的に届き、より確度の高い値で上書きされる。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardInfo {
    pub brand: String,
    pub model: String,
    pub main_switch_rating: Option<u32>,
    pub spd_status: SpdStatus,
    pub estimated_total_ways: Option<u32>,
}

impl BoardInfo {
    /// "Wylex NM8S" 形式の表示名
    pub fn display_name(&self) -> String {
        let name = [self.brand.trim(), self.model.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            "Unknown board".to_string()
        } else {
            name
        }
    }

    /// 主開閉器バッジ（例: "100A Main"）
    pub fn main_switch_badge(&self) -> Option<String> {
        self.main_switch_rating.map(|r| format!("{}A Main", r))
    }

    pub fn spd_badge(&self) -> (String, BadgeTone) {
        let tone = match self.spd_status {
            SpdStatus::Present => BadgeTone::Confirmed,
            SpdStatus::Absent => BadgeTone::Warning,
            SpdStatus::Unknown => BadgeTone::Muted,
        };
        (format!("SPD: {}", self.spd_status.as_str()), tone)
    }
}

/// 保護装置の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceCategory {
    #[default]
    #[serde(rename = "MCB", alias = "mcb")]
    Mcb,
    #[serde(rename = "RCBO", alias = "rcbo")]
    Rcbo,
    #[serde(rename = "RCD", alias = "rcd")]
    Rcd,
    #[serde(rename = "MCCB", alias = "mccb")]
    Mccb,
    #[serde(rename = "Fuse", alias = "fuse", alias = "FUSE")]
    Fuse,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 5] = [
        DeviceCategory::Mcb,
        DeviceCategory::Rcbo,
        DeviceCategory::Rcd,
        DeviceCategory::Mccb,
        DeviceCategory::Fuse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Mcb => "MCB",
            DeviceCategory::Rcbo => "RCBO",
            DeviceCategory::Rcd => "RCD",
            DeviceCategory::Mccb => "MCCB",
            DeviceCategory::Fuse => "Fuse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// トリップ特性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[serde(alias = "b")]
    B,
    #[serde(alias = "c")]
    C,
    #[serde(alias = "d")]
    D,
}

impl Curve {
    pub const ALL: [Curve; 3] = [Curve::B, Curve::C, Curve::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Curve::B => "B",
            Curve::C => "C",
            Curve::D => "D",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 相
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    #[serde(rename = "1P")]
    Single,
    #[serde(rename = "3P")]
    Three,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Single => "1P",
            Phase::Three => "3P",
        }
    }
}

/// 解析の確信度（表示用のみ、Acceptを妨げない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// 保護装置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub category: DeviceCategory,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub rating_amps: Option<u32>,
    #[serde(default)]
    pub curve: Option<Curve>,
}

/// 検出された回路
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCircuit {
    /// サーバ採番、または手動追加時は "manual-" 接頭辞
    pub id: String,
    /// 1始まりの表示番号（一意とは限らない）
    pub index: u32,
    #[serde(default)]
    pub label_text: String,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub confidence: Confidence,
}

impl DetectedCircuit {
    /// バッジ用の短い表記（"B32", "RCD 63A", "MCB"）
    pub fn device_label(&self) -> String {
        match (self.device.curve, self.device.rating_amps) {
            (Some(curve), Some(rating)) => format!("{}{}", curve, rating),
            (None, Some(rating)) => format!("{} {}A", self.device.category, rating),
            _ => self.device.category.to_string(),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.id.starts_with(crate::review::MANUAL_ID_PREFIX)
    }
}

/// 解析サービスへのヒント
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_switch_side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_ways: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_three_phase: Option<bool>,
}

/// 解析サービスの機能フラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub use_claude_ocr: bool,
    pub use_openai_components: bool,
}

impl AnalysisOptions {
    /// スキャンフローが常に送る固定値
    pub const FLOW: AnalysisOptions = AnalysisOptions {
        use_claude_ocr: true,
        use_openai_components: true,
    };
}

/// Accept時のペイロード
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanCompletion {
    pub board: Option<BoardInfo>,
    pub circuits: Vec<DetectedCircuit>,
    pub images: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wylex() -> BoardInfo {
        BoardInfo {
            brand: "Wylex".to_string(),
            model: "NM8S".to_string(),
            main_switch_rating: Some(100),
            spd_status: SpdStatus::Present,
            estimated_total_ways: None,
        }
    }

    #[test]
    fn test_board_display_name() {
        assert_eq!(wylex().display_name(), "Wylex NM8S");

        let brand_only = BoardInfo { brand: "Hager".to_string(), ..Default::default() };
        assert_eq!(brand_only.display_name(), "Hager");
        assert_eq!(BoardInfo::default().display_name(), "Unknown board");
    }

    #[test]
    fn test_board_badges() {
        let board = wylex();
        assert_eq!(board.main_switch_badge().as_deref(), Some("100A Main"));
        assert_eq!(board.spd_badge(), ("SPD: present".to_string(), BadgeTone::Confirmed));

        let unknown = BoardInfo::default();
        assert_eq!(unknown.main_switch_badge(), None);
        assert_eq!(unknown.spd_badge().1, BadgeTone::Muted);

        let absent = BoardInfo { spd_status: SpdStatus::Absent, ..Default::default() };
        assert_eq!(absent.spd_badge().1, BadgeTone::Warning);
    }

    #[test]
    fn test_board_deserialize_partial() {
        let json = r#"{"brand": "Wylex", "spd_status": "present"}"#;
        let board: BoardInfo = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(board.brand, "Wylex");
        assert_eq!(board.model, "");
        assert_eq!(board.main_switch_rating, None);
        assert_eq!(board.spd_status, SpdStatus::Present);
    }

    #[test]
    fn test_circuit_deserialize_without_type() {
        let json = r#"{
            "id": "c1",
            "index": 1,
            "label_text": "Kitchen",
            "device": {"category": "MCB", "rating_amps": 32, "curve": "B"},
            "phase": "1P",
            "confidence": "high"
        }"#;
        let circuit: DetectedCircuit = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(circuit.label_text, "Kitchen");
        assert_eq!(circuit.device.category, DeviceCategory::Mcb);
        assert_eq!(circuit.device.device_type, "");
        assert_eq!(circuit.device.rating_amps, Some(32));
        assert_eq!(circuit.device.curve, Some(Curve::B));
        assert_eq!(circuit.phase, Phase::Single);
        assert_eq!(circuit.confidence, Confidence::High);
    }

    #[test]
    fn test_circuit_serialize_wire_names() {
        let circuit = DetectedCircuit {
            id: "c9".to_string(),
            index: 9,
            label_text: "Shower".to_string(),
            device: Device {
                category: DeviceCategory::Rcbo,
                device_type: "Type A".to_string(),
                rating_amps: Some(40),
                curve: None,
            },
            phase: Phase::Three,
            confidence: Confidence::Medium,
        };
        let json = serde_json::to_string(&circuit).expect("シリアライズ失敗");
        assert!(json.contains("\"type\":\"Type A\""));
        assert!(json.contains("\"category\":\"RCBO\""));
        assert!(json.contains("\"phase\":\"3P\""));
        assert!(json.contains("\"confidence\":\"medium\""));
        assert!(json.contains("\"curve\":null"));
    }

    #[test]
    fn test_device_label() {
        let mut circuit = DetectedCircuit {
            id: "c1".to_string(),
            index: 1,
            label_text: String::new(),
            device: Device {
                category: DeviceCategory::Mcb,
                rating_amps: Some(32),
                curve: Some(Curve::B),
                ..Default::default()
            },
            phase: Phase::Single,
            confidence: Confidence::High,
        };
        assert_eq!(circuit.device_label(), "B32");

        circuit.device.curve = None;
        assert_eq!(circuit.device_label(), "MCB 32A");

        circuit.device.rating_amps = None;
        circuit.device.category = DeviceCategory::Rcd;
        assert_eq!(circuit.device_label(), "RCD");
    }

    #[test]
    fn test_category_and_curve_parse() {
        assert_eq!(DeviceCategory::parse("rcbo"), Some(DeviceCategory::Rcbo));
        assert_eq!(DeviceCategory::parse(" Fuse "), Some(DeviceCategory::Fuse));
        assert_eq!(DeviceCategory::parse("isolator"), None);
        assert_eq!(Curve::parse("c"), Some(Curve::C));
        assert_eq!(Curve::parse("K"), None);
    }

    #[test]
    fn test_hints_skip_empty_fields() {
        let hints = ScanHints { expected_ways: Some(12), ..Default::default() };
        let json = serde_json::to_string(&hints).expect("シリアライズ失敗");
        assert_eq!(json, r#"{"expected_ways":12}"#);
    }

    #[test]
    fn test_flow_options_fixed() {
        let json = serde_json::to_string(&AnalysisOptions::FLOW).expect("シリアライズ失敗");
        assert_eq!(json, r#"{"use_claude_ocr":true,"use_openai_components":true}"#);
    }
}
