//! 結果確認ステージ
//!
//! 解析ストリームから切り離したローカルコピーを編集する。
//! 遅れて届いた解析イベントで編集内容が上書きされることはない。

use crate::analysis::AnalysisSnapshot;
use crate::types::{
    BoardInfo, Confidence, Curve, DetectedCircuit, Device, DeviceCategory, Phase, ScanCompletion,
};

/// 手動追加回路のID接頭辞（サーバ採番と衝突しない名前空間）
pub const MANUAL_ID_PREFIX: &str = "manual-";

/// 手動追加回路のID採番（単調増加カウンタ）
#[derive(Debug, Clone, Default)]
pub struct ManualIdGenerator {
    last: u64,
}

impl ManualIdGenerator {
    /// 既存の manual-N を避けるように初期化
    pub fn seeded_from(circuits: &[DetectedCircuit]) -> Self {
        let last = circuits
            .iter()
            .filter_map(|c| c.id.strip_prefix(MANUAL_ID_PREFIX))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    pub fn next_id(&mut self) -> String {
        self.last += 1;
        format!("{}{}", MANUAL_ID_PREFIX, self.last)
    }
}

/// 回路への部分更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitPatch {
    pub label_text: Option<String>,
    pub category: Option<DeviceCategory>,
    pub device_type: Option<String>,
    pub rating_amps: Option<Option<u32>>,
    pub curve: Option<Option<Curve>>,
    pub phase: Option<Phase>,
}

impl CircuitPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self { label_text: Some(label.into()), ..Default::default() }
    }

    pub fn category(category: DeviceCategory) -> Self {
        Self { category: Some(category), ..Default::default() }
    }

    pub fn device_type(device_type: impl Into<String>) -> Self {
        Self { device_type: Some(device_type.into()), ..Default::default() }
    }

    pub fn rating(rating_amps: Option<u32>) -> Self {
        Self { rating_amps: Some(rating_amps), ..Default::default() }
    }

    pub fn curve(curve: Option<Curve>) -> Self {
        Self { curve: Some(curve), ..Default::default() }
    }

    pub fn phase(phase: Phase) -> Self {
        Self { phase: Some(phase), ..Default::default() }
    }

    /// 指定フィールドのみ上書き
    pub fn apply_to(self, circuit: &mut DetectedCircuit) {
        if let Some(label) = self.label_text {
            circuit.label_text = label;
        }
        if let Some(category) = self.category {
            circuit.device.category = category;
        }
        if let Some(device_type) = self.device_type {
            circuit.device.device_type = device_type;
        }
        if let Some(rating) = self.rating_amps {
            circuit.device.rating_amps = rating;
        }
        if let Some(curve) = self.curve {
            circuit.device.curve = curve;
        }
        if let Some(phase) = self.phase {
            circuit.phase = phase;
        }
    }
}

/// 確信度別件数と三相回路数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub three_phase: usize,
}

/// 結果確認ステージの状態
#[derive(Debug, Clone, Default)]
pub struct ReviewState {
    board: Option<BoardInfo>,
    circuits: Vec<DetectedCircuit>,
    editing: Option<String>,
    ids: ManualIdGenerator,
}

impl ReviewState {
    pub fn new(board: Option<BoardInfo>, circuits: Vec<DetectedCircuit>) -> Self {
        let ids = ManualIdGenerator::seeded_from(&circuits);
        Self { board, circuits, editing: None, ids }
    }

    /// 解析状態のコピーから開始
    pub fn from_snapshot(snapshot: &AnalysisSnapshot) -> Self {
        Self::new(snapshot.board.clone(), snapshot.circuits.clone())
    }

    pub fn board(&self) -> Option<&BoardInfo> {
        self.board.as_ref()
    }

    pub fn circuits(&self) -> &[DetectedCircuit] {
        &self.circuits
    }

    pub fn circuit(&self, id: &str) -> Option<&DetectedCircuit> {
        self.circuits.iter().find(|c| c.id == id)
    }

    /// 表示用: index昇順（安定ソート、状態は変更しない）
    pub fn sorted_circuits(&self) -> Vec<&DetectedCircuit> {
        let mut sorted: Vec<&DetectedCircuit> = self.circuits.iter().collect();
        sorted.sort_by_key(|c| c.index);
        sorted
    }

    pub fn summary(&self) -> ReviewSummary {
        self.circuits.iter().fold(
            ReviewSummary { total: self.circuits.len(), ..Default::default() },
            |mut s, c| {
                match c.confidence {
                    Confidence::High => s.high += 1,
                    Confidence::Medium => s.medium += 1,
                    Confidence::Low => s.low += 1,
                }
                if c.phase == Phase::Three {
                    s.three_phase += 1;
                }
                s
            },
        )
    }

    pub fn update_circuit(&mut self, id: &str, patch: CircuitPatch) -> bool {
        match self.circuits.iter_mut().find(|c| c.id == id) {
            Some(circuit) => {
                patch.apply_to(circuit);
                true
            }
            None => false,
        }
    }

    /// 削除。編集中の回路なら編集シートも閉じる
    pub fn delete_circuit(&mut self, id: &str) -> bool {
        let before = self.circuits.len();
        self.circuits.retain(|c| c.id != id);
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        self.circuits.len() != before
    }

    /// 手動回路を追加して編集シートを開く
    pub fn add_circuit(&mut self) -> String {
        let index = self.circuits.iter().map(|c| c.index).max().unwrap_or(0) + 1;
        let id = self.ids.next_id();
        self.circuits.push(DetectedCircuit {
            id: id.clone(),
            index,
            label_text: String::new(),
            device: Device {
                category: DeviceCategory::Mcb,
                ..Default::default()
            },
            phase: Phase::Single,
            confidence: Confidence::High,
        });
        self.editing = Some(id.clone());
        id
    }

    pub fn open_editor(&mut self, id: &str) -> bool {
        if self.circuit(id).is_some() {
            self.editing = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn close_editor(&mut self) {
        self.editing = None;
    }

    /// 編集シートの対象。一覧と同じ実体を参照する
    pub fn editing_circuit(&self) -> Option<&DetectedCircuit> {
        self.editing.as_deref().and_then(|id| self.circuit(id))
    }

    /// Accept: 状態を消費して呼び出し元へのペイロードを作る
    pub fn accept(self, images: Vec<String>) -> ScanCompletion {
        ScanCompletion {
            board: self.board,
            circuits: self.circuits,
            images,
        }
    }
}
