//! ストリーミング解析セッション
//!
//! 解析ジョブ自体は外部サービスが持つ。ここでは
//! - AnalysisUpdate: ストリームで届くイベント
//! - AnalysisSnapshot: 描画用の最新状態（イベントごとに原子的に置換）
//! - AnalysisSession: 開始/適用/中断/リセットのライフサイクル
//! を扱う。タイムアウトはこの層では持たない。

use crate::error::{Error, Result};
use crate::stage::{self, StepState};
use crate::types::{AnalysisOptions, BoardInfo, DetectedCircuit, ScanHints};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 解析中プレビューに表示する回路バッジの上限
pub const PREVIEW_LIMIT: usize = 12;

/// 解析リクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<ScanHints>,
    pub options: AnalysisOptions,
}

/// ストリームで届く1イベント
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuits: Option<Vec<DetectedCircuit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_error: bool,
}

impl AnalysisUpdate {
    /// 既知のフィールドを1つも持たない（イベントではないJSON）
    pub fn is_empty(&self) -> bool {
        !self.is_error
            && self.progress.is_none()
            && self.stage.is_none()
            && self.stage_message.is_none()
            && self.board.is_none()
            && self.circuits.is_none()
            && self.warnings.is_none()
            && self.error.is_none()
    }
}

/// 描画用の解析状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisSnapshot {
    pub progress: f32,
    pub stage: String,
    pub stage_message: String,
    pub board: Option<BoardInfo>,
    pub circuits: Vec<DetectedCircuit>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl AnalysisSnapshot {
    /// 届いたフィールドだけを置き換える
    pub fn apply(&mut self, update: AnalysisUpdate) {
        if let Some(progress) = update.progress {
            self.progress = progress.clamp(0.0, 100.0);
        }
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(message) = update.stage_message {
            self.stage_message = message;
        }
        if let Some(board) = update.board {
            self.board = Some(board);
        }
        if let Some(circuits) = update.circuits {
            self.circuits = circuits;
        }
        if let Some(warnings) = update.warnings {
            self.warnings = warnings;
        }
        if update.is_error {
            self.error = Some(update.error.unwrap_or_else(|| "Analysis failed".to_string()));
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn step_states(&self) -> [StepState; 5] {
        stage::step_states(&self.stage)
    }

    /// ライブプレビュー用: 先頭12件と残り件数
    pub fn circuit_preview(&self) -> (&[DetectedCircuit], usize) {
        let shown = self.circuits.len().min(PREVIEW_LIMIT);
        (&self.circuits[..shown], self.circuits.len() - shown)
    }
}

/// 協調的な中断フラグ
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// セッション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Failed,
    Aborted,
}

/// 1回の解析実行を識別するチケット
#[derive(Debug, Clone)]
pub struct SessionTicket {
    epoch: u64,
    signal: AbortSignal,
}

impl SessionTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }
}

/// 解析セッション
///
/// 同時に走るのは1本だけ。古いチケットからのイベントは捨てる。
#[derive(Debug)]
pub struct AnalysisSession {
    state: SessionState,
    epoch: u64,
    snapshot: AnalysisSnapshot,
    signal: Option<AbortSignal>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            epoch: 0,
            snapshot: AnalysisSnapshot::default(),
            signal: None,
        }
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> &AnalysisSnapshot {
        &self.snapshot
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn begin(&mut self) -> Result<SessionTicket> {
        if self.is_running() {
            return Err(Error::AnalysisInFlight);
        }
        self.epoch += 1;
        self.snapshot = AnalysisSnapshot::default();
        self.state = SessionState::Running;

        let signal = AbortSignal::new();
        self.signal = Some(signal.clone());
        tracing::debug!(epoch = self.epoch, "analysis session started");
        Ok(SessionTicket { epoch: self.epoch, signal })
    }

    fn is_current(&self, ticket: &SessionTicket) -> bool {
        ticket.epoch == self.epoch && !ticket.is_aborted()
    }

    /// イベントを適用。古いチケットや終了済みセッションには適用しない
    pub fn apply(&mut self, ticket: &SessionTicket, update: AnalysisUpdate) -> bool {
        if !self.is_current(ticket) || !self.is_running() {
            tracing::debug!(epoch = ticket.epoch, "dropping stale analysis update");
            return false;
        }
        let failed = update.is_error;
        self.snapshot.apply(update);
        if failed {
            tracing::warn!(error = ?self.snapshot.error, "analysis stream reported an error");
            self.state = SessionState::Failed;
        }
        true
    }

    /// 外部呼び出しの完了
    pub fn finish(&mut self, ticket: &SessionTicket, result: std::result::Result<(), String>) -> SessionState {
        if !self.is_current(ticket) || !self.is_running() {
            return self.state;
        }
        self.state = match result {
            Ok(()) => SessionState::Completed,
            Err(message) => {
                tracing::warn!(%message, "analysis call failed");
                self.snapshot.error = Some(message);
                SessionState::Failed
            }
        };
        self.state
    }

    /// 協調的に中断する。確認は待たない
    pub fn abort(&mut self) {
        if let Some(signal) = &self.signal {
            signal.abort();
        }
        if self.is_running() {
            self.state = SessionState::Aborted;
        }
    }

    /// 状態を破棄して Idle に戻す
    pub fn reset(&mut self) {
        self.abort();
        self.epoch += 1;
        self.snapshot = AnalysisSnapshot::default();
        self.signal = None;
        self.state = SessionState::Idle;
    }
}
