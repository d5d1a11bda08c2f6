//! スキャンフロー（capture → analyzing → results → accept）
//!
//! 現在ステージ・撮影画像・解析セッションを所有する。
//! 逆方向の遷移は rescan / cancel のみ。

use crate::analysis::{AnalysisRequest, AnalysisSession, AnalysisSnapshot, AnalysisUpdate, SessionState, SessionTicket};
use crate::error::{Error, Result};
use crate::review::ReviewState;
use crate::types::{AnalysisOptions, ScanCompletion, ScanHints};

/// フローのトップレベル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Capture,
    Analyzing,
    Results,
}

impl FlowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStage::Capture => "capture",
            FlowStage::Analyzing => "analyzing",
            FlowStage::Results => "results",
        }
    }
}

/// スキャンフローのオーケストレータ
#[derive(Debug)]
pub struct ScanFlow {
    stage: FlowStage,
    images: Vec<String>,
    session: AnalysisSession,
    review: Option<ReviewState>,
    hints: Option<ScanHints>,
    finished: bool,
}

impl Default for ScanFlow {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ScanFlow {
    pub fn new(hints: Option<ScanHints>) -> Self {
        Self {
            stage: FlowStage::Capture,
            images: Vec::new(),
            session: AnalysisSession::new(),
            review: None,
            hints,
            finished: false,
        }
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn hints(&self) -> Option<&ScanHints> {
        self.hints.as_ref()
    }

    pub fn snapshot(&self) -> &AnalysisSnapshot {
        self.session.snapshot()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn review(&self) -> Option<&ReviewState> {
        self.review.as_ref()
    }

    pub fn review_mut(&mut self) -> Option<&mut ReviewState> {
        self.review.as_mut()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 閉じられるナビバーは撮影ステージのみ
    pub fn shows_nav_bar(&self) -> bool {
        self.stage == FlowStage::Capture
    }

    fn ensure(&self, expected: &[FlowStage], action: &'static str) -> Result<()> {
        if self.finished {
            return Err(Error::FlowFinished);
        }
        if expected.contains(&self.stage) {
            Ok(())
        } else {
            Err(Error::InvalidTransition { from: self.stage.as_str(), action })
        }
    }

    /// capture → analyzing。送信すべきリクエストとチケットを返す
    pub fn complete_capture(&mut self, images: Vec<String>) -> Result<(AnalysisRequest, SessionTicket)> {
        self.ensure(&[FlowStage::Capture], "start analysis")?;
        if images.is_empty() {
            return Err(Error::NoImages);
        }
        let ticket = self.session.begin()?;
        self.images = images;
        self.stage = FlowStage::Analyzing;
        tracing::info!(images = self.images.len(), "capture complete; analysis started");

        let request = AnalysisRequest {
            images: self.images.clone(),
            hints: self.hints.clone(),
            options: AnalysisOptions::FLOW,
        };
        Ok((request, ticket))
    }

    /// ストリームイベントの適用
    pub fn apply_update(&mut self, ticket: &SessionTicket, update: AnalysisUpdate) -> bool {
        if self.stage != FlowStage::Analyzing {
            return false;
        }
        self.session.apply(ticket, update)
    }

    /// 外部呼び出しの完了。成功なら results、失敗なら analyzing のままエラー表示
    pub fn finish_analysis(&mut self, ticket: &SessionTicket, result: std::result::Result<(), String>) -> FlowStage {
        if self.stage != FlowStage::Analyzing {
            return self.stage;
        }
        if self.session.finish(ticket, result) == SessionState::Completed {
            self.review = Some(ReviewState::from_snapshot(self.session.snapshot()));
            self.stage = FlowStage::Results;
            tracing::info!(circuits = self.session.snapshot().circuits.len(), "analysis complete");
        }
        self.stage
    }

    /// 解析中のキャンセル（中断して撮影へ戻る）
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure(&[FlowStage::Analyzing], "cancel")?;
        self.return_to_capture();
        Ok(())
    }

    /// 再スキャン（エラー時のリトライもここ）
    pub fn rescan(&mut self) -> Result<()> {
        self.ensure(&[FlowStage::Analyzing, FlowStage::Results], "rescan")?;
        self.return_to_capture();
        Ok(())
    }

    fn return_to_capture(&mut self) {
        self.session.reset();
        self.images.clear();
        self.review = None;
        self.stage = FlowStage::Capture;
        tracing::debug!("returned to capture");
    }

    /// Accept。以降このフローは遷移しない
    pub fn accept(&mut self) -> Result<ScanCompletion> {
        self.ensure(&[FlowStage::Results], "accept")?;
        let review = self.review.take().unwrap_or_default();
        let completion = review.accept(std::mem::take(&mut self.images));
        self.finished = true;
        tracing::info!(circuits = completion.circuits.len(), "scan accepted");
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::CircuitPatch;
    use crate::types::{BoardInfo, Confidence, Curve, DetectedCircuit, Device, DeviceCategory, Phase, SpdStatus};

    fn images() -> Vec<String> {
        vec![
            "data:image/jpeg;base64,AAAA".to_string(),
            "data:image/jpeg;base64,BBBB".to_string(),
        ]
    }

    fn kitchen() -> DetectedCircuit {
        DetectedCircuit {
            id: "c1".to_string(),
            index: 1,
            label_text: "Kitchen".to_string(),
            device: Device {
                category: DeviceCategory::Mcb,
                device_type: String::new(),
                rating_amps: Some(32),
                curve: Some(Curve::B),
            },
            phase: Phase::Single,
            confidence: Confidence::High,
        }
    }

    fn run_to_results(flow: &mut ScanFlow) {
        let (_, ticket) = flow.complete_capture(images()).unwrap();
        flow.apply_update(&ticket, AnalysisUpdate {
            progress: Some(50.0),
            stage: Some("gemini ocr".into()),
            board: Some(BoardInfo {
                brand: "Wylex".into(),
                model: "NM8S".into(),
                main_switch_rating: Some(100),
                spd_status: SpdStatus::Present,
                estimated_total_ways: None,
            }),
            circuits: Some(vec![]),
            ..Default::default()
        });
        flow.apply_update(&ticket, AnalysisUpdate {
            progress: Some(100.0),
            stage: Some("complete".into()),
            circuits: Some(vec![kitchen()]),
            ..Default::default()
        });
        assert_eq!(flow.finish_analysis(&ticket, Ok(())), FlowStage::Results);
    }

    #[test]
    fn test_complete_capture_builds_request() {
        let hints = ScanHints { expected_ways: Some(10), ..Default::default() };
        let mut flow = ScanFlow::new(Some(hints.clone()));
        assert!(flow.shows_nav_bar());

        let (request, _) = flow.complete_capture(images()).unwrap();
        assert_eq!(flow.stage(), FlowStage::Analyzing);
        assert!(!flow.shows_nav_bar());
        assert_eq!(request.images, images());
        assert_eq!(request.hints, Some(hints));
        assert_eq!(request.options, AnalysisOptions::FLOW);
    }

    #[test]
    fn test_zero_images_rejected() {
        let mut flow = ScanFlow::default();
        assert!(matches!(flow.complete_capture(vec![]), Err(Error::NoImages)));
        assert_eq!(flow.stage(), FlowStage::Capture);
    }

    #[test]
    fn test_example_scenario_results() {
        let mut flow = ScanFlow::default();
        run_to_results(&mut flow);

        let review = flow.review().unwrap();
        assert_eq!(review.circuits().len(), 1);
        let board = review.board().unwrap();
        assert_eq!(board.display_name(), "Wylex NM8S");
        assert_eq!(board.main_switch_badge().as_deref(), Some("100A Main"));
        assert_eq!(board.spd_badge(), ("SPD: present".to_string(), crate::types::BadgeTone::Confirmed));
    }

    #[test]
    fn test_failure_stays_in_analyzing() {
        let mut flow = ScanFlow::default();
        let (_, ticket) = flow.complete_capture(images()).unwrap();
        flow.apply_update(&ticket, AnalysisUpdate {
            is_error: true,
            error: Some("Service unavailable".into()),
            ..Default::default()
        });
        assert_eq!(flow.finish_analysis(&ticket, Ok(())), FlowStage::Analyzing);
        assert_eq!(flow.snapshot().error.as_deref(), Some("Service unavailable"));

        // リトライ経路
        flow.rescan().unwrap();
        assert_eq!(flow.stage(), FlowStage::Capture);
        assert!(flow.images().is_empty());
        assert!(flow.snapshot().error.is_none());
    }

    #[test]
    fn test_call_failure_stays_in_analyzing() {
        let mut flow = ScanFlow::default();
        let (_, ticket) = flow.complete_capture(images()).unwrap();
        assert_eq!(flow.finish_analysis(&ticket, Err("timeout".into())), FlowStage::Analyzing);
        assert_eq!(flow.session_state(), SessionState::Failed);
    }

    #[test]
    fn test_cancel_discards_partial_results() {
        let mut flow = ScanFlow::default();
        let (_, ticket) = flow.complete_capture(images()).unwrap();
        flow.apply_update(&ticket, AnalysisUpdate { circuits: Some(vec![kitchen()]), ..Default::default() });

        flow.cancel().unwrap();
        assert!(ticket.is_aborted());
        assert_eq!(flow.stage(), FlowStage::Capture);
        assert!(flow.images().is_empty());
        assert!(flow.snapshot().circuits.is_empty());

        // 遅れて届いたイベント・完了は無視される
        assert!(!flow.apply_update(&ticket, AnalysisUpdate { progress: Some(99.0), ..Default::default() }));
        assert_eq!(flow.finish_analysis(&ticket, Ok(())), FlowStage::Capture);
    }

    #[test]
    fn test_cancel_only_while_analyzing() {
        let mut flow = ScanFlow::default();
        assert!(matches!(flow.cancel(), Err(Error::InvalidTransition { from: "capture", .. })));
    }

    #[test]
    fn test_accept_forwards_edits_and_original_images() {
        let mut flow = ScanFlow::default();
        run_to_results(&mut flow);

        let review = flow.review_mut().unwrap();
        review.update_circuit("c1", CircuitPatch::rating(Some(40)));
        let manual = review.add_circuit();
        let expected_board = review.board().cloned();
        let expected_circuits = review.circuits().to_vec();

        let completion = flow.accept().unwrap();
        assert_eq!(completion.board, expected_board);
        assert_eq!(completion.circuits, expected_circuits);
        assert_eq!(completion.images, images());
        assert!(completion.circuits.iter().any(|c| c.id == manual));
        assert!(flow.is_finished());

        assert!(matches!(flow.accept(), Err(Error::FlowFinished)));
        assert!(matches!(flow.rescan(), Err(Error::FlowFinished)));
    }

    #[test]
    fn test_rescan_from_results() {
        let mut flow = ScanFlow::default();
        run_to_results(&mut flow);
        flow.rescan().unwrap();
        assert_eq!(flow.stage(), FlowStage::Capture);
        assert!(flow.review().is_none());

        // 新しいセッションを開始できる
        assert!(flow.complete_capture(images()).is_ok());
    }
}
