//! スキャンフロー全体の統合テスト
//!
//! 撮影 → ストリーム解析 → 確認・編集 → 確定 → 保存 → 試験表出力

use board_scan::analyzer::stream::{drive_stream, StreamOutcome};
use board_scan::export::{self, ExportFormat};
use board_scan::review;
use board_scan::store::ScanStore;
use board_scan_common::capture::{CaptureStage, NoHaptics};
use board_scan_common::flow::{FlowStage, ScanFlow};
use board_scan_common::review::CircuitPatch;
use board_scan_common::types::{BadgeTone, Curve, ScanHints};
use futures::stream;
use tempfile::tempdir;

const FIRST_EVENT: &str = r#"{"progress": 50, "stage": "gemini ocr", "board": {"brand": "Wylex", "model": "NM8S", "main_switch_rating": 100, "spd_status": "present"}, "circuits": []}"#;
const SECOND_EVENT: &str = r#"{"progress": 100, "stage": "complete", "circuits": [{"id": "c1", "index": 1, "label_text": "Kitchen", "device": {"category": "MCB", "rating_amps": 32, "curve": "B"}, "phase": "1P", "confidence": "high"}]}"#;

fn captured_images() -> Vec<String> {
    let mut stage = CaptureStage::<board_scan::capture::NoCamera>::new();
    stage.add_images(vec![
        "data:image/jpeg;base64,AAAA".to_string(),
        "data:image/jpeg;base64,BBBB".to_string(),
    ]);
    stage.submit().expect("送信失敗")
}

fn body(lines: &[&'static str]) -> impl futures::Stream<Item = Result<Vec<u8>, String>> + Unpin {
    stream::iter(lines.iter().map(|l| Ok(format!("{}\n", l).into_bytes())).collect::<Vec<_>>())
}

#[tokio::test]
async fn test_two_event_stream_reaches_results() {
    let images = captured_images();
    let mut flow = ScanFlow::new(Some(ScanHints { expected_ways: Some(8), ..Default::default() }));
    let (request, ticket) = flow.complete_capture(images.clone()).expect("解析開始失敗");
    assert_eq!(request.images, images);
    assert!(request.options.use_claude_ocr && request.options.use_openai_components);

    let mut progress = Vec::new();
    let outcome = drive_stream(body(&[FIRST_EVENT, SECOND_EVENT]), ticket.signal(), |update| {
        flow.apply_update(&ticket, update);
        progress.push(flow.snapshot().progress);
    })
    .await
    .expect("ストリーム失敗");
    assert_eq!(outcome, StreamOutcome::Finished(2));
    assert_eq!(progress, vec![50.0, 100.0]);

    assert_eq!(flow.finish_analysis(&ticket, Ok(())), FlowStage::Results);
    let review = flow.review().expect("結果がない");
    assert_eq!(review.circuits().len(), 1);

    let board = review.board().expect("盤情報がない");
    assert_eq!(board.display_name(), "Wylex NM8S");
    assert_eq!(board.main_switch_badge().as_deref(), Some("100A Main"));
    assert_eq!(board.spd_badge(), ("SPD: present".to_string(), BadgeTone::Confirmed));
    assert_eq!(review::board_header(Some(board)), "Wylex NM8S | 100A Main | SPD: present");
}

#[tokio::test]
async fn test_pretty_printed_response_keeps_circuits() {
    let mut flow = ScanFlow::new(None);
    let (_, ticket) = flow.complete_capture(captured_images()).unwrap();
    let lines = [
        "{",
        r#" "progress": 100,"#,
        r#" "stage": "complete","#,
        r#" "circuits": ["#,
        r#"  {"id": "c1", "index": 1, "label_text": "Kitchen"}"#,
        " ]",
        "}",
    ];
    let outcome = drive_stream(body(&lines), ticket.signal(), |u| {
        flow.apply_update(&ticket, u);
    })
    .await
    .expect("ストリーム失敗");
    assert_eq!(outcome, StreamOutcome::Finished(1));

    assert_eq!(flow.finish_analysis(&ticket, Ok(())), FlowStage::Results);
    let circuits = flow.review().expect("結果がない").circuits();
    assert_eq!(circuits.len(), 1);
    assert_eq!(circuits[0].label_text, "Kitchen");
}

#[tokio::test]
async fn test_edit_accept_store_and_export() {
    let images = captured_images();
    let mut flow = ScanFlow::new(None);
    let (_, ticket) = flow.complete_capture(images.clone()).unwrap();
    drive_stream(body(&[FIRST_EVENT, SECOND_EVENT]), ticket.signal(), |u| {
        flow.apply_update(&ticket, u);
    })
    .await
    .unwrap();
    flow.finish_analysis(&ticket, Ok(()));

    let state = flow.review_mut().unwrap();
    let (curve, rating) = review::parse_shorthand("c40").unwrap();
    assert!(state.update_circuit("c1", CircuitPatch { curve: Some(curve), rating_amps: Some(Some(rating)), ..Default::default() }));
    let manual = state.add_circuit();
    state.update_circuit(&manual, CircuitPatch::label("Shower"));

    let completion = flow.accept().expect("確定失敗");
    assert_eq!(completion.images, images);
    assert_eq!(completion.circuits[0].device.curve, Some(Curve::C));
    assert_eq!(completion.circuits[0].device.rating_amps, Some(40));
    assert_eq!(completion.circuits[1].index, 2);
    assert!(completion.circuits[1].is_manual());
    assert!(flow.rescan().is_err(), "確定後は遷移できない");

    let dir = tempdir().unwrap();
    let mut store = ScanStore::open(&dir.path().join("scans.json")).unwrap();
    let id = store.add(completion.clone(), Some("test".into())).unwrap();
    let reopened = ScanStore::open(store.path()).unwrap();
    assert_eq!(reopened.get(&id).map(|s| &s.completion), Some(&completion));

    let document = export::build_schedule(&completion, None);
    assert_eq!(document.rows[1].circuit_type, "Shower");
    let written = export::export_schedule(&document, None, &ExportFormat::Json, dir.path(), "eicr").unwrap();
    assert!(written[0].ends_with("eicr.json"));
}

#[tokio::test]
async fn test_stream_error_keeps_analyzing_then_retry() {
    let mut flow = ScanFlow::new(None);
    let (_, ticket) = flow.complete_capture(captured_images()).unwrap();
    drive_stream(
        body(&[r#"{"progress": 20, "stage": "connecting"}"#, r#"{"isError": true, "error": "Service busy"}"#]),
        ticket.signal(),
        |u| {
            flow.apply_update(&ticket, u);
        },
    )
    .await
    .unwrap();

    assert_eq!(flow.finish_analysis(&ticket, Ok(())), FlowStage::Analyzing);
    assert_eq!(flow.snapshot().error.as_deref(), Some("Service busy"));

    flow.rescan().unwrap();
    assert_eq!(flow.stage(), FlowStage::Capture);
    assert!(flow.images().is_empty());
}

#[tokio::test]
async fn test_cancel_drops_late_events() {
    let mut flow = ScanFlow::new(None);
    let (_, ticket) = flow.complete_capture(captured_images()).unwrap();
    flow.cancel().unwrap();

    let outcome = drive_stream(body(&[FIRST_EVENT]), ticket.signal(), |u| {
        flow.apply_update(&ticket, u);
    })
    .await
    .unwrap();
    assert_eq!(outcome, StreamOutcome::Aborted);
    assert_eq!(flow.stage(), FlowStage::Capture);
    assert_eq!(flow.snapshot().progress, 0.0);
}

#[test]
fn test_capture_without_camera_rejects_shutter() {
    let mut stage = CaptureStage::<board_scan::capture::NoCamera>::new();
    assert!(stage.capture_frame(&NoHaptics).is_err());
    assert!(stage.submit().is_err());
}
