//! 試験表の生成（WASM版）
//!
//! 生成は common の excel_core をそのまま使う。

use super::download::{download_bytes, JSON_MIME, XLSX_MIME};
use board_scan_common::export::excel_core::generate_schedule_buffer;
use board_scan_common::schedule;
use board_scan_common::types::ScanCompletion;

/// 確定結果から試験表のxlsxを作る（先頭画像を盤写真として添付）
pub fn schedule_workbook(completion: &ScanCompletion) -> Result<Vec<u8>, String> {
    let rows = schedule::rows_from_completion(completion);
    let photo = completion.images.first().map(String::as_str);
    generate_schedule_buffer(completion.board.as_ref(), &rows, photo)
}

pub fn download_schedule(completion: &ScanCompletion, title: &str) -> Result<(), String> {
    let buffer = schedule_workbook(completion)?;
    download_bytes(&buffer, &format!("{}.xlsx", title), XLSX_MIME)
}

/// 画像を除いた確定結果JSON
pub fn completion_json(completion: &ScanCompletion) -> Result<String, String> {
    let stripped = ScanCompletion {
        images: Vec::new(),
        ..completion.clone()
    };
    serde_json::to_string_pretty(&stripped).map_err(|e| format!("JSON serialization failed: {}", e))
}

pub fn download_json(completion: &ScanCompletion, title: &str) -> Result<(), String> {
    let json = completion_json(completion)?;
    download_bytes(json.as_bytes(), &format!("{}.json", title), JSON_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_scan_common::types::{BoardInfo, Confidence, Curve, DetectedCircuit, Device, DeviceCategory, Phase};

    fn completion() -> ScanCompletion {
        ScanCompletion {
            board: Some(BoardInfo {
                brand: "Wylex".to_string(),
                model: "NM8S".to_string(),
                main_switch_rating: Some(100),
                ..Default::default()
            }),
            circuits: vec![DetectedCircuit {
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
            }],
            images: vec!["data:image/jpeg;base64,AAAA".to_string()],
        }
    }

    #[test]
    fn test_schedule_workbook_is_xlsx() {
        let buffer = schedule_workbook(&completion()).expect("Excel生成失敗");
        assert_eq!(&buffer[..2], b"PK");
    }

    #[test]
    fn test_completion_json_drops_images() {
        let json = completion_json(&completion()).expect("JSON変換失敗");
        assert!(json.contains("\"label_text\": \"Kitchen\""));
        assert!(!json.contains("base64"));
    }
}

#[cfg(all(target_arch = "wasm32", test))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_schedule_workbook_without_board() {
        let completion = ScanCompletion::default();
        let buffer = schedule_workbook(&completion).expect("Excel generation failed");
        assert_eq!(&buffer[..2], b"PK");
    }
}
