//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use board_scan::error::ScanError;
use board_scan::scanner;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, ScanError::FolderNotFound(_)));
}

/// 空のフォルダをスキャンした場合
#[test]
fn test_scan_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = scanner::scan_folder(dir.path());

    // 空フォルダはエラーではなく空のVecを返す
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// 画像のないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");

    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path());
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// ScanErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        ScanError::Config("テスト設定エラー".to_string()),
        ScanError::FolderNotFound("/path/to/folder".to_string()),
        ScanError::NoImagesFound("フォルダ".to_string()),
        ScanError::ImageLoad("board.jpg".to_string()),
        ScanError::ApiCall("502 Bad Gateway".to_string()),
        ScanError::ApiParse("JSON not found".to_string()),
        ScanError::Analysis("Service unavailable".to_string()),
        ScanError::Export("Excel生成エラー".to_string()),
        ScanError::Store("scan not found".to_string()),
        ScanError::Prompt("not a terminal".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// MissingApiKeyエラーのメッセージ確認
#[test]
fn test_missing_api_key_message() {
    let display = format!("{}", ScanError::MissingApiKey);

    assert!(display.contains("APIキー"));
    assert!(display.contains("board-scan config"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: ScanError = io_err.into();

    assert!(matches!(err, ScanError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: ScanError = json_err.into();

    assert!(matches!(err, ScanError::Json(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_transparent() {
    let err: ScanError = board_scan_common::Error::NoImages.into();
    assert!(matches!(err, ScanError::Common(board_scan_common::Error::NoImages)));

    let common_err = board_scan_common::Error::InvalidTransition { from: "capture", action: "accept" };
    let err: ScanError = common_err.into();
    assert_eq!(format!("{}", err), "Cannot accept while in the capture stage");
}
