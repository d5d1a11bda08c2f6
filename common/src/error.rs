//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No images captured")]
    NoImages,

    #[error("Camera is already in use")]
    CameraBusy,

    #[error("Camera is not active")]
    CameraInactive,

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("An analysis is already running")]
    AnalysisInFlight,

    #[error("Cannot {action} while in the {from} stage")]
    InvalidTransition { from: &'static str, action: &'static str },

    #[error("Scan flow already finished")]
    FlowFinished,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
