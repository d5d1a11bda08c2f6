//! Board Scan Common Library
//!
//! CLIとWeb(WASM)で共有される型・スキャンフローの状態機械・ユーティリティ

pub mod types;
pub mod error;
pub mod stage;
pub mod data_uri;
pub mod capture;
pub mod analysis;
pub mod review;
pub mod flow;
pub mod optimistic;
pub mod parser;
pub mod schedule;
pub mod export;

pub use types::{BoardInfo, DetectedCircuit, Device, DeviceCategory, Curve, Phase, Confidence, ScanHints, ScanCompletion};
pub use error::{Error, Result};
pub use stage::{StageTag, StepState, STAGES};
pub use capture::{CameraStream, CameraTicket, CaptureStage, Haptics};
pub use analysis::{AnalysisRequest, AnalysisSession, AnalysisSnapshot, AnalysisUpdate, AbortSignal};
pub use review::{CircuitPatch, ReviewState};
pub use flow::{FlowStage, ScanFlow};
pub use optimistic::{apply_then_persist, Mutation};
pub use parser::{extract_json, parse_stream_line, LineBuffer, StreamDecoder};
pub use schedule::{apply_to_schedule, rows_from_completion, ScheduleRow};
