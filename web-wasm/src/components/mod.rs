//! UIコンポーネント

pub mod analysis_stage;
pub mod board_scan_flow;
pub mod board_summary;
pub mod capture_stage;
pub mod circuit_edit_sheet;
pub mod export_buttons;
pub mod header;
pub mod progress_bar;
pub mod results_stage;
pub mod settings_panel;
