//! Excel生成（CLI版）
//!
//! 共通ライブラリの excel_core でバッファを作り、ファイルに書き出す

use crate::error::{Result, ScanError};
use board_scan_common::export::excel_core::generate_schedule_buffer;
use board_scan_common::schedule::ScheduleRow;
use board_scan_common::types::BoardInfo;
use std::path::Path;

pub fn generate_excel(
    board: Option<&BoardInfo>,
    rows: &[ScheduleRow],
    photo: Option<&str>,
    output_path: &Path,
) -> Result<()> {
    let buffer = generate_schedule_buffer(board, rows, photo).map_err(ScanError::Export)?;
    std::fs::write(output_path, buffer)?;
    Ok(())
}
