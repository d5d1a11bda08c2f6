pub mod excel;

use crate::error::{Result, ScanError};
use board_scan_common::schedule::{self, ScheduleRow};
use board_scan_common::types::{BoardInfo, ScanCompletion};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub enum ExportFormat {
    Json,
    Excel,
    #[default]
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use json, excel, or both", s)),
        }
    }
}

/// JSON出力の形
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleDocument {
    pub board: Option<BoardInfo>,
    pub rows: Vec<ScheduleRow>,
}

fn output_path_for_format(output: &Path, title: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", title, extension))
    } else {
        output.to_path_buf()
    }
}

fn output_paths_for_both(output: &Path, title: &str) -> (PathBuf, PathBuf) {
    if output.is_dir() || output.extension().is_none() {
        let json_path = output.join(format!("{}.json", title));
        let excel_path = output.join(format!("{}.xlsx", title));
        (json_path, excel_path)
    } else {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(title);
        let json_path = parent.join(format!("{}.json", stem));
        let excel_path = parent.join(format!("{}.xlsx", stem));
        (json_path, excel_path)
    }
}

/// 既存の試験表（JSON）を読み込む
pub fn load_schedule(path: &Path) -> Result<ScheduleDocument> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| ScanError::Export(format!("{}: {}", path.display(), e)))
}

/// スキャン結果から試験表を作る。既存表があれば空行から埋める
pub fn build_schedule(completion: &ScanCompletion, existing: Option<ScheduleDocument>) -> ScheduleDocument {
    let rows = schedule::rows_from_completion(completion);
    match existing {
        Some(mut document) => {
            let (filled, appended) = schedule::apply_to_schedule(&mut document.rows, rows);
            tracing::info!(filled, appended, "applied to existing schedule");
            if document.board.is_none() {
                document.board = completion.board.clone();
            }
            document
        }
        None => ScheduleDocument {
            board: completion.board.clone(),
            rows,
        },
    }
}

fn write_json(document: &ScheduleDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 出力したファイルのパスを返す
pub fn export_schedule(
    document: &ScheduleDocument,
    photo: Option<&str>,
    format: &ExportFormat,
    output: &Path,
    title: &str,
) -> Result<Vec<PathBuf>> {
    if output.extension().is_none() {
        std::fs::create_dir_all(output)?;
    }

    let written = match format {
        ExportFormat::Json => {
            let path = output_path_for_format(output, title, "json");
            write_json(document, &path)?;
            vec![path]
        }
        ExportFormat::Excel => {
            let path = output_path_for_format(output, title, "xlsx");
            excel::generate_excel(document.board.as_ref(), &document.rows, photo, &path)?;
            vec![path]
        }
        ExportFormat::Both => {
            let (json_path, excel_path) = output_paths_for_both(output, title);
            write_json(document, &json_path)?;
            excel::generate_excel(document.board.as_ref(), &document.rows, photo, &excel_path)?;
            vec![json_path, excel_path]
        }
    };

    for path in &written {
        println!("✔ 出力: {}", path.display());
    }
    Ok(written)
}
