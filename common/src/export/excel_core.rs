//! Excel生成（共通ライブラリ）
//!
//! 盤情報シートと試験表シートを持つブックを生成する

use crate::data_uri;
use crate::schedule::ScheduleRow;
use crate::types::BoardInfo;
use rust_xlsxwriter::*;

/// 試験表の列定義
pub struct ScheduleColumn {
    pub key: &'static str,
    pub label: &'static str,
    pub width: f64,
}

pub const SCHEDULE_COLUMNS: &[ScheduleColumn] = &[
    ScheduleColumn { key: "circuitDesignation", label: "Circuit", width: 8.0 },
    ScheduleColumn { key: "circuitDescription", label: "Description", width: 24.0 },
    ScheduleColumn { key: "circuitType", label: "Type", width: 10.0 },
    ScheduleColumn { key: "referenceMethod", label: "Ref", width: 5.0 },
    ScheduleColumn { key: "liveSize", label: "Live mm²", width: 9.0 },
    ScheduleColumn { key: "cpcSize", label: "CPC mm²", width: 9.0 },
    ScheduleColumn { key: "bsStandard", label: "BS (EN)", width: 14.0 },
    ScheduleColumn { key: "protectiveDeviceType", label: "Device", width: 8.0 },
    ScheduleColumn { key: "protectiveDeviceCurve", label: "Curve", width: 6.0 },
    ScheduleColumn { key: "protectiveDeviceRating", label: "Rating A", width: 9.0 },
    ScheduleColumn { key: "protectiveDeviceKaRating", label: "kA", width: 6.0 },
    ScheduleColumn { key: "maxZs", label: "Max Zs Ω", width: 9.0 },
    ScheduleColumn { key: "rcdRating", label: "RCD", width: 7.0 },
    ScheduleColumn { key: "ringContinuity", label: "Ring", width: 6.0 },
    ScheduleColumn { key: "insulationTestVoltage", label: "IR V", width: 7.0 },
    ScheduleColumn { key: "polarity", label: "Polarity", width: 12.0 },
    ScheduleColumn { key: "functionalTesting", label: "Functional", width: 12.0 },
    ScheduleColumn { key: "notes", label: "Notes", width: 44.0 },
];

/// 列キーから値を取得
fn field_value<'a>(row: &'a ScheduleRow, key: &str) -> &'a str {
    match key {
        "circuitDesignation" => &row.circuit_designation,
        "circuitDescription" => &row.circuit_description,
        "circuitType" => &row.circuit_type,
        "referenceMethod" => &row.reference_method,
        "liveSize" => &row.live_size,
        "cpcSize" => &row.cpc_size,
        "bsStandard" => &row.bs_standard,
        "protectiveDeviceType" => &row.protective_device_type,
        "protectiveDeviceCurve" => &row.protective_device_curve,
        "protectiveDeviceRating" => &row.protective_device_rating,
        "protectiveDeviceKaRating" => &row.protective_device_ka_rating,
        "maxZs" => &row.max_zs,
        "rcdRating" => &row.rcd_rating,
        "ringContinuity" => &row.ring_continuity,
        "insulationTestVoltage" => &row.insulation_test_voltage,
        "polarity" => &row.polarity,
        "functionalTesting" => &row.functional_testing,
        "notes" => &row.notes,
        _ => "-",
    }
}

/// Excelをバッファに生成
///
/// # Arguments
/// * `board` - 盤情報（未検出なら None）
/// * `rows` - 試験表の行
/// * `photo` - 盤写真のデータURI（先頭画像）
pub fn generate_schedule_buffer(
    board: Option<&BoardInfo>,
    rows: &[ScheduleRow],
    photo: Option<&str>,
) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_size(9.0)
        .set_font_color(Color::RGB(0x555555))
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xAAAAAA));

    let value_format = Format::new()
        .set_font_size(10.0)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));

    let auto_fill_format = value_format
        .clone()
        .set_background_color(Color::RGB(0xFFF8E1));

    // 盤情報シート
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Board")
            .map_err(|e| format!("シート名設定エラー: {}", e))?;
        sheet.set_column_width(0, 20.0)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
        sheet.set_column_width(1, 36.0)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;

        let default_board = BoardInfo::default();
        let board = board.unwrap_or(&default_board);
        let main_switch = board
            .main_switch_rating
            .map(|r| format!("{}A", r))
            .unwrap_or_else(|| "-".to_string());
        let total_ways = board
            .estimated_total_ways
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string());
        let fields = [
            ("Board", board.display_name()),
            ("Main switch", main_switch),
            ("SPD", board.spd_status.as_str().to_string()),
            ("Total ways", total_ways),
            ("Circuits", rows.len().to_string()),
        ];

        for (i, (label, value)) in fields.iter().enumerate() {
            let r = i as u32;
            sheet.write_string_with_format(r, 0, *label, &header_format)
                .map_err(|e| format!("ラベル書き込みエラー: {}", e))?;
            sheet.write_string_with_format(r, 1, value, &value_format)
                .map_err(|e| format!("値書き込みエラー: {}", e))?;
        }

        // 盤写真
        if let Some(bytes) = photo.and_then(data_uri::decode) {
            let image = Image::new_from_buffer(&bytes)
                .map_err(|e| format!("画像読み込みエラー: {}", e))?
                .set_scale_width(0.25)
                .set_scale_height(0.25)
                .set_object_movement(ObjectMovement::DontMoveOrSizeWithCells);
            sheet.insert_image((fields.len() + 1) as u32, 0, &image)
                .map_err(|e| format!("画像埋め込みエラー: {}", e))?;
        }
    }

    // 試験表シート
    let sheet = workbook.add_worksheet();
    sheet.set_name("Schedule of Tests")
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    for (c, column) in SCHEDULE_COLUMNS.iter().enumerate() {
        let col = c as u16;
        sheet.set_column_width(col, column.width)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
        sheet.write_string_with_format(0, col, column.label, &header_format)
            .map_err(|e| format!("ヘッダー書き込みエラー: {}", e))?;
    }
    sheet.set_freeze_panes(1, 1)
        .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let format = if row.auto_filled { &auto_fill_format } else { &value_format };
        for (c, column) in SCHEDULE_COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(r, c as u16, field_value(row, column.key), format)
                .map_err(|e| format!("値書き込みエラー: {}", e))?;
        }
    }

    workbook.save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}
