//! 撮影ステージ（CLI版）
//!
//! CLIにカメラはないので画像ファイルのアップロードのみ。
//! デコードは rayon で並列に行い、選択順は CaptureStage が戻す。

use crate::config::Config;
use crate::error::{Result, ScanError};
use crate::scanner::ImageInfo;
use board_scan_common::capture::{CameraStream, CaptureStage, DecodedUpload};
use board_scan_common::data_uri;
use dialoguer::MultiSelect;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use rayon::prelude::*;
use std::path::Path;

/// CLIにはカメラがない
pub enum NoCamera {}

impl CameraStream for NoCamera {
    fn grab_jpeg(&self, _quality: f64) -> board_scan_common::Result<String> {
        match *self {}
    }

    fn stop(self) {
        match self {}
    }
}

pub type CliCaptureStage = CaptureStage<NoCamera>;

/// 画像を読み込み、長辺を max_size に縮小してJPEGのData URIにする
pub fn encode_image(path: &Path, max_size: u32, quality: u8) -> Result<String> {
    let img = image::open(path)
        .map_err(|e| ScanError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    let img = if img.width() > max_size || img.height() > max_size {
        img.resize(max_size, max_size, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| ScanError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    Ok(data_uri::encode("image/jpeg", &buffer))
}

/// 並列デコード。失敗した画像は警告して捨てる
pub fn decode_uploads(images: &[ImageInfo], max_size: u32, quality: u8) -> Vec<DecodedUpload> {
    images
        .par_iter()
        .enumerate()
        .filter_map(|(sequence, info)| match encode_image(&info.path, max_size, quality) {
            Ok(data_uri) => Some(DecodedUpload { sequence, data_uri }),
            Err(e) => {
                tracing::warn!(file = %info.file_name, error = %e, "image skipped");
                None
            }
        })
        .collect()
}

/// 画像ファイルから撮影ステージを作る
pub fn stage_from_files(images: &[ImageInfo], config: &Config) -> CliCaptureStage {
    let mut stage = CliCaptureStage::new();
    stage.add_uploads(decode_uploads(images, config.max_image_size, config.jpeg_quality));
    tracing::debug!(selected = images.len(), decoded = stage.images().len(), "uploads decoded");
    stage
}

/// 一覧表示用のラベル（"#1 (412 KB)"）
pub fn image_labels(stage: &CliCaptureStage) -> Vec<String> {
    stage
        .images()
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, uri)| {
            let bytes = data_uri::extract_base64(uri).map(|b| b.len() * 3 / 4).unwrap_or(0);
            format!("#{} ({} KB)", i + 1, bytes / 1024)
        })
        .collect()
}

/// 送信する画像を対話で選ぶ。外した画像はリストから取り除く
pub fn prune_interactive(stage: &mut CliCaptureStage) -> Result<()> {
    let labels = image_labels(stage);
    if labels.len() < 2 {
        return Ok(());
    }
    let defaults = vec![true; labels.len()];
    let keep = MultiSelect::new()
        .with_prompt("送信する画像 (Spaceで切替, Enterで決定)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    // 後ろから消してインデックスのずれを防ぐ
    for index in (0..labels.len()).rev() {
        if !keep.contains(&index) {
            stage.remove_image(index);
        }
    }
    Ok(())
}
