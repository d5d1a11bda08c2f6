//! ブラウザのカメラ（getUserMedia）
//!
//! 取得したストリームは CaptureStage の CameraSlot が唯一の所有者になる。
//! トラックの停止は `CameraStream::stop` でのみ行う。

use board_scan_common::capture::{CameraConstraints, CameraStream, Haptics};
use board_scan_common::{Error, Result};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, MediaStream, MediaStreamConstraints,
    MediaStreamTrack,
};

/// JsValue のエラーを文字列に
pub fn describe(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// 取得済みのカメラストリームと、それを映している video 要素
pub struct WebCamera {
    stream: MediaStream,
    video: HtmlVideoElement,
}

/// getUserMedia に渡す video 制約
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoConstraints {
    facing_mode: &'static str,
    width: Ideal,
    height: Ideal,
}

#[derive(Serialize)]
struct Ideal {
    ideal: u32,
}

impl From<&CameraConstraints> for VideoConstraints {
    fn from(c: &CameraConstraints) -> Self {
        Self {
            facing_mode: c.facing_mode,
            width: Ideal { ideal: c.ideal_width },
            height: Ideal { ideal: c.ideal_height },
        }
    }
}

impl WebCamera {
    /// カメラを要求して video 要素に接続する
    pub async fn open(constraints: &CameraConstraints, video: HtmlVideoElement) -> std::result::Result<Self, String> {
        let window = web_sys::window().ok_or("window unavailable")?;
        let devices = window.navigator().media_devices().map_err(describe)?;

        let video_constraints = VideoConstraints::from(constraints)
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| e.to_string())?;
        let options = MediaStreamConstraints::new();
        options.set_video(&video_constraints);
        options.set_audio(&JsValue::FALSE);

        let promise = devices.get_user_media_with_constraints(&options).map_err(describe)?;
        let stream: MediaStream = JsFuture::from(promise)
            .await
            .map_err(describe)?
            .dyn_into()
            .map_err(describe)?;

        video.set_src_object(Some(&stream));
        if let Ok(playing) = video.play() {
            // 自動再生が拒否されてもフレーム取得時に分かる
            let _ = JsFuture::from(playing).await;
        }
        Ok(Self { stream, video })
    }
}

impl CameraStream for WebCamera {
    fn grab_jpeg(&self, quality: f64) -> Result<String> {
        let (width, height) = (self.video.video_width(), self.video.video_height());
        if width == 0 || height == 0 {
            return Err(Error::Camera("no video frame yet".into()));
        }

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| Error::Camera("document unavailable".into()))?;
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(|e| Error::Camera(describe(e)))?
            .dyn_into()
            .map_err(|_| Error::Camera("canvas unavailable".into()))?;
        canvas.set_width(width);
        canvas.set_height(height);

        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|e| Error::Camera(describe(e)))?
            .ok_or_else(|| Error::Camera("2d context unavailable".into()))?
            .dyn_into()
            .map_err(|_| Error::Camera("2d context unavailable".into()))?;
        context
            .draw_image_with_html_video_element(&self.video, 0.0, 0.0)
            .map_err(|e| Error::Camera(describe(e)))?;

        canvas
            .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(quality))
            .map_err(|e| Error::Camera(describe(e)))
    }

    fn stop(self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
        self.video.set_src_object(None);
        gloo::console::debug!("camera released");
    }
}

/// navigator.vibrate による触覚フィードバック
pub struct WebHaptics;

impl Haptics for WebHaptics {
    fn pulse(&self, ms: u32) {
        if let Some(window) = web_sys::window() {
            let _ = window.navigator().vibrate_with_duration(ms);
        }
    }
}
