//! 解析サービス連携（fetch + ReadableStream）
//!
//! 本文をチャンクごとに読み、StreamDecoder でイベントに変換する。
//! 中断は AbortController で fetch ごと止める。

use crate::camera::describe;
use crate::settings::Settings;
use board_scan_common::analysis::{AbortSignal, AnalysisRequest, AnalysisUpdate};
use board_scan_common::parser::StreamDecoder;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, ReadableStreamDefaultReader, Request, RequestInit, RequestMode, Response};

const ACCEPT: &str = "application/x-ndjson, text/event-stream, application/json";

/// リクエストを送り、届いたイベントを順に on_update へ渡す
///
/// 中断された場合も Ok を返す（呼び出し側がチケットで判定する）。
pub async fn stream_analysis<F>(
    settings: &Settings,
    request: &AnalysisRequest,
    controller: Option<&AbortController>,
    signal: &AbortSignal,
    mut on_update: F,
) -> Result<(), String>
where
    F: FnMut(AnalysisUpdate),
{
    let body = serde_json::to_string(request).map_err(|e| e.to_string())?;

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&JsValue::from_str(&body));
    if let Some(controller) = controller {
        opts.set_signal(Some(&controller.signal()));
    }

    let http_request = Request::new_with_str_and_init(settings.endpoint(), &opts).map_err(describe)?;
    let headers = http_request.headers();
    headers.set("Content-Type", "application/json").map_err(describe)?;
    headers.set("Accept", ACCEPT).map_err(describe)?;
    if let Some(key) = settings.api_key() {
        headers.set("Authorization", &format!("Bearer {}", key)).map_err(describe)?;
    }

    let window = web_sys::window().ok_or("window unavailable")?;
    let response = match JsFuture::from(window.fetch_with_request(&http_request)).await {
        Ok(value) => value.dyn_into::<Response>().map_err(describe)?,
        Err(_) if signal.is_aborted() => return Ok(()),
        Err(e) => return Err(format!("API error: {}", describe(e))),
    };
    if !response.ok() {
        return Err(format!("API error: {} {}", response.status(), response.status_text()));
    }

    let stream = response.body().ok_or("Empty response")?;
    let reader: ReadableStreamDefaultReader = stream
        .get_reader()
        .dyn_into()
        .map_err(|_| "stream reader unavailable".to_string())?;
    let mut decoder = StreamDecoder::new();

    loop {
        let chunk = match JsFuture::from(reader.read()).await {
            Ok(chunk) => chunk,
            Err(_) if signal.is_aborted() => return Ok(()),
            Err(e) => return Err(format!("stream error: {}", describe(e))),
        };
        if signal.is_aborted() {
            let _ = reader.cancel();
            return Ok(());
        }
        if Reflect::get(&chunk, &JsValue::from_str("done")).ok().and_then(|d| d.as_bool()).unwrap_or(false) {
            break;
        }
        let value = Reflect::get(&chunk, &JsValue::from_str("value")).map_err(describe)?;
        let bytes = Uint8Array::new(&value).to_vec();
        for update in decoder.push(&bytes) {
            on_update(update);
        }
    }

    let streamed = decoder.events();
    let tail = decoder.finish().map_err(|e| e.to_string())?;
    gloo::console::debug!(format!("analysis stream finished: {} events", streamed + tail.len()));
    tail.into_iter().for_each(&mut on_update);
    Ok(())
}
