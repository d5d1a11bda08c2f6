//! レスポンス本文のストリーム処理
//!
//! チャンク → 行 → AnalysisUpdate。HTTPクライアントから切り離してあるので
//! 任意のバイトストリームで動く。

use crate::error::{Result, ScanError};
use board_scan_common::analysis::{AbortSignal, AnalysisUpdate};
use board_scan_common::parser::StreamDecoder;
use futures::{Stream, StreamExt};
use std::fmt::Display;

/// ストリームの終わり方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// 本文を最後まで読んだ（届いたイベント数）
    Finished(usize),
    /// 中断フラグで打ち切った
    Aborted,
}

/// 本文を読み進め、イベントごとに on_update を呼ぶ
pub async fn drive_stream<S, B, E, F>(mut body: S, signal: &AbortSignal, mut on_update: F) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
    F: FnMut(AnalysisUpdate),
{
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = body.next().await {
        if signal.is_aborted() {
            return Ok(StreamOutcome::Aborted);
        }
        let chunk = chunk.map_err(|e| ScanError::ApiCall(e.to_string()))?;
        for update in decoder.push(chunk.as_ref()) {
            on_update(update);
        }
    }
    if signal.is_aborted() {
        return Ok(StreamOutcome::Aborted);
    }

    let streamed = decoder.events();
    let tail = decoder.finish().map_err(|e| ScanError::ApiParse(e.to_string()))?;
    let events = streamed + tail.len();
    tail.into_iter().for_each(&mut on_update);

    Ok(StreamOutcome::Finished(events))
}
