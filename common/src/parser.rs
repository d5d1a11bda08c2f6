//! 解析ストリームのパーサー
//!
//! レスポンス本文は1行1イベント。NDJSON と SSE（`data: {...}`）のどちらも受け付ける。
//! ストリームでない一括レスポンスは extract_json で取り出す。

use crate::analysis::AnalysisUpdate;
use crate::error::{Error, Result};

/// チャンク単位で届くバイト列を行に分割する
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンクを追加し、完結した行を返す
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// ストリーム終端で残りを取り出す
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if rest.is_empty() { None } else { Some(rest) }
    }
}

/// 1行をイベントに変換。空行・コメント・制御行は None
pub fn parse_stream_line(line: &str) -> Result<Option<AnalysisUpdate>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    if ["event:", "id:", "retry:"].iter().any(|p| line.starts_with(p)) {
        return Ok(None);
    }

    let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    serde_json::from_str(payload)
        .map(Some)
        .map_err(|e| Error::Parse(format!("stream event: {}", e)))
}

/// レスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト / [...] 配列
///
/// # Examples
/// ```
/// use board_scan_common::parser::extract_json;
///
/// let response = "result: {\"progress\": 100}";
/// assert_eq!(extract_json(response).unwrap(), "{\"progress\": 100}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = response[start..].find("```") {
            return Ok(response[start..start + end_offset].trim());
        }
    }

    let open = response.find(&['{', '['][..]);
    if let Some(start) = open {
        let close = if response[start..].starts_with('{') { '}' } else { ']' };
        if let Some(end) = response.rfind(close) {
            if end > start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSON not found in response".into()))
}

/// 一括レスポンスを最終イベントとしてパース
pub fn parse_final_response(body: &str) -> Result<AnalysisUpdate> {
    let json = extract_json(body)?;
    serde_json::from_str(json).map_err(|e| Error::Parse(format!("final response: {}", e)))
}

/// レスポンス本文をイベント列に変換する
///
/// 1行も解釈できないまま終端に達した場合は、本文全体を一括レスポンスとして読む。
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
    events: usize,
    skipped: Vec<String>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに取り出したイベント数
    pub fn events(&self) -> usize {
        self.events
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<AnalysisUpdate> {
        self.lines
            .push(chunk)
            .into_iter()
            .filter_map(|line| self.decode(line))
            .collect()
    }

    /// 終端処理。残りの行と、必要なら一括レスポンスを返す
    pub fn finish(mut self) -> Result<Vec<AnalysisUpdate>> {
        let mut updates: Vec<AnalysisUpdate> = self
            .lines
            .finish()
            .and_then(|rest| self.decode(rest))
            .into_iter()
            .collect();

        if self.events == 0 && !self.skipped.is_empty() {
            updates.push(parse_final_response(&self.skipped.join("\n"))?);
        }
        Ok(updates)
    }

    fn decode(&mut self, line: String) -> Option<AnalysisUpdate> {
        match parse_stream_line(&line) {
            Ok(Some(update)) if !update.is_empty() => {
                self.events += 1;
                self.skipped.clear();
                Some(update)
            }
            Ok(Some(_)) => {
                tracing::debug!("line has no event fields");
                self.skip(line);
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "line is not a stream event");
                self.skip(line);
                None
            }
        }
    }

    /// 一括レスポンスの候補として保持する。イベントが届いた後は不要
    fn skip(&mut self, line: String) {
        if self.events == 0 {
            self.skipped.push(line);
        }
    }
}
