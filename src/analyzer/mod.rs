//! 解析サービスとの通信
//!
//! POST でリクエストを送り、本文を行単位のイベントとして読みながら
//! ScanFlow に適用する。進捗は indicatif で表示する。

pub mod stream;

pub use stream::{drive_stream, StreamOutcome};

use crate::config::Config;
use crate::error::{Result, ScanError};
use board_scan_common::analysis::{AbortSignal, AnalysisRequest, AnalysisSnapshot, AnalysisUpdate};
use board_scan_common::flow::{FlowStage, ScanFlow};
use board_scan_common::stage::{StepState, STAGES};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// 解析サービスのクライアント
pub struct AnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| ScanError::ApiCall(format!("HTTPクライアント初期化失敗: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.get_api_key().ok(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// リクエストを送り、イベントごとに on_update を呼ぶ
    pub async fn stream<F>(&self, request: &AnalysisRequest, signal: &AbortSignal, on_update: F) -> Result<StreamOutcome>
    where
        F: FnMut(AnalysisUpdate),
    {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/x-ndjson, text/event-stream, application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, images = request.images.len(), "sending analysis request");
        let response = builder
            .send()
            .await
            .map_err(|e| ScanError::ApiCall(format!("Network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::ApiCall(format!("{}: {}", status, body.trim())));
        }

        drive_stream(response.bytes_stream(), signal, on_update).await
    }
}

/// 1セッション分の解析を実行する
///
/// Ctrl-C で中断するとフローはキャンセル扱いで撮影ステージへ戻る。
/// 戻り値は実行後のフローステージ。
pub async fn run_analysis(
    client: &AnalysisClient,
    flow: &mut ScanFlow,
    images: Vec<String>,
) -> Result<FlowStage> {
    let (request, ticket) = flow.complete_capture(images)?;
    let signal = ticket.signal().clone();
    let bar = progress_bar();

    let outcome = {
        let on_update = |update: AnalysisUpdate| {
            if flow.apply_update(&ticket, update) {
                render(&bar, flow.snapshot());
            }
        };
        let streaming = client.stream(&request, &signal, on_update);
        tokio::select! {
            result = streaming => Some(result),
            _ = tokio::signal::ctrl_c() => {
                signal.abort();
                None
            }
        }
    };

    match outcome {
        None | Some(Ok(StreamOutcome::Aborted)) => {
            flow.cancel()?;
            bar.abandon_with_message("cancelled");
            Ok(FlowStage::Capture)
        }
        Some(Ok(StreamOutcome::Finished(events))) => {
            tracing::debug!(events, "stream finished");
            let stage = flow.finish_analysis(&ticket, Ok(()));
            finish_bar(&bar, flow.snapshot(), stage);
            Ok(stage)
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "analysis request failed");
            let stage = flow.finish_analysis(&ticket, Err(e.to_string()));
            finish_bar(&bar, flow.snapshot(), stage);
            Ok(stage)
        }
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{spinner} [{bar:30}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(STAGES[0].label);
    bar
}

/// ステップ表示（✔ 完了 / ▶ 実行中 / · 未着手）
pub fn step_line(snapshot: &AnalysisSnapshot) -> String {
    snapshot
        .step_states()
        .iter()
        .zip(STAGES.iter())
        .map(|(state, def)| {
            let mark = match state {
                StepState::Complete => "✔",
                StepState::InProgress => "▶",
                StepState::Pending => "·",
            };
            format!("{} {}", mark, def.label)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn render(bar: &ProgressBar, snapshot: &AnalysisSnapshot) {
    bar.set_position(snapshot.progress.round() as u64);
    let (preview, more) = snapshot.circuit_preview();
    let mut message = if snapshot.stage_message.is_empty() {
        step_line(snapshot)
    } else {
        format!("{} | {}", step_line(snapshot), snapshot.stage_message)
    };
    if !preview.is_empty() {
        let badges: Vec<String> = preview.iter().map(|c| c.device_label()).collect();
        message.push_str(&format!(" | {}", badges.join(" ")));
        if more > 0 {
            message.push_str(&format!(" +{} more", more));
        }
    }
    bar.set_message(message);
}

fn finish_bar(bar: &ProgressBar, snapshot: &AnalysisSnapshot, stage: FlowStage) {
    match stage {
        FlowStage::Results => bar.finish_with_message(format!("{} circuits detected", snapshot.circuits.len())),
        _ => bar.abandon_with_message(
            snapshot.error.clone().unwrap_or_else(|| "Analysis failed".to_string()),
        ),
    }
}
