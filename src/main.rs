use board_scan::{analyzer, capture, cli, config, error, export, review, scanner, store};
use board_scan_common::flow::{FlowStage, ScanFlow};
use board_scan_common::review::ReviewState;
use board_scan_common::types::{ScanCompletion, ScanHints};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use dialoguer::Confirm;
use error::{Result, ScanError};
use review::ReviewAction;
use std::path::{Path, PathBuf};
use store::ScanStore;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "board_scan=debug,board_scan_common=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Scan {
            paths,
            expected_ways,
            board_type,
            main_switch_side,
            three_phase,
            pick,
            no_review,
            no_store,
            output,
        } => {
            println!("🔌 board-scan - 分電盤スキャン\n");

            // 1. 画像読み込み
            println!("[1/3] 画像を読み込み中...");
            let files = scanner::collect_inputs(&paths)?;
            if files.is_empty() {
                return Err(ScanError::NoImagesFound(describe_paths(&paths)));
            }
            let mut stage = capture::stage_from_files(&files, &config);
            if pick {
                capture::prune_interactive(&mut stage)?;
            }
            let images = stage.submit()?;
            println!("✔ {}枚の画像\n", images.len());

            // 2. 解析 → 3. 確認
            let hints = ScanHints {
                main_switch_side,
                expected_ways,
                board_type,
                is_three_phase: three_phase.then_some(true),
            };
            let client = analyzer::AnalysisClient::new(&config)?;
            let mut flow = ScanFlow::new(Some(hints));

            let Some(completion) = run_scan_flow(&client, &mut flow, images, no_review).await? else {
                return Ok(());
            };

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string_pretty(&completion)?)?;
                println!("✔ 確定結果を保存: {}", path.display());
            }
            if !no_store {
                let mut store = ScanStore::open(&config.store_path()?)?;
                let id = store.add(completion.clone(), Some(describe_paths(&paths)))?;
                println!("✔ 保存しました: {} ({})", id, store.path().display());
            }

            println!("\n✅ {}回路を確定", completion.circuits.len());
        }

        Commands::Review { id } => {
            let mut store = ScanStore::open(&config.store_path()?)?;
            let scan = store
                .get(&id)
                .cloned()
                .ok_or_else(|| ScanError::Store(format!("scan not found: {}", id)))?;

            let mut state = ReviewState::new(scan.completion.board, scan.completion.circuits);
            match review::run_review(&mut state)? {
                ReviewAction::Accept => {
                    store.update(&id, state.accept(scan.completion.images))?;
                    println!("✔ 更新しました: {}", id);
                }
                ReviewAction::Rescan => {
                    println!("再スキャンは `board-scan scan` で実行してください");
                }
                ReviewAction::Quit => {
                    println!("変更を破棄しました");
                }
            }
        }

        Commands::Export { source, format, output, title, merge } => {
            println!("📄 board-scan - 試験表エクスポート\n");

            let completion = load_completion(&source, &config)?;
            let existing = merge.as_deref().map(export::load_schedule).transpose()?;
            let document = export::build_schedule(&completion, existing);

            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            let photo = completion.images.first().map(String::as_str);
            export::export_schedule(&document, photo, &format, &output_dir, &title)?;

            println!("\n✅ エクスポート完了 ({}行)", document.rows.len());
        }

        Commands::Store { list, show, remove } => {
            let mut store = ScanStore::open(&config.store_path()?)?;

            if let Some(id) = remove {
                if store.remove(&id)? {
                    println!("✔ 削除しました: {}", id);
                } else {
                    println!("見つかりません: {}", id);
                }
            }

            if let Some(id) = show {
                match store.get(&id) {
                    Some(scan) => {
                        let mut scan = scan.clone();
                        let count = scan.completion.images.len();
                        scan.completion.images.clear();
                        println!("{}", serde_json::to_string_pretty(&scan)?);
                        println!("(画像 {}枚)", count);
                    }
                    None => println!("見つかりません: {}", id),
                }
            }

            if list {
                if store.scans().is_empty() {
                    println!("保存済みスキャンはありません: {}", store.path().display());
                }
                for scan in store.scans() {
                    println!(
                        "{:<8} {}  {}  {}回路",
                        scan.id,
                        scan.accepted_at,
                        review::board_header(scan.completion.board.as_ref()),
                        scan.completion.circuits.len()
                    );
                }
            }
        }

        Commands::Config { set_api_key, set_endpoint, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(endpoint) = set_endpoint {
                config.set_endpoint(endpoint)?;
                println!("✔ URLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  URL: {}", config.endpoint());
                println!("  最大画像サイズ: {}px", config.max_image_size);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  接続タイムアウト: {}秒", config.connect_timeout_seconds);
                println!("  APIキー: {}", if config.has_api_key() { "設定済み" } else { "未設定" });
                if let Ok(path) = config.store_path() {
                    println!("  保存先: {}", path.display());
                }
            }
        }
    }

    Ok(())
}

/// 解析 → 確認 → Accept。中止・キャンセル時は None
async fn run_scan_flow(
    client: &analyzer::AnalysisClient,
    flow: &mut ScanFlow,
    images: Vec<String>,
    no_review: bool,
) -> Result<Option<ScanCompletion>> {
    loop {
        println!("[2/3] AI解析中... (Ctrl-Cで中断)");
        match analyzer::run_analysis(client, flow, images.clone()).await? {
            FlowStage::Results => {
                println!("✔ 解析完了\n");
                let action = if no_review {
                    ReviewAction::Accept
                } else {
                    println!("[3/3] 結果の確認");
                    let state = flow
                        .review_mut()
                        .ok_or_else(|| ScanError::Analysis("review state missing".into()))?;
                    review::run_review(state)?
                };

                match action {
                    ReviewAction::Accept => return Ok(Some(flow.accept()?)),
                    ReviewAction::Rescan => {
                        flow.rescan()?;
                        println!("\n↻ 再スキャン\n");
                    }
                    ReviewAction::Quit => {
                        println!("中止しました");
                        return Ok(None);
                    }
                }
            }
            FlowStage::Analyzing => {
                let message = flow
                    .snapshot()
                    .error
                    .clone()
                    .unwrap_or_else(|| "Analysis failed".to_string());
                println!("✖ {}", message);

                let retry = Confirm::new()
                    .with_prompt("再試行しますか？")
                    .default(true)
                    .interact()?;
                if !retry {
                    return Err(ScanError::Analysis(message));
                }
                flow.rescan()?;
            }
            FlowStage::Capture => {
                println!("キャンセルしました");
                return Ok(None);
            }
        }
    }
}

/// スキャンIDまたは確定結果JSONファイルを読み込む
fn load_completion(source: &str, config: &Config) -> Result<ScanCompletion> {
    let path = Path::new(source);
    if path.is_file() {
        let content = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&content)?);
    }
    let store = ScanStore::open(&config.store_path()?)?;
    store
        .get(source)
        .map(|scan| scan.completion.clone())
        .ok_or_else(|| ScanError::Store(format!("scan not found: {}", source)))
}

fn describe_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
