use crate::export::ExportFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "board-scan")]
#[command(about = "分電盤スキャン（撮影・AI解析・回路確認）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真を解析して回路を確認・確定する
    Scan {
        /// 画像ファイルまたはフォルダ（指定順で送信）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 想定回路数
        #[arg(long)]
        expected_ways: Option<u32>,

        /// 盤の種類（例: split-load, high-integrity）
        #[arg(long)]
        board_type: Option<String>,

        /// 主開閉器の位置 (left/right)
        #[arg(long)]
        main_switch_side: Option<String>,

        /// 三相盤
        #[arg(long)]
        three_phase: bool,

        /// 送信前に画像を選び直す
        #[arg(long)]
        pick: bool,

        /// 確認をせずにそのまま確定する
        #[arg(long)]
        no_review: bool,

        /// 確定結果を保存しない
        #[arg(long)]
        no_store: bool,

        /// 確定結果のJSON出力先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 保存済みスキャンを再確認・編集
    Review {
        /// スキャンID（例: scan-3）
        #[arg(required = true)]
        id: String,
    },

    /// 試験表（Schedule of Tests）を出力
    Export {
        /// スキャンIDまたは確定結果JSONファイル
        #[arg(required = true)]
        source: String,

        /// 出力形式 (json/excel/both)
        #[arg(short, long, default_value = "both")]
        format: ExportFormat,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ファイル名
        #[arg(short, long, default_value = "schedule-of-tests")]
        title: String,

        /// 既存の試験表JSON（空行から埋める）
        #[arg(long)]
        merge: Option<PathBuf>,
    },

    /// 保存済みスキャンの管理
    Store {
        /// 一覧を表示
        #[arg(long)]
        list: bool,

        /// 内容を表示
        #[arg(long)]
        show: Option<String>,

        /// 削除
        #[arg(long)]
        remove: Option<String>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 解析サービスのURLを設定
        #[arg(long)]
        set_endpoint: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
