use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const API_KEY_ENV: &str = "BOARD_SCAN_API_KEY";
const ENDPOINT_ENV: &str = "BOARD_SCAN_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 解析サービスのURL
    pub endpoint: String,
    pub api_key: Option<String>,
    /// 送信前に縮小する長辺px
    pub max_image_size: u32,
    /// 送信JPEG品質 (1-100)
    pub jpeg_quality: u8,
    pub connect_timeout_seconds: u64,
    /// 確定済みスキャンの保存先（省略時はデータディレクトリ）
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8787/api/analyze-board".into(),
            api_key: None,
            max_image_size: 1920,
            // 撮影時と同じ 0.92
            jpeg_quality: 92,
            connect_timeout_seconds: 30,
            store_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ScanError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("board-scan").join("config.json"))
    }

    /// 環境変数を優先したエンドポイント
    pub fn endpoint(&self) -> String {
        resolve(std::env::var(ENDPOINT_ENV).ok(), Some(&self.endpoint))
            .unwrap_or_else(|| self.endpoint.clone())
    }

    /// 環境変数を優先したAPIキー
    pub fn get_api_key(&self) -> Result<String> {
        resolve(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
            .ok_or(ScanError::MissingApiKey)
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_ok()
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let data = dirs::data_dir()
            .ok_or_else(|| ScanError::Config("データディレクトリが見つかりません".into()))?;
        Ok(data.join("board-scan").join("scans.json"))
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_endpoint(&mut self, endpoint: String) -> Result<()> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ScanError::Config(format!("URLが不正です: {}", endpoint)));
        }
        self.endpoint = endpoint;
        self.save()
    }
}

/// 環境変数 → 設定ファイルの順で空でない値を選ぶ
fn resolve(env: Option<String>, file: Option<&str>) -> Option<String> {
    env.filter(|v| !v.trim().is_empty())
        .or_else(|| file.filter(|v| !v.trim().is_empty()).map(str::to_string))
}
