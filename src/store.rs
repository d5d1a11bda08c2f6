//! 確定済みスキャンの保存
//!
//! JSONファイル1つに全件を持つ。変更はメモリ上で先に反映し、
//! 書き込みに失敗したら変更前の一覧に戻す。

use crate::error::{Result, ScanError};
use board_scan_common::optimistic::apply_then_persist;
use board_scan_common::types::ScanCompletion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 保存された1スキャン
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScan {
    pub id: String,
    /// RFC 3339
    pub accepted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub completion: ScanCompletion,
}

#[derive(Debug)]
pub struct ScanStore {
    path: PathBuf,
    scans: Vec<StoredScan>,
}

impl ScanStore {
    /// ファイルがなければ空で開く
    pub fn open(path: &Path) -> Result<Self> {
        let scans = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)
                .map_err(|e| ScanError::Store(format!("{}: {}", path.display(), e)))?
        } else {
            Vec::new()
        };
        Ok(Self { path: path.to_path_buf(), scans })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scans(&self) -> &[StoredScan] {
        &self.scans
    }

    pub fn get(&self, id: &str) -> Option<&StoredScan> {
        self.scans.iter().find(|s| s.id == id)
    }

    fn next_id(&self) -> String {
        let last = self
            .scans
            .iter()
            .filter_map(|s| s.id.strip_prefix("scan-"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("scan-{}", last + 1)
    }

    /// 追加して保存。失敗時は追加前に戻る
    pub fn add(&mut self, completion: ScanCompletion, source: Option<String>) -> Result<String> {
        let id = self.next_id();
        let scan = StoredScan {
            id: id.clone(),
            accepted_at: chrono::Local::now().to_rfc3339(),
            source,
            completion,
        };
        let path = self.path.clone();
        apply_then_persist(&mut self.scans, |scans| scans.push(scan), |scans| write_scans(&path, scans))?;
        tracing::info!(id = %id, path = %self.path.display(), "scan stored");
        Ok(id)
    }

    /// 内容を差し替えて保存
    pub fn update(&mut self, id: &str, completion: ScanCompletion) -> Result<()> {
        if self.get(id).is_none() {
            return Err(ScanError::Store(format!("scan not found: {}", id)));
        }
        let path = self.path.clone();
        apply_then_persist(
            &mut self.scans,
            |scans| {
                if let Some(scan) = scans.iter_mut().find(|s| s.id == id) {
                    scan.completion = completion;
                }
            },
            |scans| write_scans(&path, scans),
        )
    }

    /// 削除して保存。存在しなければ false
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let path = self.path.clone();
        apply_then_persist(&mut self.scans, |scans| scans.retain(|s| s.id != id), |scans| write_scans(&path, scans))?;
        Ok(true)
    }
}

/// 一時ファイルに書いてから置き換える
fn write_scans(path: &Path, scans: &[StoredScan]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(scans)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        std::fs::remove_file(&tmp).ok();
        return Err(ScanError::Store(format!("{}: {}", path.display(), e)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_scan_common::types::{BoardInfo, Confidence, DetectedCircuit, Device, Phase};

    fn completion(brand: &str) -> ScanCompletion {
        ScanCompletion {
            board: Some(BoardInfo { brand: brand.into(), ..Default::default() }),
            circuits: vec![DetectedCircuit {
                id: "c1".into(),
                index: 1,
                label_text: "Kitchen".into(),
                device: Device::default(),
                phase: Phase::Single,
                confidence: Confidence::High,
            }],
            images: vec!["data:image/jpeg;base64,AAAA".into()],
        }
    }

    #[test]
    fn test_add_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scans.json");

        let mut store = ScanStore::open(&path).unwrap();
        assert!(store.scans().is_empty());
        let first = store.add(completion("Wylex"), Some("photos/".into())).unwrap();
        let second = store.add(completion("Hager"), None).unwrap();
        assert_eq!(first, "scan-1");
        assert_eq!(second, "scan-2");

        let reopened = ScanStore::open(&path).unwrap();
        assert_eq!(reopened.scans(), store.scans());
        assert_eq!(reopened.get("scan-1").unwrap().source.as_deref(), Some("photos/"));
        assert!(!dir.path().join("nested").join("scans.json.tmp").exists());
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.json");
        let mut store = ScanStore::open(&path).unwrap();
        store.add(completion("Wylex"), None).unwrap();
        let before = store.scans().to_vec();

        // 保存先をディレクトリに差し替えて書き込みを失敗させる
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.add(completion("Hager"), None).is_err());
        assert_eq!(store.scans(), before.as_slice());

        assert!(store.update("scan-1", completion("MK")).is_err());
        assert_eq!(store.scans(), before.as_slice());

        assert!(store.remove("scan-1").is_err());
        assert_eq!(store.scans(), before.as_slice());
    }

    #[test]
    fn test_update_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.json");
        let mut store = ScanStore::open(&path).unwrap();
        let id = store.add(completion("Wylex"), None).unwrap();

        store.update(&id, completion("Hager")).unwrap();
        let brand = &store.get(&id).unwrap().completion.board.as_ref().unwrap().brand;
        assert_eq!(brand, "Hager");
        assert!(matches!(store.update("scan-99", completion("x")), Err(ScanError::Store(_))));

        assert!(store.remove(&id).unwrap());
        assert!(!store.remove(&id).unwrap());
        assert!(ScanStore::open(&path).unwrap().scans().is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ScanStore::open(&path), Err(ScanError::Store(_))));
    }
}
