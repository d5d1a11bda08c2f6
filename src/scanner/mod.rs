use crate::error::{Result, ScanError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

impl ImageInfo {
    fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { path: path.to_path_buf(), file_name }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_image_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

/// フォルダ直下の画像をファイル名順で列挙
pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(ScanError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_image_path(e.path()))
        .map(|e| ImageInfo::from_path(e.path()))
        .collect();

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

/// 引数の並び（＝選択順）で画像を集める。フォルダは展開する
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<ImageInfo>> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            images.extend(scan_folder(path)?);
        } else if path.is_file() {
            if is_image_path(path) {
                images.push(ImageInfo::from_path(path));
            } else {
                tracing::warn!(path = %path.display(), "not an image; skipped");
            }
        } else {
            return Err(ScanError::FolderNotFound(path.display().to_string()));
        }
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("jpeg"));
        assert!(is_image_extension("png"));
        assert!(is_image_extension("webp"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("pdf"));
        assert!(!is_image_extension("gif"));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"));
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_folder_with_images() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("board1.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("board2.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("labels.png")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("readme.txt")).unwrap().write_all(b"text").unwrap();
        fs::create_dir(temp_dir.path().join("nested.jpg")).unwrap();

        let result = scan_folder(temp_dir.path()).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].file_name, "board1.jpg");
        assert_eq!(result[1].file_name, "board2.JPG");
        assert_eq!(result[2].file_name, "labels.png");
    }

    #[test]
    fn test_collect_inputs_keeps_argument_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let c = temp_dir.path().join("c.jpg");
        let a = temp_dir.path().join("a.jpg");
        File::create(&c).unwrap();
        File::create(&a).unwrap();
        File::create(temp_dir.path().join("notes.txt")).unwrap();

        let result = collect_inputs(&[c.clone(), temp_dir.path().join("notes.txt"), a.clone()]).unwrap();
        let names: Vec<_> = result.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["c.jpg", "a.jpg"]);
    }

    #[test]
    fn test_collect_inputs_missing_path() {
        let result = collect_inputs(&[PathBuf::from("/nonexistent/board.jpg")]);
        assert!(matches!(result, Err(ScanError::FolderNotFound(_))));
    }
}
