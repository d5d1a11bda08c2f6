//! Data URI ユーティリティ
//!
//! 撮影画像は "data:image/jpeg;base64,/9j/..." 形式で保持する。

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Data URIからBase64データ部分を抽出
pub fn extract_base64(data_uri: &str) -> Option<&str> {
    data_uri.split_once(',').map(|(_, data)| data)
}

/// Data URIからMIMEタイプを抽出（抽出できなければ "image/jpeg"）
pub fn extract_mime_type(data_uri: &str) -> &str {
    data_uri
        .strip_prefix("data:")
        .and_then(|s| s.split(';').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("image/jpeg")
}

/// バイト列からData URIを生成
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Data URIをバイト列に戻す
pub fn decode(data_uri: &str) -> Option<Vec<u8>> {
    let data = extract_base64(data_uri)?;
    STANDARD.decode(data).ok()
}

/// 拡張子からMIMEタイプを推定
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}
