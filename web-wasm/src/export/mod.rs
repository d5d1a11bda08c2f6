//! 確定結果の出力（ブラウザでダウンロード）

pub mod download;
pub mod excel_wasm;
