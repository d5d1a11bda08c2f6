//! 外部サービス連携

pub mod analysis;
