//! Export core modules shared across CLI and WASM wrappers.

#[cfg(feature = "excel")]
pub mod excel_core;
