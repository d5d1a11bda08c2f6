pub mod analyzer;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod review;
pub mod scanner;
pub mod store;
