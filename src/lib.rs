pub mod basis;
pub mod callback;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod sync;
