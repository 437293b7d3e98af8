pub mod config;
pub mod service;

pub use config::Settings;
pub use service::Ledger;
