pub mod auth;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod ledger;
pub mod pick;
pub mod remote;
pub mod retry;
pub mod utils;
pub mod verification;

pub use config::Config;
pub use error::PhotoPickError;
