pub mod cli;
pub mod client;
pub mod config;
pub mod connect;
pub mod crypto;
pub mod error;
pub mod eventtracking;
pub mod hd_path;
pub mod keystore;
pub mod transaction;
pub mod units;
