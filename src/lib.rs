#![forbid(unsafe_code)]

pub mod browse;
pub mod cart;
pub mod cart_cache;
pub mod catalogue;
pub mod clean;
pub mod cli;
pub mod config;
pub mod export;
pub mod formats;
pub mod location;
pub mod logging;
pub mod session;
pub mod sheet_store;
pub mod table;
