pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod region;
pub mod scrapers;
pub mod storage;
pub mod sweeper;
