pub mod config;
pub mod logging;
pub mod errors;
pub mod alerts;
pub mod mail;
pub mod market_data;
pub mod report;
pub mod db;
