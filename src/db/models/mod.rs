pub mod commodities;
pub mod user_commodities;
pub mod market_records;
