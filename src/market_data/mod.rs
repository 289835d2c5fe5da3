pub mod fmp_client;
pub mod fmp_types;
pub mod transform;

pub use fmp_client::FmpClient;
