use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CommodityModel {
    pub commodity_id: i32,
    pub symbol: String,
    pub commodity_name: String,
    pub currency: String,
}
