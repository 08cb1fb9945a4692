use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// Reference averages per symbol, maintained by the ingestion pipeline.
/// The engine reads `avg_volume_30d` as the volume_spike baseline.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "symbol_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub symbol: String,
    pub avg_volume_30d: f64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
