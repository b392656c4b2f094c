use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Requisition line keyed by `(material_id, order_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OrderLine {
    #[schema(example = 3)]
    pub material_id: u64,
    #[schema(example = 12)]
    pub order_id: u64,
    #[schema(example = 4.5)]
    pub quantity: f64,
}
