use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Material {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Cement 25kg")]
    pub description: String,
}
