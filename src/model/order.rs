use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle of a material order, stored as its snake_case name.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    ReadyToShip,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        OrderStatus::from_str(raw.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(OrderStatus::ReadyToShip.to_string(), "ready_to_ship");
        assert_eq!(OrderStatus::Pending.as_ref(), "pending");
        assert_eq!(OrderStatus::parse("shipped"), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse(" cancelled "), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("lost"), None);
    }

    #[test]
    fn status_deserializes_from_json() {
        let status: OrderStatus = serde_json::from_str("\"ready_to_ship\"").unwrap();
        assert_eq!(status, OrderStatus::ReadyToShip);
    }
}
