use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, strum_macros::Display)]
pub enum Role {
    Admin = 1,
    Collaborator = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Collaborator),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Admins can do everything a collaborator can.
    pub fn can_clock(self) -> bool {
        matches!(self, Role::Admin | Role::Collaborator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Collaborator] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(3), None);
    }

    #[test]
    fn both_roles_can_clock() {
        assert!(Role::Admin.can_clock());
        assert!(Role::Collaborator.can_clock());
    }
}
