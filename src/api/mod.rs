use serde::Deserialize;
use utoipa::ToSchema;

pub mod absences;
pub mod dashboard;
pub mod feedback;
pub mod health;
pub mod materials;
pub mod order_lines;
pub mod orders;
pub mod time_records;
pub mod users;
pub mod vacations;

/// Body of the bulk delete endpoints: a bare JSON array of ids.
#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!([3, 4, 9]))]
pub struct IdList(pub Vec<u64>);

impl IdList {
    /// Ids without duplicates, first occurrence kept.
    pub fn unique(&self) -> Vec<u64> {
        let mut seen = std::collections::HashSet::new();
        self.0.iter().copied().filter(|id| seen.insert(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_collapse() {
        let list = IdList(vec![4, 2, 4, 9, 2]);
        assert_eq!(list.unique(), vec![4, 2, 9]);
    }

    #[test]
    fn ids_arrive_as_a_bare_array() {
        let list: IdList = serde_json::from_str("[3, 4]").unwrap();
        assert_eq!(list.unique(), vec![3, 4]);
        assert!(serde_json::from_str::<IdList>(r#"{"ids": [3, 4]}"#).is_err());
    }
}
