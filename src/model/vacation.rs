use strum_macros::{AsRefStr, Display};

/// Stored in `vacations.kind`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum VacationKind {
    Individual,
    Company,
}

impl VacationKind {
    pub fn from_db(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("company") {
            VacationKind::Company
        } else {
            VacationKind::Individual
        }
    }

    /// Calendar colour used by the events feed.
    pub fn color(self) -> &'static str {
        match self {
            VacationKind::Company => "#dc3545",
            VacationKind::Individual => "#0d6efd",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_per_kind() {
        assert_eq!(VacationKind::from_db("company").color(), "#dc3545");
        assert_eq!(VacationKind::from_db("individual").color(), "#0d6efd");
        assert_eq!(VacationKind::Company.as_ref(), "company");
    }
}
