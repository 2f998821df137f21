use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an integer identifier newtype as used by the timesheet backend.
///
/// Remote records, projects, tasks and users are all keyed by integers, but
/// they must never be mixed up with each other.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

integer_id!(
    /// Identifier of a timesheet record on the remote backend.
    RecordId
);

integer_id!(
    /// A project identifier from the timesheet backend.
    ProjectId
);

integer_id!(
    /// A task identifier, always scoped to a project.
    TaskId
);

integer_id!(
    /// The backend user that owns a timesheet record.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&RecordId::new(42)).unwrap();
        assert_eq!(json, "42");

        let project: ProjectId = serde_json::from_str("7").unwrap();
        assert_eq!(project, ProjectId::from(7));
        assert_eq!(i64::from(project), 7);
    }

    #[test]
    fn display_matches_raw_value() {
        assert_eq!(TaskId::new(10).to_string(), "10");
        assert_eq!(UserId::new(-1).as_i64(), -1);
    }
}
