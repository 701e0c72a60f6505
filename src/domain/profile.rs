use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an authenticated user. Every mutating operation is performed
/// by exactly one profile, the actor.
pub type ProfileId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(full_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename(&mut self, full_name: impl Into<String>) {
        self.full_name = full_name.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_bumps_updated_at() {
        let mut profile = Profile::new("Ana Souza");
        let created = profile.updated_at;

        profile.rename("Ana S. Lima");

        assert_eq!(profile.full_name, "Ana S. Lima");
        assert!(profile.updated_at >= created);
        assert_eq!(profile.created_at, created);
    }
}
