use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Profile, ProductId, ProfileId};

pub type MovementId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock received; the balance goes up.
    Inbound,
    /// Stock shipped or consumed; the balance goes down.
    Outbound,
}

impl MovementKind {
    /// Value stored in the `movements.type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "entrada",
            MovementKind::Outbound => "saida",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "inbound",
            MovementKind::Outbound => "outbound",
        }
    }

    /// Signed change this movement applies to a balance.
    pub fn delta(&self, quantity: i64) -> i64 {
        match self {
            MovementKind::Inbound => quantity,
            MovementKind::Outbound => -quantity,
        }
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" | "inbound" | "in" => Ok(MovementKind::Inbound),
            "saida" | "saída" | "outbound" | "out" => Ok(MovementKind::Outbound),
            other => Err(format!("unknown movement type: {}", other)),
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One entry of the append-only stock log. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Always positive; direction comes from `kind`.
    pub quantity: i64,
    pub responsible_id: ProfileId,
    /// Display name of the responsible profile at the time of the movement.
    pub responsible_name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Build a movement performed by `responsible`. Identity and timestamp are
    /// assigned here, not by the caller.
    ///
    /// Panics if `quantity` is not positive; callers validate it first
    /// (see [`crate::domain::stock::validate_quantity`]).
    pub fn new(
        product_id: ProductId,
        kind: MovementKind,
        quantity: i64,
        responsible: &Profile,
    ) -> Self {
        assert!(quantity > 0, "Movement quantity must be positive");
        Self {
            id: Uuid::new_v4(),
            product_id,
            kind,
            quantity,
            responsible_id: responsible.id,
            responsible_name: responsible.full_name.clone(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn delta(&self) -> i64 {
        self.kind.delta(self.quantity)
    }
}

/// A movement joined with the product fields the history view displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub movement: Movement,
    pub product_name: String,
    pub product_category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_values() {
        assert_eq!(MovementKind::Inbound.as_str(), "entrada");
        assert_eq!(MovementKind::Outbound.as_str(), "saida");
    }

    #[test]
    fn test_kind_parses_storage_and_english_names() {
        assert_eq!("entrada".parse::<MovementKind>(), Ok(MovementKind::Inbound));
        assert_eq!("IN".parse::<MovementKind>(), Ok(MovementKind::Inbound));
        assert_eq!("saida".parse::<MovementKind>(), Ok(MovementKind::Outbound));
        assert_eq!("Outbound".parse::<MovementKind>(), Ok(MovementKind::Outbound));
        assert!("transfer".parse::<MovementKind>().is_err());
    }

    #[test]
    fn test_delta_sign() {
        assert_eq!(MovementKind::Inbound.delta(4), 4);
        assert_eq!(MovementKind::Outbound.delta(4), -4);
    }

    #[test]
    fn test_movement_captures_responsible_name() {
        let mut operator = Profile::new("Carlos Mendes");
        let movement = Movement::new(Uuid::new_v4(), MovementKind::Inbound, 3, &operator)
            .with_notes("NF 1234");

        operator.rename("Carlos M.");

        assert_eq!(movement.responsible_id, operator.id);
        assert_eq!(movement.responsible_name, "Carlos Mendes");
        assert_eq!(movement.notes.as_deref(), Some("NF 1234"));
        assert_eq!(movement.delta(), 3);
    }

    #[test]
    #[should_panic(expected = "Movement quantity must be positive")]
    fn test_movement_requires_positive_quantity() {
        let operator = Profile::new("Carlos Mendes");
        Movement::new(Uuid::new_v4(), MovementKind::Outbound, 0, &operator);
    }
}
