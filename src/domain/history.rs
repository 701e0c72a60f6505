use super::{MovementKind, MovementRecord};

/// In-memory filter over an already fetched movement history.
///
/// `search` is a case-insensitive substring match against the product name or
/// the responsible display name; `kind` is an exact match. An unset or blank
/// criterion matches everything. Filtering never reorders records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub search: Option<String>,
    pub kind: Option<MovementKind>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.needle().is_none()
    }

    pub fn matches(&self, record: &MovementRecord) -> bool {
        self.kind.is_none_or(|kind| record.movement.kind == kind)
            && self
                .needle()
                .is_none_or(|needle| matches_needle(record, &needle))
    }

    /// Keep the matching records, preserving their order.
    pub fn apply(&self, records: &[MovementRecord]) -> Vec<MovementRecord> {
        if self.is_empty() {
            return records.to_vec();
        }
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

fn matches_needle(record: &MovementRecord, needle: &str) -> bool {
    record.product_name.to_lowercase().contains(needle)
        || record.movement.responsible_name.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{Movement, Profile};

    fn record(product_name: &str, responsible: &str, kind: MovementKind) -> MovementRecord {
        let profile = Profile::new(responsible);
        MovementRecord {
            movement: Movement::new(Uuid::new_v4(), kind, 1, &profile),
            product_name: product_name.to_string(),
            product_category: "Notebooks".to_string(),
        }
    }

    fn sample() -> Vec<MovementRecord> {
        vec![
            record("MacBook Air M2", "Joana Prado", MovementKind::Outbound),
            record("ThinkPad T14", "Pedro Alves", MovementKind::Inbound),
            record("IdeaPad 3", "Joana Prado", MovementKind::Inbound),
            record("Dell XPS 13", "Joana Prado", MovementKind::Outbound),
        ]
    }

    #[test]
    fn test_empty_filter_keeps_everything_in_order() {
        let records = sample();
        let filter = HistoryFilter::new().with_search("   ");
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&records), records);
    }

    #[test]
    fn test_search_matches_product_name_case_insensitively() {
        let records = sample();
        let result = HistoryFilter::new().with_search("thinkPAD").apply(&records);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].product_name, "ThinkPad T14");
    }

    #[test]
    fn test_kind_and_responsible_search_preserve_order() {
        let records = sample();
        let filter = HistoryFilter::new()
            .with_search("joana")
            .with_kind(MovementKind::Outbound);

        let result = filter.apply(&records);

        let names: Vec<_> = result.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, vec!["MacBook Air M2", "Dell XPS 13"]);
        assert!(result.iter().all(|r| filter.matches(r)));
    }

    #[test]
    fn test_kind_only() {
        let records = sample();
        let result = HistoryFilter::new()
            .with_kind(MovementKind::Inbound)
            .apply(&records);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| r.movement.kind == MovementKind::Inbound));
    }

    #[test]
    fn test_apply_is_repeatable() {
        let records = sample();
        let filter = HistoryFilter::new().with_search("a");
        assert_eq!(filter.apply(&records), filter.apply(&records));
    }
}
