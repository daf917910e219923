//! Identifier Synthesis
//!
//! Four ids per conversion. The Bereich and Plan ids link the two feature
//! members in both directions; the geometry id is never referenced.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub const DOCUMENT_PREFIX: &str = "GML_";
pub const FEATURE_PREFIX: &str = "ID_";

/// Source of raw unique values
pub trait IdGenerator {
    fn next_uuid(&mut self) -> String;
}

/// Random version-4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_uuid(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Hands out the given values in order, then a zero-padded counter.
#[derive(Debug, Default, Clone)]
pub struct SequenceIds {
    values: VecDeque<String>,
    issued: u64,
}

impl SequenceIds {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            issued: 0,
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_uuid(&mut self) -> String {
        self.issued += 1;
        self.values
            .pop_front()
            .unwrap_or_else(|| format!("00000000-0000-0000-0000-{:012}", self.issued))
    }
}

/// The ids of one output document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIds {
    pub document: String,
    pub bereich: String,
    pub plan: String,
    pub geometry: String,
}

impl PlanIds {
    /// Draws document, bereich, plan and geometry ids in that order.
    pub fn generate(ids: &mut dyn IdGenerator) -> Self {
        Self {
            document: format!("{}{}", DOCUMENT_PREFIX, ids.next_uuid()),
            bereich: format!("{}{}", FEATURE_PREFIX, ids.next_uuid()),
            plan: format!("{}{}", FEATURE_PREFIX, ids.next_uuid()),
            geometry: format!("{}{}", FEATURE_PREFIX, ids.next_uuid()),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [self.document.as_str(), self.bereich.as_str(), self.plan.as_str(), self.geometry.as_str()]
    }
}

/// Local xlink reference to an id
pub fn href(id: &str) -> String {
    format!("#{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_ids_prefixed_and_distinct() {
        let ids = PlanIds::generate(&mut RandomIds);
        assert!(ids.document.starts_with("GML_"));
        for id in [&ids.bereich, &ids.plan, &ids.geometry] {
            assert!(id.starts_with("ID_"));
        }
        let unique: HashSet<_> = ids.all().into_iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_random_ids_are_v4() {
        let raw = RandomIds.next_uuid();
        let parsed = Uuid::parse_str(&raw).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_sequence_order_and_fallback() {
        let mut seq = SequenceIds::new(["a", "b"]);
        let ids = PlanIds::generate(&mut seq);
        assert_eq!(ids.document, "GML_a");
        assert_eq!(ids.bereich, "ID_b");
        assert_eq!(ids.plan, "ID_00000000-0000-0000-0000-000000000003");
        assert_eq!(ids.geometry, "ID_00000000-0000-0000-0000-000000000004");
    }

    #[test]
    fn test_href() {
        assert_eq!(href("ID_x"), "#ID_x");
    }
}
