//! # heirloom-types: Core types for `Heirloom`
//!
//! This crate contains shared types used across the `Heirloom` workspace:
//! - Entity IDs ([`EntityId`], [`RevisionId`], [`Delta`])
//! - Legacy identifiers ([`LanguageCode`], [`NodeType`])
//! - Translation models ([`TranslationStrategy`], [`SourceOptions`])
//! - Legacy schema names ([`schema`])

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

pub mod schema;
mod strategy;

pub use strategy::{SourceOptions, TranslationStrategy, UnknownStrategy};

// ============================================================================
// Entity IDs - All Copy (cheap 8-byte values)
// ============================================================================

/// Identifier of a legacy content item (`node.nid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Identifier of one stored revision of a content item (`node.vid`).
///
/// Its presence on a row selects revisioned field storage; its absence selects
/// current storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RevisionId(u64);

impl RevisionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RevisionId> for u64 {
    fn from(id: RevisionId) -> Self {
        id.0
    }
}

/// Zero-based position of one value inside a multi-value field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Delta(u32);

impl Delta {
    pub const ZERO: Delta = Delta(0);

    pub fn new(delta: u32) -> Self {
        Self(delta)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl Display for Delta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Delta {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Delta> for u32 {
    fn from(delta: Delta) -> Self {
        delta.0
    }
}

// ============================================================================
// Legacy identifiers - Clone (contain String)
// ============================================================================

/// A legacy language code such as `en`, `fr`, or `und`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this code should restrict field lookups.
    ///
    /// An empty code means "no language given" and matches every language.
    /// `und` is a real stored language and still filters.
    pub fn is_specified(&self) -> bool {
        !self.0.is_empty()
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LanguageCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

/// The type tag of a content item (`node.type`), e.g. `article` or `page`.
///
/// Selects which fields are declared for an item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeType(String);

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for NodeType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_round_trips_through_u64() {
        let id = EntityId::from(10);
        assert_eq!(u64::from(id), 10);
        assert_eq!(id.to_string(), "10");
    }

    #[test]
    fn delta_orders_numerically() {
        let mut deltas = vec![Delta::new(10), Delta::new(2), Delta::ZERO];
        deltas.sort();
        assert_eq!(deltas, vec![Delta::ZERO, Delta::new(2), Delta::new(10)]);
    }

    #[test]
    fn empty_language_is_unspecified() {
        assert!(!LanguageCode::default().is_specified());
        assert!(LanguageCode::from("und").is_specified());
        assert!(LanguageCode::from("fr").is_specified());
    }

    #[test]
    fn identifiers_serialize_transparently() {
        let json = serde_json::to_string(&NodeType::from("page")).unwrap();
        assert_eq!(json, "\"page\"");

        let lang: LanguageCode = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(lang.as_str(), "en");
    }
}
