//! Translation models of the legacy schema and the options that select them.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NodeType;

/// How the legacy schema links a content item to its translations.
///
/// Each variant selects one query shape in the query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TranslationStrategy {
    /// Plain content items, no translation awareness.
    #[default]
    None,
    /// Items share a translation-set id (`tnid`); an item is an original iff
    /// `tnid` is zero or equals its own id.
    SetLinked,
    /// A side table holds one record per language per item; a record is an
    /// original iff its `source` is empty.
    EntityLinked,
}

impl TranslationStrategy {
    pub const ALL: [TranslationStrategy; 3] = [
        TranslationStrategy::None,
        TranslationStrategy::SetLinked,
        TranslationStrategy::EntityLinked,
    ];

    /// Canonical configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationStrategy::None => "none",
            TranslationStrategy::SetLinked => "set-linked",
            TranslationStrategy::EntityLinked => "entity-linked",
        }
    }

    /// Returns true if this strategy can distinguish originals from translations.
    pub fn is_translation_aware(self) -> bool {
        !matches!(self, TranslationStrategy::None)
    }
}

impl Display for TranslationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy name that matches no known translation model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown translation strategy: {0:?}")]
pub struct UnknownStrategy(pub String);

impl FromStr for TranslationStrategy {
    type Err = UnknownStrategy;

    /// Accepts the canonical names as well as the source plugin ids that
    /// older migration definitions still carry.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "d6_node" | "d7_node" => Ok(TranslationStrategy::None),
            "set-linked" | "d7_node_content_translation" => Ok(TranslationStrategy::SetLinked),
            "entity-linked" | "d7_node_entity_translation" => {
                Ok(TranslationStrategy::EntityLinked)
            }
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for TranslationStrategy {
    type Error = UnknownStrategy;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TranslationStrategy> for String {
    fn from(value: TranslationStrategy) -> Self {
        value.as_str().to_string()
    }
}

/// Options the host passes when asking for an extraction query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Which translation model the legacy install uses.
    pub strategy: TranslationStrategy,
    /// Emit non-default translations instead of originals.
    pub translations: bool,
    /// Restrict extraction to one content type.
    pub node_type: Option<NodeType>,
}

impl SourceOptions {
    pub fn new(strategy: TranslationStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_translations(mut self, translations: bool) -> Self {
        self.translations = translations;
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<NodeType>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("none" => TranslationStrategy::None; "canonical none")]
    #[test_case("set-linked" => TranslationStrategy::SetLinked; "canonical set linked")]
    #[test_case("entity-linked" => TranslationStrategy::EntityLinked; "canonical entity linked")]
    #[test_case("d7_node_content_translation" => TranslationStrategy::SetLinked; "legacy content translation id")]
    #[test_case("d7_node_entity_translation" => TranslationStrategy::EntityLinked; "legacy entity translation id")]
    #[test_case("d6_node" => TranslationStrategy::None; "legacy d6 id")]
    fn parses_strategy_names(name: &str) -> TranslationStrategy {
        name.parse().unwrap()
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = "i18n_magic".parse::<TranslationStrategy>().unwrap_err();
        assert_eq!(err, UnknownStrategy("i18n_magic".to_string()));
    }

    #[test]
    fn canonical_names_round_trip() {
        for strategy in TranslationStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<TranslationStrategy>(), Ok(strategy));
        }
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: SourceOptions =
            serde_json::from_str(r#"{"strategy":"entity-linked","node_type":"article"}"#).unwrap();
        assert_eq!(opts.strategy, TranslationStrategy::EntityLinked);
        assert!(!opts.translations);
        assert_eq!(opts.node_type, Some(NodeType::from("article")));

        let bad = serde_json::from_str::<SourceOptions>(r#"{"strategy":"nope"}"#);
        assert!(bad.is_err());
    }
}
