//! Naming of the sparse field storage tables.

use heirloom_types::RevisionId;
use heirloom_types::schema::{FIELD_DATA_PREFIX, FIELD_REVISION_PREFIX, field_columns};

/// Which copy of a field's values to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// `field_data_<field>`: values of the current revision.
    Current,
    /// `field_revision_<field>`: values of every revision.
    Revision,
}

impl StorageKind {
    /// Revision storage when a revision id is known, current storage otherwise.
    pub fn for_revision(revision: Option<RevisionId>) -> Self {
        if revision.is_some() {
            StorageKind::Revision
        } else {
            StorageKind::Current
        }
    }

    pub fn table_prefix(self) -> &'static str {
        match self {
            StorageKind::Current => FIELD_DATA_PREFIX,
            StorageKind::Revision => FIELD_REVISION_PREFIX,
        }
    }

    /// Unprefixed storage table for `field`.
    pub fn table_name(self, field: &str) -> String {
        format!("{}{field}", self.table_prefix())
    }
}

/// Key columns every storage table carries; sub-columns may not reuse them.
pub const KEY_COLUMNS: [&str; 7] = [
    field_columns::ENTITY_TYPE,
    field_columns::BUNDLE,
    field_columns::DELETED,
    field_columns::ENTITY_ID,
    field_columns::REVISION_ID,
    field_columns::LANGUAGE,
    field_columns::DELTA,
];

/// Returns true if `name` is a legal field or sub-column name: lowercase
/// ASCII letters, digits and underscores, starting with a letter.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None => "field_data_body"; "current values")]
    #[test_case(Some(RevisionId::new(7)) => "field_revision_body"; "revisioned values")]
    fn table_follows_revision(revision: Option<RevisionId>) -> String {
        StorageKind::for_revision(revision).table_name("body")
    }

    #[test_case("body" => true)]
    #[test_case("field_tags2" => true)]
    #[test_case("" => false)]
    #[test_case("Body" => false)]
    #[test_case("2col" => false)]
    #[test_case("body; drop" => false)]
    #[test_case("_private" => false)]
    fn names(name: &str) -> bool {
        is_valid_name(name)
    }
}
