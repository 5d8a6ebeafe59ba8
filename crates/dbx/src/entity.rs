//! Entity declarations and the metadata derived from them.
//!
//! A record type describes itself through [`Entity`]: its field declarations
//! (external name, storage column, declared Rust type) plus three optional
//! capabilities, each a default method that returns nothing unless overridden:
//!
//! - [`Entity::references`]: external name → canonical name (filter aliases,
//!   header references)
//! - [`Entity::enums`]: enum dictionaries for `Enum`-typed fields
//! - [`Entity::display_columns`]: external name → display name (header entries)
//!
//! `#[derive(Entity)]` generates the implementation from `#[orm(...)]` attributes.

use crate::error::{OrmError, OrmResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One declared field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// External (JSON / query-string) name. `None` when the field is suppressed.
    pub name: Option<&'static str>,
    /// Storage column. `None` for virtual fields.
    pub column: Option<&'static str>,
    /// Declared Rust type as written, e.g. `Option<i64>`.
    pub type_name: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str, column: &'static str, type_name: &'static str) -> Self {
        Self {
            name: Some(name),
            column: Some(column),
            type_name,
        }
    }

    /// A field with no storage column.
    pub const fn virtual_field(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name: Some(name),
            column: None,
            type_name,
        }
    }

    /// A field hidden from filters and headers.
    pub const fn skipped(column: &'static str, type_name: &'static str) -> Self {
        Self {
            name: None,
            column: Some(column),
            type_name,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.column.is_none()
    }
}

/// Dictionary of codes and labels for an `Enum` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDefinition {
    /// External name of the field this dictionary applies to.
    pub key: String,
    pub reference: String,
    /// code → label
    pub values: BTreeMap<String, String>,
}

impl EnumDefinition {
    pub fn new(key: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reference: reference.into(),
            values: BTreeMap::new(),
        }
    }

    /// Add a code/label pair.
    pub fn value(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.values.insert(code.into(), label.into());
        self
    }
}

/// A record type a query builder can be bound to.
pub trait Entity {
    /// Field declarations in declaration order.
    fn fields() -> &'static [FieldDef];

    /// Default FROM table.
    fn table() -> Option<&'static str> {
        None
    }

    /// Alias map: external name → canonical name.
    fn references() -> HashMap<String, String> {
        HashMap::new()
    }

    fn enums() -> Vec<EnumDefinition> {
        Vec::new()
    }

    /// Display names for header entries; fields without one are left out of headers.
    fn display_columns() -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Metadata derived once from an [`Entity`].
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    fields: &'static [FieldDef],
    field_to_column: HashMap<String, String>,
    aliases: HashMap<String, String>,
    enums: Vec<EnumDefinition>,
    display_columns: HashMap<String, String>,
}

impl EntityMetadata {
    /// Derive metadata for `E`, rejecting malformed capability output.
    pub fn extract<E: Entity>() -> OrmResult<Self> {
        Self::from_parts(
            E::fields(),
            E::references(),
            E::enums(),
            E::display_columns(),
        )
    }

    pub(crate) fn from_parts(
        fields: &'static [FieldDef],
        aliases: HashMap<String, String>,
        enums: Vec<EnumDefinition>,
        display_columns: HashMap<String, String>,
    ) -> OrmResult<Self> {
        let mut field_to_column = HashMap::new();
        let mut declared = HashSet::new();
        for field in fields {
            let Some(name) = field.name else { continue };
            declared.insert(name);
            if let Some(column) = field.column {
                field_to_column.insert(name.to_string(), column.to_string());
            }
        }

        if let Some(key) = aliases.keys().find(|k| k.is_empty()) {
            return Err(OrmError::config(format!(
                "references: empty external name (mapped to {:?})",
                aliases[key]
            )));
        }

        let mut seen = HashSet::new();
        for def in &enums {
            if def.key.is_empty() {
                return Err(OrmError::config("enums: definition with empty key"));
            }
            if !declared.contains(def.key.as_str()) {
                return Err(OrmError::config(format!(
                    "enums: key {:?} is not a declared field",
                    def.key
                )));
            }
            if !seen.insert(def.key.as_str()) {
                return Err(OrmError::config(format!(
                    "enums: duplicate definition for {:?}",
                    def.key
                )));
            }
        }

        for key in display_columns.keys() {
            if !declared.contains(key.as_str()) {
                return Err(OrmError::config(format!(
                    "display columns: key {key:?} is not a declared field"
                )));
            }
        }

        Ok(Self {
            fields,
            field_to_column,
            aliases,
            enums,
            display_columns,
        })
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Look up a declared field by external name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == Some(name))
    }

    pub fn column_for(&self, name: &str) -> Option<&str> {
        self.field_to_column.get(name).map(String::as_str)
    }

    pub fn alias_for(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Follow the alias map once, or return the name unchanged.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.aliases.get(name) {
            Some(target) if !target.is_empty() => target.as_str(),
            _ => name,
        }
    }

    pub fn enums(&self) -> &[EnumDefinition] {
        &self.enums
    }

    pub fn enum_for(&self, name: &str) -> Option<&EnumDefinition> {
        self.enums.iter().find(|e| e.key == name)
    }

    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.display_columns
            .get(name)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Metadata with no fields; used when extraction failed.
    pub(crate) fn empty() -> Self {
        Self {
            fields: &[],
            field_to_column: HashMap::new(),
            aliases: HashMap::new(),
            enums: Vec::new(),
            display_columns: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIELDS: &[FieldDef] = &[
        FieldDef::new("id", "id", "i64"),
        FieldDef::new("userId", "user_id", "i64"),
        FieldDef::virtual_field("fullName", "String"),
        FieldDef::skipped("password_hash", "String"),
        FieldDef::new("status", "status", "Enum"),
    ];

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn maps_fields_with_columns_only() {
        let meta =
            EntityMetadata::from_parts(FIELDS, HashMap::new(), Vec::new(), HashMap::new()).unwrap();
        assert_eq!(meta.column_for("userId"), Some("user_id"));
        assert_eq!(meta.column_for("fullName"), None);
        assert_eq!(meta.column_for("password_hash"), None);
        assert!(meta.field("fullName").unwrap().is_virtual());
    }

    #[test]
    fn absent_capabilities_are_empty() {
        let meta =
            EntityMetadata::from_parts(FIELDS, HashMap::new(), Vec::new(), HashMap::new()).unwrap();
        assert!(meta.enums().is_empty());
        assert_eq!(meta.alias_for("user"), None);
        assert_eq!(meta.display_name("id"), None);
        assert_eq!(meta.canonical_name("user"), "user");
    }

    #[test]
    fn aliases_redirect_once() {
        let meta = EntityMetadata::from_parts(
            FIELDS,
            map(&[("user", "userId")]),
            Vec::new(),
            HashMap::new(),
        )
        .unwrap();
        assert_eq!(meta.canonical_name("user"), "userId");
        assert_eq!(meta.canonical_name("id"), "id");
    }

    #[test]
    fn rejects_enum_for_unknown_field() {
        let err = EntityMetadata::from_parts(
            FIELDS,
            HashMap::new(),
            vec![EnumDefinition::new("nope", "statuses")],
            HashMap::new(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn rejects_duplicate_enum_keys() {
        let err = EntityMetadata::from_parts(
            FIELDS,
            HashMap::new(),
            vec![
                EnumDefinition::new("status", "a"),
                EnumDefinition::new("status", "b"),
            ],
            HashMap::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_display_key_for_unknown_field() {
        let err = EntityMetadata::from_parts(
            FIELDS,
            HashMap::new(),
            Vec::new(),
            map(&[("ghost", "Ghost")]),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn rejects_empty_alias_key() {
        let err =
            EntityMetadata::from_parts(FIELDS, map(&[("", "id")]), Vec::new(), HashMap::new())
                .unwrap_err();
        assert!(err.is_config());
    }
}
