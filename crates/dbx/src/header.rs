//! Response metadata derived from entity declarations.
//!
//! ```json
//! {"meta":{"header":{"status":{"name":"Status","type":"enum","reference":"statuses","value":{"a":"Active"}}},"count":1},"body":[...]}
//! ```

use crate::entity::EntityMetadata;
use serde::Serialize;
use std::collections::BTreeMap;

/// Semantic category of a field, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Number,
    Bool,
    Date,
    String,
    Money,
    Enum,
    Object,
}

impl SemanticType {
    /// Classify a declared Rust type such as `Option<chrono::NaiveDate>`.
    ///
    /// `Option<T>` and references classify as `T`; only the last path segment
    /// is considered.
    pub fn classify(type_name: &str) -> Self {
        let last = base_type(type_name);
        let base = last.split('<').next().unwrap_or(last.as_str());
        match base {
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" | "f32" | "f64" | "Decimal" => SemanticType::Number,
            "bool" => SemanticType::Bool,
            "NaiveDate" | "NaiveDateTime" | "NaiveTime" | "DateTime" | "OffsetDateTime"
            | "SystemTime" => SemanticType::Date,
            "String" | "str" | "Uuid" => SemanticType::String,
            "Cow" if last == "Cow<str>" => SemanticType::String,
            "Money" => SemanticType::Money,
            "Enum" => SemanticType::Enum,
            _ => SemanticType::Object,
        }
    }
}

/// The declared type with whitespace, references and `Option` removed, reduced
/// to its last path segment: `Option<&chrono::NaiveDate>` → `NaiveDate`.
pub(crate) fn base_type(type_name: &str) -> String {
    let compact = strip_lifetimes(type_name);
    let mut ty = compact.as_str();
    loop {
        if let Some(rest) = ty.strip_prefix('&') {
            ty = rest.strip_prefix("mut").unwrap_or(rest);
            continue;
        }
        let last = last_segment(ty);
        if let Some(inner) = last
            .strip_prefix("Option<")
            .and_then(|s| s.strip_suffix('>'))
        {
            ty = inner;
            continue;
        }
        return last.to_string();
    }
}

/// Drop whitespace and lifetimes (with a following `,`): `Cow<'a, str>` → `Cow<str>`.
fn strip_lifetimes(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut chars = type_name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            while chars.next_if(|c| c.is_alphanumeric() || *c == '_').is_some() {}
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            chars.next_if_eq(&',');
        } else if !c.is_whitespace() {
            out.push(c);
        }
    }
    out
}

/// Last `::` segment outside generic arguments.
fn last_segment(ty: &str) -> &str {
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = ty.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    &ty[start..]
}

/// Header entry for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Display name.
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(rename = "virtual", skip_serializing_if = "std::ops::Not::not")]
    pub is_virtual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Enum dictionary (code → label).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<BTreeMap<String, String>>,
}

/// External name → descriptor.
pub type Header = BTreeMap<String, FieldDescriptor>;

/// Build the header for every named field that has a display name.
pub fn build_header(metadata: &EntityMetadata) -> Header {
    let mut header = Header::new();
    for field in metadata.fields() {
        let Some(name) = field.name else { continue };
        let Some(display) = metadata.display_name(name) else {
            continue;
        };

        let semantic_type = SemanticType::classify(field.type_name);
        let mut descriptor = FieldDescriptor {
            name: display.to_string(),
            semantic_type,
            is_virtual: field.is_virtual(),
            reference: metadata.alias_for(name).map(str::to_string),
            value: None,
        };

        if semantic_type == SemanticType::Enum {
            if let Some(def) = metadata.enum_for(name) {
                descriptor.reference = Some(def.reference.clone());
                descriptor.value = Some(def.values.clone());
            }
        }

        header.insert(name.to_string(), descriptor);
    }
    header
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub header: Header,
    pub count: i64,
}

/// Result envelope: `{"meta": {...}, "body": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    pub body: T,
}
