//! Scalar value types understood by the header generator.
//!
//! - [`Money`]: a float amount whose conversions are fixed to two decimals.
//! - [`Enum`]: a textual code resolved against an [`EnumDefinition`](crate::EnumDefinition).

use bytes::BytesMut;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A monetary amount.
///
/// Stored as `f64`; every conversion rounds half away from zero to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Money(pub f64);

impl Money {
    pub fn new(amount: f64) -> Self {
        Money(amount)
    }

    /// The amount rounded to two decimals.
    pub fn to_f64(self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

impl FromStr for Money {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Money)
    }
}

impl From<f64> for Money {
    fn from(amount: f64) -> Self {
        Money(amount)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Money)
    }
}

impl ToSql for Money {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        self.to_f64().to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <f64 as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Money {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        <f64 as FromSql>::from_sql(ty, raw).map(Money)
    }

    fn accepts(ty: &Type) -> bool {
        <f64 as FromSql>::accepts(ty)
    }
}

/// A textual enumeration code (e.g. `"active"`).
///
/// Binds to text columns and to PostgreSQL `ENUM` types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Enum(pub String);

impl Enum {
    pub fn new(code: impl Into<String>) -> Self {
        Enum(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Enum {
    fn from(code: &str) -> Self {
        Enum(code.to_string())
    }
}

impl From<String> for Enum {
    fn from(code: String) -> Self {
        Enum(code)
    }
}

fn accepts_enum_text(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_)) || <&str as ToSql>::accepts(ty)
}

impl ToSql for Enum {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        self.0.as_str().to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        accepts_enum_text(ty)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Enum {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        <&str as FromSql>::from_sql(ty, raw).map(|s| Enum(s.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        accepts_enum_text(ty)
    }
}
