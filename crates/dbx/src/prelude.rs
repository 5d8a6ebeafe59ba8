//! Convenient imports for typical `dbx` usage.
//!
//! ```ignore
//! use dbx::prelude::*;
//! ```

pub use crate::{
    Entity, Enum, EnumDefinition, Envelope, FieldDef, FilterOptions, FromRow, GenericClient, Meta,
    Money, OrmError, OrmResult, QueryBuilder, RowExt, Session, TransactionOptions, params,
};

#[cfg(feature = "pool")]
pub use crate::{DatabaseConfig, Registry, create_pool};
