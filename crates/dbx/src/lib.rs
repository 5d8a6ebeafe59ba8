//! # dbx
//!
//! A SELECT statement builder bound to a record type, for PostgreSQL.
//!
//! ## Features
//!
//! - **Entity-bound**: field names, storage columns, aliases, enum dictionaries
//!   and display names come from the record type (`#[derive(Entity)]`)
//! - **Fluent builder**: selection, joins, whitelisted WHERE operators, grouping,
//!   ordering and pagination; misuse is reported at build/execute time
//! - **Query-string filters**: `name%5Blike%5D=jo&limit=10` decoded into predicates
//! - **Response metadata**: a header describing every displayed field
//!   (semantic type, virtual flag, reference, enum values)
//! - **Sessions**: one connection plus an explicit transaction state
//!
//! ## Example
//!
//! ```ignore
//! use dbx::{Entity, FromRow, QueryBuilder};
//!
//! #[derive(Debug, Entity, FromRow)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(display = "ID")]
//!     id: i64,
//!     #[orm(display = "Name")]
//!     name: String,
//!     #[orm(name = "teamId", column = "team_id", display = "Team")]
//!     team_id: i64,
//!     // `team%5Bequal%5D=3` filters on `team_id`; the header reports `reference: "teamId"`.
//!     #[orm(name = "team", reference = "teamId", virtual, display = "Team name")]
//!     team_name: String,
//! }
//!
//! let mut qb = QueryBuilder::<User>::new().select(["id", "name", "team_id"]);
//! qb.apply_filters([("name%5Blike%5D", "jo"), ("team%5Bequal%5D", "3"), ("limit", "10")])?;
//! let page = qb.fetch_with_meta::<User>(&client).await?;
//! println!("{}", serde_json::to_string(&page.meta)?);
//! ```

pub mod builder;
pub mod client;
pub mod entity;
pub mod error;
pub mod filter;
pub mod header;
pub mod param;
pub mod prelude;
pub mod render;
pub mod row;
pub mod session;
pub mod statement;
pub mod types;

pub use builder::QueryBuilder;
pub use client::GenericClient;
pub use entity::{Entity, EntityMetadata, EnumDefinition, FieldDef};
pub use error::{OrmError, OrmResult};
pub use filter::{FilterOptions, UnknownOperator};
pub use header::{Envelope, FieldDescriptor, Header, Meta, SemanticType, build_header};
pub use param::{IntoParams, Param, ParamList};
pub use render::{RenderMode, RenderedQuery};
pub use row::{FromRow, RowExt};
pub use session::{DeferredRow, Session, TransactionIsolation, TransactionOptions};
pub use statement::{JoinKind, Operator, SortDirection, Statement};
pub use types::{Enum, Money};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{DatabaseConfig, Registry, create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use dbx_derive::{Entity, FromRow};

// Re-exported for derive-generated code.
pub use tokio_postgres;
