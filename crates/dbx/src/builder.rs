//! Fluent SELECT builder bound to an [`Entity`].
//!
//! ```ignore
//! use dbx::QueryBuilder;
//!
//! let users: Vec<User> = QueryBuilder::<User>::new()
//!     .select(["id", "name"])
//!     .left_join("teams", "teams.id = users.team_id AND teams.kind = ?", ("core",))
//!     .filter("status", "IN", ("active", "pending"))
//!     .order_by("name", "asc")
//!     .limit(20)
//!     .fetch_all(&client)
//!     .await?;
//! ```
//!
//! Builder methods never fail. A misuse (unknown operator, wrong value count,
//! bad sort direction, malformed entity metadata) is recorded and returned by
//! [`QueryBuilder::build`] and every execution method; the offending call does
//! not touch the statement.

use crate::client::GenericClient;
use crate::entity::{Entity, EntityMetadata};
use crate::error::{OrmError, OrmResult};
use crate::header::{Envelope, Header, Meta, build_header};
use crate::param::IntoParams;
use crate::render::{RenderMode, RenderedQuery};
use crate::row::{FromRow, RowExt};
use crate::statement::{Join, JoinKind, OrderClause, Operator, Predicate, SortDirection, Statement};
use std::fmt;
use std::marker::PhantomData;
use tokio_postgres::Row;

/// SELECT builder for entity `E`.
#[must_use]
pub struct QueryBuilder<E> {
    pub(crate) metadata: EntityMetadata,
    pub(crate) statement: Statement,
    /// Set when entity metadata could not be derived.
    metadata_error: Option<String>,
    /// First recorded misuse.
    pub(crate) build_error: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> QueryBuilder<E> {
    /// Create a builder, deriving metadata from `E`.
    ///
    /// The FROM table defaults to [`Entity::table`].
    pub fn new() -> Self {
        let (metadata, metadata_error) = match EntityMetadata::extract::<E>() {
            Ok(metadata) => (metadata, None),
            Err(OrmError::Config(msg)) => (EntityMetadata::empty(), Some(msg)),
            Err(err) => (EntityMetadata::empty(), Some(err.to_string())),
        };
        let statement = Statement {
            from: E::table().unwrap_or_default().to_string(),
            ..Statement::default()
        };
        Self {
            metadata,
            statement,
            build_error: metadata_error.clone(),
            metadata_error,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            statement: self.statement.clone(),
            metadata_error: self.metadata_error.clone(),
            build_error: self.build_error.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("statement", &self.statement)
            .field("build_error", &self.build_error)
            .finish()
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Keep the first error only.
    pub(crate) fn record_error(&mut self, err: OrmError) {
        if self.build_error.is_none() {
            self.build_error = Some(match err {
                OrmError::Config(msg) => msg,
                other => other.to_string(),
            });
        }
    }

    // ==================== Clauses ====================

    /// Set the FROM table.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.statement.from = name.into();
        self
    }

    /// Append selected columns, in order.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement
            .selected
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append a JOIN. `?` in `on` binds the next value of `args`.
    pub fn join(
        mut self,
        kind: JoinKind,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.statement.joins.push(Join {
            kind,
            table: table.into(),
            on: on.into(),
            args: args.into_params(),
        });
        self
    }

    pub fn inner_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::Inner, table, on, args)
    }

    pub fn left_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::Left, table, on, args)
    }

    pub fn right_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::Right, table, on, args)
    }

    pub fn full_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::Full, table, on, args)
    }

    /// Join a table to itself (use an alias in `table`, e.g. `"users parent"`).
    pub fn self_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::SelfJoin, table, on, args)
    }

    pub fn natural_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::Natural, table, on, args)
    }

    pub fn cross_join(
        self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: impl IntoParams,
    ) -> Self {
        self.join(JoinKind::Cross, table, on, args)
    }

    /// Add a WHERE condition, ANDed with the others.
    ///
    /// `operator` is one of `=, !=, <>, >, <, >=, <=, LIKE, NOT LIKE, IN, NOT IN,
    /// BETWEEN, NOT BETWEEN, IS NULL, IS NOT NULL` (any case).
    pub fn filter(mut self, column: impl Into<String>, operator: &str, values: impl IntoParams) -> Self {
        match Self::predicate(column, operator, values) {
            Ok(predicate) => self.statement.predicates.push(predicate),
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Like [`filter`](Self::filter), failing immediately on misuse.
    pub fn try_filter(
        mut self,
        column: impl Into<String>,
        operator: &str,
        values: impl IntoParams,
    ) -> OrmResult<Self> {
        let predicate = Self::predicate(column, operator, values)?;
        self.statement.predicates.push(predicate);
        Ok(self)
    }

    fn predicate(
        column: impl Into<String>,
        operator: &str,
        values: impl IntoParams,
    ) -> OrmResult<Predicate> {
        let operator = Operator::parse(operator)?;
        Predicate::new(column, operator, values.into_params())
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement
            .group_by
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append an ORDER BY clause; `direction` is `ASC` or `DESC` (any case).
    pub fn order_by(mut self, column: impl Into<String>, direction: &str) -> Self {
        match SortDirection::parse(direction) {
            Ok(direction) => self.statement.order_by.push(OrderClause {
                column: column.into(),
                direction,
            }),
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Like [`order_by`](Self::order_by), failing immediately on misuse.
    pub fn try_order_by(mut self, column: impl Into<String>, direction: &str) -> OrmResult<Self> {
        let direction = SortDirection::parse(direction)?;
        self.statement.order_by.push(OrderClause {
            column: column.into(),
            direction,
        });
        Ok(self)
    }

    /// Page size; `0` disables pagination.
    pub fn limit(mut self, limit: u64) -> Self {
        self.statement.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.statement.offset = offset;
        self
    }

    // ==================== Rendering ====================

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    /// Return the first recorded misuse, if any.
    pub fn validate(&self) -> OrmResult<()> {
        if let Some(ref err) = self.build_error {
            return Err(OrmError::Config(err.clone()));
        }
        Ok(())
    }

    /// Render the data query.
    pub fn build(&self) -> OrmResult<RenderedQuery> {
        self.validate()?;
        Ok(RenderedQuery::render(&self.statement, RenderMode::Data))
    }

    /// Render the `count(*)` query.
    pub fn build_count(&self) -> OrmResult<RenderedQuery> {
        self.validate()?;
        Ok(RenderedQuery::render(&self.statement, RenderMode::Count))
    }

    /// Field descriptors for the response envelope.
    pub fn header(&self) -> OrmResult<Header> {
        if let Some(ref err) = self.metadata_error {
            return Err(OrmError::Config(err.clone()));
        }
        Ok(build_header(&self.metadata))
    }

    // ==================== Execution ====================

    /// Execute the data query and return raw rows.
    pub async fn query_rows(&self, conn: &impl GenericClient) -> OrmResult<Vec<Row>> {
        let query = self.build()?;
        query.validate()?;
        conn.query(&query.numbered_sql(), &query.params_ref()).await
    }

    /// Execute the data query and map every row.
    pub async fn fetch_all<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<Vec<T>> {
        let rows = self.query_rows(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute the count query.
    pub async fn count(&self, conn: &impl GenericClient) -> OrmResult<i64> {
        let query = self.build_count()?;
        query.validate()?;
        let row = conn
            .query_one(&query.numbered_sql(), &query.params_ref())
            .await?;
        row.try_get_index(0)
    }

    /// Count, header and rows in one envelope.
    pub async fn fetch_with_meta<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Envelope<Vec<T>>> {
        let count = self.count(conn).await?;
        let header = self.header()?;
        let body = self.fetch_all(conn).await?;
        Ok(Envelope {
            meta: Meta { header, count },
            body,
        })
    }

    /// Raw rows together with the count and header.
    pub async fn query_rows_with_meta(&self, conn: &impl GenericClient) -> OrmResult<(Vec<Row>, Meta)> {
        let count = self.count(conn).await?;
        let header = self.header()?;
        let rows = self.query_rows(conn).await?;
        Ok((rows, Meta { header, count }))
    }
}
