//! Rendering a [`Statement`] into SQL text plus positional arguments.
//!
//! Text and placeholders are kept as separate parts, so the same rendering can
//! be emitted with `?` placeholders ([`RenderedQuery::sql`]) or PostgreSQL's
//! `$1, $2, ...` ([`RenderedQuery::numbered_sql`]).

use crate::error::{OrmError, OrmResult};
use crate::param::{Param, ParamList};
use crate::statement::{Operator, Statement};
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Selected columns plus pagination.
    Data,
    /// `SELECT count(*)` without pagination.
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SqlPart {
    Raw(String),
    Param,
}

/// Rendered statement text and its arguments in placeholder order.
#[derive(Debug, Clone)]
#[must_use]
pub struct RenderedQuery {
    parts: Vec<SqlPart>,
    params: ParamList,
}

impl RenderedQuery {
    /// Render `statement` in the given mode.
    pub fn render(statement: &Statement, mode: RenderMode) -> Self {
        let mut out = Self {
            parts: Vec::new(),
            params: ParamList::new(),
        };

        match mode {
            RenderMode::Data if statement.selected.is_empty() => out.push("SELECT"),
            RenderMode::Data => {
                out.push("SELECT ");
                out.push(&statement.selected.join(", "));
            }
            RenderMode::Count => out.push("SELECT count(*)"),
        }

        out.push(" FROM ");
        out.push(&statement.from);

        for join in &statement.joins {
            out.push(" ");
            out.push(join.kind.keyword());
            out.push(" JOIN ");
            out.push(&join.table);
            if !join.on.is_empty() {
                out.push(" ON ");
                out.push_condition(&join.on);
            }
            for arg in &join.args {
                out.params.push_param(arg.clone());
            }
        }

        for (i, predicate) in statement.predicates.iter().enumerate() {
            out.push(if i == 0 { " WHERE " } else { " AND " });
            out.push(predicate.column());
            out.push(" ");
            out.push(predicate.operator().as_str());
            let values = predicate.values();
            match predicate.operator() {
                Operator::IsNull | Operator::IsNotNull => {}
                Operator::In | Operator::NotIn => {
                    out.push(" (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            out.push(",");
                        }
                        out.push_bind(value);
                    }
                    out.push(")");
                }
                Operator::Between | Operator::NotBetween => {
                    out.push(" ");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            out.push(" AND ");
                        }
                        out.push_bind(value);
                    }
                }
                _ => {
                    out.push(" ");
                    for value in values {
                        out.push_bind(value);
                    }
                }
            }
        }

        if !statement.group_by.is_empty() {
            out.push(" GROUP BY ");
            out.push(&statement.group_by.join(", "));
        }

        if !statement.order_by.is_empty() {
            out.push(" ORDER BY ");
            let clauses: Vec<String> = statement
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.column, o.direction.as_str()))
                .collect();
            out.push(&clauses.join(", "));
        }

        if mode == RenderMode::Data && statement.limit != 0 {
            out.push(&format!(
                " LIMIT {} OFFSET {}",
                statement.limit, statement.offset
            ));
        }

        out
    }

    fn push(&mut self, sql: &str) {
        if sql.is_empty() {
            return;
        }
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
    }

    fn push_bind(&mut self, value: &Param) {
        self.parts.push(SqlPart::Param);
        self.params.push_param(value.clone());
    }

    /// Copy a raw join condition, turning each `?` into a placeholder part.
    /// Join arguments are bound separately and checked by [`validate`](Self::validate).
    fn push_condition(&mut self, condition: &str) {
        let mut pieces = condition.split('?');
        if let Some(first) = pieces.next() {
            self.push(first);
        }
        for piece in pieces {
            self.parts.push(SqlPart::Param);
            self.push(piece);
        }
    }

    /// SQL text with `?` placeholders.
    pub fn sql(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => out.push('?'),
            }
        }
        out
    }

    /// SQL text with `$1, $2, ...` placeholders, as sent to PostgreSQL.
    pub fn numbered_sql(&self) -> String {
        let mut out = String::new();
        let mut idx = 0;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    out.push('$');
                    out.push_str(&idx.to_string());
                }
            }
        }
        out
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }

    pub fn placeholder_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Param))
            .count()
    }

    /// Check that every placeholder has exactly one argument.
    pub fn validate(&self) -> OrmResult<()> {
        let placeholder_count = self.placeholder_count();
        if placeholder_count != self.params.len() {
            let params_len = self.params.len();
            return Err(OrmError::Validation(format!(
                "placeholders({placeholder_count}) != params({params_len})"
            )));
        }
        Ok(())
    }
}
