//! In-memory representation of a SELECT statement.

use crate::error::{OrmError, OrmResult};
use crate::param::Param;
use std::fmt;

/// JOIN flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    /// A table joined to itself; rendered as `INNER JOIN`.
    SelfJoin,
    Natural,
    Cross,
}

impl JoinKind {
    /// SQL keyword preceding `JOIN`.
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner | JoinKind::SelfJoin => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Natural => "NATURAL",
            JoinKind::Cross => "CROSS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    /// Raw ON condition; `?` marks a bound argument.
    pub on: String,
    pub args: Vec<Param>,
}

/// Whitelisted WHERE operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    /// `<>`
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

/// How many values an operator binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl Operator {
    /// Parse an operator, case-insensitively and ignoring surrounding whitespace.
    pub fn parse(op: &str) -> OrmResult<Self> {
        let normalized = op.trim().to_ascii_uppercase();
        let op = match normalized.as_str() {
            "=" => Operator::Eq,
            "!=" => Operator::NotEq,
            "<>" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Gte,
            "<=" => Operator::Lte,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            _ => return Err(OrmError::config(format!("incorrect operator {op:?}"))),
        };
        Ok(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Operator::In | Operator::NotIn => Arity::AtLeast(1),
            Operator::Between | Operator::NotBetween => Arity::Exactly(2),
            Operator::IsNull | Operator::IsNotNull => Arity::Exactly(0),
            _ => Arity::Exactly(1),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One WHERE condition.
///
/// Only constructible through [`Predicate::new`], which checks the value count.
#[derive(Debug, Clone)]
pub struct Predicate {
    column: String,
    operator: Operator,
    values: Vec<Param>,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, values: Vec<Param>) -> OrmResult<Self> {
        if !operator.arity().accepts(values.len()) {
            return Err(OrmError::config(format!(
                "value count ({}) is not compatible with operator {}",
                values.len(),
                operator
            )));
        }
        Ok(Self {
            column: column.into(),
            operator,
            values,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[Param] {
        &self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(direction: &str) -> OrmResult<Self> {
        match direction.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(OrmError::config(format!("incorrect sort {direction:?}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub direction: SortDirection,
}

/// Accumulated SELECT intent.
///
/// Lists only grow; `limit` and `offset` keep the last value set.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub(crate) selected: Vec<String>,
    pub(crate) from: String,
    pub(crate) joins: Vec<Join>,
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<OrderClause>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
}

impl Statement {
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn order_by(&self) -> &[OrderClause] {
        &self.order_by
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}
