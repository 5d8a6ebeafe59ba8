//! Query-string filters: `field%5Bop%5D=value`.
//!
//! ```text
//! name%5Bequal%5D=john          name = 'john'
//! name%5Blike%5D=jo             name LIKE '%jo%'
//! id%5Bin%5D=%5B1,2,3%5D        id IN (1, 2, 3)
//! limit=10&offset=20            LIMIT 10 OFFSET 20
//! ```
//!
//! Field names go through the entity's alias map, then its field → column map.
//! Values for `equal`/`not-equal`/`in`/`not-in` are parsed according to the
//! field's declared Rust type, so PostgreSQL receives typed parameters.

use crate::builder::QueryBuilder;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::header::base_type;
use crate::param::Param;
use crate::statement::{Operator, Predicate};
use crate::types::{Enum, Money};
use regex::Regex;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;
use tokio_postgres::types::ToSql;

/// What to do with an operator the filter language does not define.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownOperator {
    /// Fail the whole decode.
    #[default]
    Reject,
    /// Skip the key (logged at debug level).
    Ignore,
}

/// Options for [`QueryBuilder::apply_filters_with`].
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub unknown_operator: UnknownOperator,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown_operator(mut self, policy: UnknownOperator) -> Self {
        self.unknown_operator = policy;
        self
    }
}

enum Decoded {
    Limit(u64),
    Offset(u64),
    Predicate(Predicate),
}

fn key_regex() -> &'static Regex {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    KEY_RE.get_or_init(|| {
        Regex::new(r"^([^\[\]%]+)(?:%5[Bb]|\[)([^\[\]]*?)(?:%5[Dd]|\])$")
            .expect("invalid built-in filter key regex")
    })
}

impl<E: Entity> QueryBuilder<E> {
    /// Decode query-string pairs into predicates and pagination.
    ///
    /// All pairs are decoded before anything is applied: on error the
    /// statement is left untouched. Pairs are applied in key order.
    pub fn apply_filters<I, K, V>(&mut self, pairs: I) -> OrmResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.apply_filters_with(pairs, &FilterOptions::default())
    }

    pub fn apply_filters_with<I, K, V>(&mut self, pairs: I, options: &FilterOptions) -> OrmResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(K, V)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

        let mut decoded = Vec::with_capacity(pairs.len());
        for (key, value) in &pairs {
            if let Some(entry) = self.decode_pair(key.as_ref(), value.as_ref(), options)? {
                decoded.push(entry);
            }
        }

        for entry in decoded {
            match entry {
                Decoded::Limit(n) => self.statement.limit = n,
                Decoded::Offset(n) => self.statement.offset = n,
                Decoded::Predicate(p) => self.statement.predicates.push(p),
            }
        }
        Ok(())
    }

    fn decode_pair(
        &self,
        key: &str,
        value: &str,
        options: &FilterOptions,
    ) -> OrmResult<Option<Decoded>> {
        match key {
            "limit" => return parse_page(key, value).map(|n| Some(Decoded::Limit(n))),
            "offset" => return parse_page(key, value).map(|n| Some(Decoded::Offset(n))),
            _ => {}
        }

        let caps = key_regex()
            .captures(key)
            .ok_or_else(|| OrmError::filter(format!("cannot parse query name {key:?}")))?;
        let field = &caps[1];
        let op = caps[2].to_ascii_lowercase();

        let operator = match op.as_str() {
            "equal" => Operator::Eq,
            "not-equal" => Operator::NotEq,
            "like" => Operator::Like,
            "not-like" => Operator::NotLike,
            "in" => Operator::In,
            "not-in" => Operator::NotIn,
            _ => match options.unknown_operator {
                UnknownOperator::Reject => {
                    return Err(OrmError::filter(format!(
                        "unknown filter operator {op:?} in {key:?}"
                    )));
                }
                UnknownOperator::Ignore => {
                    tracing::debug!(key, op = %op, "ignoring unknown filter operator");
                    return Ok(None);
                }
            },
        };

        let name = self.metadata.canonical_name(field);
        let def = self
            .metadata
            .field(name)
            .ok_or_else(|| OrmError::filter(format!("unknown filter field {field:?}")))?;
        let column = self
            .metadata
            .column_for(name)
            .ok_or_else(|| OrmError::filter(format!("field {field:?} has no column")))?;

        let value = value.replace("%20", " ");
        let values = match operator {
            Operator::Like | Operator::NotLike => vec![Param::new(format!("%{value}%"))],
            Operator::In | Operator::NotIn => split_list(&value)
                .map(|item| typed_value(field, def.type_name, item))
                .collect::<OrmResult<Vec<_>>>()?,
            _ => vec![typed_value(field, def.type_name, &value)?],
        };

        Predicate::new(column, operator, values).map(|p| Some(Decoded::Predicate(p)))
    }
}

fn parse_page(key: &str, value: &str) -> OrmResult<u64> {
    value
        .parse::<u64>()
        .map_err(|e| OrmError::filter(format!("invalid {key} {value:?}: {e}")))
}

/// `%5B1,2%5D` or `[1,2]` → `1`, `2`.
///
/// One leading and one trailing bracket are removed; bare lists are accepted.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    let value = value
        .strip_prefix("%5B")
        .or_else(|| value.strip_prefix('['))
        .unwrap_or(value);
    let value = value
        .strip_suffix("%5D")
        .or_else(|| value.strip_suffix(']'))
        .unwrap_or(value);
    value.split(',')
}

fn parsed<T>(field: &str, raw: &str) -> OrmResult<Param>
where
    T: FromStr + ToSql + Send + Sync + 'static,
    T::Err: Display,
{
    raw.parse::<T>()
        .map(Param::new)
        .map_err(|e| OrmError::filter(format!("invalid value {raw:?} for {field:?}: {e}")))
}

/// Bind `raw` as the field's declared type; unknown types bind as text.
fn typed_value(field: &str, type_name: &str, raw: &str) -> OrmResult<Param> {
    let base = base_type(type_name);
    match base.split('<').next().unwrap_or_default() {
        "i8" => parsed::<i8>(field, raw),
        "i16" => parsed::<i16>(field, raw),
        "i32" => parsed::<i32>(field, raw),
        "i64" => parsed::<i64>(field, raw),
        "f32" => parsed::<f32>(field, raw),
        "f64" => parsed::<f64>(field, raw),
        "bool" => parsed::<bool>(field, raw),
        "Money" => parsed::<Money>(field, raw),
        "Uuid" => parsed::<uuid::Uuid>(field, raw),
        "NaiveDate" => parsed::<chrono::NaiveDate>(field, raw),
        "NaiveDateTime" => parsed::<chrono::NaiveDateTime>(field, raw),
        "DateTime" => parsed::<chrono::DateTime<chrono::Utc>>(field, raw),
        "Enum" => Ok(Param::new(Enum::from(raw))),
        _ => Ok(Param::new(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EnumDefinition, FieldDef};
    use std::collections::{BTreeMap, HashMap};

    struct Account;

    impl Entity for Account {
        fn fields() -> &'static [FieldDef] {
            static FIELDS: &[FieldDef] = &[
                FieldDef::new("id", "id", "i64"),
                FieldDef::new("name", "name", "String"),
                FieldDef::new("userId", "user_id", "Option<i32>"),
                FieldDef::new("status", "status", "Enum"),
                FieldDef::new("balance", "balance", "Money"),
                FieldDef::new("openedOn", "opened_on", "chrono::NaiveDate"),
                FieldDef::virtual_field("label", "String"),
            ];
            FIELDS
        }

        fn table() -> Option<&'static str> {
            Some("accounts")
        }

        fn references() -> HashMap<String, String> {
            HashMap::from([("user".to_string(), "userId".to_string())])
        }

        fn enums() -> Vec<EnumDefinition> {
            vec![EnumDefinition::new("status", "statuses").value("a", "Active")]
        }
    }

    fn query(pairs: &[(&str, &str)]) -> OrmResult<QueryBuilder<Account>> {
        let mut qb = QueryBuilder::<Account>::new();
        qb.apply_filters(pairs.iter().copied())?;
        Ok(qb)
    }

    fn sql_and_args(qb: &QueryBuilder<Account>) -> (String, Vec<String>) {
        let q = qb.build_count().unwrap();
        let args = q.params().iter().map(|p| format!("{p:?}")).collect();
        (q.sql(), args)
    }

    #[test]
    fn equal_filter_on_plain_field() {
        let qb = query(&[("name%5Bequal%5D", "john")]).unwrap();
        let (sql, args) = sql_and_args(&qb);
        assert_eq!(sql, "SELECT count(*) FROM accounts WHERE name = ?");
        assert_eq!(args, vec!["\"john\""]);
    }

    #[test]
    fn pagination_only() {
        let qb = query(&[("limit", "10"), ("offset", "5")]).unwrap();
        assert_eq!(qb.statement().limit(), 10);
        assert_eq!(qb.statement().offset(), 5);
        assert!(qb.statement().predicates().is_empty());
    }

    #[test]
    fn malformed_key_leaves_statement_unchanged() {
        let mut qb = QueryBuilder::<Account>::new();
        let err = qb
            .apply_filters([("limit", "3"), ("bogus", "1")])
            .unwrap_err();
        assert!(err.is_filter());
        assert!(err.to_string().contains("cannot parse query name"));
        assert_eq!(qb.statement().limit(), 0);
        assert!(qb.statement().predicates().is_empty());
    }

    #[test]
    fn alias_resolves_to_column_with_typed_values() {
        let qb = query(&[("user%5Bin%5D", "%5B1,2,3%5D")]).unwrap();
        let (sql, args) = sql_and_args(&qb);
        assert_eq!(sql, "SELECT count(*) FROM accounts WHERE user_id IN (?,?,?)");
        assert_eq!(args, vec!["1", "2", "3"]);
    }

    #[test]
    fn like_wraps_value_and_decodes_spaces() {
        let qb = query(&[("name%5bnot-LIKE%5d", "jo%20hn")]).unwrap();
        let (sql, args) = sql_and_args(&qb);
        assert_eq!(sql, "SELECT count(*) FROM accounts WHERE name NOT LIKE ?");
        assert_eq!(args, vec!["\"%jo hn%\""]);
    }

    #[test]
    fn literal_brackets_are_accepted() {
        let qb = query(&[("id[not-in]", "[4,5]"), ("status[not-equal]", "a")]).unwrap();
        let (sql, args) = sql_and_args(&qb);
        assert_eq!(
            sql,
            "SELECT count(*) FROM accounts WHERE id NOT IN (?,?) AND status != ?"
        );
        assert_eq!(args, vec!["4", "5", "Enum(\"a\")"]);
    }

    #[test]
    fn typed_parse_failure_is_a_filter_error() {
        let err = query(&[("id%5Bequal%5D", "abc")]).err().unwrap();
        assert!(err.is_filter());
        assert!(query(&[("openedOn%5Bequal%5D", "2024-02-30")]).is_err());
        assert!(query(&[("openedOn%5Bequal%5D", "2024-02-29")]).is_ok());
        assert!(query(&[("balance%5Bequal%5D", "12.50")]).is_ok());
    }

    #[test]
    fn unknown_and_virtual_fields_are_rejected() {
        assert!(query(&[("ghost%5Bequal%5D", "1")]).err().unwrap().is_filter());
        assert!(query(&[("label%5Bequal%5D", "x")]).err().unwrap().is_filter());
    }

    #[test]
    fn unknown_operator_policy() {
        assert!(query(&[("name%5Bgt%5D", "1")]).err().unwrap().is_filter());

        let mut qb = QueryBuilder::<Account>::new();
        let options = FilterOptions::new().unknown_operator(UnknownOperator::Ignore);
        qb.apply_filters_with([("name%5Bgt%5D", "1"), ("id%5Bequal%5D", "7")], &options)
            .unwrap();
        let (sql, args) = sql_and_args(&qb);
        assert_eq!(sql, "SELECT count(*) FROM accounts WHERE id = ?");
        assert_eq!(args, vec!["7"]);
    }

    #[test]
    fn any_bracketed_operator_follows_the_policy() {
        let keys = ["name%5B%5D", "name%5Bgte2%5D", "name%5Bnot_equal%5D", "name[]"];
        for key in keys {
            let err = query(&[(key, "1")]).err().unwrap();
            assert!(err.to_string().contains("unknown filter operator"), "{key}");
        }

        let mut qb = QueryBuilder::<Account>::new();
        let options = FilterOptions::new().unknown_operator(UnknownOperator::Ignore);
        let mut pairs: Vec<(&str, &str)> = keys.iter().map(|k| (*k, "1")).collect();
        pairs.push(("name%5Bequal%5D", "ann"));
        qb.apply_filters_with(pairs, &options).unwrap();
        let (sql, args) = sql_and_args(&qb);
        assert_eq!(sql, "SELECT count(*) FROM accounts WHERE name = ?");
        assert_eq!(args, vec!["\"ann\""]);
    }

    #[test]
    fn missing_brackets_still_fail_to_parse() {
        let mut qb = QueryBuilder::<Account>::new();
        let options = FilterOptions::new().unknown_operator(UnknownOperator::Ignore);
        for key in ["name", "%5Bequal%5D", "name%5Bequal"] {
            let err = qb.apply_filters_with([(key, "1")], &options).unwrap_err();
            assert!(err.to_string().contains("cannot parse query name"), "{key}");
        }
    }

    #[test]
    fn negative_pagination_is_rejected() {
        assert!(query(&[("limit", "-1")]).err().unwrap().is_filter());
        assert!(query(&[("offset", "ten")]).is_err());
    }

    #[test]
    fn decoded_order_is_stable() {
        let pairs: BTreeMap<&str, &str> =
            [("name%5Bequal%5D", "a"), ("id%5Bequal%5D", "1")].into_iter().collect();
        let mut a = QueryBuilder::<Account>::new();
        a.apply_filters(pairs.clone()).unwrap();
        let mut b = QueryBuilder::<Account>::new();
        b.apply_filters(pairs.into_iter().rev()).unwrap();
        assert_eq!(sql_and_args(&a), sql_and_args(&b));
    }

    #[test]
    fn split_list_strips_one_bracket_pair() {
        assert_eq!(split_list("%5Ba,b%5D").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(split_list("[[a]]").collect::<Vec<_>>(), vec!["[a]"]);
        assert_eq!(split_list("a").collect::<Vec<_>>(), vec!["a"]);
    }
}
