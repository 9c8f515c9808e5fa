//! Parsing raw filter input into [`FilterToken`]s.
//!
//! Two syntaxes produce the same tokens:
//!
//! - Query parameters: `<path>[<delimiter><operator>]=<v1>[,<v2>...]`. The
//!   last delimiter-separated segment of the key is the operator when it names
//!   one; otherwise the whole key is the path and the default operator applies.
//! - Structured requests: a list of [`FilterRequest`] entries with an explicit
//!   field, optional operator and a value string.
//!
//! ```rust
//! use sift_query::config::FilterConfig;
//! use sift_query::operator::Operator;
//! use sift_query::parser::FilterParser;
//!
//! let config = FilterConfig::default();
//! let parser = FilterParser::new(&config);
//!
//! let tokens = parser.parse_query_params([
//!     ("owner__name__icontains", "acme"),
//!     ("age__between", "18,30"),
//!     ("page", "2"),
//! ]);
//!
//! assert_eq!(tokens[0].field_path, "owner__name");
//! assert_eq!(tokens[0].operator, Operator::IContains);
//! assert_eq!(tokens[1].raw_values, vec!["18", "30"]);
//! assert_eq!(tokens[2].operator, Operator::Eq);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::FilterConfig;
use crate::operator::Operator;
use crate::token::{FilterToken, Origin};
use crate::types::{OrderBy, OrderByField, SortOrder};

/// One entry of a structured filter request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Field path.
    pub field: String,
    /// Operator token; the default operator applies when absent or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Value, list-separated for multi-valued operators.
    pub value: String,
}

impl FilterRequest {
    /// Create a request entry.
    pub fn new(field: impl Into<String>, operator: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.map(str::to_string),
            value: value.into(),
        }
    }
}

/// Turns raw input into filter tokens and sort specifications.
#[derive(Debug, Clone, Copy)]
pub struct FilterParser<'a> {
    config: &'a FilterConfig,
}

impl<'a> FilterParser<'a> {
    /// Create a parser using `config`'s delimiter and separators.
    pub fn new(config: &'a FilterConfig) -> Self {
        Self { config }
    }

    /// Parse query parameters.
    ///
    /// Only the first value of a repeated key is used. The sort parameter is
    /// not a filter and is skipped.
    pub fn parse_query_params<I, K, V>(&self, params: I) -> Vec<FilterToken>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut first: IndexMap<String, String> = IndexMap::new();
        for (key, value) in params {
            let key = key.as_ref();
            if key == self.config.sort_param {
                continue;
            }
            first
                .entry(key.to_string())
                .or_insert_with(|| value.as_ref().to_string());
        }

        first
            .into_iter()
            .map(|(key, value)| {
                let (path, operator) = self.split_operator(&key);
                FilterToken {
                    field_path: path.to_string(),
                    operator,
                    raw_values: self.split_values(&value),
                    origin: Origin::QueryParam,
                    label: key,
                }
            })
            .collect()
    }

    /// Parse structured request entries. Entries with a blank field are
    /// dropped.
    pub fn parse_request<I>(&self, entries: I) -> Vec<FilterToken>
    where
        I: IntoIterator<Item = FilterRequest>,
    {
        entries
            .into_iter()
            .filter_map(|entry| {
                if entry.field.trim().is_empty() {
                    trace!(value = %entry.value, "Dropping filter request with blank field");
                    return None;
                }
                let operator = entry
                    .operator
                    .as_deref()
                    .and_then(Operator::lookup)
                    .unwrap_or(self.config.default_operator);
                Some(FilterToken {
                    label: entry.field.clone(),
                    field_path: entry.field,
                    operator,
                    raw_values: self.split_values(&entry.value),
                    origin: Origin::RequestBody,
                })
            })
            .collect()
    }

    /// Parse a sort specification such as `name,-owner__created_at`.
    ///
    /// A leading `-` sorts descending, a leading `+` or no sign ascending.
    /// Blank entries are skipped.
    pub fn parse_sort(&self, raw: &str) -> OrderBy {
        raw.split(self.config.list_separator)
            .map(str::trim)
            .filter_map(|entry| {
                let (path, order) = match entry.strip_prefix('-') {
                    Some(rest) => (rest, SortOrder::Desc),
                    None => (entry.strip_prefix('+').unwrap_or(entry), SortOrder::Asc),
                };
                let path = path.trim();
                (!path.is_empty()).then(|| OrderByField::new(path.to_string(), order))
            })
            .collect()
    }

    /// Find the sort parameter among query parameters and parse it.
    pub fn sort_from_query_params<I, K, V>(&self, params: I) -> OrderBy
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        params
            .into_iter()
            .find(|(key, _)| key.as_ref() == self.config.sort_param)
            .map(|(_, value)| self.parse_sort(value.as_ref()))
            .unwrap_or_default()
    }

    /// Split a query key into field path and operator.
    pub fn split_operator<'k>(&self, key: &'k str) -> (&'k str, Operator) {
        if let Some((path, suffix)) = key.rsplit_once(self.config.delimiter.as_str()) {
            if !path.is_empty() {
                if let Some(op) = Operator::lookup(suffix) {
                    return (path, op);
                }
            }
        }
        (key, self.config.default_operator)
    }

    /// Split a value string on the list separator. Trailing empty segments
    /// are dropped, so an empty string yields no values and `1,2,` yields two.
    pub fn split_values(&self, value: &str) -> Vec<String> {
        let mut values: Vec<String> = value
            .split(self.config.list_separator)
            .map(str::to_string)
            .collect();
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser_with<R>(config: FilterConfig, f: impl FnOnce(FilterParser<'_>) -> R) -> R {
        f(FilterParser::new(&config))
    }

    #[test]
    fn test_operator_suffix() {
        let config = FilterConfig::default();
        let parser = FilterParser::new(&config);
        assert_eq!(parser.split_operator("age__gt"), ("age", Operator::Gt));
        assert_eq!(
            parser.split_operator("user__manager__name__ICONTAINS"),
            ("user__manager__name", Operator::IContains)
        );
        assert_eq!(parser.split_operator("owner__name"), ("owner__name", Operator::Eq));
        assert_eq!(parser.split_operator("name"), ("name", Operator::Eq));
        assert_eq!(parser.split_operator("__gt"), ("__gt", Operator::Eq));
    }

    #[test]
    fn test_query_params_keep_label_and_first_value() {
        let config = FilterConfig::default();
        let parser = FilterParser::new(&config);
        let tokens = parser.parse_query_params(vec![
            ("age__in", "1,2,3"),
            ("age__in", "9"),
            ("sort", "-age"),
        ]);
        assert_eq!(tokens.len(), 1);
        let token = &tokens[0];
        assert_eq!(token.label, "age__in");
        assert_eq!(token.field_path, "age");
        assert_eq!(token.operator, Operator::In);
        assert_eq!(token.raw_values, vec!["1", "2", "3"]);
        assert_eq!(token.origin, Origin::QueryParam);
    }

    #[test]
    fn test_empty_value_has_no_raw_values() {
        let config = FilterConfig::default();
        let parser = FilterParser::new(&config);
        let tokens = parser.parse_query_params([("deleted_at__is_null", "")]);
        assert!(tokens[0].raw_values.is_empty());
        assert_eq!(parser.split_values("a,,b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_trailing_separators_dropped() {
        let config = FilterConfig::default();
        let parser = FilterParser::new(&config);
        assert_eq!(parser.split_values("1,2,"), vec!["1", "2"]);
        assert_eq!(parser.split_values("1,2,,"), vec!["1", "2"]);
        assert_eq!(parser.split_values(",1"), vec!["", "1"]);
        assert!(parser.split_values(",,").is_empty());
    }

    #[test]
    fn test_request_entries() {
        let config = FilterConfig::default();
        let parser = FilterParser::new(&config);
        let tokens = parser.parse_request(vec![
            FilterRequest::new("name", Some("icontains"), "acme"),
            FilterRequest::new("age", None, "18"),
            FilterRequest::new("age", Some("bogus"), "18"),
            FilterRequest::new("  ", Some("eq"), "x"),
        ]);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].operator, Operator::IContains);
        assert_eq!(tokens[1].operator, Operator::Eq);
        assert_eq!(tokens[2].operator, Operator::Eq);
        assert!(tokens.iter().all(|t| t.origin == Origin::RequestBody));
        assert_eq!(tokens[0].label, "name");
    }

    #[test]
    fn test_request_deserializes_without_operator() {
        let entries: Vec<FilterRequest> =
            serde_json::from_str(r#"[{"field": "age", "value": "18,30", "operator": "between"}, {"field": "name", "value": "x"}]"#)
                .unwrap();
        assert_eq!(entries[1].operator, None);
        let config = FilterConfig::default();
        let tokens = FilterParser::new(&config).parse_request(entries);
        assert_eq!(tokens[0].raw_values, vec!["18", "30"]);
    }

    #[test]
    fn test_custom_syntax() {
        let config = FilterConfig::default().delimiter(".").list_separator('|');
        parser_with(config, |parser| {
            let tokens = parser.parse_query_params([("owner.name.starts_with", "a|b")]);
            assert_eq!(tokens[0].field_path, "owner.name");
            assert_eq!(tokens[0].operator, Operator::StartsWith);
            assert_eq!(tokens[0].raw_values, vec!["a", "b"]);
        });
    }

    #[test]
    fn test_sort() {
        let config = FilterConfig::default();
        let parser = FilterParser::new(&config);
        let order = parser.parse_sort("name, -owner__created_at,,+age");
        assert_eq!(
            order.fields(),
            &[
                OrderByField::asc("name"),
                OrderByField::desc("owner__created_at"),
                OrderByField::asc("age"),
            ]
        );
        assert!(parser.parse_sort("").is_empty());
        assert!(parser.parse_sort(" , - ").is_empty());

        let order = parser.sort_from_query_params([("page", "1"), ("sort", "-id")]);
        assert_eq!(order.fields(), &[OrderByField::desc("id")]);
        assert!(parser.sort_from_query_params([("page", "1")]).is_empty());
    }
}
