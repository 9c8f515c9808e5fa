//! Normalized filter tokens.

use serde::{Deserialize, Serialize};

use crate::operator::Operator;

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A URL query parameter.
    QueryParam,
    /// An entry of a structured filter request.
    RequestBody,
}

/// One filter expression, independent of its input syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterToken {
    /// Delimited path from the root entity, without the operator suffix.
    pub field_path: String,
    /// The input key exactly as received; errors are attributed to it.
    pub label: String,
    /// Operator to apply.
    pub operator: Operator,
    /// Raw values, in input order.
    pub raw_values: Vec<String>,
    /// Input syntax the token was parsed from.
    pub origin: Origin,
}

impl FilterToken {
    /// Create a token whose label is the field path.
    pub fn new(field_path: impl Into<String>, operator: Operator, raw_values: Vec<String>) -> Self {
        let field_path = field_path.into();
        Self {
            label: field_path.clone(),
            field_path,
            operator,
            raw_values,
            origin: Origin::RequestBody,
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_labels_by_path() {
        let token = FilterToken::new("age", Operator::Gt, vec!["18".into()]);
        assert_eq!(token.label, "age");
        assert_eq!(token.origin, Origin::RequestBody);

        let token = token.with_label("age__gt").with_origin(Origin::QueryParam);
        assert_eq!(token.field_path, "age");
        assert_eq!(token.label, "age__gt");
        assert_eq!(token.origin, Origin::QueryParam);
    }
}
