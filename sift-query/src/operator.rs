//! The operator catalog.
//!
//! Every comparison or matching behavior a filter can request is one of the
//! eighteen [`Operator`] variants. Operators are addressed from the outside by
//! their string token (`eq`, `icontains`, `not_between`, ...), matched
//! case-insensitively.
//!
//! ```rust
//! use sift_query::operator::{Operator, OperatorSet};
//!
//! assert_eq!(Operator::lookup("ICONTAINS"), Some(Operator::IContains));
//! assert_eq!(Operator::lookup("like"), None);
//!
//! let set = OperatorSet::EQUALITY.with(Operator::Gt);
//! assert!(set.contains(Operator::Gt));
//! assert!(!set.contains(Operator::Contains));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A named comparison or matching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Operator {
    /// Equal to.
    Eq = 0,
    /// Not equal to.
    Neq,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal to.
    Gte,
    /// Less than or equal to.
    Lte,
    /// Value is null.
    IsNull,
    /// Value is not null.
    IsNotNull,
    /// Member of a value list.
    In,
    /// Not a member of a value list.
    NotIn,
    /// Inside an inclusive range.
    Between,
    /// Outside an inclusive range.
    NotBetween,
    /// Substring match.
    Contains,
    /// Case-insensitive substring match.
    IContains,
    /// Prefix match.
    StartsWith,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Suffix match.
    EndsWith,
    /// Case-insensitive suffix match.
    IEndsWith,
}

impl Operator {
    /// All operators, in declaration order.
    pub const ALL: [Operator; 18] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::IsNull,
        Self::IsNotNull,
        Self::In,
        Self::NotIn,
        Self::Between,
        Self::NotBetween,
        Self::Contains,
        Self::IContains,
        Self::StartsWith,
        Self::IStartsWith,
        Self::EndsWith,
        Self::IEndsWith,
    ];

    /// The canonical (lowercase) token of this operator.
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "starts_with",
            Self::IStartsWith => "istarts_with",
            Self::EndsWith => "ends_with",
            Self::IEndsWith => "iends_with",
        }
    }

    /// Look up an operator by token, ignoring ASCII case.
    pub fn lookup(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.token().eq_ignore_ascii_case(token))
    }

    /// Whether this operator tests for null rather than comparing values.
    pub const fn is_null_check(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Whether this operator orders values (and so needs a comparable form
    /// for temporal columns).
    pub const fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Gt | Self::Lt | Self::Gte | Self::Lte | Self::Between | Self::NotBetween
        )
    }

    const fn bit(&self) -> u32 {
        1 << (*self as u8)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::lookup(&token)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown operator `{}`", token)))
    }
}

/// A set of operators, stored as a bitset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperatorSet(u32);

impl OperatorSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every operator.
    pub const ALL: Self = Self((1 << Operator::ALL.len()) - 1);

    /// `IS_NULL` and `IS_NOT_NULL`.
    pub const NULL_CHECKS: Self = Self::of(&[Operator::IsNull, Operator::IsNotNull]);

    /// Equality, membership and null checks.
    pub const EQUALITY: Self = Self::of(&[
        Operator::Eq,
        Operator::Neq,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ]);

    /// Equality plus ordering and ranges.
    pub const COMPARABLE: Self = Self::EQUALITY.union(Self::of(&[
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::Between,
        Operator::NotBetween,
    ]));

    /// The pattern-matching operators.
    pub const PATTERN: Self = Self::of(&[
        Operator::Contains,
        Operator::IContains,
        Operator::StartsWith,
        Operator::IStartsWith,
        Operator::EndsWith,
        Operator::IEndsWith,
    ]);

    /// Everything that applies to text.
    pub const TEXT: Self = Self::COMPARABLE.union(Self::PATTERN);

    /// Build a set from a slice of operators.
    pub const fn of(ops: &[Operator]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < ops.len() {
            bits |= ops[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Union of two sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// This set plus one operator.
    pub const fn with(self, op: Operator) -> Self {
        Self(self.0 | op.bit())
    }

    /// This set minus one operator.
    pub const fn without(self, op: Operator) -> Self {
        Self(self.0 & !op.bit())
    }

    /// Check membership.
    pub const fn contains(&self, op: Operator) -> bool {
        self.0 & op.bit() != 0
    }

    /// Add an operator in place.
    pub fn insert(&mut self, op: Operator) {
        self.0 |= op.bit();
    }

    /// Whether the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of operators in the set.
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Operator> + '_ {
        Operator::ALL.into_iter().filter(|op| self.contains(*op))
    }
}

impl fmt::Debug for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Operator> for OperatorSet {
    fn from_iter<I: IntoIterator<Item = Operator>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for op in iter {
            set.insert(op);
        }
        set
    }
}

impl<const N: usize> From<[Operator; N]> for OperatorSet {
    fn from(ops: [Operator; N]) -> Self {
        Self::of(&ops)
    }
}

impl From<Operator> for OperatorSet {
    fn from(op: Operator) -> Self {
        Self::EMPTY.with(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Operator::lookup("eq"), Some(Operator::Eq));
        assert_eq!(Operator::lookup("EQ"), Some(Operator::Eq));
        assert_eq!(Operator::lookup("Not_Between"), Some(Operator::NotBetween));
        assert_eq!(Operator::lookup("IS_NOT_NULL"), Some(Operator::IsNotNull));
    }

    #[test]
    fn test_lookup_unknown_token() {
        assert_eq!(Operator::lookup("like"), None);
        assert_eq!(Operator::lookup(""), None);
        assert_eq!(Operator::lookup("eq "), None);
    }

    #[test]
    fn test_every_token_round_trips() {
        for op in Operator::ALL {
            assert_eq!(Operator::lookup(op.token()), Some(op));
        }
    }

    #[test]
    fn test_operator_classes() {
        assert!(Operator::IsNull.is_null_check());
        assert!(Operator::Between.is_ordering());
        assert!(!Operator::Eq.is_ordering());
    }

    #[test]
    fn test_operator_set_membership() {
        let set = OperatorSet::from([Operator::Eq, Operator::IContains]);
        assert!(set.contains(Operator::Eq));
        assert!(set.contains(Operator::IContains));
        assert!(!set.contains(Operator::Gt));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Operator::Eq, Operator::IContains]);
    }

    #[test]
    fn test_predefined_sets() {
        assert_eq!(OperatorSet::ALL.len(), 18);
        assert!(OperatorSet::TEXT.contains(Operator::StartsWith));
        assert!(!OperatorSet::COMPARABLE.contains(Operator::Contains));
        assert!(OperatorSet::COMPARABLE.contains(Operator::NotBetween));
        assert!(OperatorSet::EQUALITY.without(Operator::In).len() == 5);
    }

    #[test]
    fn test_operator_serde() {
        let json = serde_json::to_string(&Operator::StartsWith).unwrap();
        assert_eq!(json, "\"starts_with\"");
        let op: Operator = serde_json::from_str("\"NEQ\"").unwrap();
        assert_eq!(op, Operator::Neq);
        assert!(serde_json::from_str::<Operator>("\"nope\"").is_err());
    }
}
