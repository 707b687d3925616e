//! Typed filter predicates.
//!
//! A [`Predicate`] is a small tree over four variants: field equality, set
//! membership, conjunction, and negation. Field names are plain strings at
//! construction time so predicates can come from CLI flags or config files;
//! they are bound to concrete row fields or metadata attributes only when a
//! table evaluates them (see [`Predicate::resolve`]).
//!
//! Resolution rules:
//! - `model`, `scenario`, `region`, `variable`, `unit` compare against the
//!   row's own string fields;
//! - `year` compares against the row's year and requires integer values;
//! - any other name must be an attribute declared by the table's
//!   [`RunMetadata`] and is looked up through the row's `(model, scenario)`.
//!   Rows whose run has no value for the attribute never match (closed
//!   world), so under [`Predicate::Not`] they always match.
//!
//! Excluding rows is expressed with [`Predicate::negate`] rather than a
//! separate flag: `filter(&p.negate())` and `filter(&p)` always partition a
//! table.

use std::{collections::BTreeSet, fmt, str::FromStr};

use snafu::prelude::*;

use crate::{
    metadata::{CATEGORY, RunMetadata},
    observation::Observation,
    scenario_table::error::{
        InvalidPredicateValueSnafu, MalformedPredicateSnafu, TableError, UnknownFieldSnafu,
    },
};

/// Name of the year field.
pub const YEAR: &str = "year";

/// A literal compared against a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicateValue {
    /// Integer literal (years, numeric codes).
    Int(i64),
    /// Text literal.
    Text(String),
}

impl PredicateValue {
    fn as_year(&self, field: &str) -> Result<i32, TableError> {
        match self {
            PredicateValue::Int(v) => i32::try_from(*v).ok().context(InvalidPredicateValueSnafu {
                field,
                value: v.to_string(),
                reason: "year out of range",
            }),
            PredicateValue::Text(s) => {
                s.trim()
                    .parse::<i32>()
                    .map_err(|e| TableError::InvalidPredicateValue {
                        field: field.to_string(),
                        value: s.clone(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

impl fmt::Display for PredicateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateValue::Int(v) => write!(f, "{v}"),
            PredicateValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PredicateValue {
    fn from(value: &str) -> Self {
        PredicateValue::Text(value.to_string())
    }
}

impl From<String> for PredicateValue {
    fn from(value: String) -> Self {
        PredicateValue::Text(value)
    }
}

impl From<&String> for PredicateValue {
    fn from(value: &String) -> Self {
        PredicateValue::Text(value.clone())
    }
}

impl From<i32> for PredicateValue {
    fn from(value: i32) -> Self {
        PredicateValue::Int(value.into())
    }
}

impl From<i64> for PredicateValue {
    fn from(value: i64) -> Self {
        PredicateValue::Int(value)
    }
}

/// Filter predicate tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `field == value`.
    Eq {
        /// Field name.
        field: String,
        /// Expected value.
        value: PredicateValue,
    },
    /// `field ∈ values`. An empty set matches nothing.
    In {
        /// Field name.
        field: String,
        /// Accepted values.
        values: Vec<PredicateValue>,
    },
    /// Every child matches. An empty conjunction matches everything.
    And(Vec<Predicate>),
    /// The child does not match.
    Not(Box<Predicate>),
}

impl Predicate {
    /// `field == value`.
    pub fn equals(field: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field ∈ values`.
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PredicateValue>,
    {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `category == label`.
    pub fn category(label: impl Into<PredicateValue>) -> Self {
        Predicate::equals(CATEGORY, label)
    }

    /// `year ∈ years`.
    pub fn years<I: IntoIterator<Item = i32>>(years: I) -> Self {
        Predicate::is_in(YEAR, years)
    }

    /// Conjunction of all given predicates.
    pub fn all<I: IntoIterator<Item = Predicate>>(predicates: I) -> Self {
        predicates
            .into_iter()
            .fold(Predicate::And(Vec::new()), Predicate::and)
    }

    /// `self AND other`, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        let mut children = match self {
            Predicate::And(children) => children,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => children.extend(more),
            single => children.push(single),
        }
        Predicate::And(children)
    }

    /// Logical negation. Double negation collapses.
    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Bind field names against row fields and the declared attributes in
    /// `metadata`.
    ///
    /// Fails with [`TableError::UnknownField`] for names that are neither
    /// row fields nor declared attributes (`category` always resolves), and with
    /// [`TableError::InvalidPredicateValue`] for non-integer years.
    pub fn resolve(&self, metadata: &RunMetadata) -> Result<ResolvedPredicate, TableError> {
        match self {
            Predicate::Eq { field, value } => {
                resolve_set(field, std::slice::from_ref(value), metadata)
            }
            Predicate::In { field, values } => resolve_set(field, values, metadata),
            Predicate::And(children) => Ok(ResolvedPredicate::And(
                children
                    .iter()
                    .map(|p| p.resolve(metadata))
                    .collect::<Result<_, _>>()?,
            )),
            Predicate::Not(inner) => Ok(ResolvedPredicate::Not(Box::new(
                inner.resolve(metadata)?,
            ))),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq { field, value } => write!(f, "{field}={value}"),
            Predicate::In { field, values } => {
                write!(f, "{field} in [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Predicate::And(children) if children.is_empty() => f.write_str("true"),
            Predicate::And(children) => {
                f.write_str("(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str(")")
            }
            Predicate::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}

/// Parses `field=value`, `field=v1,v2,...`, and `field!=value` forms.
///
/// Values are kept as text; `year` values are checked when the predicate is
/// resolved against a table.
impl FromStr for Predicate {
    type Err = TableError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (lhs, rhs) = input.split_once('=').context(MalformedPredicateSnafu {
            input,
            reason: "expected field=value",
        })?;

        let (field, negated) = match lhs.strip_suffix('!') {
            Some(field) => (field.trim(), true),
            None => (lhs.trim(), false),
        };
        ensure!(
            !field.is_empty(),
            MalformedPredicateSnafu {
                input,
                reason: "missing field name",
            }
        );

        let values: Vec<&str> = rhs.split(',').map(str::trim).collect();
        ensure!(
            values.iter().all(|v| !v.is_empty()),
            MalformedPredicateSnafu {
                input,
                reason: "empty value",
            }
        );

        let predicate = match values.as_slice() {
            [single] => Predicate::equals(field, *single),
            many => Predicate::is_in(field, many.iter().copied()),
        };

        Ok(if negated {
            predicate.negate()
        } else {
            predicate
        })
    }
}

/// String-valued row fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    /// `model`
    Model,
    /// `scenario`
    Scenario,
    /// `region`
    Region,
    /// `variable`
    Variable,
    /// `unit`
    Unit,
}

impl RowField {
    /// Map a field name to a row field, if it is one.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "model" => Some(RowField::Model),
            "scenario" => Some(RowField::Scenario),
            "region" => Some(RowField::Region),
            "variable" => Some(RowField::Variable),
            "unit" => Some(RowField::Unit),
            _ => None,
        }
    }

    fn get(self, obs: &Observation) -> &str {
        match self {
            RowField::Model => &obs.model,
            RowField::Scenario => &obs.scenario,
            RowField::Region => &obs.region,
            RowField::Variable => &obs.variable,
            RowField::Unit => &obs.unit,
        }
    }
}

/// A predicate whose field names are bound; produced by
/// [`Predicate::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPredicate {
    /// Row string field membership.
    Row {
        /// Bound field.
        field: RowField,
        /// Accepted values.
        values: BTreeSet<String>,
    },
    /// Row year membership.
    Year {
        /// Accepted years.
        years: BTreeSet<i32>,
    },
    /// Metadata attribute membership via the row's run.
    Meta {
        /// Attribute name.
        attribute: String,
        /// Accepted values.
        values: BTreeSet<String>,
    },
    /// Conjunction.
    And(Vec<ResolvedPredicate>),
    /// Negation.
    Not(Box<ResolvedPredicate>),
}

impl ResolvedPredicate {
    /// Evaluate against one row.
    pub fn matches(&self, obs: &Observation, metadata: &RunMetadata) -> bool {
        match self {
            ResolvedPredicate::Row { field, values } => values.contains(field.get(obs)),
            ResolvedPredicate::Year { years } => years.contains(&obs.year),
            ResolvedPredicate::Meta { attribute, values } => metadata
                .get(&obs.model, &obs.scenario, attribute)
                .is_some_and(|v| values.contains(v)),
            ResolvedPredicate::And(children) => children.iter().all(|c| c.matches(obs, metadata)),
            ResolvedPredicate::Not(inner) => !inner.matches(obs, metadata),
        }
    }

    /// True when any leaf consults run metadata.
    pub fn references_metadata(&self) -> bool {
        match self {
            ResolvedPredicate::Meta { .. } => true,
            ResolvedPredicate::Row { .. } | ResolvedPredicate::Year { .. } => false,
            ResolvedPredicate::And(children) => children.iter().any(Self::references_metadata),
            ResolvedPredicate::Not(inner) => inner.references_metadata(),
        }
    }
}

fn resolve_set(
    field: &str,
    values: &[PredicateValue],
    metadata: &RunMetadata,
) -> Result<ResolvedPredicate, TableError> {
    if field == YEAR {
        let years = values
            .iter()
            .map(|v| v.as_year(field))
            .collect::<Result<_, _>>()?;
        return Ok(ResolvedPredicate::Year { years });
    }

    let texts = || -> BTreeSet<String> { values.iter().map(ToString::to_string).collect() };

    if let Some(row_field) = RowField::from_name(field) {
        return Ok(ResolvedPredicate::Row {
            field: row_field,
            values: texts(),
        });
    }

    ensure!(metadata.has_attribute(field), UnknownFieldSnafu { field });
    Ok(ResolvedPredicate::Meta {
        attribute: field.to_string(),
        values: texts(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::RunKey;

    fn meta() -> RunMetadata {
        let mut meta = RunMetadata::new();
        meta.set_category(RunKey::new("M1", "S1"), "Above 2C");
        meta
    }

    fn obs(model: &str, year: i32) -> Observation {
        Observation::new(model, "S1", "World", "Emissions|CO2", "Mt CO2/yr", year, 1.0)
    }

    #[test]
    fn parse_equality_and_membership() -> Result<(), TableError> {
        assert_eq!(
            "variable=Emissions|CO2".parse::<Predicate>()?,
            Predicate::equals("variable", "Emissions|CO2")
        );
        assert_eq!(
            "year = 2020, 2030".parse::<Predicate>()?,
            Predicate::is_in("year", ["2020", "2030"])
        );
        assert_eq!(
            "category!=Above 2C".parse::<Predicate>()?,
            Predicate::category("Above 2C").negate()
        );
        Ok(())
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["category", "=x", "year=2020,,2030", "region="] {
            let err = bad.parse::<Predicate>().expect_err(bad);
            assert!(matches!(err, TableError::MalformedPredicate { .. }), "{bad}: {err}");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn unknown_field_fails_resolution() {
        let err = Predicate::equals("colour", "red")
            .resolve(&meta())
            .expect_err("unknown field");
        assert!(matches!(err, TableError::UnknownField { ref field } if field == "colour"));
    }

    #[test]
    fn non_integer_year_fails_resolution() {
        let err = Predicate::equals("year", "twenty")
            .resolve(&meta())
            .expect_err("bad year");
        assert!(matches!(err, TableError::InvalidPredicateValue { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn metadata_predicate_is_closed_world() -> Result<(), TableError> {
        let meta = meta();
        let p = Predicate::category("Above 2C").resolve(&meta)?;
        assert!(p.references_metadata());
        assert!(p.matches(&obs("M1", 2020), &meta));
        // M2 has no metadata entry: never matches, so its negation does.
        assert!(!p.matches(&obs("M2", 2020), &meta));

        let not_p = Predicate::category("Above 2C").negate().resolve(&meta)?;
        assert!(not_p.matches(&obs("M2", 2020), &meta));
        Ok(())
    }

    #[test]
    fn conjunction_and_double_negation() -> Result<(), TableError> {
        let meta = meta();
        let p = Predicate::equals("model", "M1").and(Predicate::years([2020, 2030]));
        assert!(matches!(&p, Predicate::And(c) if c.len() == 2));

        let resolved = p.clone().resolve(&meta)?;
        assert!(!resolved.references_metadata());
        assert!(resolved.matches(&obs("M1", 2030), &meta));
        assert!(!resolved.matches(&obs("M1", 2025), &meta));

        assert_eq!(p.clone().negate().negate(), p);
        assert!(Predicate::And(Vec::new()).resolve(&meta)?.matches(&obs("M9", 1), &meta));
        assert!(!Predicate::is_in("model", Vec::<String>::new())
            .resolve(&meta)?
            .matches(&obs("M1", 1), &meta));
        Ok(())
    }

    #[test]
    fn display_is_readable() {
        let p = Predicate::category("Above 2C")
            .negate()
            .and(Predicate::years([2020, 2030]));
        assert_eq!(p.to_string(), "(NOT category=Above 2C AND year in [2020, 2030])");
    }
}
