use std::fmt;

use serde::Serialize;

/// A non-fatal finding. The affected field is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// More than two relation fields claim one relationship.
    AmbiguousRelation { key: String, fields: Vec<String> },
    /// MySQL cannot default a JSON column.
    JsonDefault { model: String, field: String },
    /// A default value of a kind that has no column default.
    UnsupportedDefault {
        model: String,
        field: String,
        kind: String,
    },
    /// Scalar lists can only be migrated on Postgres.
    ScalarListUnsupported { model: String, field: String },
    /// No column backs a one-to-one relation field.
    MissingColumn { model: String, field: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::AmbiguousRelation { key, fields } => write!(
                f,
                "ambiguous relation '{}' between {}; add @relation(name: ...) to tell them apart",
                key,
                fields.join(", ")
            ),
            Warning::JsonDefault { model, field } => write!(
                f,
                "{}.{}: MySQL does not support defaults on JSON columns, default ignored",
                model, field
            ),
            Warning::UnsupportedDefault { model, field, kind } => write!(
                f,
                "{}.{}: {} default values are not supported, default ignored",
                model, field, kind
            ),
            Warning::ScalarListUnsupported { model, field } => write!(
                f,
                "{}.{}: scalar lists cannot be migrated on MySQL",
                model, field
            ),
            Warning::MissingColumn { model, field } => write!(
                f,
                "{}.{}: no column backs this relation, unique constraint not added",
                model, field
            ),
        }
    }
}
