use thiserror::Error;

use crate::entity::{EntityKind, UserId};
use crate::value::ValueType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DdsError {
    /// An entity is still referenced and cannot be removed.
    #[error("{entity} is still in use by {blocker}; remove that reference first")]
    IntegrityViolation { entity: String, blocker: String },

    #[error("criterion {criterion} compares {expected} values but context holds {found}")]
    TypeMismatch {
        criterion: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("operator {operator} cannot be used with {value_type} values")]
    UnsupportedOperator {
        operator: String,
        value_type: ValueType,
    },

    #[error("a user with the id {0} already exists")]
    DuplicateUser(UserId),

    #[error("no user with the id {0}")]
    UnknownUser(UserId),

    #[error("no context named '{0}'")]
    UnknownContext(String),

    #[error("{kind} not found: {id}")]
    UnknownEntity { kind: EntityKind, id: String },

    #[error("no subscriber registered for response type '{0}'")]
    UnconfiguredSink(String),

    #[error("cannot parse '{value}' as {value_type}: {reason}")]
    Parse {
        value: String,
        value_type: ValueType,
        reason: String,
    },

    /// A parse failure raised while refreshing a specific criterion.
    #[error("criterion {criterion}: cannot parse '{value}' as {value_type}: {reason}")]
    MalformedLiteral {
        criterion: String,
        value: String,
        value_type: ValueType,
        reason: String,
    },

    #[error("criterion weight {0} is outside [0, 1]")]
    InvalidWeight(f64),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl DdsError {
    pub fn unknown(kind: EntityKind, id: impl ToString) -> Self {
        DdsError::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }

    /// Attach the offending criterion to a parse failure.
    pub fn in_criterion(self, criterion: impl ToString) -> Self {
        match self {
            DdsError::Parse {
                value,
                value_type,
                reason,
            } => DdsError::MalformedLiteral {
                criterion: criterion.to_string(),
                value,
                value_type,
                reason,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, DdsError>;
