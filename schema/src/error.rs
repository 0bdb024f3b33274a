use crate::ParmTemplateType;

/// Malformed or inconsistent parameter metadata.
///
/// Always names the offending parameter and, where there is one, the offending field.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("parameter {parm:?} is missing required field {field:?}")]
    MissingField { parm: String, field: &'static str },
    #[error("parameter {parm:?} has field {field:?} = {value:?} which is not {expected}")]
    InvalidField {
        parm: String,
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("parameter name {name:?} appears more than once in group {group:?}")]
    DuplicateName { group: String, name: String },
    #[error("parameter {parm:?} is a {got} template, not {expected}")]
    WrongType {
        parm: String,
        got: ParmTemplateType,
        expected: &'static str,
    },
    #[error("malformed parameter source: {reason}")]
    Malformed { reason: String },
}

impl SchemaError {
    /// Name of the parameter that the error relates to, if any.
    pub fn parm(&self) -> Option<&str> {
        use SchemaError::*;
        match self {
            MissingField { parm, .. } | InvalidField { parm, .. } | WrongType { parm, .. } => {
                Some(parm)
            }
            DuplicateName { name, .. } => Some(name),
            Malformed { .. } => None,
        }
    }

    /// Name of the field that the error relates to, if any.
    pub fn field(&self) -> Option<&'static str> {
        use SchemaError::*;
        match self {
            MissingField { field, .. } | InvalidField { field, .. } => Some(field),
            DuplicateName { .. } | WrongType { .. } | Malformed { .. } => None,
        }
    }

    pub(crate) fn invalid(
        parm: &str,
        field: &'static str,
        value: impl std::fmt::Debug,
        expected: &'static str,
    ) -> Self {
        SchemaError::InvalidField {
            parm: parm.to_owned(),
            field,
            value: format!("{value:?}"),
            expected,
        }
    }
}
