use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/* ===== errors ===== */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaError {
    OidAlreadyExists(String),
    NoSuchOid(String),
    HasDependents { oid: String, dependents: Vec<String> },
    HasDescendants { oid: String, descendants: Vec<String> },
    InvalidSubtreeSpecification(String),
    InvalidRefinement(String),
    MissingObjectClass,
    InvalidAttribute(String),
    MissingMustAttribute { class: String, attribute: String },
    MultipleSingleValue(String),
    CollectiveAttributeNotAllowed(String),
    AdministrativeDescendant(String),
    UnknownNormalizer(String),
    UnknownComparator(String),
    InvalidSchemaEntry(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SchemaError::OidAlreadyExists(oid) => write!(f, "OID {} is already registered", oid),
            SchemaError::NoSuchOid(oid) => write!(f, "OID {} is not registered", oid),
            SchemaError::HasDependents { oid, dependents } => write!(
                f,
                "{} is still used by [{}]",
                oid,
                dependents.join(", ")
            ),
            SchemaError::HasDescendants { oid, descendants } => write!(
                f,
                "{} still has descendants [{}]",
                oid,
                descendants.join(", ")
            ),
            SchemaError::InvalidSubtreeSpecification(msg) => {
                write!(f, "invalid subtree specification: {}", msg)
            }
            SchemaError::InvalidRefinement(msg) => write!(f, "invalid refinement: {}", msg),
            SchemaError::MissingObjectClass => f.write_str("entry has no objectClass"),
            SchemaError::InvalidAttribute(a) => write!(f, "attribute {} is not defined", a),
            SchemaError::MissingMustAttribute { class, attribute } => {
                write!(f, "object class {} requires {}", class, attribute)
            }
            SchemaError::MultipleSingleValue(a) => {
                write!(f, "attribute {} may only hold a single value", a)
            }
            SchemaError::CollectiveAttributeNotAllowed(dn) => write!(
                f,
                "collective attributes are only allowed on collective subentries, not {}",
                dn
            ),
            SchemaError::AdministrativeDescendant(dn) => write!(
                f,
                "{} has an administrative point beneath it and cannot be renamed or moved",
                dn
            ),
            SchemaError::UnknownNormalizer(n) => write!(f, "no normalizer named {}", n),
            SchemaError::UnknownComparator(c) => write!(f, "no comparator named {}", c),
            SchemaError::InvalidSchemaEntry(msg) => write!(f, "invalid schema entry: {}", msg),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationError {
    // Naming and structure
    NamingViolation(String),
    InvalidDnSyntax(String),
    InvalidFilter(String),
    NoSuchObject(String),
    EntryAlreadyExists(String),
    NotAllowedOnNonLeaf(String),
    Referral(Vec<String>),

    // Schema
    SchemaViolation(SchemaError),
    NoSuchAttribute(String),

    // Policy
    UnwillingToPerform(String),
    NoPermission(String),
    NotAuthenticated,
    InvalidCredentials,

    // Internal
    IllegalState(String),
    Abandoned,
    Backend,

    // Change log
    ChangeLogDisabled,
    InvalidRevision { requested: u64, current: u64 },
    NoSuchTag,
}

impl PartialEq<SchemaError> for OperationError {
    fn eq(&self, other: &SchemaError) -> bool {
        matches!(self, OperationError::SchemaViolation(inner) if inner == other)
    }
}

impl From<SchemaError> for OperationError {
    fn from(value: SchemaError) -> Self {
        OperationError::SchemaViolation(value)
    }
}

impl Display for OperationError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mut output = format!("{:?}", self)
            .split(['(', ' ', '{'])
            .next()
            .unwrap_or("")
            .to_string();

        if let Some(msg) = self.message() {
            output += &format!(" - {}", msg);
        };
        f.write_str(&output)
    }
}

impl OperationError {
    /// A message describing the error, including the offending DN or the
    /// list of dependents where one is known.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::NamingViolation(msg) => Some(msg.clone()),
            Self::InvalidDnSyntax(dn) => Some(format!("unable to parse dn {}", dn)),
            Self::InvalidFilter(msg) => Some(msg.clone()),
            Self::NoSuchObject(dn) => Some(format!("no entry named {}", dn)),
            Self::EntryAlreadyExists(dn) => Some(format!("an entry named {} already exists", dn)),
            Self::NotAllowedOnNonLeaf(dn) => Some(format!("{} has children", dn)),
            Self::Referral(urls) => Some(format!("referred to [{}]", urls.join(", "))),
            Self::SchemaViolation(err) => Some(err.to_string()),
            Self::NoSuchAttribute(msg) => Some(msg.clone()),
            Self::UnwillingToPerform(msg) => Some(msg.clone()),
            Self::NoPermission(msg) => Some(msg.clone()),
            Self::NotAuthenticated => Some("this operation requires an authenticated session".into()),
            Self::InvalidCredentials => None,
            Self::IllegalState(msg) => Some(msg.clone()),
            Self::Abandoned => Some("the operation was abandoned by the client".into()),
            Self::Backend => None,
            Self::ChangeLogDisabled => Some("the change log is not enabled".into()),
            Self::InvalidRevision { requested, current } => Some(format!(
                "revision {} must be older than the current revision {}",
                requested, current
            )),
            Self::NoSuchTag => Some("no tag has been recorded".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OperationError, SchemaError};

    #[test]
    fn test_operationerror_as_string() {
        let e = OperationError::NoSuchObject("cn=a,dc=example,dc=com".to_string());
        assert_eq!(
            e.to_string(),
            "NoSuchObject - no entry named cn=a,dc=example,dc=com"
        );
        assert_eq!(OperationError::Backend.to_string(), "Backend");
        let e = OperationError::InvalidRevision {
            requested: 4,
            current: 4,
        };
        assert!(e.to_string().starts_with("InvalidRevision - "));
    }

    #[test]
    fn test_schemaerror_lists_dependents() {
        let e: OperationError = SchemaError::HasDependents {
            oid: "1.3.6.1.4.1.1466.115.121.1.15".to_string(),
            dependents: vec!["cn".to_string(), "sn".to_string()],
        }
        .into();
        let msg = e.to_string();
        assert!(msg.starts_with("SchemaViolation"));
        assert!(msg.contains("[cn, sn]"));
        assert!(e == SchemaError::HasDependents {
            oid: "1.3.6.1.4.1.1466.115.121.1.15".to_string(),
            dependents: vec!["cn".to_string(), "sn".to_string()],
        });
    }
}
