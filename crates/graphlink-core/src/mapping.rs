//! Declarative relationship mappings.
//!
//! A mapping binds two fields of a record to the key properties of two node
//! types, and names the relationship type that connects them. Mappings are
//! validated once at construction and are read-only afterwards, so a single
//! instance can be shared across row sources and concurrent imports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::types::Record;

// ── Field Selectors ──────────────────────────────────────────────

/// Locates an endpoint key value within a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSelector {
    /// Zero-based column position.
    Position(usize),
    /// Column name, looked up in the header record.
    Name(String),
}

impl FieldSelector {
    /// Resolve this selector to a column position using the header record.
    ///
    /// Positions resolve unconditionally; whether a given row is long enough
    /// is decided per row. Names resolve to the first header column equal to
    /// the name, ignoring surrounding whitespace on either side.
    pub fn column(&self, header: &Record) -> Option<usize> {
        match self {
            Self::Position(idx) => Some(*idx),
            Self::Name(name) => {
                let name = name.trim();
                header.fields().iter().position(|f| f.trim() == name)
            }
        }
    }

    fn trimmed(self) -> Self {
        match self {
            Self::Name(name) => Self::Name(trim_owned(name)),
            position => position,
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Name(name) if name.trim().is_empty())
    }
}

impl FromStr for FieldSelector {
    type Err = ConfigurationError;

    /// Digits select a column position, anything else a header name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigurationError::EmptyField { field: "selector" });
        }
        match s.parse::<usize>() {
            Ok(idx) => Ok(Self::Position(idx)),
            Err(_) => Ok(Self::Name(s.to_string())),
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(idx) => write!(f, "column {idx}"),
            Self::Name(name) => write!(f, "column {name:?}"),
        }
    }
}

// ── Endpoints ────────────────────────────────────────────────────

/// One side of a relationship: which node type, which key property, and
/// where in the record the key value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMapping {
    pub label: String,
    pub key: String,
    pub selector: FieldSelector,
}

impl EndpointMapping {
    pub fn new(label: impl Into<String>, key: impl Into<String>, selector: FieldSelector) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            selector,
        }
    }

    fn trimmed(self) -> Self {
        Self {
            label: trim_owned(self.label),
            key: trim_owned(self.key),
            selector: self.selector.trimmed(),
        }
    }
}

impl FromStr for EndpointMapping {
    type Err = ConfigurationError;

    /// Parse the compact `Label:KeyProperty:selector` notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(3, ':').collect();
        let [label, key, selector] = parts.as_slice() else {
            return Err(ConfigurationError::InvalidEndpoint(s.to_string()));
        };
        if label.trim().is_empty() || key.trim().is_empty() {
            return Err(ConfigurationError::InvalidEndpoint(s.to_string()));
        }
        Ok(Self::new(label.trim(), key.trim(), selector.parse()?))
    }
}

// ── Relationship Mapping ─────────────────────────────────────────

/// A validated, immutable description of one relationship type to import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipMapping {
    from: EndpointMapping,
    to: EndpointMapping,
    relationship_type: String,
}

impl RelationshipMapping {
    /// Build a mapping, rejecting empty labels, keys, selectors or type, and
    /// identifiers that cannot be safely quoted in a graph query.
    ///
    /// Surrounding whitespace is stripped from every identifier and selector
    /// name before validation.
    pub fn new(
        from: EndpointMapping,
        to: EndpointMapping,
        relationship_type: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let from = from.trimmed();
        let to = to.trimmed();
        let relationship_type = trim_owned(relationship_type.into());

        check_identifier("from.label", &from.label)?;
        check_identifier("from.key", &from.key)?;
        check_selector("from.selector", &from.selector)?;
        check_identifier("to.label", &to.label)?;
        check_identifier("to.key", &to.key)?;
        check_selector("to.selector", &to.selector)?;
        check_identifier("relationship_type", &relationship_type)?;

        Ok(Self {
            from,
            to,
            relationship_type,
        })
    }

    pub fn from(&self) -> &EndpointMapping {
        &self.from
    }

    pub fn to(&self) -> &EndpointMapping {
        &self.to
    }

    pub fn relationship_type(&self) -> &str {
        &self.relationship_type
    }
}

impl fmt::Display for RelationshipMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(:{} {{{}}})-[:{}]->(:{} {{{}}})",
            self.from.label, self.from.key, self.relationship_type, self.to.label, self.to.key
        )
    }
}

fn trim_owned(value: String) -> String {
    if value.trim() == value {
        value
    } else {
        value.trim().to_string()
    }
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if value.is_empty() {
        return Err(ConfigurationError::EmptyField { field });
    }
    if value.contains('`') {
        return Err(ConfigurationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_selector(field: &'static str, selector: &FieldSelector) -> Result<(), ConfigurationError> {
    if selector.is_empty() {
        return Err(ConfigurationError::EmptyField { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_account() -> RelationshipMapping {
        RelationshipMapping::new(
            EndpointMapping::new("Customer", "CustomerID", FieldSelector::Position(2)),
            EndpointMapping::new("Account", "AccountID", FieldSelector::Position(0)),
            "HAS_ACCOUNT",
        )
        .unwrap()
    }

    #[test]
    fn test_valid_mapping() {
        let m = has_account();
        assert_eq!(m.relationship_type(), "HAS_ACCOUNT");
        assert_eq!(m.from().label, "Customer");
        assert_eq!(m.to().selector, FieldSelector::Position(0));
        assert_eq!(
            m.to_string(),
            "(:Customer {CustomerID})-[:HAS_ACCOUNT]->(:Account {AccountID})"
        );
    }

    #[test]
    fn test_empty_fields_rejected() {
        let err = RelationshipMapping::new(
            EndpointMapping::new("", "CustomerID", FieldSelector::Position(2)),
            EndpointMapping::new("Account", "AccountID", FieldSelector::Position(0)),
            "HAS_ACCOUNT",
        )
        .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyField { field: "from.label" });

        let err = RelationshipMapping::new(
            EndpointMapping::new("Customer", "CustomerID", FieldSelector::Position(2)),
            EndpointMapping::new("Account", "AccountID", FieldSelector::Name(" ".into())),
            "HAS_ACCOUNT",
        )
        .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyField { field: "to.selector" });

        let err = RelationshipMapping::new(
            EndpointMapping::new("Customer", "CustomerID", FieldSelector::Position(2)),
            EndpointMapping::new("Account", "AccountID", FieldSelector::Position(0)),
            "",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::EmptyField {
                field: "relationship_type"
            }
        );
    }

    #[test]
    fn test_backtick_rejected() {
        let err = RelationshipMapping::new(
            EndpointMapping::new("Customer", "CustomerID", FieldSelector::Position(2)),
            EndpointMapping::new("Account`) DETACH DELETE (n", "AccountID", FieldSelector::Position(0)),
            "HAS_ACCOUNT",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidIdentifier { field: "to.label", .. }
        ));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let m = RelationshipMapping::new(
            EndpointMapping::new(" Customer ", "CustomerID\t", FieldSelector::Position(2)),
            EndpointMapping::new("Account", " AccountID", FieldSelector::Name(" AccountID ".into())),
            " HAS_ACCOUNT ",
        )
        .unwrap();
        assert_eq!(m.from().label, "Customer");
        assert_eq!(m.from().key, "CustomerID");
        assert_eq!(m.to().key, "AccountID");
        assert_eq!(m.to().selector, FieldSelector::Name("AccountID".into()));
        assert_eq!(m.relationship_type(), "HAS_ACCOUNT");
        assert_eq!(m, has_account_by_name());
    }

    fn has_account_by_name() -> RelationshipMapping {
        RelationshipMapping::new(
            EndpointMapping::new("Customer", "CustomerID", FieldSelector::Position(2)),
            EndpointMapping::new("Account", "AccountID", FieldSelector::Name("AccountID".into())),
            "HAS_ACCOUNT",
        )
        .unwrap()
    }

    #[test]
    fn test_selector_resolution() {
        let header = Record::from(vec!["AccountID", "Name", "CustomerID"]);
        assert_eq!(FieldSelector::Position(7).column(&header), Some(7));
        assert_eq!(
            FieldSelector::Name("CustomerID".into()).column(&header),
            Some(2)
        );
        assert_eq!(
            FieldSelector::Name(" CustomerID ".into()).column(&header),
            Some(2)
        );
        assert_eq!(FieldSelector::Name("Region".into()).column(&header), None);
    }

    #[test]
    fn test_parse_endpoint_notation() {
        let ep: EndpointMapping = "Customer:CustomerID:2".parse().unwrap();
        assert_eq!(ep.label, "Customer");
        assert_eq!(ep.key, "CustomerID");
        assert_eq!(ep.selector, FieldSelector::Position(2));

        let ep: EndpointMapping = "Account:AccountID:AccountID".parse().unwrap();
        assert_eq!(ep.selector, FieldSelector::Name("AccountID".into()));

        assert!("Customer:CustomerID".parse::<EndpointMapping>().is_err());
        assert!(":CustomerID:2".parse::<EndpointMapping>().is_err());
        assert!("Customer:CustomerID:".parse::<EndpointMapping>().is_err());
    }
}
