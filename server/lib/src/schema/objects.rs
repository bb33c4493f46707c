//! The schema elements held by the registries. Every element carries a [`SchemaMeta`]
//! header naming its OID, aliases, owning schema and whether it was individually disabled.

use std::fmt;

use crate::constants::EntryClass;

/// The kinds of schema element. The derived ordering is the order elements must be
/// registered in so that every reference points at something already present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaObjectKind {
    Syntax,
    Comparator,
    Normalizer,
    MatchingRule,
    AttributeType,
    ObjectClass,
}

impl SchemaObjectKind {
    /// The `ou=` container name holding this kind beneath a `cn=<schema>,ou=schema` entry.
    pub fn container(self) -> &'static str {
        match self {
            SchemaObjectKind::Syntax => "syntaxes",
            SchemaObjectKind::Comparator => "comparators",
            SchemaObjectKind::Normalizer => "normalizers",
            SchemaObjectKind::MatchingRule => "matchingrules",
            SchemaObjectKind::AttributeType => "attributetypes",
            SchemaObjectKind::ObjectClass => "objectclasses",
        }
    }

    pub fn entry_class(self) -> EntryClass {
        match self {
            SchemaObjectKind::Syntax => EntryClass::MetaSyntax,
            SchemaObjectKind::Comparator => EntryClass::MetaComparator,
            SchemaObjectKind::Normalizer => EntryClass::MetaNormalizer,
            SchemaObjectKind::MatchingRule => EntryClass::MetaMatchingRule,
            SchemaObjectKind::AttributeType => EntryClass::MetaAttributeType,
            SchemaObjectKind::ObjectClass => EntryClass::MetaObjectClass,
        }
    }

    pub fn all() -> [SchemaObjectKind; 6] {
        [
            SchemaObjectKind::Syntax,
            SchemaObjectKind::Comparator,
            SchemaObjectKind::Normalizer,
            SchemaObjectKind::MatchingRule,
            SchemaObjectKind::AttributeType,
            SchemaObjectKind::ObjectClass,
        ]
    }
}

impl fmt::Display for SchemaObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaObjectKind::Syntax => "syntax",
            SchemaObjectKind::Comparator => "comparator",
            SchemaObjectKind::Normalizer => "normalizer",
            SchemaObjectKind::MatchingRule => "matching rule",
            SchemaObjectKind::AttributeType => "attribute type",
            SchemaObjectKind::ObjectClass => "object class",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaMeta {
    pub oid: String,
    pub names: Vec<String>,
    pub description: Option<String>,
    pub schema: String,
    pub enabled: bool,
}

impl SchemaMeta {
    pub fn new(oid: &str, names: &[&str], schema: &str) -> Self {
        SchemaMeta {
            oid: oid.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            description: None,
            schema: schema.to_string(),
            enabled: true,
        }
    }

    /// The primary name, falling back to the OID for anonymous elements.
    pub fn name(&self) -> &str {
        self.names.first().map(|s| s.as_str()).unwrap_or(self.oid.as_str())
    }

    /// True if `name_or_oid` is the OID or any alias of this element.
    pub fn is_named(&self, name_or_oid: &str) -> bool {
        self.oid == name_or_oid || self.names.iter().any(|n| n.eq_ignore_ascii_case(name_or_oid))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttributeUsage {
    #[default]
    UserApplications,
    DirectoryOperation,
    DistributedOperation,
    DsaOperation,
}

impl AttributeUsage {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeUsage::UserApplications => "userApplications",
            AttributeUsage::DirectoryOperation => "directoryOperation",
            AttributeUsage::DistributedOperation => "distributedOperation",
            AttributeUsage::DsaOperation => "dSAOperation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "userapplications" => Some(AttributeUsage::UserApplications),
            "directoryoperation" => Some(AttributeUsage::DirectoryOperation),
            "distributedoperation" => Some(AttributeUsage::DistributedOperation),
            "dsaoperation" => Some(AttributeUsage::DsaOperation),
            _ => None,
        }
    }

    pub fn is_operational(self) -> bool {
        self != AttributeUsage::UserApplications
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeType {
    pub meta: SchemaMeta,
    pub superior: Option<String>,
    pub syntax: Option<String>,
    pub equality: Option<String>,
    pub single_value: bool,
    pub collective: bool,
    pub no_user_modification: bool,
    pub usage: AttributeUsage,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectClassKind {
    Abstract,
    #[default]
    Structural,
    Auxiliary,
}

impl ObjectClassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectClassKind::Abstract => "ABSTRACT",
            ObjectClassKind::Structural => "STRUCTURAL",
            ObjectClassKind::Auxiliary => "AUXILIARY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ABSTRACT" => Some(ObjectClassKind::Abstract),
            "STRUCTURAL" => Some(ObjectClassKind::Structural),
            "AUXILIARY" => Some(ObjectClassKind::Auxiliary),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectClass {
    pub meta: SchemaMeta,
    pub superiors: Vec<String>,
    pub kind: ObjectClassKind,
    pub must: Vec<String>,
    pub may: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LdapSyntax {
    pub meta: SchemaMeta,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchingRule {
    pub meta: SchemaMeta,
    pub syntax: String,
}

/// A normalizer is registered under the OID of the matching rule it serves. The
/// implementation is one of the built in normalizers named by `fqcn`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizerDescription {
    pub meta: SchemaMeta,
    pub fqcn: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComparatorDescription {
    pub meta: SchemaMeta,
    pub fqcn: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaObject {
    Syntax(LdapSyntax),
    Comparator(ComparatorDescription),
    Normalizer(NormalizerDescription),
    MatchingRule(MatchingRule),
    AttributeType(AttributeType),
    ObjectClass(ObjectClass),
}

impl SchemaObject {
    pub fn meta(&self) -> &SchemaMeta {
        match self {
            SchemaObject::Syntax(o) => &o.meta,
            SchemaObject::Comparator(o) => &o.meta,
            SchemaObject::Normalizer(o) => &o.meta,
            SchemaObject::MatchingRule(o) => &o.meta,
            SchemaObject::AttributeType(o) => &o.meta,
            SchemaObject::ObjectClass(o) => &o.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut SchemaMeta {
        match self {
            SchemaObject::Syntax(o) => &mut o.meta,
            SchemaObject::Comparator(o) => &mut o.meta,
            SchemaObject::Normalizer(o) => &mut o.meta,
            SchemaObject::MatchingRule(o) => &mut o.meta,
            SchemaObject::AttributeType(o) => &mut o.meta,
            SchemaObject::ObjectClass(o) => &mut o.meta,
        }
    }

    pub fn kind(&self) -> SchemaObjectKind {
        match self {
            SchemaObject::Syntax(_) => SchemaObjectKind::Syntax,
            SchemaObject::Comparator(_) => SchemaObjectKind::Comparator,
            SchemaObject::Normalizer(_) => SchemaObjectKind::Normalizer,
            SchemaObject::MatchingRule(_) => SchemaObjectKind::MatchingRule,
            SchemaObject::AttributeType(_) => SchemaObjectKind::AttributeType,
            SchemaObject::ObjectClass(_) => SchemaObjectKind::ObjectClass,
        }
    }

    pub fn oid(&self) -> &str {
        self.meta().oid.as_str()
    }

    pub fn schema_name(&self) -> &str {
        self.meta().schema.as_str()
    }

    pub fn is_enabled(&self) -> bool {
        self.meta().enabled
    }
}

impl fmt::Display for SchemaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind(), self.meta().name(), self.oid())
    }
}

/// A named schema, the unit that is enabled and disabled as a whole. Elements of a
/// disabled schema, and individually disabled elements, are stashed here rather than
/// registered so that enabling the schema again can restore them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub enabled: bool,
    pub dependencies: Vec<String>,
    pub owner: Option<String>,
    pub stashed: Vec<SchemaObject>,
}

impl Schema {
    pub fn new(name: &str, dependencies: &[&str]) -> Self {
        Schema {
            name: name.to_string(),
            enabled: true,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            owner: None,
            stashed: Vec::new(),
        }
    }

    pub fn depends_on(&self, other: &str) -> bool {
        self.dependencies
            .iter()
            .any(|d| d.eq_ignore_ascii_case(other))
    }
}
