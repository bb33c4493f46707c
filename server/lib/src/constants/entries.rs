use std::fmt::Display;

use crate::filter::{f_eq, Filter};
use crate::prelude::Attribute;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryClass {
    AccessControlSubentry,
    CollectiveAttributeSubentry,
    DcObject,
    Domain,
    ExtensibleObject,
    InetOrgPerson,
    MetaAttributeType,
    MetaComparator,
    MetaMatchingRule,
    MetaNormalizer,
    MetaObjectClass,
    MetaSchema,
    MetaSyntax,
    MetaTop,
    Organization,
    OrganizationalPerson,
    OrganizationalUnit,
    Person,
    Referral,
    Subentry,
    Subschema,
    Top,
    TriggerExecutionSubentry,
}

impl From<EntryClass> for &'static str {
    fn from(val: EntryClass) -> Self {
        match val {
            EntryClass::AccessControlSubentry => "accessControlSubentry",
            EntryClass::CollectiveAttributeSubentry => "collectiveAttributeSubentry",
            EntryClass::DcObject => "dcObject",
            EntryClass::Domain => "domain",
            EntryClass::ExtensibleObject => "extensibleObject",
            EntryClass::InetOrgPerson => "inetOrgPerson",
            EntryClass::MetaAttributeType => "metaAttributeType",
            EntryClass::MetaComparator => "metaComparator",
            EntryClass::MetaMatchingRule => "metaMatchingRule",
            EntryClass::MetaNormalizer => "metaNormalizer",
            EntryClass::MetaObjectClass => "metaObjectClass",
            EntryClass::MetaSchema => "metaSchema",
            EntryClass::MetaSyntax => "metaSyntax",
            EntryClass::MetaTop => "metaTop",
            EntryClass::Organization => "organization",
            EntryClass::OrganizationalPerson => "organizationalPerson",
            EntryClass::OrganizationalUnit => "organizationalUnit",
            EntryClass::Person => "person",
            EntryClass::Referral => "referral",
            EntryClass::Subentry => "subentry",
            EntryClass::Subschema => "subschema",
            EntryClass::Top => "top",
            EntryClass::TriggerExecutionSubentry => "triggerExecutionSubentry",
        }
    }
}

impl AsRef<str> for EntryClass {
    fn as_ref(&self) -> &str {
        (*self).into()
    }
}

impl From<EntryClass> for String {
    fn from(val: EntryClass) -> Self {
        let s: &'static str = val.into();
        s.to_string()
    }
}

impl Display for EntryClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &'static str = (*self).into();
        f.write_str(s)
    }
}

impl EntryClass {
    /// Return a filter that'll match this class
    pub fn as_f_eq(&self) -> Filter {
        f_eq(Attribute::ObjectClass, self.as_ref())
    }
}
