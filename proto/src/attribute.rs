use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::*;

pub use smartstring::alias::String as AttrString;

/// An attribute type name. Well known names the server reasons about have their
/// own variant, anything else is carried as a lower cased `Custom` value so that
/// two spellings of the same attribute always compare equal.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[serde(try_from = "&str", into = "AttrString")]
pub enum Attribute {
    AccessControlSubentries,
    AdministrativeRole,
    Cn,
    CollectiveAttributeSubentries,
    CollectiveExclusions,
    CreateTimestamp,
    CreatorsName,
    Dc,
    Description,
    EntryUuid,
    ModifiersName,
    ModifyTimestamp,
    NamingContexts,
    ObjectClass,
    Ou,
    PrescriptiveAci,
    Ref,
    Sn,
    SubschemaSubentry,
    SubtreeSpecification,
    SupportedControl,
    SupportedLdapVersion,
    TriggerExecutionSubentries,
    Uid,
    UserPassword,
    VendorName,

    MCollective,
    MDependencies,
    MDescription,
    MDisabled,
    MEquality,
    MFqcn,
    MMay,
    MMust,
    MName,
    MNoUserModification,
    MOid,
    MOwner,
    MSingleValue,
    MSupAttributeType,
    MSupObjectClass,
    MSyntax,
    MTypeObjectClass,
    MUsage,

    Custom(AttrString),
}

impl AsRef<str> for Attribute {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<Attribute> for Attribute {
    fn as_ref(&self) -> &Attribute {
        self
    }
}

impl TryFrom<&str> for Attribute {
    type Error = std::convert::Infallible;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(Attribute::from_str(value))
    }
}

impl From<&String> for Attribute {
    fn from(value: &String) -> Self {
        Self::from_str(value.as_str())
    }
}

impl<'a> From<&'a Attribute> for &'a str {
    fn from(val: &'a Attribute) -> Self {
        val.as_str()
    }
}

impl From<Attribute> for AttrString {
    fn from(val: Attribute) -> Self {
        AttrString::from(val.as_str())
    }
}

impl Attribute {
    pub fn as_str(&self) -> &str {
        match self {
            Attribute::AccessControlSubentries => ATTR_ACCESS_CONTROL_SUBENTRIES,
            Attribute::AdministrativeRole => ATTR_ADMINISTRATIVE_ROLE,
            Attribute::Cn => ATTR_CN,
            Attribute::CollectiveAttributeSubentries => ATTR_COLLECTIVE_ATTRIBUTE_SUBENTRIES,
            Attribute::CollectiveExclusions => ATTR_COLLECTIVE_EXCLUSIONS,
            Attribute::CreateTimestamp => ATTR_CREATE_TIMESTAMP,
            Attribute::CreatorsName => ATTR_CREATORS_NAME,
            Attribute::Dc => ATTR_DC,
            Attribute::Description => ATTR_DESCRIPTION,
            Attribute::EntryUuid => ATTR_ENTRY_UUID,
            Attribute::ModifiersName => ATTR_MODIFIERS_NAME,
            Attribute::ModifyTimestamp => ATTR_MODIFY_TIMESTAMP,
            Attribute::NamingContexts => ATTR_NAMING_CONTEXTS,
            Attribute::ObjectClass => ATTR_OBJECT_CLASS,
            Attribute::Ou => ATTR_OU,
            Attribute::PrescriptiveAci => ATTR_PRESCRIPTIVE_ACI,
            Attribute::Ref => ATTR_REF,
            Attribute::Sn => ATTR_SN,
            Attribute::SubschemaSubentry => ATTR_SUBSCHEMA_SUBENTRY,
            Attribute::SubtreeSpecification => ATTR_SUBTREE_SPECIFICATION,
            Attribute::SupportedControl => ATTR_SUPPORTED_CONTROL,
            Attribute::SupportedLdapVersion => ATTR_SUPPORTED_LDAP_VERSION,
            Attribute::TriggerExecutionSubentries => ATTR_TRIGGER_EXECUTION_SUBENTRIES,
            Attribute::Uid => ATTR_UID,
            Attribute::UserPassword => ATTR_USER_PASSWORD,
            Attribute::VendorName => ATTR_VENDOR_NAME,

            Attribute::MCollective => ATTR_M_COLLECTIVE,
            Attribute::MDependencies => ATTR_M_DEPENDENCIES,
            Attribute::MDescription => ATTR_M_DESCRIPTION,
            Attribute::MDisabled => ATTR_M_DISABLED,
            Attribute::MEquality => ATTR_M_EQUALITY,
            Attribute::MFqcn => ATTR_M_FQCN,
            Attribute::MMay => ATTR_M_MAY,
            Attribute::MMust => ATTR_M_MUST,
            Attribute::MName => ATTR_M_NAME,
            Attribute::MNoUserModification => ATTR_M_NO_USER_MODIFICATION,
            Attribute::MOid => ATTR_M_OID,
            Attribute::MOwner => ATTR_M_OWNER,
            Attribute::MSingleValue => ATTR_M_SINGLE_VALUE,
            Attribute::MSupAttributeType => ATTR_M_SUP_ATTRIBUTE_TYPE,
            Attribute::MSupObjectClass => ATTR_M_SUP_OBJECT_CLASS,
            Attribute::MSyntax => ATTR_M_SYNTAX,
            Attribute::MTypeObjectClass => ATTR_M_TYPE_OBJECT_CLASS,
            Attribute::MUsage => ATTR_M_USAGE,

            Attribute::Custom(value) => value.as_str(),
        }
    }

    // We allow this because the standard lib from_str is fallible, and we want an infallible version.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            ATTR_ACCESS_CONTROL_SUBENTRIES => Attribute::AccessControlSubentries,
            ATTR_ADMINISTRATIVE_ROLE => Attribute::AdministrativeRole,
            ATTR_CN => Attribute::Cn,
            ATTR_COLLECTIVE_ATTRIBUTE_SUBENTRIES => Attribute::CollectiveAttributeSubentries,
            ATTR_COLLECTIVE_EXCLUSIONS => Attribute::CollectiveExclusions,
            ATTR_CREATE_TIMESTAMP => Attribute::CreateTimestamp,
            ATTR_CREATORS_NAME => Attribute::CreatorsName,
            ATTR_DC => Attribute::Dc,
            ATTR_DESCRIPTION => Attribute::Description,
            ATTR_ENTRY_UUID => Attribute::EntryUuid,
            ATTR_MODIFIERS_NAME => Attribute::ModifiersName,
            ATTR_MODIFY_TIMESTAMP => Attribute::ModifyTimestamp,
            ATTR_NAMING_CONTEXTS => Attribute::NamingContexts,
            ATTR_OBJECT_CLASS => Attribute::ObjectClass,
            ATTR_OU => Attribute::Ou,
            ATTR_PRESCRIPTIVE_ACI => Attribute::PrescriptiveAci,
            ATTR_REF => Attribute::Ref,
            ATTR_SN => Attribute::Sn,
            ATTR_SUBSCHEMA_SUBENTRY => Attribute::SubschemaSubentry,
            ATTR_SUBTREE_SPECIFICATION => Attribute::SubtreeSpecification,
            ATTR_SUPPORTED_CONTROL => Attribute::SupportedControl,
            ATTR_SUPPORTED_LDAP_VERSION => Attribute::SupportedLdapVersion,
            ATTR_TRIGGER_EXECUTION_SUBENTRIES => Attribute::TriggerExecutionSubentries,
            ATTR_UID => Attribute::Uid,
            ATTR_USER_PASSWORD => Attribute::UserPassword,
            ATTR_VENDOR_NAME => Attribute::VendorName,

            ATTR_M_COLLECTIVE => Attribute::MCollective,
            ATTR_M_DEPENDENCIES => Attribute::MDependencies,
            ATTR_M_DESCRIPTION => Attribute::MDescription,
            ATTR_M_DISABLED => Attribute::MDisabled,
            ATTR_M_EQUALITY => Attribute::MEquality,
            ATTR_M_FQCN => Attribute::MFqcn,
            ATTR_M_MAY => Attribute::MMay,
            ATTR_M_MUST => Attribute::MMust,
            ATTR_M_NAME => Attribute::MName,
            ATTR_M_NO_USER_MODIFICATION => Attribute::MNoUserModification,
            ATTR_M_OID => Attribute::MOid,
            ATTR_M_OWNER => Attribute::MOwner,
            ATTR_M_SINGLE_VALUE => Attribute::MSingleValue,
            ATTR_M_SUP_ATTRIBUTE_TYPE => Attribute::MSupAttributeType,
            ATTR_M_SUP_OBJECT_CLASS => Attribute::MSupObjectClass,
            ATTR_M_SYNTAX => Attribute::MSyntax,
            ATTR_M_TYPE_OBJECT_CLASS => Attribute::MTypeObjectClass,
            ATTR_M_USAGE => Attribute::MUsage,

            other => Attribute::Custom(AttrString::from(other)),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::Attribute;

    #[test]
    fn test_attribute_from_str() {
        assert_eq!(Attribute::ObjectClass, Attribute::from_str("objectClass"));
        assert_eq!(Attribute::ObjectClass, Attribute::from_str("OBJECTCLASS"));
        assert_eq!(Attribute::MOid, Attribute::from_str("m-oid"));
        assert_eq!(
            Attribute::from_str("c-L"),
            Attribute::from_str(" c-l ")
        );
    }

    #[test]
    fn test_attribute_as_str() {
        assert_eq!(Attribute::ObjectClass.as_str(), "objectclass");
        assert_eq!(
            Attribute::AccessControlSubentries.to_string(),
            "accesscontrolsubentries".to_string()
        );
        assert_eq!(Attribute::from_str("postalCode").as_str(), "postalcode");
    }

    #[test]
    fn test_attribute_serde() {
        let a: Attribute = serde_json::from_str("\"subtreeSpecification\"").expect("parse");
        assert_eq!(a, Attribute::SubtreeSpecification);
        let s = serde_json::to_string(&Attribute::MDisabled).expect("ser");
        assert_eq!(s, "\"m-disabled\"");
    }
}
