//! The schemas every server starts with. These are registered in code at startup and are
//! never stored as meta-schema entries, so they can't be modified through the directory.

use crate::schema::normalizers::{Comparator, Normalizer};
use crate::schema::objects::*;

pub const SCHEMA_NAME_SYSTEM: &str = "system";
pub const SCHEMA_NAME_CORE: &str = "core";
pub const SCHEMA_NAME_META: &str = "meta";
pub const SCHEMA_NAME_COLLECTIVE: &str = "collective";

pub const SYNTAX_BOOLEAN: &str = "1.3.6.1.4.1.1466.115.121.1.7";
pub const SYNTAX_DN: &str = "1.3.6.1.4.1.1466.115.121.1.12";
pub const SYNTAX_DIRECTORY_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.15";
pub const SYNTAX_GENERALIZED_TIME: &str = "1.3.6.1.4.1.1466.115.121.1.24";
pub const SYNTAX_IA5_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.26";
pub const SYNTAX_INTEGER: &str = "1.3.6.1.4.1.1466.115.121.1.27";
pub const SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.38";
pub const SYNTAX_OCTET_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.40";
pub const SYNTAX_SUBTREE_SPECIFICATION: &str = "1.3.6.1.4.1.1466.115.121.1.45";
pub const SYNTAX_TELEPHONE_NUMBER: &str = "1.3.6.1.4.1.1466.115.121.1.50";
pub const SYNTAX_UUID: &str = "1.3.6.1.1.16.1";

pub const MR_OBJECT_IDENTIFIER: &str = "2.5.13.0";
pub const MR_DISTINGUISHED_NAME: &str = "2.5.13.1";
pub const MR_CASE_IGNORE: &str = "2.5.13.2";
pub const MR_CASE_EXACT: &str = "2.5.13.5";
pub const MR_BOOLEAN: &str = "2.5.13.13";
pub const MR_INTEGER: &str = "2.5.13.14";
pub const MR_OCTET_STRING: &str = "2.5.13.17";
pub const MR_TELEPHONE_NUMBER: &str = "2.5.13.20";
pub const MR_GENERALIZED_TIME: &str = "2.5.13.27";
pub const MR_UUID: &str = "1.3.6.1.1.16.2";
pub const MR_CASE_IGNORE_IA5: &str = "1.3.6.1.4.1.1466.109.114.2";

fn meta(oid: &str, names: &[&str], schema: &str) -> SchemaMeta {
    SchemaMeta::new(oid, names, schema)
}

fn syntax(oid: &str, description: &str) -> SchemaObject {
    let mut meta = meta(oid, &[], SCHEMA_NAME_SYSTEM);
    meta.description = Some(description.to_string());
    SchemaObject::Syntax(LdapSyntax { meta })
}

fn matching_rule(oid: &str, name: &str, syntax: &str) -> SchemaObject {
    SchemaObject::MatchingRule(MatchingRule {
        meta: meta(oid, &[name], SCHEMA_NAME_SYSTEM),
        syntax: syntax.to_string(),
    })
}

fn normalizer(oid: &str, normalizer: Normalizer) -> SchemaObject {
    SchemaObject::Normalizer(NormalizerDescription {
        meta: meta(oid, &[], SCHEMA_NAME_SYSTEM),
        fqcn: normalizer.fqcn().to_string(),
    })
}

fn comparator(oid: &str, comparator: Comparator) -> SchemaObject {
    SchemaObject::Comparator(ComparatorDescription {
        meta: meta(oid, &[], SCHEMA_NAME_SYSTEM),
        fqcn: comparator.fqcn().to_string(),
    })
}

fn attribute_type(
    oid: &str,
    names: &[&str],
    schema: &str,
    syntax: &str,
    equality: &str,
) -> AttributeType {
    AttributeType {
        meta: meta(oid, names, schema),
        syntax: Some(syntax.to_string()),
        equality: Some(equality.to_string()),
        ..Default::default()
    }
}

fn sub_attribute_type(oid: &str, names: &[&str], schema: &str, superior: &str) -> AttributeType {
    AttributeType {
        meta: meta(oid, names, schema),
        superior: Some(superior.to_string()),
        ..Default::default()
    }
}

fn operational(at: AttributeType, usage: AttributeUsage, no_user_modification: bool) -> SchemaObject {
    SchemaObject::AttributeType(AttributeType {
        usage,
        no_user_modification,
        ..at
    })
}

fn single(at: AttributeType) -> AttributeType {
    AttributeType {
        single_value: true,
        ..at
    }
}

fn object_class(
    oid: &str,
    name: &str,
    schema: &str,
    superiors: &[&str],
    kind: ObjectClassKind,
    must: &[&str],
    may: &[&str],
) -> SchemaObject {
    SchemaObject::ObjectClass(ObjectClass {
        meta: meta(oid, &[name], schema),
        superiors: superiors.iter().map(|s| s.to_string()).collect(),
        kind,
        must: must.iter().map(|s| s.to_string()).collect(),
        may: may.iter().map(|s| s.to_string()).collect(),
    })
}

fn system_schema() -> Vec<SchemaObject> {
    let s = SCHEMA_NAME_SYSTEM;
    vec![
        syntax(SYNTAX_BOOLEAN, "Boolean"),
        syntax(SYNTAX_DN, "DN"),
        syntax(SYNTAX_DIRECTORY_STRING, "Directory String"),
        syntax(SYNTAX_GENERALIZED_TIME, "Generalized Time"),
        syntax(SYNTAX_IA5_STRING, "IA5 String"),
        syntax(SYNTAX_INTEGER, "Integer"),
        syntax(SYNTAX_OID, "OID"),
        syntax(SYNTAX_OCTET_STRING, "Octet String"),
        syntax(SYNTAX_SUBTREE_SPECIFICATION, "Subtree Specification"),
        syntax(SYNTAX_TELEPHONE_NUMBER, "Telephone Number"),
        syntax(SYNTAX_UUID, "UUID"),
        comparator(MR_OBJECT_IDENTIFIER, Comparator::CaseIgnore),
        comparator(MR_DISTINGUISHED_NAME, Comparator::CaseIgnore),
        comparator(MR_CASE_IGNORE, Comparator::CaseIgnore),
        comparator(MR_CASE_EXACT, Comparator::CaseExact),
        comparator(MR_BOOLEAN, Comparator::CaseExact),
        comparator(MR_INTEGER, Comparator::Integer),
        comparator(MR_OCTET_STRING, Comparator::Octet),
        comparator(MR_TELEPHONE_NUMBER, Comparator::CaseIgnore),
        comparator(MR_GENERALIZED_TIME, Comparator::CaseExact),
        comparator(MR_UUID, Comparator::CaseIgnore),
        comparator(MR_CASE_IGNORE_IA5, Comparator::CaseIgnore),
        normalizer(MR_OBJECT_IDENTIFIER, Normalizer::DeepTrimToLower),
        normalizer(MR_DISTINGUISHED_NAME, Normalizer::DeepTrimToLower),
        normalizer(MR_CASE_IGNORE, Normalizer::DeepTrimToLower),
        normalizer(MR_CASE_EXACT, Normalizer::DeepTrim),
        normalizer(MR_BOOLEAN, Normalizer::Boolean),
        normalizer(MR_INTEGER, Normalizer::Numeric),
        normalizer(MR_OCTET_STRING, Normalizer::NoOp),
        normalizer(MR_TELEPHONE_NUMBER, Normalizer::Numeric),
        normalizer(MR_GENERALIZED_TIME, Normalizer::DeepTrim),
        normalizer(MR_UUID, Normalizer::DeepTrimToLower),
        normalizer(MR_CASE_IGNORE_IA5, Normalizer::DeepTrimToLower),
        matching_rule(MR_OBJECT_IDENTIFIER, "objectIdentifierMatch", SYNTAX_OID),
        matching_rule(MR_DISTINGUISHED_NAME, "distinguishedNameMatch", SYNTAX_DN),
        matching_rule(MR_CASE_IGNORE, "caseIgnoreMatch", SYNTAX_DIRECTORY_STRING),
        matching_rule(MR_CASE_EXACT, "caseExactMatch", SYNTAX_DIRECTORY_STRING),
        matching_rule(MR_BOOLEAN, "booleanMatch", SYNTAX_BOOLEAN),
        matching_rule(MR_INTEGER, "integerMatch", SYNTAX_INTEGER),
        matching_rule(MR_OCTET_STRING, "octetStringMatch", SYNTAX_OCTET_STRING),
        matching_rule(MR_TELEPHONE_NUMBER, "telephoneNumberMatch", SYNTAX_TELEPHONE_NUMBER),
        matching_rule(MR_GENERALIZED_TIME, "generalizedTimeMatch", SYNTAX_GENERALIZED_TIME),
        matching_rule(MR_UUID, "uuidMatch", SYNTAX_UUID),
        matching_rule(MR_CASE_IGNORE_IA5, "caseIgnoreIA5Match", SYNTAX_IA5_STRING),
        SchemaObject::AttributeType(attribute_type(
            "2.5.4.0",
            &["objectClass"],
            s,
            SYNTAX_OID,
            MR_OBJECT_IDENTIFIER,
        )),
        SchemaObject::AttributeType(attribute_type(
            "2.5.4.41",
            &["name"],
            s,
            SYNTAX_DIRECTORY_STRING,
            MR_CASE_IGNORE,
        )),
        SchemaObject::AttributeType(attribute_type(
            "2.16.840.1.113730.3.1.34",
            &["ref"],
            s,
            SYNTAX_IA5_STRING,
            MR_CASE_EXACT,
        )),
        operational(
            single(attribute_type(
                "2.5.18.1",
                &["createTimestamp"],
                s,
                SYNTAX_GENERALIZED_TIME,
                MR_GENERALIZED_TIME,
            )),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            single(attribute_type(
                "2.5.18.2",
                &["modifyTimestamp"],
                s,
                SYNTAX_GENERALIZED_TIME,
                MR_GENERALIZED_TIME,
            )),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            single(attribute_type(
                "2.5.18.3",
                &["creatorsName"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            )),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            single(attribute_type(
                "2.5.18.4",
                &["modifiersName"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            )),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            attribute_type(
                "2.5.18.5",
                &["administrativeRole"],
                s,
                SYNTAX_OID,
                MR_OBJECT_IDENTIFIER,
            ),
            AttributeUsage::DirectoryOperation,
            false,
        ),
        operational(
            single(attribute_type(
                "2.5.18.6",
                &["subtreeSpecification"],
                s,
                SYNTAX_SUBTREE_SPECIFICATION,
                MR_CASE_EXACT,
            )),
            AttributeUsage::DirectoryOperation,
            false,
        ),
        operational(
            attribute_type(
                "2.5.18.7",
                &["collectiveExclusions"],
                s,
                SYNTAX_OID,
                MR_OBJECT_IDENTIFIER,
            ),
            AttributeUsage::DirectoryOperation,
            false,
        ),
        operational(
            single(attribute_type(
                "2.5.18.10",
                &["subschemaSubentry"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            )),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            attribute_type(
                "2.5.18.11",
                &["accessControlSubentries"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            ),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            attribute_type(
                "2.5.18.12",
                &["collectiveAttributeSubentries"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            ),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            attribute_type(
                "1.3.6.1.4.1.18060.0.4.1.2.27",
                &["triggerExecutionSubentries"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            ),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            attribute_type(
                "2.5.24.4",
                &["prescriptiveACI"],
                s,
                SYNTAX_DIRECTORY_STRING,
                MR_CASE_EXACT,
            ),
            AttributeUsage::DirectoryOperation,
            false,
        ),
        operational(
            single(attribute_type(
                "1.3.6.1.1.16.4",
                &["entryUUID"],
                s,
                SYNTAX_UUID,
                MR_UUID,
            )),
            AttributeUsage::DirectoryOperation,
            true,
        ),
        operational(
            attribute_type(
                "1.3.6.1.4.1.1466.101.120.5",
                &["namingContexts"],
                s,
                SYNTAX_DN,
                MR_DISTINGUISHED_NAME,
            ),
            AttributeUsage::DsaOperation,
            true,
        ),
        operational(
            attribute_type(
                "1.3.6.1.4.1.1466.101.120.13",
                &["supportedControl"],
                s,
                SYNTAX_OID,
                MR_OBJECT_IDENTIFIER,
            ),
            AttributeUsage::DsaOperation,
            true,
        ),
        operational(
            attribute_type(
                "1.3.6.1.4.1.1466.101.120.15",
                &["supportedLDAPVersion"],
                s,
                SYNTAX_INTEGER,
                MR_INTEGER,
            ),
            AttributeUsage::DsaOperation,
            true,
        ),
        operational(
            single(attribute_type(
                "1.3.6.1.1.4",
                &["vendorName"],
                s,
                SYNTAX_DIRECTORY_STRING,
                MR_CASE_EXACT,
            )),
            AttributeUsage::DsaOperation,
            true,
        ),
        object_class("2.5.6.0", "top", s, &[], ObjectClassKind::Abstract, &["objectClass"], &[]),
        object_class(
            "2.5.17.0",
            "subentry",
            s,
            &["top"],
            ObjectClassKind::Structural,
            &["cn", "subtreeSpecification"],
            &[],
        ),
        object_class(
            "2.5.17.1",
            "accessControlSubentry",
            s,
            &["top"],
            ObjectClassKind::Auxiliary,
            &["prescriptiveACI"],
            &[],
        ),
        object_class(
            "2.5.17.2",
            "collectiveAttributeSubentry",
            s,
            &["top"],
            ObjectClassKind::Auxiliary,
            &[],
            &[],
        ),
        object_class("2.5.20.1", "subschema", s, &["top"], ObjectClassKind::Auxiliary, &[], &[]),
        object_class(
            "1.3.6.1.4.1.18060.0.4.1.4.11",
            "triggerExecutionSubentry",
            s,
            &["top"],
            ObjectClassKind::Auxiliary,
            &[],
            &[],
        ),
        object_class(
            "2.16.840.1.113730.3.2.6",
            "referral",
            s,
            &["top"],
            ObjectClassKind::Structural,
            &["ref"],
            &[],
        ),
        object_class(
            "1.3.6.1.4.1.1466.101.120.111",
            "extensibleObject",
            s,
            &["top"],
            ObjectClassKind::Auxiliary,
            &[],
            &[],
        ),
    ]
}

fn core_schema() -> Vec<SchemaObject> {
    let s = SCHEMA_NAME_CORE;
    vec![
        SchemaObject::AttributeType(sub_attribute_type("2.5.4.3", &["cn", "commonName"], s, "name")),
        SchemaObject::AttributeType(sub_attribute_type("2.5.4.4", &["sn", "surname"], s, "name")),
        SchemaObject::AttributeType(sub_attribute_type(
            "2.5.4.11",
            &["ou", "organizationalUnitName"],
            s,
            "name",
        )),
        SchemaObject::AttributeType(sub_attribute_type(
            "2.5.4.10",
            &["o", "organizationName"],
            s,
            "name",
        )),
        SchemaObject::AttributeType(sub_attribute_type("2.5.4.7", &["l", "localityName"], s, "name")),
        SchemaObject::AttributeType(sub_attribute_type(
            "2.5.4.8",
            &["st", "stateOrProvinceName"],
            s,
            "name",
        )),
        SchemaObject::AttributeType(sub_attribute_type("2.5.4.42", &["givenName"], s, "name")),
        SchemaObject::AttributeType(attribute_type(
            "2.5.4.13",
            &["description"],
            s,
            SYNTAX_DIRECTORY_STRING,
            MR_CASE_IGNORE,
        )),
        SchemaObject::AttributeType(attribute_type(
            "2.5.4.35",
            &["userPassword"],
            s,
            SYNTAX_OCTET_STRING,
            MR_OCTET_STRING,
        )),
        SchemaObject::AttributeType(attribute_type(
            "2.5.4.20",
            &["telephoneNumber"],
            s,
            SYNTAX_TELEPHONE_NUMBER,
            MR_TELEPHONE_NUMBER,
        )),
        SchemaObject::AttributeType(attribute_type(
            "2.5.4.17",
            &["postalCode"],
            s,
            SYNTAX_DIRECTORY_STRING,
            MR_CASE_IGNORE,
        )),
        SchemaObject::AttributeType(single(attribute_type(
            "0.9.2342.19200300.100.1.25",
            &["dc", "domainComponent"],
            s,
            SYNTAX_IA5_STRING,
            MR_CASE_IGNORE_IA5,
        ))),
        SchemaObject::AttributeType(attribute_type(
            "0.9.2342.19200300.100.1.1",
            &["uid", "userid"],
            s,
            SYNTAX_DIRECTORY_STRING,
            MR_CASE_IGNORE,
        )),
        SchemaObject::AttributeType(attribute_type(
            "0.9.2342.19200300.100.1.3",
            &["mail"],
            s,
            SYNTAX_IA5_STRING,
            MR_CASE_IGNORE_IA5,
        )),
        SchemaObject::AttributeType(single(attribute_type(
            "2.16.840.1.113730.3.1.241",
            &["displayName"],
            s,
            SYNTAX_DIRECTORY_STRING,
            MR_CASE_IGNORE,
        ))),
        object_class(
            "2.5.6.6",
            "person",
            s,
            &["top"],
            ObjectClassKind::Structural,
            &["sn", "cn"],
            &["userPassword", "telephoneNumber", "description"],
        ),
        object_class(
            "2.5.6.7",
            "organizationalPerson",
            s,
            &["person"],
            ObjectClassKind::Structural,
            &[],
            &["ou", "l", "st", "postalCode"],
        ),
        object_class(
            "2.16.840.1.113730.3.2.2",
            "inetOrgPerson",
            s,
            &["organizationalPerson"],
            ObjectClassKind::Structural,
            &[],
            &["uid", "mail", "displayName", "givenName"],
        ),
        object_class(
            "2.5.6.4",
            "organization",
            s,
            &["top"],
            ObjectClassKind::Structural,
            &["o"],
            &["description", "l", "st"],
        ),
        object_class(
            "2.5.6.5",
            "organizationalUnit",
            s,
            &["top"],
            ObjectClassKind::Structural,
            &["ou"],
            &["description", "l", "st", "postalCode"],
        ),
        object_class(
            "0.9.2342.19200300.100.4.13",
            "domain",
            s,
            &["top"],
            ObjectClassKind::Structural,
            &["dc"],
            &["description", "o"],
        ),
        object_class(
            "1.3.6.1.4.1.1466.344",
            "dcObject",
            s,
            &["top"],
            ObjectClassKind::Auxiliary,
            &["dc"],
            &[],
        ),
    ]
}

fn collective_schema() -> Vec<SchemaObject> {
    let s = SCHEMA_NAME_COLLECTIVE;
    [
        ("2.5.4.7.1", "c-l", "l"),
        ("2.5.4.8.1", "c-st", "st"),
        ("2.5.4.10.1", "c-o", "o"),
        ("2.5.4.11.1", "c-ou", "ou"),
        ("2.5.4.17.1", "c-postalCode", "postalCode"),
        ("2.5.4.20.1", "c-telephoneNumber", "telephoneNumber"),
    ]
    .into_iter()
    .map(|(oid, name, sup)| {
        SchemaObject::AttributeType(AttributeType {
            collective: true,
            ..sub_attribute_type(oid, &[name], s, sup)
        })
    })
    .collect()
}

fn meta_schema() -> Vec<SchemaObject> {
    let s = SCHEMA_NAME_META;
    let mut objects: Vec<SchemaObject> = [
        ("1", "m-oid", SYNTAX_OID, MR_OBJECT_IDENTIFIER, true),
        ("2", "m-name", SYNTAX_DIRECTORY_STRING, MR_CASE_IGNORE, false),
        ("3", "m-description", SYNTAX_DIRECTORY_STRING, MR_CASE_IGNORE, true),
        ("4", "m-supAttributeType", SYNTAX_OID, MR_OBJECT_IDENTIFIER, true),
        ("5", "m-syntax", SYNTAX_OID, MR_OBJECT_IDENTIFIER, true),
        ("6", "m-equality", SYNTAX_OID, MR_OBJECT_IDENTIFIER, true),
        ("7", "m-singleValue", SYNTAX_BOOLEAN, MR_BOOLEAN, true),
        ("8", "m-collective", SYNTAX_BOOLEAN, MR_BOOLEAN, true),
        ("9", "m-noUserModification", SYNTAX_BOOLEAN, MR_BOOLEAN, true),
        ("10", "m-usage", SYNTAX_DIRECTORY_STRING, MR_CASE_IGNORE, true),
        ("11", "m-supObjectClass", SYNTAX_OID, MR_OBJECT_IDENTIFIER, false),
        ("12", "m-typeObjectClass", SYNTAX_DIRECTORY_STRING, MR_CASE_IGNORE, true),
        ("13", "m-must", SYNTAX_OID, MR_OBJECT_IDENTIFIER, false),
        ("14", "m-may", SYNTAX_OID, MR_OBJECT_IDENTIFIER, false),
        ("15", "m-fqcn", SYNTAX_DIRECTORY_STRING, MR_CASE_EXACT, true),
        ("16", "m-disabled", SYNTAX_BOOLEAN, MR_BOOLEAN, true),
        ("17", "m-dependencies", SYNTAX_DIRECTORY_STRING, MR_CASE_IGNORE, false),
        ("18", "m-owner", SYNTAX_DIRECTORY_STRING, MR_CASE_IGNORE, true),
    ]
    .into_iter()
    .map(|(suffix, name, syntax, equality, single_value)| {
        let oid = format!("1.3.6.1.4.1.18060.0.4.0.2.{}", suffix);
        SchemaObject::AttributeType(AttributeType {
            single_value,
            ..attribute_type(&oid, &[name], s, syntax, equality)
        })
    })
    .collect();

    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.1",
        "metaTop",
        s,
        &["top"],
        ObjectClassKind::Abstract,
        &["m-oid"],
        &["m-name", "m-description", "m-disabled"],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.2",
        "metaSchema",
        s,
        &["top"],
        ObjectClassKind::Structural,
        &["cn"],
        &["m-owner", "m-dependencies", "m-disabled"],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.3",
        "metaAttributeType",
        s,
        &["metaTop"],
        ObjectClassKind::Structural,
        &[],
        &[
            "m-supAttributeType",
            "m-syntax",
            "m-equality",
            "m-singleValue",
            "m-collective",
            "m-noUserModification",
            "m-usage",
        ],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.4",
        "metaObjectClass",
        s,
        &["metaTop"],
        ObjectClassKind::Structural,
        &[],
        &["m-supObjectClass", "m-typeObjectClass", "m-must", "m-may"],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.5",
        "metaSyntax",
        s,
        &["metaTop"],
        ObjectClassKind::Structural,
        &[],
        &[],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.6",
        "metaMatchingRule",
        s,
        &["metaTop"],
        ObjectClassKind::Structural,
        &["m-syntax"],
        &[],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.7",
        "metaNormalizer",
        s,
        &["metaTop"],
        ObjectClassKind::Structural,
        &["m-fqcn"],
        &[],
    ));
    objects.push(object_class(
        "1.3.6.1.4.1.18060.0.4.0.3.8",
        "metaComparator",
        s,
        &["metaTop"],
        ObjectClassKind::Structural,
        &["m-fqcn"],
        &[],
    ));
    objects
}

lazy_static! {
    /// Every bootstrap schema paired with its elements, in dependency order.
    pub static ref BOOTSTRAP_SCHEMAS: Vec<(Schema, Vec<SchemaObject>)> = vec![
        (Schema::new(SCHEMA_NAME_SYSTEM, &[]), system_schema()),
        (Schema::new(SCHEMA_NAME_CORE, &[SCHEMA_NAME_SYSTEM]), core_schema()),
        (Schema::new(SCHEMA_NAME_META, &[SCHEMA_NAME_SYSTEM, SCHEMA_NAME_CORE]), meta_schema()),
        (
            Schema::new(SCHEMA_NAME_COLLECTIVE, &[SCHEMA_NAME_CORE]),
            collective_schema()
        ),
    ];
}
