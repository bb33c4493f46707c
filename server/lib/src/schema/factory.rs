//! Builds schema elements from the meta-schema entries that describe them.

use super::normalizers::{Comparator, Normalizer};
use super::objects::*;
use crate::prelude::*;

fn invalid(entry: &Entry, msg: &str) -> OperationError {
    OperationError::SchemaViolation(SchemaError::InvalidSchemaEntry(format!(
        "{}: {}",
        entry.dn(),
        msg
    )))
}

fn required<'a>(entry: &'a Entry, attr: &Attribute) -> Result<&'a str, OperationError> {
    entry
        .get_ava_single(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid(entry, &format!("{} is required", attr)))
}

fn optional(entry: &Entry, attr: &Attribute) -> Option<String> {
    entry.get_ava_single(attr).map(|v| v.trim().to_string())
}

fn multi(entry: &Entry, attr: &Attribute) -> Vec<String> {
    entry
        .get_ava(attr)
        .map(|vs| vs.iter().map(|v| v.trim().to_string()).collect())
        .unwrap_or_default()
}

fn boolean(entry: &Entry, attr: &Attribute) -> Result<bool, OperationError> {
    match entry.get_ava_single(attr).map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case(VALUE_TRUE) => Ok(true),
        Some(v) if v.eq_ignore_ascii_case(VALUE_FALSE) => Ok(false),
        Some(v) => Err(invalid(entry, &format!("{} is not a boolean: {}", attr, v))),
    }
}

/// The kind of element a meta-schema entry describes, if it describes one.
pub fn kind_of(entry: &Entry) -> Option<SchemaObjectKind> {
    SchemaObjectKind::all()
        .into_iter()
        .find(|k| entry.has_class(k.entry_class()))
}

pub fn is_schema_entry(entry: &Entry) -> bool {
    entry.has_class(EntryClass::MetaSchema)
}

/// `m-disabled: TRUE`. Anything else, including absence, is enabled.
pub fn is_disabled(entry: &Entry) -> bool {
    entry
        .get_ava_single(&Attribute::MDisabled)
        .map(|v| v.trim().eq_ignore_ascii_case(VALUE_TRUE))
        .unwrap_or(false)
}

pub fn schema(entry: &Entry) -> Result<Schema, OperationError> {
    let name = required(entry, &Attribute::Cn)?;
    Ok(Schema {
        name: name.to_string(),
        enabled: !is_disabled(entry),
        dependencies: multi(entry, &Attribute::MDependencies),
        owner: optional(entry, &Attribute::MOwner),
        stashed: Vec::new(),
    })
}

#[instrument(level = "trace", name = "schema::factory", skip_all)]
pub fn schema_object(
    kind: SchemaObjectKind,
    entry: &Entry,
    schema_name: &str,
) -> Result<SchemaObject, OperationError> {
    let meta = SchemaMeta {
        oid: required(entry, &Attribute::MOid)?.to_string(),
        names: multi(entry, &Attribute::MName),
        description: optional(entry, &Attribute::MDescription),
        schema: schema_name.to_string(),
        enabled: !is_disabled(entry),
    };

    let obj = match kind {
        SchemaObjectKind::Syntax => SchemaObject::Syntax(LdapSyntax { meta }),
        SchemaObjectKind::Comparator => {
            let fqcn = required(entry, &Attribute::MFqcn)?;
            if Comparator::from_fqcn(fqcn).is_none() {
                return Err(OperationError::SchemaViolation(SchemaError::UnknownComparator(
                    fqcn.to_string(),
                )));
            }
            SchemaObject::Comparator(ComparatorDescription {
                meta,
                fqcn: fqcn.to_string(),
            })
        }
        SchemaObjectKind::Normalizer => {
            let fqcn = required(entry, &Attribute::MFqcn)?;
            if Normalizer::from_fqcn(fqcn).is_none() {
                return Err(OperationError::SchemaViolation(SchemaError::UnknownNormalizer(
                    fqcn.to_string(),
                )));
            }
            SchemaObject::Normalizer(NormalizerDescription {
                meta,
                fqcn: fqcn.to_string(),
            })
        }
        SchemaObjectKind::MatchingRule => SchemaObject::MatchingRule(MatchingRule {
            meta,
            syntax: required(entry, &Attribute::MSyntax)?.to_string(),
        }),
        SchemaObjectKind::AttributeType => {
            let usage = match optional(entry, &Attribute::MUsage) {
                None => AttributeUsage::default(),
                Some(u) => AttributeUsage::parse(&u)
                    .ok_or_else(|| invalid(entry, &format!("unknown usage {}", u)))?,
            };
            let at = AttributeType {
                superior: optional(entry, &Attribute::MSupAttributeType),
                syntax: optional(entry, &Attribute::MSyntax),
                equality: optional(entry, &Attribute::MEquality),
                single_value: boolean(entry, &Attribute::MSingleValue)?,
                collective: boolean(entry, &Attribute::MCollective)?,
                no_user_modification: boolean(entry, &Attribute::MNoUserModification)?,
                usage,
                meta,
            };
            if at.syntax.is_none() && at.superior.is_none() {
                return Err(invalid(entry, "an attribute type needs a syntax or a superior"));
            }
            if at.superior.as_deref().map(|s| at.meta.is_named(s)).unwrap_or(false) {
                return Err(invalid(entry, "an attribute type can't be its own superior"));
            }
            SchemaObject::AttributeType(at)
        }
        SchemaObjectKind::ObjectClass => {
            let kind = match optional(entry, &Attribute::MTypeObjectClass) {
                None => ObjectClassKind::default(),
                Some(k) => ObjectClassKind::parse(&k)
                    .ok_or_else(|| invalid(entry, &format!("unknown object class type {}", k)))?,
            };
            let oc = ObjectClass {
                superiors: multi(entry, &Attribute::MSupObjectClass),
                kind,
                must: multi(entry, &Attribute::MMust),
                may: multi(entry, &Attribute::MMay),
                meta,
            };
            if oc.superiors.iter().any(|s| oc.meta.is_named(s)) {
                return Err(invalid(entry, "an object class can't be its own superior"));
            }
            SchemaObject::ObjectClass(oc)
        }
    };
    schema_trace!(%obj, "built from entry");
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute_type_entry() -> Entry {
        entry_init!(
            Dn::parse("m-oid=1.3.6.1.4.1.9999.1,ou=attributetypes,cn=other,ou=schema").expect("dn"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaTop.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaAttributeType.as_ref()),
            (Attribute::MOid, "1.3.6.1.4.1.9999.1"),
            (Attribute::MName, "favouriteColour"),
            (Attribute::MSyntax, SYNTAX_DIRECTORY_STRING),
            (Attribute::MEquality, MR_CASE_IGNORE),
            (Attribute::MSingleValue, "TRUE")
        )
    }

    #[test]
    fn test_factory_attribute_type() {
        let e = attribute_type_entry();
        assert_eq!(kind_of(&e), Some(SchemaObjectKind::AttributeType));
        let obj = schema_object(SchemaObjectKind::AttributeType, &e, "other").expect("build");
        let SchemaObject::AttributeType(at) = obj else {
            unreachable!()
        };
        assert!(at.single_value);
        assert!(!at.collective);
        assert!(at.meta.enabled);
        assert_eq!(at.meta.name(), "favouriteColour");
        assert_eq!(at.meta.schema, "other");
    }

    #[test]
    fn test_factory_rejects_bad_entries() {
        let mut e = attribute_type_entry();
        e.set_ava(Attribute::MSingleValue, ["maybe"]);
        assert!(matches!(
            schema_object(SchemaObjectKind::AttributeType, &e, "other"),
            Err(OperationError::SchemaViolation(SchemaError::InvalidSchemaEntry(_)))
        ));

        let normalizer = entry_init!(
            Dn::parse("m-oid=1.2.3,ou=normalizers,cn=other,ou=schema").expect("dn"),
            (Attribute::ObjectClass, EntryClass::MetaNormalizer.as_ref()),
            (Attribute::MOid, "1.2.3"),
            (Attribute::MFqcn, "com.example.NoSuchNormalizer")
        );
        assert_eq!(
            schema_object(SchemaObjectKind::Normalizer, &normalizer, "other"),
            Err(OperationError::SchemaViolation(SchemaError::UnknownNormalizer(
                "com.example.NoSuchNormalizer".to_string()
            )))
        );
    }

    #[test]
    fn test_factory_schema() {
        let e = entry_init!(
            Dn::parse("cn=other,ou=schema").expect("dn"),
            (Attribute::ObjectClass, EntryClass::MetaSchema.as_ref()),
            (Attribute::Cn, "other"),
            (Attribute::MDependencies, "core"),
            (Attribute::MDisabled, "TRUE")
        );
        let s = schema(&e).expect("schema");
        assert_eq!(s.name, "other");
        assert!(!s.enabled);
        assert!(s.depends_on("CORE"));
        assert!(is_disabled(&e));
    }
}
