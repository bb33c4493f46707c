use super::SchemaObjectSynchronizer;
use crate::schema::objects::SchemaObjectKind;

pub struct ObjectClassSynchronizer;

impl SchemaObjectSynchronizer for ObjectClassSynchronizer {
    fn kind(&self) -> SchemaObjectKind {
        SchemaObjectKind::ObjectClass
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{attribute_type, element_dn, manager};
    use super::super::{add, delete, move_entry, SchemaChange};
    use crate::prelude::*;
    use crate::schema::objects::{ObjectClassKind, Schema, SchemaObjectKind};
    use crate::schema::SchemaTransaction;

    fn object_class(oid: &str, name: &str, must: &str) -> Entry {
        entry_init!(
            element_dn(SchemaObjectKind::ObjectClass, oid, "other"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaTop.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaObjectClass.as_ref()),
            (Attribute::MOid, oid),
            (Attribute::MName, name),
            (Attribute::MSupObjectClass, "top"),
            (Attribute::MTypeObjectClass, "AUXILIARY"),
            (Attribute::MMust, must)
        )
    }

    #[test]
    fn test_object_class_lifecycle() {
        let schema = manager();
        let mut sw = schema.write();
        let at = attribute_type("1.3.6.1.4.1.9999.20", "badgeNumber", "other");
        let oc = object_class("1.3.6.1.4.1.9999.21", "badgeHolder", "badgeNumber");

        // The must attribute isn't there yet.
        assert_eq!(
            add(&mut sw, &oc),
            Err(OperationError::SchemaViolation(SchemaError::NoSuchOid(
                "badgeNumber".to_string()
            )))
        );
        assert!(add(&mut sw, &at).is_ok());
        assert_eq!(add(&mut sw, &oc), Ok(SchemaChange::Modified));
        let registered = sw.lookup_object_class("badgeholder").expect("registered");
        assert_eq!(registered.kind, ObjectClassKind::Auxiliary);

        // The attribute is now in use.
        assert!(matches!(
            delete(&mut sw, &at, false),
            Err(OperationError::SchemaViolation(SchemaError::HasDependents { .. }))
        ));
        assert!(delete(&mut sw, &oc, false).is_ok());
        assert!(delete(&mut sw, &at, false).is_ok());
    }

    #[test]
    fn test_object_class_move_to_disabled_schema() {
        let schema = manager();
        let mut sw = schema.write();
        let mut idle = Schema::new("idle", &[SCHEMA_NAME_CORE]);
        idle.enabled = false;
        assert!(sw.add_schema(idle).is_ok());

        let oc = object_class("1.3.6.1.4.1.9999.22", "roaming", "cn");
        assert!(add(&mut sw, &oc).is_ok());
        let new_parent = Dn::parse("ou=objectclasses,cn=idle,ou=schema").expect("dn");
        assert_eq!(
            move_entry(&mut sw, &oc, &new_parent, false),
            Ok(SchemaChange::Modified)
        );
        // Known, but no longer active.
        assert!(sw.lookup_object_class("roaming").is_none());
        assert!(sw
            .get_registries()
            .contains_oid(SchemaObjectKind::ObjectClass, "1.3.6.1.4.1.9999.22"));

        let wrong = Dn::parse("ou=attributetypes,cn=idle,ou=schema").expect("dn");
        assert!(matches!(
            move_entry(&mut sw, &oc, &wrong, false),
            Err(OperationError::NamingViolation(_))
        ));
    }
}
