use super::SchemaObjectSynchronizer;
use crate::schema::objects::SchemaObjectKind;

pub struct AttributeTypeSynchronizer;

impl SchemaObjectSynchronizer for AttributeTypeSynchronizer {
    fn kind(&self) -> SchemaObjectKind {
        SchemaObjectKind::AttributeType
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{attribute_type, element_dn, manager};
    use super::super::{add, delete, modify, rename, SchemaChange};
    use crate::prelude::*;
    use crate::schema::objects::SchemaObjectKind;
    use crate::schema::SchemaTransaction;

    #[test]
    fn test_attribute_type_add_and_duplicate() {
        let schema = manager();
        let mut sw = schema.write();
        let e = attribute_type("1.3.6.1.4.1.9999.1", "favouriteColour", "other");
        assert_eq!(add(&mut sw, &e), Ok(SchemaChange::Modified));
        assert!(sw.lookup_attribute_type("favouritecolour").is_some());

        let before = sw.get_registries().count(SchemaObjectKind::AttributeType);
        let dup = attribute_type("1.3.6.1.4.1.9999.1", "otherColour", "other");
        assert_eq!(
            add(&mut sw, &dup),
            Err(OperationError::SchemaViolation(SchemaError::OidAlreadyExists(
                "1.3.6.1.4.1.9999.1".to_string()
            )))
        );
        assert_eq!(
            sw.get_registries().count(SchemaObjectKind::AttributeType),
            before
        );
        assert!(sw.lookup_attribute_type("otherColour").is_none());
    }

    #[test]
    fn test_attribute_type_wrong_container() {
        let schema = manager();
        let mut sw = schema.write();
        let mut e = attribute_type("1.3.6.1.4.1.9999.2", "misplaced", "other");
        e.set_dn(element_dn(SchemaObjectKind::ObjectClass, "1.3.6.1.4.1.9999.2", "other"));
        assert!(matches!(
            add(&mut sw, &e),
            Err(OperationError::NamingViolation(_))
        ));
    }

    #[test]
    fn test_attribute_type_delete_with_descendants() {
        let schema = manager();
        let mut sw = schema.write();
        let parent = attribute_type("1.3.6.1.4.1.9999.3", "colour", "other");
        let mut child = attribute_type("1.3.6.1.4.1.9999.4", "hairColour", "other");
        child.set_ava(Attribute::MSupAttributeType, ["colour"]);
        assert!(add(&mut sw, &parent).is_ok());
        assert!(add(&mut sw, &child).is_ok());

        assert!(matches!(
            delete(&mut sw, &parent, false),
            Err(OperationError::SchemaViolation(SchemaError::HasDescendants { .. }))
        ));
        assert!(matches!(
            delete(&mut sw, &child, true),
            Err(OperationError::UnwillingToPerform(_))
        ));
        assert_eq!(delete(&mut sw, &child, false), Ok(SchemaChange::Modified));
        assert_eq!(delete(&mut sw, &parent, false), Ok(SchemaChange::Modified));
        assert!(sw.lookup_attribute_type("colour").is_none());
    }

    #[test]
    fn test_attribute_type_modify_and_disable() {
        let schema = manager();
        let mut sw = schema.write();
        let before = attribute_type("1.3.6.1.4.1.9999.5", "shoeSize", "other");
        assert!(add(&mut sw, &before).is_ok());

        // Same definition, nothing to do.
        assert_eq!(
            modify(&mut sw, &before, &before.clone(), false),
            Ok(SchemaChange::Unchanged)
        );

        let mut after = before.clone();
        after.set_ava(Attribute::MSingleValue, ["TRUE"]);
        assert_eq!(modify(&mut sw, &before, &after, false), Ok(SchemaChange::Modified));
        assert!(sw.is_single_value(&Attribute::from_str("shoeSize")));

        let mut disabled = after.clone();
        disabled.set_ava(Attribute::MDisabled, ["TRUE"]);
        assert_eq!(modify(&mut sw, &after, &disabled, false), Ok(SchemaChange::Modified));
        assert!(sw.lookup_attribute_type("shoeSize").is_none());
        assert!(sw
            .get_registries()
            .contains_oid(SchemaObjectKind::AttributeType, "1.3.6.1.4.1.9999.5"));

        assert_eq!(modify(&mut sw, &disabled, &after, false), Ok(SchemaChange::Modified));
        assert!(sw.lookup_attribute_type("shoeSize").is_some());
    }

    #[test]
    fn test_attribute_type_rename() {
        let schema = manager();
        let mut sw = schema.write();
        let e = attribute_type("1.3.6.1.4.1.9999.6", "petName", "other");
        assert!(add(&mut sw, &e).is_ok());

        assert!(matches!(
            rename(&mut sw, &e, &Rdn::new(Attribute::Cn, "petName"), false),
            Err(OperationError::NamingViolation(_))
        ));
        assert!(matches!(
            rename(&mut sw, &e, &Rdn::new(Attribute::MOid, "2.5.4.3"), false),
            Err(OperationError::SchemaViolation(SchemaError::OidAlreadyExists(_)))
        ));
        assert_eq!(
            rename(&mut sw, &e, &Rdn::new(Attribute::MOid, "1.3.6.1.4.1.9999.7"), false),
            Ok(SchemaChange::Modified)
        );
        let at = sw.lookup_attribute_type("petName").expect("renamed");
        assert_eq!(at.meta.oid, "1.3.6.1.4.1.9999.7");
        assert!(!sw
            .get_registries()
            .contains_oid(SchemaObjectKind::AttributeType, "1.3.6.1.4.1.9999.6"));
    }
}
