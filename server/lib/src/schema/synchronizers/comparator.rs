use super::SchemaObjectSynchronizer;
use crate::schema::objects::SchemaObjectKind;

pub struct ComparatorSynchronizer;

impl SchemaObjectSynchronizer for ComparatorSynchronizer {
    fn kind(&self) -> SchemaObjectKind {
        SchemaObjectKind::Comparator
    }
}
