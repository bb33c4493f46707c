use super::SchemaObjectSynchronizer;
use crate::schema::objects::SchemaObjectKind;

pub struct SyntaxSynchronizer;

impl SchemaObjectSynchronizer for SyntaxSynchronizer {
    fn kind(&self) -> SchemaObjectKind {
        SchemaObjectKind::Syntax
    }
}
