//! Entity trait: identity plus the table metadata repositories validate against.

/// Static description of a persisted entity.
///
/// Schemas reference each other through `relations`, so a query that reaches
/// `product.title` from a variant can be checked without touching storage.
#[derive(Debug)]
pub struct EntitySchema {
    /// Human-readable entity name, used in error messages ("ProductVariant").
    pub name: &'static str,
    /// Backing table name.
    pub table: &'static str,
    /// Scalar columns that can be filtered, selected and ordered on.
    pub columns: &'static [&'static str],
    /// Named relations and the schema on the other side.
    pub relations: &'static [(&'static str, &'static EntitySchema)],
}

impl EntitySchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn relation(&self, name: &str) -> Option<&'static EntitySchema> {
        self.relations
            .iter()
            .find(|(rel, _)| *rel == name)
            .map(|(_, schema)| *schema)
    }
}

/// Entity marker + minimal interface.
pub trait Entity {
    /// Entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the static schema describing this entity.
    fn schema() -> &'static EntitySchema;
}
