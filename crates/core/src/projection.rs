//! Field projection parsed from `select` + `relations`.

use std::collections::{BTreeMap, BTreeSet};

use crate::entity::EntitySchema;
use crate::error::RepositoryError;
use crate::query::FindConfig;

/// Requested shape for one level of an entity graph.
///
/// - `fields == None` means every scalar field.
/// - `id` is always included, whatever was selected.
/// - A dotted select path (`product.title`) implies the relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Option<BTreeSet<String>>,
    relations: BTreeMap<String, Projection>,
}

impl Projection {
    /// All scalar fields, no relations.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FindConfig) -> Self {
        let mut root = Projection::all();

        for path in &config.relations {
            root.node_mut(path.split('.'));
        }

        if !config.select.is_empty() {
            root.fields = Some(BTreeSet::new());
        }
        for path in &config.select {
            let (node, field) = match path.rsplit_once('.') {
                Some((relation, field)) => (root.node_mut(relation.split('.')), field),
                None => (&mut root, path.as_str()),
            };
            node.fields
                .get_or_insert_with(BTreeSet::new)
                .insert(field.to_string());
        }

        root
    }

    fn node_mut<'a>(&mut self, mut path: impl Iterator<Item = &'a str>) -> &mut Projection {
        match path.next() {
            Some(segment) => self
                .relations
                .entry(segment.to_string())
                .or_default()
                .node_mut(path),
            None => self,
        }
    }

    /// Whether `field` is part of this level's output.
    pub fn includes(&self, field: &str) -> bool {
        field == "id" || self.fields.as_ref().is_none_or(|f| f.contains(field))
    }

    /// True when no explicit field list was given for this level.
    pub fn is_full(&self) -> bool {
        self.fields.is_none()
    }

    pub fn relation(&self, name: &str) -> Option<&Projection> {
        self.relations.get(name)
    }

    /// Check every field and relation against `schema`, recursively.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), RepositoryError> {
        if let Some(fields) = &self.fields {
            for field in fields {
                if !schema.has_column(field) {
                    return Err(RepositoryError::UnknownField {
                        entity: schema.name,
                        field: field.clone(),
                    });
                }
            }
        }
        for (name, child) in &self.relations {
            let target = schema
                .relation(name)
                .ok_or_else(|| RepositoryError::UnknownRelation {
                    entity: schema.name,
                    relation: name.clone(),
                })?;
            child.validate(target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PRODUCT: EntitySchema = EntitySchema {
        name: "Product",
        table: "product",
        columns: &["id", "title", "status"],
        relations: &[("tags", &TAG)],
    };

    static TAG: EntitySchema = EntitySchema {
        name: "ProductTag",
        table: "product_tag",
        columns: &["id", "value"],
        relations: &[],
    };

    static VARIANT: EntitySchema = EntitySchema {
        name: "ProductVariant",
        table: "product_variant",
        columns: &["id", "title", "product_id"],
        relations: &[("product", &PRODUCT)],
    };

    #[test]
    fn no_select_means_every_field() {
        let p = Projection::from_config(&FindConfig::new());
        assert!(p.is_full());
        assert!(p.includes("title"));
        assert!(p.relation("product").is_none());
    }

    #[test]
    fn select_narrows_root_and_relation_fields() {
        let config = FindConfig::new()
            .select(["id", "title", "product.title"])
            .relations(["product"]);
        let p = Projection::from_config(&config);

        assert!(p.includes("title"));
        assert!(!p.includes("product_id"));

        let product = p.relation("product").unwrap();
        assert!(product.includes("id"));
        assert!(product.includes("title"));
        assert!(!product.includes("status"));
    }

    #[test]
    fn dotted_select_implies_relation() {
        let p = Projection::from_config(&FindConfig::new().select(["product.title"]));
        assert!(p.relation("product").is_some());
        assert!(p.includes("id"));
        assert!(!p.includes("title"));
    }

    #[test]
    fn relation_without_selected_fields_is_full() {
        let config = FindConfig::new().select(["title"]).relations(["product"]);
        let p = Projection::from_config(&config);
        assert!(p.relation("product").unwrap().is_full());
    }

    #[test]
    fn nested_relations_parse_into_tree() {
        let p = Projection::from_config(&FindConfig::new().relations(["product.tags"]));
        assert!(p.relation("product").unwrap().relation("tags").is_some());
        assert!(p.validate(&VARIANT).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_relation_and_field() {
        let p = Projection::from_config(&FindConfig::new().relations(["supplier"]));
        assert!(matches!(
            p.validate(&VARIANT),
            Err(RepositoryError::UnknownRelation { relation, .. }) if relation == "supplier"
        ));

        let p = Projection::from_config(&FindConfig::new().select(["product.colour"]));
        assert!(matches!(
            p.validate(&VARIANT),
            Err(RepositoryError::UnknownField { entity: "Product", .. })
        ));
    }
}
