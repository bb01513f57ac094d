//! Schema derivation for stores without native introspection.

use graphmem_protocols::{Entity, GraphSchema, Relation};

/// Labels and keys seen in a sample of entities and their outgoing relations.
pub(crate) fn derive_schema(entities: &[Entity], relations: &[Relation]) -> GraphSchema {
    let mut schema = GraphSchema::default();
    for entity in entities {
        schema.entity_types.push(entity.entity_type.clone());
        schema
            .entity_property_keys
            .extend(entity.metadata.keys().cloned());
    }
    for relation in relations {
        schema.relation_types.push(relation.relation_type.clone());
        schema
            .relation_property_keys
            .extend(relation.properties.keys().cloned());
    }
    schema.normalize()
}
