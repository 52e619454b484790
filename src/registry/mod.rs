//! Ontology registries: types, relations, and the snapshot that bundles them.
//!
//! An [`Ontology`] is an immutable value passed explicitly into validation and
//! inference. [`SharedOntology`] publishes new snapshots copy-on-write so
//! readers always hold a complete, consistent registry pair.

pub mod relations;
pub mod types;

use std::sync::{Arc, RwLock};

use crate::error::RegistryResult;

pub use relations::{OntologyRelation, RelationRegistry, validate_relation_definition};
pub use types::{DEFAULT_MAX_DEPTH, OntologyType, TypeRegistry, validate_type_definition};

/// A consistent pair of type and relation registries.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    types: TypeRegistry,
    relations: RelationRegistry,
}

impl Ontology {
    /// Bundle registries. Every relation in `relations` must already have been
    /// registered against `types`.
    pub fn new(types: TypeRegistry, relations: RelationRegistry) -> Self {
        Self { types, relations }
    }

    /// Build an ontology from type and relation definitions in one step.
    pub fn from_definitions(
        types: impl IntoIterator<Item = OntologyType>,
        relations: impl IntoIterator<Item = OntologyRelation>,
        max_depth: usize,
    ) -> RegistryResult<Self> {
        let types = TypeRegistry::from_definitions(types, max_depth)?;
        let mut registry = RelationRegistry::new();
        for rel in relations {
            registry.register(rel, &types)?;
        }
        Ok(Self::new(types, registry))
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn relations(&self) -> &RelationRegistry {
        &self.relations
    }

    pub fn get_type(&self, type_id: &str) -> Option<&OntologyType> {
        self.types.get_type(type_id)
    }

    pub fn get_relation(&self, relation_id: &str) -> Option<&OntologyRelation> {
        self.relations.get_relation(relation_id)
    }

    pub fn is_subtype_of(&self, candidate: &str, ancestor: &str) -> bool {
        self.types.is_subtype_of(candidate, ancestor)
    }

    /// Whether the given subject and object types satisfy the relation's
    /// domain and range. Absent constraints always pass.
    pub fn check_domain_range(
        &self,
        relation: &OntologyRelation,
        subject_type: &str,
        object_type: &str,
    ) -> bool {
        let domain_ok = relation
            .domain
            .as_ref()
            .is_none_or(|d| self.is_subtype_of(subject_type, d.as_str()));
        let range_ok = relation
            .range
            .as_ref()
            .is_none_or(|r| self.is_subtype_of(object_type, r.as_str()));
        domain_ok && range_ok
    }

    /// Copy of this ontology with one more type.
    pub fn with_type(&self, ty: OntologyType) -> RegistryResult<Self> {
        let mut next = self.clone();
        next.types.register(ty)?;
        Ok(next)
    }

    /// Copy of this ontology with one more relation.
    pub fn with_relation(&self, rel: OntologyRelation) -> RegistryResult<Self> {
        let mut next = self.clone();
        next.relations.register(rel, &self.types)?;
        Ok(next)
    }
}

/// Read-mostly handle publishing [`Ontology`] snapshots.
///
/// Readers take an `Arc` and never block writers for longer than the pointer
/// swap. Registration validates against a private copy and only publishes
/// on success.
#[derive(Debug, Default)]
pub struct SharedOntology {
    current: RwLock<Arc<Ontology>>,
}

impl SharedOntology {
    pub fn new(ontology: Ontology) -> Self {
        Self {
            current: RwLock::new(Arc::new(ontology)),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Ontology> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Register a type and publish the resulting snapshot.
    pub fn register_type(&self, ty: OntologyType) -> RegistryResult<Arc<Ontology>> {
        self.update(|current| current.with_type(ty))
    }

    /// Register a relation and publish the resulting snapshot.
    pub fn register_relation(&self, rel: OntologyRelation) -> RegistryResult<Arc<Ontology>> {
        self.update(|current| current.with_relation(rel))
    }

    fn update(
        &self,
        apply: impl FnOnce(&Ontology) -> RegistryResult<Ontology>,
    ) -> RegistryResult<Arc<Ontology>> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = Arc::new(apply(&guard)?);
        *guard = Arc::clone(&next);
        Ok(next)
    }
}
