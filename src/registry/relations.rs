//! Relation registry: relation definitions with domain/range constraints
//! and algebraic flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::symbol::{RelationId, TypeId};

use super::types::TypeRegistry;

/// A relation in the ontology.
///
/// `domain` / `range` of `None` mean the subject / object is unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRelation {
    pub relation_id: RelationId,
    /// Human-readable name.
    pub name: String,
    pub domain: Option<TypeId>,
    pub range: Option<TypeId>,
    pub is_transitive: bool,
    pub is_symmetric: bool,
    pub is_reflexive: bool,
    #[serde(default)]
    pub description: String,
    /// Seconds since UNIX epoch.
    #[serde(default)]
    pub created_at: u64,
}

impl OntologyRelation {
    /// An unconstrained relation with no algebraic properties.
    pub fn new(relation_id: impl Into<RelationId>) -> Self {
        let relation_id = relation_id.into();
        Self {
            name: relation_id.to_string().replace('_', " "),
            relation_id,
            domain: None,
            range: None,
            is_transitive: false,
            is_symmetric: false,
            is_reflexive: false,
            description: String::new(),
            created_at: 0,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<TypeId>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_range(mut self, range: impl Into<TypeId>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn transitive(mut self) -> Self {
        self.is_transitive = true;
        self
    }

    pub fn symmetric(mut self) -> Self {
        self.is_symmetric = true;
        self
    }

    pub fn reflexive(mut self) -> Self {
        self.is_reflexive = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Comma-separated list of the algebraic flags that are set.
    pub fn axioms(&self) -> String {
        let flags: Vec<&str> = [
            (self.is_transitive, "transitive"),
            (self.is_symmetric, "symmetric"),
            (self.is_reflexive, "reflexive"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();
        flags.join(", ")
    }
}

/// Check the fields of a relation definition in isolation.
pub fn validate_relation_definition(rel: &OntologyRelation) -> RegistryResult<()> {
    if rel.relation_id.is_empty() {
        return Err(RegistryError::EmptyId { kind: "relation" });
    }
    if rel.name.is_empty() {
        return Err(RegistryError::EmptyName {
            kind: "relation",
            id: rel.relation_id.to_string(),
        });
    }
    Ok(())
}

/// Registry of ontology relations, keyed by id.
///
/// Serialize-only: domain and range can only be checked against a
/// [`TypeRegistry`], so relations are reloaded through [`Self::register`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationRegistry {
    relations: BTreeMap<RelationId, OntologyRelation>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation whose domain and range must name types in `types`.
    pub fn register(&mut self, rel: OntologyRelation, types: &TypeRegistry) -> RegistryResult<()> {
        validate_relation_definition(&rel)?;
        if self.relations.contains_key(&rel.relation_id) {
            return Err(RegistryError::DuplicateRelation {
                relation_id: rel.relation_id.to_string(),
            });
        }
        for constraint in [&rel.domain, &rel.range].into_iter().flatten() {
            if !types.contains(constraint.as_str()) {
                return Err(RegistryError::UnknownType {
                    relation_id: rel.relation_id.to_string(),
                    type_id: constraint.to_string(),
                });
            }
        }
        self.relations.insert(rel.relation_id.clone(), rel);
        Ok(())
    }

    /// Look up a relation definition.
    pub fn get_relation(&self, relation_id: &str) -> Option<&OntologyRelation> {
        self.relations.get(relation_id)
    }

    pub fn contains(&self, relation_id: &str) -> bool {
        self.relations.contains_key(relation_id)
    }

    /// Relations flagged transitive, ordered by id.
    pub fn transitive(&self) -> impl Iterator<Item = &OntologyRelation> {
        self.relations.values().filter(|r| r.is_transitive)
    }

    /// All relations, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &OntologyRelation> {
        self.relations.values()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
