//! Type registry: entity type definitions and their single-parent hierarchy.
//!
//! Every parent chain is finite, acyclic and ends at the single root type.
//! The invariant is enforced when types are added, so queries can rely on it;
//! [`TypeRegistry::is_subtype_of`] still bounds its walk by `max_depth`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::symbol::TypeId;

/// Default bound on parent-chain length.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A type in the ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyType {
    pub type_id: TypeId,
    /// Human-readable name.
    pub name: String,
    /// Parent in the `is_a` hierarchy; `None` only for the root.
    pub parent: Option<TypeId>,
    pub description: String,
    /// Seconds since UNIX epoch.
    pub created_at: u64,
}

impl OntologyType {
    pub fn new(type_id: impl Into<TypeId>, parent: Option<&str>) -> Self {
        let type_id = type_id.into();
        Self {
            name: type_id.to_string(),
            type_id,
            parent: parent.map(TypeId::from),
            description: String::new(),
            created_at: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Check the fields of a type definition in isolation.
pub fn validate_type_definition(ty: &OntologyType) -> RegistryResult<()> {
    if ty.type_id.is_empty() {
        return Err(RegistryError::EmptyId { kind: "type" });
    }
    if ty.name.is_empty() {
        return Err(RegistryError::EmptyName {
            kind: "type",
            id: ty.type_id.to_string(),
        });
    }
    if ty.parent.as_ref().is_some_and(TypeId::is_empty) {
        return Err(RegistryError::EmptyParent {
            type_id: ty.type_id.to_string(),
        });
    }
    Ok(())
}

/// Registry of ontology types, keyed by id.
///
/// Deserialization goes through [`TypeRegistry::from_definitions`], so a
/// payload that breaks the hierarchy invariants is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TypeRegistryData")]
pub struct TypeRegistry {
    types: BTreeMap<TypeId, OntologyType>,
    root: Option<TypeId>,
    max_depth: usize,
}

/// Unchecked serialized form of a [`TypeRegistry`].
#[derive(Deserialize)]
struct TypeRegistryData {
    types: BTreeMap<TypeId, OntologyType>,
    #[serde(default)]
    root: Option<TypeId>,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl TryFrom<TypeRegistryData> for TypeRegistry {
    type Error = RegistryError;

    fn try_from(data: TypeRegistryData) -> RegistryResult<Self> {
        if let Some((key, ty)) = data.types.iter().find(|(key, ty)| **key != ty.type_id) {
            return Err(RegistryError::KeyMismatch {
                key: key.to_string(),
                type_id: ty.type_id.to_string(),
            });
        }
        let registry = Self::from_definitions(data.types.into_values(), data.max_depth)?;
        if let Some(declared) = data.root
            && registry.root.as_ref() != Some(&declared)
        {
            return Err(RegistryError::RootMismatch {
                declared: declared.to_string(),
                actual: registry
                    .root
                    .as_ref()
                    .map_or_else(String::new, TypeId::to_string),
            });
        }
        Ok(registry)
    }
}

impl TypeRegistry {
    /// Create an empty registry. The first registered type must be the root.
    pub fn new(max_depth: usize) -> Self {
        Self {
            types: BTreeMap::new(),
            root: None,
            max_depth,
        }
    }

    /// Build a registry from a batch of definitions in any order.
    ///
    /// The whole hierarchy is checked before the registry is returned: exactly
    /// one root, every parent present, every chain acyclic and within `max_depth`.
    pub fn from_definitions(
        defs: impl IntoIterator<Item = OntologyType>,
        max_depth: usize,
    ) -> RegistryResult<Self> {
        let mut types = BTreeMap::new();
        let mut root: Option<TypeId> = None;

        for ty in defs {
            validate_type_definition(&ty)?;
            if types.contains_key(&ty.type_id) {
                return Err(RegistryError::DuplicateType {
                    type_id: ty.type_id.to_string(),
                });
            }
            if ty.parent.is_none() {
                if let Some(existing) = &root {
                    return Err(RegistryError::MultipleRoots {
                        first: existing.to_string(),
                        second: ty.type_id.to_string(),
                    });
                }
                root = Some(ty.type_id.clone());
            }
            types.insert(ty.type_id.clone(), ty);
        }

        if root.is_none() && !types.is_empty() {
            return Err(RegistryError::MissingRoot);
        }

        let registry = Self {
            types,
            root,
            max_depth,
        };
        for ty in registry.types.values() {
            if let Some(parent) = &ty.parent {
                registry.check_chain(&ty.type_id, parent)?;
            }
        }
        Ok(registry)
    }

    /// Register a single type.
    ///
    /// The would-be parent chain is walked before insertion; the type is
    /// rejected if the chain revisits an id or exceeds the depth bound.
    pub fn register(&mut self, ty: OntologyType) -> RegistryResult<()> {
        validate_type_definition(&ty)?;
        if self.types.contains_key(&ty.type_id) {
            return Err(RegistryError::DuplicateType {
                type_id: ty.type_id.to_string(),
            });
        }

        match &ty.parent {
            None => {
                if let Some(existing) = &self.root {
                    return Err(RegistryError::MultipleRoots {
                        first: existing.to_string(),
                        second: ty.type_id.to_string(),
                    });
                }
                self.root = Some(ty.type_id.clone());
            }
            Some(parent) => {
                if self.root.is_none() {
                    return Err(RegistryError::MissingRoot);
                }
                self.check_chain(&ty.type_id, parent)?;
            }
        }

        self.types.insert(ty.type_id.clone(), ty);
        Ok(())
    }

    /// Walk the chain that `type_id` would have with parent `parent`.
    fn check_chain(&self, type_id: &TypeId, parent: &TypeId) -> RegistryResult<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(type_id.as_str());

        let mut current = parent;
        let mut depth = 1;
        loop {
            if !seen.insert(current.as_str()) {
                return Err(RegistryError::Cycle {
                    type_id: type_id.to_string(),
                    revisited: current.to_string(),
                });
            }
            if depth > self.max_depth {
                return Err(RegistryError::DepthExceeded {
                    type_id: type_id.to_string(),
                    max_depth: self.max_depth,
                });
            }
            let Some(def) = self.types.get(current) else {
                return Err(RegistryError::UnknownParent {
                    type_id: type_id.to_string(),
                    parent: current.to_string(),
                });
            };
            match &def.parent {
                Some(next) => {
                    current = next;
                    depth += 1;
                }
                None => return Ok(()),
            }
        }
    }

    /// Look up a type definition.
    pub fn get_type(&self, type_id: &str) -> Option<&OntologyType> {
        self.types.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// Whether `candidate` equals `ancestor` or has it somewhere up its parent chain.
    ///
    /// Reflexive by definition. Unknown ids are never subtypes of anything
    /// but themselves.
    pub fn is_subtype_of(&self, candidate: &str, ancestor: &str) -> bool {
        if candidate == ancestor {
            return true;
        }
        let mut current = candidate;
        for _ in 0..self.max_depth {
            let Some(parent) = self.types.get(current).and_then(|t| t.parent.as_ref()) else {
                return false;
            };
            if parent == ancestor {
                return true;
            }
            current = parent.as_str();
        }
        false
    }

    /// Parent chain of a type, nearest first, excluding the type itself.
    pub fn ancestors(&self, type_id: &str) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = type_id;
        while chain.len() < self.max_depth {
            match self.types.get(current).and_then(|t| t.parent.as_ref()) {
                Some(parent) => {
                    chain.push(parent.clone());
                    current = parent.as_str();
                }
                None => break,
            }
        }
        chain
    }

    /// The root type, if any type is registered.
    pub fn root(&self) -> Option<&OntologyType> {
        self.root.as_ref().and_then(|r| self.types.get(r))
    }

    /// All types, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &OntologyType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> TypeRegistry {
        TypeRegistry::from_definitions(
            [
                OntologyType::new("Thing", None),
                OntologyType::new("Entity", Some("Thing")),
                OntologyType::new("Concept", Some("Thing")),
                OntologyType::new("Agent", Some("Entity")),
                OntologyType::new("AIModel", Some("Agent")),
                OntologyType::new("LLM", Some("AIModel")),
            ],
            DEFAULT_MAX_DEPTH,
        )
        .unwrap()
    }

    #[test]
    fn subtype_is_reflexive() {
        let reg = baseline();
        for ty in reg.iter() {
            assert!(reg.is_subtype_of(ty.type_id.as_str(), ty.type_id.as_str()));
        }
        // Reflexive even for ids the registry has never heard of.
        assert!(reg.is_subtype_of("Unregistered", "Unregistered"));
    }

    #[test]
    fn everything_is_a_thing() {
        let reg = baseline();
        for ty in reg.iter() {
            assert!(reg.is_subtype_of(ty.type_id.as_str(), "Thing"));
            if ty.type_id != "Thing" {
                assert!(!reg.is_subtype_of("Thing", ty.type_id.as_str()));
            }
        }
    }

    #[test]
    fn subtype_walks_multiple_levels() {
        let reg = baseline();
        assert!(reg.is_subtype_of("LLM", "Agent"));
        assert!(reg.is_subtype_of("LLM", "Entity"));
        assert!(!reg.is_subtype_of("LLM", "Concept"));
        assert!(!reg.is_subtype_of("Agent", "LLM"));
    }

    #[test]
    fn ancestors_nearest_first() {
        let reg = baseline();
        let chain: Vec<String> = reg.ancestors("LLM").iter().map(|t| t.to_string()).collect();
        assert_eq!(chain, ["AIModel", "Agent", "Entity", "Thing"]);
        assert!(reg.ancestors("Thing").is_empty());
    }

    #[test]
    fn register_requires_known_parent() {
        let mut reg = baseline();
        let err = reg
            .register(OntologyType::new("Robot", Some("Machine")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownParent { .. }));
        assert!(reg.get_type("Robot").is_none());
    }

    #[test]
    fn register_rejects_self_parent() {
        let mut reg = baseline();
        let err = reg
            .register(OntologyType::new("Loop", Some("Loop")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Cycle { .. }));
    }

    #[test]
    fn register_rejects_second_root() {
        let mut reg = baseline();
        let err = reg.register(OntologyType::new("Other", None)).unwrap_err();
        assert!(matches!(err, RegistryError::MultipleRoots { .. }));
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut reg = baseline();
        let err = reg
            .register(OntologyType::new("Agent", Some("Thing")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType { .. }));
    }

    #[test]
    fn register_enforces_depth_bound() {
        let mut reg = TypeRegistry::new(3);
        reg.register(OntologyType::new("T0", None)).unwrap();
        reg.register(OntologyType::new("T1", Some("T0"))).unwrap();
        reg.register(OntologyType::new("T2", Some("T1"))).unwrap();
        reg.register(OntologyType::new("T3", Some("T2"))).unwrap();
        let err = reg.register(OntologyType::new("T4", Some("T3"))).unwrap_err();
        assert!(matches!(err, RegistryError::DepthExceeded { max_depth: 3, .. }));
    }

    #[test]
    fn first_type_must_be_root() {
        let mut reg = TypeRegistry::default();
        let err = reg
            .register(OntologyType::new("Entity", Some("Thing")))
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingRoot);
    }

    #[test]
    fn from_definitions_accepts_any_order() {
        let reg = TypeRegistry::from_definitions(
            [
                OntologyType::new("LLM", Some("Agent")),
                OntologyType::new("Agent", Some("Thing")),
                OntologyType::new("Thing", None),
            ],
            DEFAULT_MAX_DEPTH,
        )
        .unwrap();
        assert!(reg.is_subtype_of("LLM", "Thing"));
        assert_eq!(reg.root().unwrap().type_id, "Thing");
    }

    #[test]
    fn from_definitions_detects_cycles() {
        let err = TypeRegistry::from_definitions(
            [
                OntologyType::new("Thing", None),
                OntologyType::new("A", Some("B")),
                OntologyType::new("B", Some("A")),
            ],
            DEFAULT_MAX_DEPTH,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::Cycle { .. }));
    }

    #[test]
    fn from_definitions_requires_a_root() {
        let err = TypeRegistry::from_definitions(
            [
                OntologyType::new("A", Some("B")),
                OntologyType::new("B", Some("A")),
            ],
            DEFAULT_MAX_DEPTH,
        )
        .unwrap_err();
        assert_eq!(err, RegistryError::MissingRoot);
    }

    #[test]
    fn definition_checks_reject_empty_fields() {
        assert!(matches!(
            validate_type_definition(&OntologyType::new("", None)),
            Err(RegistryError::EmptyId { .. })
        ));
        assert!(matches!(
            validate_type_definition(&OntologyType::new("X", None).with_name("")),
            Err(RegistryError::EmptyName { .. })
        ));
        assert!(matches!(
            validate_type_definition(&OntologyType::new("X", Some(""))),
            Err(RegistryError::EmptyParent { .. })
        ));
    }

    #[test]
    fn duplicate_root_is_reported_as_duplicate() {
        let err = TypeRegistry::from_definitions(
            [OntologyType::new("Thing", None), OntologyType::new("Thing", None)],
            DEFAULT_MAX_DEPTH,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateType {
                type_id: "Thing".into()
            }
        );
    }

    #[test]
    fn ontology_type_json_keeps_every_field() {
        let root = OntologyType::new("Thing", None)
            .with_name("Anything")
            .with_description("top of the hierarchy")
            .with_created_at(1_700_000_000);
        let json = serde_json::to_string(&root).unwrap();
        let back: OntologyType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
        assert_eq!(back.parent, None);
        assert_eq!(back.created_at, 1_700_000_000);

        let child = OntologyType::new("LLM", Some("AIModel")).with_created_at(42);
        let back: OntologyType =
            serde_json::from_str(&serde_json::to_string(&child).unwrap()).unwrap();
        assert_eq!(back.parent.as_ref().map(TypeId::as_str), Some("AIModel"));
        assert_eq!(back, child);
    }

    #[test]
    fn registry_json_reloads_into_equivalent_registry() {
        let reg = baseline();
        let json = serde_json::to_string(&reg).unwrap();
        let back: TypeRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), reg.len());
        assert_eq!(back.root(), reg.root());
        assert_eq!(back.max_depth(), DEFAULT_MAX_DEPTH);
        assert!(back.is_subtype_of("LLM", "Agent"));
    }

    #[test]
    fn registry_json_with_cycle_is_rejected() {
        let json = r#"{
            "types": {
                "Thing": {"type_id": "Thing", "name": "Thing", "parent": null, "description": "", "created_at": 0},
                "A": {"type_id": "A", "name": "A", "parent": "B", "description": "", "created_at": 0},
                "B": {"type_id": "B", "name": "B", "parent": "A", "description": "", "created_at": 0}
            },
            "root": "Thing",
            "max_depth": 64
        }"#;
        let err = serde_json::from_str::<TypeRegistry>(json).unwrap_err();
        assert!(err.to_string().contains("cycle"), "{err}");
    }

    #[test]
    fn registry_json_with_two_roots_is_rejected() {
        let json = r#"{
            "types": {
                "Thing": {"type_id": "Thing", "name": "Thing", "parent": null, "description": "", "created_at": 0},
                "Other": {"type_id": "Other", "name": "Other", "parent": null, "description": "", "created_at": 0}
            },
            "root": "Thing",
            "max_depth": 64
        }"#;
        let err = serde_json::from_str::<TypeRegistry>(json).unwrap_err();
        assert!(err.to_string().contains("more than one root"), "{err}");
    }

    #[test]
    fn registry_json_checks_keys_and_declared_root() {
        let mismatched_key = r#"{
            "types": {
                "Root": {"type_id": "Thing", "name": "Thing", "parent": null, "description": "", "created_at": 0}
            }
        }"#;
        let err = serde_json::from_str::<TypeRegistry>(mismatched_key).unwrap_err();
        assert!(err.to_string().contains("under key"), "{err}");

        let wrong_root = r#"{
            "types": {
                "Thing": {"type_id": "Thing", "name": "Thing", "parent": null, "description": "", "created_at": 0},
                "Entity": {"type_id": "Entity", "name": "Entity", "parent": "Thing", "description": "", "created_at": 0}
            },
            "root": "Entity"
        }"#;
        let err = serde_json::from_str::<TypeRegistry>(wrong_root).unwrap_err();
        assert!(err.to_string().contains("declared root"), "{err}");
    }
}
