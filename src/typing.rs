//! Entity typing: mapping untyped entity ids to ontology types.
//!
//! [`PatternTyping`] is a best-effort placeholder that guesses from the shape
//! of the identifier. Production callers should supply explicit types through
//! [`AssertedTyping`] (or their own [`EntityTyping`] implementation) and let the
//! heuristic act only as the last fallback.

use dashmap::DashMap;

use crate::symbol::TypeId;
use crate::triple::TypeAssertion;

/// Capability to resolve an entity id to a type.
pub trait EntityTyping: Send + Sync {
    /// The type of `entity_id`, or `None` if this source has no opinion.
    fn type_of(&self, entity_id: &str) -> Option<TypeId>;
}

impl<T: EntityTyping + ?Sized> EntityTyping for std::sync::Arc<T> {
    fn type_of(&self, entity_id: &str) -> Option<TypeId> {
        (**self).type_of(entity_id)
    }
}

impl<T: EntityTyping + ?Sized> EntityTyping for &T {
    fn type_of(&self, entity_id: &str) -> Option<TypeId> {
        (**self).type_of(entity_id)
    }
}

/// An absent source has no opinion about any entity.
impl<T: EntityTyping> EntityTyping for Option<T> {
    fn type_of(&self, entity_id: &str) -> Option<TypeId> {
        self.as_ref().and_then(|t| t.type_of(entity_id))
    }
}

// ---------------------------------------------------------------------------
// Pattern heuristic
// ---------------------------------------------------------------------------

/// Model-family substrings that mark an identifier as an `LLM`.
pub const DEFAULT_MODEL_FAMILIES: &[&str] = &[
    "gpt", "claude", "llama", "gemini", "mistral", "mixtral", "falcon", "qwen", "deepseek",
];

/// Identifier-shape heuristic.
///
/// Rules, first match wins:
/// 1. contains a known model-family name (case-insensitive) → `LLM`
/// 2. ends with `_agent` → `Agent`
/// 3. ends with `_concept` or `_type` → `Concept`
/// 4. ends with `_event` → `Event`
/// 5. otherwise → the default type (`Entity`)
#[derive(Debug, Clone)]
pub struct PatternTyping {
    model_families: Vec<String>,
    default_type: TypeId,
}

impl PatternTyping {
    pub fn new() -> Self {
        Self::with_model_families(DEFAULT_MODEL_FAMILIES.iter().copied())
    }

    /// Replace the model-family list. Names are matched lowercase.
    pub fn with_model_families<S: AsRef<str>>(families: impl IntoIterator<Item = S>) -> Self {
        Self {
            model_families: families
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
            default_type: TypeId::new("Entity"),
        }
    }

    /// Type returned when no rule matches.
    pub fn with_default_type(mut self, default_type: impl Into<TypeId>) -> Self {
        self.default_type = default_type.into();
        self
    }

    /// Apply the rules. Always yields a type.
    pub fn infer_type(&self, entity_id: &str) -> TypeId {
        let lower = entity_id.to_lowercase();
        if self.model_families.iter().any(|f| lower.contains(f.as_str())) {
            return TypeId::new("LLM");
        }
        if entity_id.ends_with("_agent") {
            TypeId::new("Agent")
        } else if entity_id.ends_with("_concept") || entity_id.ends_with("_type") {
            TypeId::new("Concept")
        } else if entity_id.ends_with("_event") {
            TypeId::new("Event")
        } else {
            self.default_type.clone()
        }
    }
}

impl Default for PatternTyping {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTyping for PatternTyping {
    fn type_of(&self, entity_id: &str) -> Option<TypeId> {
        Some(self.infer_type(entity_id))
    }
}

// ---------------------------------------------------------------------------
// Explicit assertions
// ---------------------------------------------------------------------------

/// Authoritative entity types, safe to update while validators read.
///
/// The latest assertion for an entity wins.
#[derive(Debug, Default)]
pub struct AssertedTyping {
    assertions: DashMap<String, TypeAssertion>,
}

impl AssertedTyping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an assertion, returning the one it replaced.
    pub fn assert(&self, assertion: TypeAssertion) -> Option<TypeAssertion> {
        self.assertions
            .insert(assertion.entity_id.clone(), assertion)
    }

    /// Drop the assertion for an entity.
    pub fn retract(&self, entity_id: &str) -> Option<TypeAssertion> {
        self.assertions.remove(entity_id).map(|(_, a)| a)
    }

    pub fn get(&self, entity_id: &str) -> Option<TypeAssertion> {
        self.assertions.get(entity_id).map(|r| r.value().clone())
    }

    /// All assertions, ordered by entity id.
    pub fn all(&self) -> Vec<TypeAssertion> {
        let mut all: Vec<TypeAssertion> =
            self.assertions.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        all
    }

    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }
}

impl EntityTyping for AssertedTyping {
    fn type_of(&self, entity_id: &str) -> Option<TypeId> {
        self.assertions
            .get(entity_id)
            .map(|r| r.value().type_id.clone())
    }
}

// ---------------------------------------------------------------------------
// Layering
// ---------------------------------------------------------------------------

/// Consult `primary` first and fall back to `fallback`.
#[derive(Debug, Clone)]
pub struct LayeredTyping<P, F> {
    pub primary: P,
    pub fallback: F,
}

impl<P, F> LayeredTyping<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: EntityTyping, F: EntityTyping> EntityTyping for LayeredTyping<P, F> {
    fn type_of(&self, entity_id: &str) -> Option<TypeId> {
        self.primary
            .type_of(entity_id)
            .or_else(|| self.fallback.type_of(entity_id))
    }
}
