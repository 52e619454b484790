//! Knowledge triples: the statements the validator admits and the
//! inference engine reasons over.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OntologyError, ValidationResult};
use crate::symbol::{RelationId, TypeId, now_secs};

/// A (subject, predicate, object) knowledge statement with confidence and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeTriple {
    /// Subject entity id.
    pub subject: String,
    /// Predicate, resolved against the relation registry.
    pub predicate: RelationId,
    /// Object entity id or literal value.
    pub object: String,
    /// Confidence in [0.0, 1.0]. Not clamped on construction so validation can reject it.
    pub confidence: f32,
    /// Id of the principal that asserted this triple.
    pub source: String,
    /// Seconds since UNIX epoch.
    pub created_at: u64,
}

impl KnowledgeTriple {
    /// Create a triple with full confidence, anonymous source and the current timestamp.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<RelationId>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence: 1.0,
            source: String::new(),
            created_at: now_secs(),
        }
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the asserting principal.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// The identity of this statement, ignoring confidence and metadata.
    pub fn key(&self) -> TripleKey {
        TripleKey {
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        }
    }
}

impl fmt::Display for KnowledgeTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}) @ {:.4}",
            self.subject, self.predicate, self.object, self.confidence
        )
    }
}

/// Statement identity used for deduplication: (subject, predicate, object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripleKey {
    pub subject: String,
    pub predicate: RelationId,
    pub object: String,
}

impl TripleKey {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<RelationId>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for TripleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// An authoritative statement that an entity has a given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAssertion {
    /// Entity being typed.
    pub entity_id: String,
    /// Type assigned to the entity.
    pub type_id: TypeId,
    /// Principal that made the assertion.
    pub asserted_by: String,
    /// Seconds since UNIX epoch.
    pub asserted_at: u64,
}

impl TypeAssertion {
    pub fn new(
        entity_id: impl Into<String>,
        type_id: impl Into<TypeId>,
        asserted_by: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            type_id: type_id.into(),
            asserted_by: asserted_by.into(),
            asserted_at: now_secs(),
        }
    }
}

static TUPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(\s*([^,]+?)\s*,\s*([^,]+?)\s*,\s*([^)]+?)\s*\)$").unwrap()
});

/// Parse a `(subject, predicate, object)` tuple string.
pub fn parse_tuple(input: &str) -> ValidationResult<TripleKey> {
    let caps = TUPLE_RE.captures(input.trim()).ok_or_else(|| {
        OntologyError::ValidationError(format!(
            "invalid triple format: {input}. Expected: (subject, predicate, object)"
        ))
    })?;
    Ok(TripleKey::new(&caps[1], &caps[2], &caps[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_confidence_and_metadata() {
        let a = KnowledgeTriple::new("GPT-4", "improves_upon", "GPT-3.5").with_confidence(0.3);
        let b = KnowledgeTriple::new("GPT-4", "improves_upon", "GPT-3.5")
            .with_confidence(0.9)
            .with_source("alice");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn confidence_is_not_clamped() {
        let t = KnowledgeTriple::new("a", "related_to", "b").with_confidence(1.5);
        assert_eq!(t.confidence, 1.5);
    }

    #[test]
    fn parse_tuple_trims_whitespace() {
        let key = parse_tuple("  ( GPT-4 , is_a ,  LLM )").unwrap();
        assert_eq!(key, TripleKey::new("GPT-4", "is_a", "LLM"));
    }

    #[test]
    fn parse_tuple_keeps_inner_spaces() {
        let key = parse_tuple("(Claude 4, capable_of, long context reasoning)").unwrap();
        assert_eq!(key.subject, "Claude 4");
        assert_eq!(key.object, "long context reasoning");
    }

    #[test]
    fn parse_tuple_rejects_malformed() {
        assert!(matches!(
            parse_tuple("GPT-4 is a LLM"),
            Err(OntologyError::ValidationError(_))
        ));
        assert!(parse_tuple("(a, b)").is_err());
    }

    #[test]
    fn triple_roundtrips_through_json() {
        let t = KnowledgeTriple::new("GPT-4", "capable_of", "reasoning")
            .with_confidence(0.75)
            .with_source("agent-1")
            .with_created_at(42);
        let json = serde_json::to_string(&t).unwrap();
        let back: KnowledgeTriple = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
