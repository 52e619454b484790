//! Triple validation: admit or reject a candidate statement against the ontology.
//!
//! Checks run in a fixed order and the first failure is reported:
//!
//! 1. confidence in `[0.0, 1.0]`
//! 2. predicate is a registered relation
//! 3. subject/object types resolve (explicit hint, else typing source, else heuristic)
//! 4. subject type satisfies the relation's domain
//! 5. object type satisfies the relation's range
//!
//! Validation never mutates anything, so it is safe to retry and to run on
//! many threads against the same snapshot.

use std::sync::Arc;

use crate::error::{OntologyError, ValidationResult};
use crate::registry::{Ontology, OntologyRelation};
use crate::symbol::TypeId;
use crate::triple::KnowledgeTriple;
use crate::typing::{EntityTyping, LayeredTyping, PatternTyping};

/// Types supplied by the caller for a single triple, overriding every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHints {
    pub subject: Option<TypeId>,
    pub object: Option<TypeId>,
}

impl TypeHints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn subject(mut self, type_id: impl Into<TypeId>) -> Self {
        self.subject = Some(type_id.into());
        self
    }

    pub fn object(mut self, type_id: impl Into<TypeId>) -> Self {
        self.object = Some(type_id.into());
        self
    }
}

/// Validator bound to one ontology snapshot.
#[derive(Clone)]
pub struct TripleValidator {
    ontology: Arc<Ontology>,
    /// Caller's typing source, if any, layered over the pattern heuristic.
    typing: LayeredTyping<Option<Arc<dyn EntityTyping>>, PatternTyping>,
}

impl TripleValidator {
    /// Validator using only the pattern heuristic for untyped entities.
    pub fn new(ontology: Arc<Ontology>) -> Self {
        Self {
            ontology,
            typing: LayeredTyping::new(None, PatternTyping::new()),
        }
    }

    /// Consult `source` before the heuristic.
    pub fn with_typing(mut self, source: Arc<dyn EntityTyping>) -> Self {
        self.typing.primary = Some(source);
        self
    }

    /// Replace the fallback heuristic.
    pub fn with_heuristic(mut self, heuristic: PatternTyping) -> Self {
        self.typing.fallback = heuristic;
        self
    }

    pub fn ontology(&self) -> &Arc<Ontology> {
        &self.ontology
    }

    /// Validate a triple, resolving entity types from the typing source and heuristic.
    pub fn validate(&self, triple: &KnowledgeTriple) -> ValidationResult<()> {
        self.validate_with(triple, &TypeHints::none())
    }

    /// Validate a triple, preferring the caller's explicit types.
    pub fn validate_with(&self, triple: &KnowledgeTriple, hints: &TypeHints) -> ValidationResult<()> {
        let result = self.check(triple, hints);
        if let Err(e) = &result {
            tracing::debug!(
                subject = %triple.subject,
                predicate = %triple.predicate,
                object = %triple.object,
                error = %e,
                "triple rejected"
            );
        }
        result
    }

    fn check(&self, triple: &KnowledgeTriple, hints: &TypeHints) -> ValidationResult<()> {
        // NaN fails the range check too.
        if !(0.0..=1.0).contains(&triple.confidence) {
            return Err(OntologyError::ValidationError(format!(
                "confidence must be in [0, 1], got {}",
                triple.confidence
            )));
        }

        let relation = self
            .ontology
            .get_relation(triple.predicate.as_str())
            .ok_or_else(|| OntologyError::UnknownRelation(triple.predicate.to_string()))?;

        let subject_type = self.resolve_type(&triple.subject, hints.subject.as_ref());
        let object_type = self.resolve_type(&triple.object, hints.object.as_ref());

        if self
            .ontology
            .check_domain_range(relation, subject_type.as_str(), object_type.as_str())
        {
            return Ok(());
        }

        // Something failed; find the first failing position for the report.
        if let Some(domain) = &relation.domain {
            self.require(relation, &subject_type, domain, |required, actual| {
                OntologyError::DomainViolation {
                    relation: relation.relation_id.to_string(),
                    required,
                    actual,
                }
            })?;
        }

        if let Some(range) = &relation.range {
            self.require(relation, &object_type, range, |required, actual| {
                OntologyError::RangeViolation {
                    relation: relation.relation_id.to_string(),
                    required,
                    actual,
                }
            })?;
        }

        Ok(())
    }

    /// Resolve an entity's type: explicit hint, then typing source, then heuristic.
    pub fn resolve_type(&self, entity_id: &str, hint: Option<&TypeId>) -> TypeId {
        if let Some(t) = hint {
            return t.clone();
        }
        self.typing
            .type_of(entity_id)
            .unwrap_or_else(|| self.typing.fallback.infer_type(entity_id))
    }

    fn require(
        &self,
        relation: &OntologyRelation,
        actual: &TypeId,
        required: &TypeId,
        violation: impl FnOnce(String, String) -> OntologyError,
    ) -> ValidationResult<()> {
        if !self.ontology.types().contains(actual.as_str()) {
            tracing::trace!(
                relation = %relation.relation_id,
                type_id = %actual,
                "resolved type is not registered"
            );
            return Err(OntologyError::UnknownType(actual.to_string()));
        }
        if self.ontology.is_subtype_of(actual.as_str(), required.as_str()) {
            Ok(())
        } else {
            Err(violation(required.to_string(), actual.to_string()))
        }
    }
}

impl std::fmt::Debug for TripleValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleValidator")
            .field("types", &self.ontology.types().len())
            .field("relations", &self.ontology.relations().len())
            .field("has_typing_source", &self.typing.primary.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DEFAULT_MAX_DEPTH, OntologyRelation, OntologyType};
    use crate::triple::TypeAssertion;
    use crate::typing::AssertedTyping;

    fn ontology() -> Arc<Ontology> {
        Arc::new(
            Ontology::from_definitions(
                [
                    OntologyType::new("Thing", None),
                    OntologyType::new("Entity", Some("Thing")),
                    OntologyType::new("Concept", Some("Thing")),
                    OntologyType::new("Event", Some("Thing")),
                    OntologyType::new("Value", Some("Thing")),
                    OntologyType::new("Agent", Some("Entity")),
                    OntologyType::new("Property", Some("Concept")),
                    OntologyType::new("AIModel", Some("Agent")),
                    OntologyType::new("LLM", Some("AIModel")),
                    OntologyType::new("Dataset", Some("Entity")),
                    OntologyType::new("Capability", Some("Concept")),
                ],
                [
                    OntologyRelation::new("is_a")
                        .with_domain("Thing")
                        .with_range("Thing")
                        .transitive()
                        .reflexive(),
                    OntologyRelation::new("related_to").symmetric().reflexive(),
                    OntologyRelation::new("improves_upon")
                        .with_domain("AIModel")
                        .with_range("AIModel")
                        .transitive(),
                    OntologyRelation::new("capable_of")
                        .with_domain("Agent")
                        .with_range("Capability"),
                    OntologyRelation::new("trained_on")
                        .with_domain("AIModel")
                        .with_range("Dataset"),
                ],
                DEFAULT_MAX_DEPTH,
            )
            .unwrap(),
        )
    }

    fn triple(s: &str, p: &str, o: &str, c: f32) -> KnowledgeTriple {
        KnowledgeTriple::new(s, p, o).with_confidence(c)
    }

    #[test]
    fn accepts_valid_triple() {
        let v = TripleValidator::new(ontology());
        assert_eq!(v.validate(&triple("claude_agent", "is_a", "Agent", 1.0)), Ok(()));
        assert_eq!(v.validate(&triple("GPT-4", "improves_upon", "GPT-3.5", 0.9)), Ok(()));
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        let v = TripleValidator::new(ontology());
        assert!(v.validate(&triple("a", "related_to", "b", 0.0)).is_ok());
        assert!(v.validate(&triple("a", "related_to", "b", 1.0)).is_ok());
    }

    #[test]
    fn out_of_range_confidence_is_validation_error() {
        let v = TripleValidator::new(ontology());
        for c in [1.5, -0.1, f32::NAN, f32::INFINITY] {
            let err = v.validate(&triple("a", "related_to", "b", c)).unwrap_err();
            assert!(matches!(err, OntologyError::ValidationError(ref m) if m.contains("confidence")));
        }
    }

    #[test]
    fn confidence_is_checked_before_relation() {
        let v = TripleValidator::new(ontology());
        let err = v.validate(&triple("a", "no_such_predicate", "b", 2.0)).unwrap_err();
        assert!(matches!(err, OntologyError::ValidationError(_)));
    }

    #[test]
    fn unknown_predicate_is_rejected() {
        let v = TripleValidator::new(ontology());
        let err = v.validate(&triple("A", "no_such_predicate", "B", 1.0)).unwrap_err();
        assert_eq!(err, OntologyError::UnknownRelation("no_such_predicate".into()));
    }

    #[test]
    fn domain_violation_reports_types() {
        let v = TripleValidator::new(ontology());
        let hints = TypeHints::none().subject("Dataset");
        let err = v
            .validate_with(&triple("Dataset-X", "improves_upon", "GPT-4", 1.0), &hints)
            .unwrap_err();
        assert_eq!(
            err,
            OntologyError::DomainViolation {
                relation: "improves_upon".into(),
                required: "AIModel".into(),
                actual: "Dataset".into(),
            }
        );
    }

    #[test]
    fn domain_is_checked_before_range() {
        let v = TripleValidator::new(ontology());
        // Both sides wrong: only the domain is reported.
        let err = v
            .validate(&triple("plain_thing", "capable_of", "other_thing", 1.0))
            .unwrap_err();
        assert!(matches!(err, OntologyError::DomainViolation { .. }));
    }

    #[test]
    fn range_violation() {
        let v = TripleValidator::new(ontology());
        let err = v
            .validate(&triple("GPT-4", "capable_of", "reasoning", 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            OntologyError::RangeViolation { ref actual, .. } if actual == "Entity"
        ));
    }

    #[test]
    fn typing_source_overrides_heuristic() {
        let asserted = Arc::new(AssertedTyping::new());
        asserted.assert(TypeAssertion::new("reasoning", "Capability", "loader"));
        let v = TripleValidator::new(ontology()).with_typing(asserted);
        assert!(v.validate(&triple("GPT-4", "capable_of", "reasoning", 0.9)).is_ok());
    }

    #[test]
    fn hints_override_typing_source() {
        let asserted = Arc::new(AssertedTyping::new());
        asserted.assert(TypeAssertion::new("reasoning", "Capability", "loader"));
        let v = TripleValidator::new(ontology()).with_typing(asserted);
        let hints = TypeHints::none().object("Dataset");
        let err = v
            .validate_with(&triple("GPT-4", "capable_of", "reasoning", 0.9), &hints)
            .unwrap_err();
        assert!(matches!(err, OntologyError::RangeViolation { .. }));
    }

    #[test]
    fn unregistered_resolved_type_is_unknown_type() {
        let v = TripleValidator::new(ontology());
        let hints = TypeHints::none().subject("Robot");
        let err = v
            .validate_with(&triple("r2d2", "trained_on", "corpus", 1.0), &hints)
            .unwrap_err();
        assert_eq!(err, OntologyError::UnknownType("Robot".into()));
    }

    #[test]
    fn unconstrained_sides_skip_type_checks() {
        let v = TripleValidator::new(ontology());
        let hints = TypeHints::none().subject("Robot").object("Droid");
        assert!(
            v.validate_with(&triple("r2d2", "related_to", "c3po", 0.5), &hints)
                .is_ok()
        );
    }

    #[test]
    fn verdict_matches_ontology_domain_range_check() {
        let ont = ontology();
        let v = TripleValidator::new(Arc::clone(&ont));
        let types = ["Thing", "Agent", "LLM", "Dataset", "Capability", "Robot"];
        for relation in ["is_a", "related_to", "capable_of", "trained_on"] {
            let rel = ont.get_relation(relation).unwrap();
            for s in types {
                for o in types {
                    let hints = TypeHints::none().subject(s).object(o);
                    let accepted = v
                        .validate_with(&triple("a", relation, "b", 1.0), &hints)
                        .is_ok();
                    assert_eq!(
                        accepted,
                        ont.check_domain_range(rel, s, o),
                        "({s}, {relation}, {o})"
                    );
                }
            }
        }
    }

    #[test]
    fn debug_shows_typing_source() {
        let v = TripleValidator::new(ontology());
        assert!(format!("{v:?}").contains("has_typing_source: false"));
        let v = v.with_typing(Arc::new(AssertedTyping::new()));
        assert!(format!("{v:?}").contains("has_typing_source: true"));
    }

    #[test]
    fn validation_is_repeatable() {
        let v = TripleValidator::new(ontology());
        let t = triple("Dataset-X", "trained_on", "GPT-4", 1.0);
        let first = v.validate(&t);
        assert_eq!(first, v.validate(&t));
        assert!(first.is_err());
    }

    #[test]
    fn validators_share_across_threads() {
        let v = TripleValidator::new(ontology());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let v = v.clone();
                std::thread::spawn(move || {
                    v.validate(&triple(&format!("model_{i}_agent"), "is_a", "Agent", 1.0))
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }
    }
}
