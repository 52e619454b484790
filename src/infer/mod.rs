//! Bounded forward-chaining over relation axioms.
//!
//! Given an immutable snapshot of accepted triples, the engine repeatedly
//! applies two rules until nothing new appears or the round cap is hit:
//!
//! - **transitivity**: `(a R b) ∧ (b R c) ⇒ (a R c)` for every transitive `R`,
//!   confidence `c1 * c2 * transitive_decay`
//! - **capability inheritance**: `(a improves_upon b) ∧ (b capable_of x) ⇒
//!   (a capable_of x)`, confidence `c1 * c2 * capability_decay`
//!
//! Termination comes from the round cap, not from closure completeness. When
//! the last permitted round still produced triples the outcome reports
//! `reached_fixpoint == false` and a warning is logged.

pub mod engine;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::InferResult;
use crate::provenance::DerivedTriple;
use crate::registry::Ontology;
use crate::symbol::RelationId;
use crate::triple::{KnowledgeTriple, TripleKey};

pub use engine::InferenceEngine;

/// Default round cap.
pub const MAX_ITER: usize = 10;
/// Default confidence decay for transitive derivations.
pub const TRANSITIVE_DECAY: f32 = 0.8;
/// Default confidence decay for capability inheritance.
pub const CAPABILITY_DECAY: f32 = 0.9;

/// Configuration for the inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Maximum forward-chaining rounds (default: 10).
    pub max_rounds: usize,
    /// Multiplier applied to transitive derivations (default: 0.8).
    pub transitive_decay: f32,
    /// Multiplier applied to capability inheritance (default: 0.9).
    pub capability_decay: f32,
    /// Relation whose subject inherits capabilities from its object.
    pub improvement_relation: RelationId,
    /// Relation linking an agent to a capability.
    pub capability_relation: RelationId,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_rounds: MAX_ITER,
            transitive_decay: TRANSITIVE_DECAY,
            capability_decay: CAPABILITY_DECAY,
            improvement_relation: RelationId::new("improves_upon"),
            capability_relation: RelationId::new("capable_of"),
        }
    }
}

/// Result of an inference run.
#[derive(Debug, Clone, Default)]
pub struct InferenceOutcome {
    /// Derived triples in derivation order, one per (subject, predicate, object).
    pub derived: Vec<DerivedTriple>,
    /// Rounds executed, including the final empty one when a fixpoint is reached.
    pub rounds: usize,
    pub reached_fixpoint: bool,
    /// Derivation counts per rule (`transitive:<relation>`, `capability-inheritance`).
    pub rule_stats: BTreeMap<String, usize>,
}

impl InferenceOutcome {
    pub fn get(&self, key: &TripleKey) -> Option<&DerivedTriple> {
        self.derived.iter().find(|d| {
            d.triple.subject == key.subject
                && d.triple.predicate == key.predicate
                && d.triple.object == key.object
        })
    }

    pub fn contains(&self, key: &TripleKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }

    /// The derived statements as plain triples, e.g. to feed back into a store.
    pub fn triples(&self) -> Vec<KnowledgeTriple> {
        self.derived.iter().map(|d| d.triple.clone()).collect()
    }
}

/// Cooperative cancellation flag shared between a caller and a running inference.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Derive new triples from `triples` with the default configuration.
pub fn infer_from_axioms(
    ontology: &Ontology,
    triples: &[KnowledgeTriple],
) -> InferResult<Vec<DerivedTriple>> {
    InferenceEngine::default()
        .run(ontology, triples)
        .map(|outcome| outcome.derived)
}

/// Whether `candidate` is asserted in `triples` or derivable from them.
pub fn can_infer(
    ontology: &Ontology,
    triples: &[KnowledgeTriple],
    candidate: &TripleKey,
) -> InferResult<bool> {
    InferenceEngine::default().can_infer(ontology, triples, candidate)
}
