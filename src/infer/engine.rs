//! Forward-chaining inference engine.
//!
//! Runs the axiom rules to a fixpoint or the round cap, producing derived
//! triples with provenance. Each transitive relation's round is computed
//! independently on the rayon pool and merged in relation-id order, so output
//! is deterministic regardless of scheduling.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;

use crate::error::{InferError, InferResult};
use crate::provenance::{Derivation, DerivationKind, DerivedTriple};
use crate::registry::{Ontology, OntologyRelation};
use crate::triple::{KnowledgeTriple, TripleKey};

use super::{CancelToken, InferenceConfig, InferenceOutcome};

const CAPABILITY_RULE: &str = "capability-inheritance";

/// Bounded forward-chaining engine. Holds only configuration; every run is a
/// pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct InferenceEngine {
    config: InferenceConfig,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Run forward-chaining over `triples`.
    pub fn run(
        &self,
        ontology: &Ontology,
        triples: &[KnowledgeTriple],
    ) -> InferResult<InferenceOutcome> {
        self.run_with_cancel(ontology, triples, &CancelToken::new())
    }

    /// Run forward-chaining, stopping with [`InferError::Cancelled`] once
    /// `cancel` is set. The token is checked before each round and before
    /// each relation within a round.
    pub fn run_with_cancel(
        &self,
        ontology: &Ontology,
        triples: &[KnowledgeTriple],
        cancel: &CancelToken,
    ) -> InferResult<InferenceOutcome> {
        check_registered(ontology, triples)?;

        let transitive: Vec<&OntologyRelation> = ontology.relations().transitive().collect();

        // T ∪ derived, as statements and as keys.
        let mut view: Vec<KnowledgeTriple> = triples.to_vec();
        let mut known: HashSet<TripleKey> = triples.iter().map(KnowledgeTriple::key).collect();

        let mut derived: Vec<DerivedTriple> = Vec::new();
        let mut rule_stats: BTreeMap<String, usize> = BTreeMap::new();
        let mut rounds = 0;
        let mut reached_fixpoint = false;

        for round in 1..=self.config.max_rounds {
            if cancel.is_cancelled() {
                return Err(InferError::Cancelled { round });
            }
            rounds = round;

            let per_relation: Vec<Vec<DerivedTriple>> = transitive
                .par_iter()
                .map(|rel| {
                    if cancel.is_cancelled() {
                        Vec::new()
                    } else {
                        self.close_relation(rel, &view, &known, round)
                    }
                })
                .collect();
            if cancel.is_cancelled() {
                return Err(InferError::Cancelled { round });
            }

            let mut new_this_round: Vec<DerivedTriple> = Vec::new();
            let mut new_keys: HashSet<TripleKey> = HashSet::new();

            for (rel, batch) in transitive.iter().zip(per_relation) {
                let mut count = 0;
                for dt in batch {
                    if new_keys.insert(dt.key()) {
                        new_this_round.push(dt);
                        count += 1;
                    }
                }
                if count > 0 {
                    *rule_stats
                        .entry(format!("transitive:{}", rel.relation_id))
                        .or_insert(0) += count;
                }
            }

            let mut inherited = 0;
            for dt in self.inherit_capabilities(&view, &known, round) {
                if new_keys.insert(dt.key()) {
                    new_this_round.push(dt);
                    inherited += 1;
                }
            }
            if inherited > 0 {
                *rule_stats.entry(CAPABILITY_RULE.to_string()).or_insert(0) += inherited;
            }

            if new_this_round.is_empty() {
                reached_fixpoint = true;
                break;
            }

            tracing::debug!(round, new = new_this_round.len(), "inference round");

            known.extend(new_keys);
            view.extend(new_this_round.iter().map(|dt| dt.triple.clone()));
            derived.extend(new_this_round);
        }

        if !reached_fixpoint && !derived.is_empty() {
            tracing::warn!(
                max_rounds = self.config.max_rounds,
                derived = derived.len(),
                "inference stopped at the round cap before reaching a fixpoint; \
                 results may be incomplete"
            );
        }

        Ok(InferenceOutcome {
            derived,
            rounds,
            reached_fixpoint,
            rule_stats,
        })
    }

    /// Whether `candidate` is in `triples` or derivable from them.
    pub fn can_infer(
        &self,
        ontology: &Ontology,
        triples: &[KnowledgeTriple],
        candidate: &TripleKey,
    ) -> InferResult<bool> {
        check_registered(ontology, triples)?;
        if triples.iter().any(|t| matches_key(t, candidate)) {
            return Ok(true);
        }
        Ok(self.run(ontology, triples)?.contains(candidate))
    }

    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    /// One round of `(a R b) ∧ (b R c) ⇒ (a R c)` for a single relation.
    fn close_relation(
        &self,
        rel: &OntologyRelation,
        view: &[KnowledgeTriple],
        known: &HashSet<TripleKey>,
        round: usize,
    ) -> Vec<DerivedTriple> {
        let edges: Vec<&KnowledgeTriple> = view
            .iter()
            .filter(|t| t.predicate == rel.relation_id)
            .collect();
        let by_subject = index_by_subject(&edges);

        let mut out = Vec::new();
        let mut seen: HashSet<TripleKey> = HashSet::new();
        for first in &edges {
            let Some(nexts) = by_subject.get(first.object.as_str()) else {
                continue;
            };
            for second in nexts {
                let key = TripleKey::new(
                    first.subject.clone(),
                    rel.relation_id.clone(),
                    second.object.clone(),
                );
                if known.contains(&key) || !seen.insert(key.clone()) {
                    continue;
                }
                out.push(derive(
                    key,
                    DerivationKind::TransitiveInference,
                    first,
                    second,
                    self.config.transitive_decay,
                    round,
                ));
            }
        }
        out
    }

    /// One round of `(a improves_upon b) ∧ (b capable_of x) ⇒ (a capable_of x)`.
    fn inherit_capabilities(
        &self,
        view: &[KnowledgeTriple],
        known: &HashSet<TripleKey>,
        round: usize,
    ) -> Vec<DerivedTriple> {
        let improvement = &self.config.improvement_relation;
        let capability = &self.config.capability_relation;

        let capabilities: Vec<&KnowledgeTriple> = view
            .iter()
            .filter(|t| t.predicate == *capability)
            .collect();
        if capabilities.is_empty() {
            return Vec::new();
        }
        let by_subject = index_by_subject(&capabilities);

        let mut out = Vec::new();
        let mut seen: HashSet<TripleKey> = HashSet::new();
        for improves in view.iter().filter(|t| t.predicate == *improvement) {
            let Some(caps) = by_subject.get(improves.object.as_str()) else {
                continue;
            };
            for cap in caps {
                let key = TripleKey::new(
                    improves.subject.clone(),
                    capability.clone(),
                    cap.object.clone(),
                );
                if known.contains(&key) || !seen.insert(key.clone()) {
                    continue;
                }
                out.push(derive(
                    key,
                    DerivationKind::CapabilityInheritance,
                    improves,
                    cap,
                    self.config.capability_decay,
                    round,
                ));
            }
        }
        out
    }
}

/// Every predicate in the snapshot must still be registered; anything else
/// means the registry and the store have drifted apart.
fn check_registered(ontology: &Ontology, triples: &[KnowledgeTriple]) -> InferResult<()> {
    for t in triples {
        if ontology.get_relation(t.predicate.as_str()).is_none() {
            tracing::error!(
                relation = %t.predicate,
                subject = %t.subject,
                object = %t.object,
                "snapshot references an unregistered relation; registry and store are out of sync"
            );
            return Err(InferError::UnregisteredRelation {
                relation: t.predicate.to_string(),
                subject: t.subject.clone(),
                object: t.object.clone(),
            });
        }
    }
    Ok(())
}

fn index_by_subject<'a>(
    triples: &[&'a KnowledgeTriple],
) -> HashMap<&'a str, Vec<&'a KnowledgeTriple>> {
    let mut index: HashMap<&'a str, Vec<&'a KnowledgeTriple>> = HashMap::new();
    for &t in triples {
        index.entry(t.subject.as_str()).or_default().push(t);
    }
    index
}

fn matches_key(t: &KnowledgeTriple, key: &TripleKey) -> bool {
    t.subject == key.subject && t.predicate == key.predicate && t.object == key.object
}

/// Build a derived triple from two antecedents.
///
/// Source is the first antecedent's principal; the timestamp is the later of
/// the two, which keeps the computation independent of the wall clock.
fn derive(
    key: TripleKey,
    kind: DerivationKind,
    first: &KnowledgeTriple,
    second: &KnowledgeTriple,
    decay: f32,
    round: usize,
) -> DerivedTriple {
    DerivedTriple {
        triple: KnowledgeTriple {
            subject: key.subject,
            predicate: key.predicate,
            object: key.object,
            confidence: first.confidence * second.confidence * decay,
            source: first.source.clone(),
            created_at: first.created_at.max(second.created_at),
        },
        derivation: Derivation {
            kind,
            contributing: vec![first.key(), second.key()],
        },
        round,
    }
}
