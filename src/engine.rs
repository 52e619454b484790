//! Engine facade: top-level API for the ontology engine.
//!
//! The `Engine` owns the published ontology snapshot, the entity typing
//! assertions and the inference configuration, and hands out validators
//! bound to the current snapshot.

use std::fmt;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{InferResult, OntoResult, RegistryResult, ValidationResult};
use crate::infer::{CancelToken, InferenceEngine, InferenceOutcome};
use crate::registry::{Ontology, OntologyRelation, OntologyType, SharedOntology};
use crate::seeds::SeedRegistry;
use crate::symbol::now_secs;
use crate::triple::{KnowledgeTriple, TripleKey, TypeAssertion};
use crate::typing::{AssertedTyping, EntityTyping};
use crate::validate::{TripleValidator, TypeHints};

/// The ontology engine.
///
/// Validation and inference always run against one immutable [`Ontology`]
/// snapshot; registering a type or relation publishes a new snapshot without
/// disturbing calls already in flight.
pub struct Engine {
    config: EngineConfig,
    ontology: SharedOntology,
    asserted: Arc<AssertedTyping>,
    inference: InferenceEngine,
}

impl Engine {
    /// Create an engine, bootstrapping the ontology from the configured seed packs.
    pub fn new(config: EngineConfig) -> OntoResult<Self> {
        config.validate()?;
        let seeds = match &config.bootstrap.seeds_dir {
            Some(dir) => SeedRegistry::discover(dir),
            None => SeedRegistry::bundled(),
        };
        let ontology = seeds.bootstrap(&config.bootstrap.seed_packs, config.registry.max_depth)?;
        let engine = Self::with_ontology(config, ontology);
        tracing::info!(
            types = engine.snapshot().types().len(),
            relations = engine.snapshot().relations().len(),
            "engine ready"
        );
        Ok(engine)
    }

    /// Create an engine around an already-built ontology.
    pub fn with_ontology(config: EngineConfig, ontology: Ontology) -> Self {
        let inference = InferenceEngine::new(config.inference.clone());
        Self {
            config,
            ontology: SharedOntology::new(ontology),
            asserted: Arc::new(AssertedTyping::new()),
            inference,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current ontology snapshot.
    pub fn snapshot(&self) -> Arc<Ontology> {
        self.ontology.snapshot()
    }

    /// Authoritative entity types consulted before the pattern heuristic.
    pub fn asserted_types(&self) -> &Arc<AssertedTyping> {
        &self.asserted
    }

    /// Record an explicit entity type.
    pub fn assert_type(&self, assertion: TypeAssertion) -> Option<TypeAssertion> {
        tracing::debug!(
            entity = %assertion.entity_id,
            type_id = %assertion.type_id,
            "type asserted"
        );
        self.asserted.assert(assertion)
    }

    /// A validator bound to the current snapshot.
    pub fn validator(&self) -> TripleValidator {
        let typing: Arc<dyn EntityTyping> = self.asserted.clone();
        TripleValidator::new(self.snapshot())
            .with_typing(typing)
            .with_heuristic(self.config.typing.heuristic())
    }

    pub fn validate(&self, triple: &KnowledgeTriple) -> ValidationResult<()> {
        self.validator().validate(triple)
    }

    pub fn validate_with(&self, triple: &KnowledgeTriple, hints: &TypeHints) -> ValidationResult<()> {
        self.validator().validate_with(triple, hints)
    }

    /// Forward-chain over `triples` against the current snapshot.
    pub fn infer(&self, triples: &[KnowledgeTriple]) -> InferResult<InferenceOutcome> {
        self.inference.run(&self.snapshot(), triples)
    }

    pub fn infer_with_cancel(
        &self,
        triples: &[KnowledgeTriple],
        cancel: &CancelToken,
    ) -> InferResult<InferenceOutcome> {
        self.inference
            .run_with_cancel(&self.snapshot(), triples, cancel)
    }

    pub fn can_infer(&self, triples: &[KnowledgeTriple], candidate: &TripleKey) -> InferResult<bool> {
        self.inference.can_infer(&self.snapshot(), triples, candidate)
    }

    /// Register a type. Rejects cycles, unknown parents and duplicates.
    ///
    /// A zero `created_at` is replaced with the current time; zero is left
    /// to bundled seed definitions.
    pub fn register_type(&self, mut ty: OntologyType) -> RegistryResult<()> {
        if ty.created_at == 0 {
            ty.created_at = now_secs();
        }
        let type_id = ty.type_id.clone();
        self.ontology.register_type(ty)?;
        tracing::info!(%type_id, "type registered");
        Ok(())
    }

    /// Register a relation. Domain and range must name registered types.
    /// A zero `created_at` is stamped as in [`Self::register_type`].
    pub fn register_relation(&self, mut rel: OntologyRelation) -> RegistryResult<()> {
        if rel.created_at == 0 {
            rel.created_at = now_secs();
        }
        let relation_id = rel.relation_id.clone();
        self.ontology.register_relation(rel)?;
        tracing::info!(%relation_id, "relation registered");
        Ok(())
    }

    /// Summary of the engine state.
    pub fn info(&self) -> EngineInfo {
        let snapshot = self.snapshot();
        EngineInfo {
            seed_packs: self.config.bootstrap.seed_packs.clone(),
            type_count: snapshot.types().len(),
            relation_count: snapshot.relations().len(),
            transitive_relations: snapshot
                .relations()
                .transitive()
                .map(|r| r.relation_id.to_string())
                .collect(),
            asserted_types: self.asserted.len(),
            max_rounds: self.config.inference.max_rounds,
            max_depth: snapshot.types().max_depth(),
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub seed_packs: Vec<String>,
    pub type_count: usize,
    pub relation_count: usize,
    pub transitive_relations: Vec<String>,
    pub asserted_types: usize,
    pub max_rounds: usize,
    pub max_depth: usize,
}

impl fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ontology engine info")?;
        writeln!(f, "  seed packs:   {}", self.seed_packs.join(", "))?;
        writeln!(f, "  types:        {}", self.type_count)?;
        writeln!(f, "  relations:    {}", self.relation_count)?;
        writeln!(f, "  transitive:   {}", self.transitive_relations.join(", "))?;
        writeln!(f, "  asserted:     {}", self.asserted_types)?;
        writeln!(f, "  max rounds:   {}", self.max_rounds)?;
        writeln!(f, "  max depth:    {}", self.max_depth)?;
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("types", &self.snapshot().types().len())
            .field("relations", &self.snapshot().relations().len())
            .field("asserted_types", &self.asserted.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OntoError, OntologyError, RegistryError};

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn default_engine_loads_bundled_packs() {
        let info = engine().info();
        assert_eq!(info.type_count, 13);
        assert_eq!(info.relation_count, 9);
        assert_eq!(info.transitive_relations, vec!["improves_upon", "is_a", "part_of"]);
    }

    #[test]
    fn asserted_type_overrides_heuristic() {
        let engine = engine();
        let triple = KnowledgeTriple::new("GPT-3.5", "capable_of", "reasoning");
        assert!(matches!(
            engine.validate(&triple),
            Err(OntologyError::RangeViolation { .. })
        ));

        engine.assert_type(TypeAssertion::new("reasoning", "Capability", "test"));
        engine.validate(&triple).unwrap();
    }

    #[test]
    fn registration_is_visible_to_new_validators() {
        let engine = engine();
        let old = engine.validator();
        engine
            .register_relation(
                OntologyRelation::new("fine_tuned_from")
                    .with_domain("AIModel")
                    .with_range("AIModel"),
            )
            .unwrap();

        let triple = KnowledgeTriple::new("GPT-4o", "fine_tuned_from", "GPT-4");
        assert!(matches!(
            old.validate(&triple),
            Err(OntologyError::UnknownRelation(_))
        ));
        engine.validate(&triple).unwrap();
    }

    #[test]
    fn runtime_registrations_are_timestamped() {
        let engine = engine();
        engine
            .register_type(OntologyType::new("Robot", Some("Agent")))
            .unwrap();
        engine
            .register_type(OntologyType::new("Drone", Some("Robot")).with_created_at(7))
            .unwrap();
        engine
            .register_relation(
                OntologyRelation::new("pilots")
                    .with_domain("Agent")
                    .with_range("Drone"),
            )
            .unwrap();

        let snapshot = engine.snapshot();
        assert!(snapshot.get_type("Robot").unwrap().created_at > 0);
        assert_eq!(snapshot.get_type("Drone").unwrap().created_at, 7);
        assert!(snapshot.get_relation("pilots").unwrap().created_at > 0);
        // Bundled seed definitions keep the zero timestamp.
        assert_eq!(snapshot.get_type("Thing").unwrap().created_at, 0);
        assert_eq!(snapshot.get_relation("is_a").unwrap().created_at, 0);
    }

    #[test]
    fn cyclic_registration_is_rejected() {
        let engine = engine();
        let err = engine
            .register_type(OntologyType::new("Thing", Some("Entity")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType { .. }));
    }

    #[test]
    fn unknown_seed_pack_fails_startup() {
        let mut config = EngineConfig::default();
        config.bootstrap.seed_packs.push("missing".into());
        assert!(matches!(Engine::new(config), Err(OntoError::Seed(_))));
    }

    #[test]
    fn invalid_config_fails_startup() {
        let mut config = EngineConfig::default();
        config.inference.max_rounds = 0;
        assert!(matches!(Engine::new(config), Err(OntoError::Config(_))));
    }

    #[test]
    fn infer_uses_configured_decay() {
        let mut config = EngineConfig::default();
        config.inference.transitive_decay = 1.0;
        let engine = Engine::new(config).unwrap();
        let outcome = engine
            .infer(&[
                KnowledgeTriple::new("wheel", "part_of", "car").with_confidence(0.5),
                KnowledgeTriple::new("car", "part_of", "fleet"),
            ])
            .unwrap();
        let derived = outcome
            .get(&TripleKey::new("wheel", "part_of", "fleet"))
            .unwrap();
        assert!((derived.confidence() - 0.5).abs() < 1e-6);
    }
}
