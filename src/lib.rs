// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ontology-engine
//!
//! A typed ontology layer for a knowledge graph: a type hierarchy and relation
//! vocabulary, a validator that admits only triples consistent with them, and
//! bounded forward-chaining inference over the accepted triples.
//!
//! ## Architecture
//!
//! - **Registries** (`registry`): acyclic single-parent type hierarchy and
//!   relation definitions with domain, range and algebraic flags
//! - **Typing** (`typing`): pluggable entity typing; explicit assertions first,
//!   identifier heuristic last
//! - **Validation** (`validate`): fixed-order checks returning the first violation
//! - **Inference** (`infer`): transitive closure and capability inheritance,
//!   capped at ten rounds, parallel per relation via `rayon`
//! - **Seeds** (`seeds`): TOML seed packs that bootstrap the registries
//!
//! ## Library usage
//!
//! ```no_run
//! use ontology_engine::config::EngineConfig;
//! use ontology_engine::engine::Engine;
//! use ontology_engine::triple::{KnowledgeTriple, TypeAssertion};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.assert_type(TypeAssertion::new("reasoning", "Capability", "curator"));
//!
//! let kb = vec![
//!     KnowledgeTriple::new("GPT-4", "improves_upon", "GPT-3.5"),
//!     KnowledgeTriple::new("GPT-3.5", "capable_of", "reasoning").with_confidence(0.9),
//! ];
//! for t in &kb {
//!     engine.validate(t).unwrap();
//! }
//! let outcome = engine.infer(&kb).unwrap();
//! assert_eq!(outcome.len(), 1);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod infer;
pub mod provenance;
pub mod registry;
pub mod seeds;
pub mod symbol;
pub mod triple;
pub mod typing;
pub mod validate;

pub use error::{OntoError, OntoResult, OntologyError};
pub use infer::{can_infer, infer_from_axioms};
