//! Rich diagnostic error types for the ontology engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`OntologyError`] is the rejection
//! taxonomy returned by triple validation; [`InferError`] is kept separate
//! because it signals registry/data desynchronization rather than a bad triple.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::seeds::SeedError;

/// Top-level error type for the ontology engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Why a candidate triple was rejected.
///
/// Any variant means "rejected, nothing stored". Validation reports the first
/// violated rule in its fixed check order.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum OntologyError {
    #[error("unknown type: {0}")]
    #[diagnostic(
        code(onto::validate::unknown_type),
        help(
            "The resolved type of an entity is not registered. Register the type \
             or assert a registered type for the entity."
        )
    )]
    UnknownType(String),

    #[error("unknown relation: {0}")]
    #[diagnostic(
        code(onto::validate::unknown_relation),
        help("The predicate is not registered. List known predicates with `onto relations`.")
    )]
    UnknownRelation(String),

    #[error(
        "domain constraint violated: {relation} requires subject type {required}, got {actual}"
    )]
    #[diagnostic(
        code(onto::validate::domain),
        help(
            "The subject's type must equal or be a subtype of the relation's domain. \
             Supply an explicit subject type if the inferred one is wrong."
        )
    )]
    DomainViolation {
        relation: String,
        required: String,
        actual: String,
    },

    #[error(
        "range constraint violated: {relation} requires object type {required}, got {actual}"
    )]
    #[diagnostic(
        code(onto::validate::range),
        help(
            "The object's type must equal or be a subtype of the relation's range. \
             Supply an explicit object type if the inferred one is wrong."
        )
    )]
    RangeViolation {
        relation: String,
        required: String,
        actual: String,
    },

    #[error("validation error: {0}")]
    #[diagnostic(code(onto::validate::invalid))]
    ValidationError(String),
}

/// Result type for triple validation.
pub type ValidationResult<T> = std::result::Result<T, OntologyError>;

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Errors from type and relation registration.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum RegistryError {
    #[error("{kind} id cannot be empty")]
    #[diagnostic(code(onto::registry::empty_id))]
    EmptyId { kind: &'static str },

    #[error("{kind} \"{id}\" has an empty name")]
    #[diagnostic(code(onto::registry::empty_name))]
    EmptyName { kind: &'static str, id: String },

    #[error("type \"{type_id}\" names an empty parent")]
    #[diagnostic(
        code(onto::registry::empty_parent),
        help("Omit the parent entirely for the root type.")
    )]
    EmptyParent { type_id: String },

    #[error("type \"{type_id}\" is already registered")]
    #[diagnostic(
        code(onto::registry::duplicate_type),
        help("Registries are append-only. Choose a new type id.")
    )]
    DuplicateType { type_id: String },

    #[error("relation \"{relation_id}\" is already registered")]
    #[diagnostic(
        code(onto::registry::duplicate_relation),
        help("Relations are immutable once registered. Choose a new relation id.")
    )]
    DuplicateRelation { relation_id: String },

    #[error("type \"{type_id}\" names unknown parent \"{parent}\"")]
    #[diagnostic(
        code(onto::registry::unknown_parent),
        help("Register the parent type first.")
    )]
    UnknownParent { type_id: String, parent: String },

    #[error("relation \"{relation_id}\" refers to unknown type \"{type_id}\"")]
    #[diagnostic(
        code(onto::registry::unknown_type),
        help("Domain and range must name registered types.")
    )]
    UnknownType { relation_id: String, type_id: String },

    #[error("type \"{type_id}\" would create a parent cycle through \"{revisited}\"")]
    #[diagnostic(
        code(onto::registry::cycle),
        help("The parent chain must be acyclic and end at the root type.")
    )]
    Cycle { type_id: String, revisited: String },

    #[error("type \"{type_id}\" exceeds the maximum hierarchy depth of {max_depth}")]
    #[diagnostic(
        code(onto::registry::depth),
        help("Flatten the hierarchy or raise `registry.max_depth` in the config.")
    )]
    DepthExceeded { type_id: String, max_depth: usize },

    #[error("type hierarchy has no root type")]
    #[diagnostic(
        code(onto::registry::missing_root),
        help("Exactly one type must have no parent (conventionally `Thing`).")
    )]
    MissingRoot,

    #[error("type hierarchy has more than one root: \"{first}\" and \"{second}\"")]
    #[diagnostic(
        code(onto::registry::multiple_roots),
        help("Give every type except the root a parent.")
    )]
    MultipleRoots { first: String, second: String },

    #[error("type stored under key \"{key}\" has id \"{type_id}\"")]
    #[diagnostic(
        code(onto::registry::key_mismatch),
        help("Each entry in `types` must be keyed by its own `type_id`.")
    )]
    KeyMismatch { key: String, type_id: String },

    #[error("declared root \"{declared}\" does not match hierarchy root \"{actual}\"")]
    #[diagnostic(code(onto::registry::root_mismatch))]
    RootMismatch { declared: String, actual: String },
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

/// Errors from the inference engine.
///
/// These are integration failures, never ordinary rejections.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum InferError {
    #[error(
        "triple ({subject}, {relation}, {object}) references relation \"{relation}\" \
         which is not registered"
    )]
    #[diagnostic(
        code(onto::infer::unregistered_relation),
        help(
            "The registry is out of sync with the triple store. Every stored triple \
             passed validation, so its relation must still be registered. Reload the \
             registries from the same seed packs the store was validated against."
        )
    )]
    UnregisteredRelation {
        relation: String,
        subject: String,
        object: String,
    },

    #[error("inference cancelled during round {round}")]
    #[diagnostic(code(onto::infer::cancelled))]
    Cancelled { round: usize },
}

/// Result type for inference operations.
pub type InferResult<T> = std::result::Result<T, InferError>;

/// Convenience result type alias.
pub type OntoResult<T> = std::result::Result<T, OntoError>;
