//! Provenance: how a piece of knowledge came to be.
//!
//! Every triple produced by inference carries a [`Derivation`] linking it back
//! to the statements it was derived from, so derived knowledge is never
//! indistinguishable from a directly asserted triple.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::triple::{KnowledgeTriple, TripleKey};

/// The rule that produced a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivationKind {
    /// Directly asserted by a principal.
    Direct,
    /// `(a R b) ∧ (b R c) ⇒ (a R c)` for a transitive relation `R`.
    TransitiveInference,
    /// `(a improves_upon b) ∧ (b capable_of x) ⇒ (a capable_of x)`.
    CapabilityInheritance,
}

impl fmt::Display for DerivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::TransitiveInference => write!(f, "transitive"),
            Self::CapabilityInheritance => write!(f, "capability-inheritance"),
        }
    }
}

/// Derivation metadata: the rule and the statements it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    pub kind: DerivationKind,
    /// Keys of the contributing triples, in rule-antecedent order.
    pub contributing: Vec<TripleKey>,
}

impl Derivation {
    pub fn direct() -> Self {
        Self {
            kind: DerivationKind::Direct,
            contributing: Vec::new(),
        }
    }
}

/// A knowledge triple together with how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTriple {
    pub triple: KnowledgeTriple,
    pub derivation: Derivation,
    /// Inference round that produced the triple (0 for direct assertions).
    pub round: usize,
}

impl DerivedTriple {
    /// Wrap a directly asserted triple.
    pub fn direct(triple: KnowledgeTriple) -> Self {
        Self {
            triple,
            derivation: Derivation::direct(),
            round: 0,
        }
    }

    pub fn key(&self) -> TripleKey {
        self.triple.key()
    }

    pub fn confidence(&self) -> f32 {
        self.triple.confidence
    }

    pub fn kind(&self) -> DerivationKind {
        self.derivation.kind
    }

    /// Whether this triple was inferred rather than asserted.
    pub fn is_inferred(&self) -> bool {
        self.derivation.kind != DerivationKind::Direct
    }
}

impl fmt::Display for DerivedTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}", self.triple, self.derivation.kind)?;
        if !self.derivation.contributing.is_empty() {
            write!(f, " from ")?;
            for (i, key) in self.derivation.contributing.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
        }
        write!(f, "]")
    }
}
