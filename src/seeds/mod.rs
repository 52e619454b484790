//! Seed packs: ontology bootstrapping.
//!
//! A seed pack is a TOML-defined bundle of type and relation definitions.
//! Two packs are bundled into the binary: `base` (the upper-level hierarchy
//! and baseline relations) and `ai-ml` (models, datasets and capabilities).
//! Additional packs can be discovered from a directory at runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::error::RegistryError;
use crate::registry::{Ontology, OntologyRelation, OntologyType, RelationRegistry, TypeRegistry};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("seed pack not found: \"{id}\"")]
    #[diagnostic(
        code(onto::seed::not_found),
        help("List available packs with `onto info`. Extra packs are read from `bootstrap.seeds_dir`.")
    )]
    NotFound { id: String },

    #[error("failed to parse seed pack \"{id}\": {message}")]
    #[diagnostic(
        code(onto::seed::parse),
        help("Check the seed.toml syntax: a [seed] table plus [[types]] and [[relations]] arrays.")
    )]
    Parse { id: String, message: String },

    #[error("failed to read seed file: {path}")]
    #[diagnostic(code(onto::seed::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

pub type SeedResult<T> = std::result::Result<T, SeedError>;

// ── Seed pack data model ────────────────────────────────────────────────

/// A seed pack: TOML-defined ontology bundle.
#[derive(Debug, Clone)]
pub struct SeedPack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub types: Vec<SeedType>,
    pub relations: Vec<SeedRelation>,
    /// Source: `Bundled` or `External(path)`.
    pub source: SeedSource,
}

/// Where a seed pack came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    /// Loaded from an external directory.
    External(PathBuf),
}

/// A type definition in a seed pack.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedType {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A relation definition in a seed pack.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRelation {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub transitive: bool,
    #[serde(default)]
    pub symmetric: bool,
    #[serde(default)]
    pub reflexive: bool,
    #[serde(default)]
    pub description: String,
}

impl SeedType {
    fn to_definition(&self) -> OntologyType {
        let mut ty = OntologyType::new(self.id.as_str(), self.parent.as_deref())
            .with_description(self.description.clone());
        if let Some(name) = &self.name {
            ty = ty.with_name(name.clone());
        }
        ty
    }
}

impl SeedRelation {
    fn to_definition(&self) -> OntologyRelation {
        let mut rel = OntologyRelation::new(self.id.as_str())
            .with_description(self.description.clone());
        if let Some(name) = &self.name {
            rel.name = name.clone();
        }
        rel.domain = self.domain.as_deref().map(Into::into);
        rel.range = self.range.as_deref().map(Into::into);
        rel.is_transitive = self.transitive;
        rel.is_symmetric = self.symmetric;
        rel.is_reflexive = self.reflexive;
        rel
    }
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeedToml {
    seed: SeedMeta,
    #[serde(default)]
    types: Vec<SeedType>,
    #[serde(default)]
    relations: Vec<SeedRelation>,
}

#[derive(Debug, Deserialize)]
struct SeedMeta {
    id: String,
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    description: String,
}

fn default_version() -> String {
    "0.1.0".into()
}

// ── Bundled seed packs ──────────────────────────────────────────────────

const BASE_TOML: &str = include_str!("../../data/seeds/base/seed.toml");
const AI_ML_TOML: &str = include_str!("../../data/seeds/ai-ml/seed.toml");

/// Parse a seed pack from TOML text. `hint` names the pack in parse errors.
pub fn parse_seed_toml(toml_str: &str, hint: &str, source: SeedSource) -> SeedResult<SeedPack> {
    let parsed: SeedToml = toml::from_str(toml_str).map_err(|e| SeedError::Parse {
        id: hint.to_string(),
        message: e.to_string(),
    })?;
    Ok(SeedPack {
        id: parsed.seed.id,
        name: parsed.seed.name,
        version: parsed.seed.version,
        description: parsed.seed.description,
        types: parsed.types,
        relations: parsed.relations,
        source,
    })
}

fn bundled_packs() -> Vec<SeedPack> {
    [(BASE_TOML, "base"), (AI_ML_TOML, "ai-ml")]
        .iter()
        .filter_map(
            |(toml, id)| match parse_seed_toml(toml, id, SeedSource::Bundled) {
                Ok(pack) => Some(pack),
                Err(e) => {
                    tracing::warn!(seed = id, "Failed to parse bundled seed: {e}");
                    None
                }
            },
        )
        .collect()
}

// ── Seed Registry ───────────────────────────────────────────────────────

/// Registry of available seed packs (bundled + discovered from disk).
pub struct SeedRegistry {
    packs: HashMap<String, SeedPack>,
}

impl SeedRegistry {
    /// Create a registry with only bundled packs.
    pub fn bundled() -> Self {
        let packs = bundled_packs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { packs }
    }

    /// Discover seed packs from a directory (in addition to bundled packs).
    ///
    /// Each subdirectory containing a `seed.toml` is loaded as a pack. A
    /// discovered pack replaces a bundled pack with the same id.
    pub fn discover(seeds_dir: &Path) -> Self {
        let mut registry = Self::bundled();

        let Ok(entries) = std::fs::read_dir(seeds_dir) else {
            tracing::debug!(dir = %seeds_dir.display(), "seeds directory not readable");
            return registry;
        };
        for entry in entries.flatten() {
            let seed_file = entry.path().join("seed.toml");
            if !seed_file.is_file() {
                continue;
            }
            match load_seed_file(&seed_file) {
                Ok(pack) => {
                    tracing::debug!(seed = %pack.id, path = %seed_file.display(), "discovered seed pack");
                    registry.packs.insert(pack.id.clone(), pack);
                }
                Err(e) => {
                    tracing::warn!(path = %seed_file.display(), "Skipping seed pack: {e}");
                }
            }
        }

        registry
    }

    /// List all available seed packs.
    pub fn list(&self) -> Vec<&SeedPack> {
        let mut packs: Vec<&SeedPack> = self.packs.values().collect();
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        packs
    }

    /// Get a seed pack by ID.
    pub fn get(&self, id: &str) -> SeedResult<&SeedPack> {
        self.packs
            .get(id)
            .ok_or_else(|| SeedError::NotFound { id: id.to_string() })
    }

    /// Build an ontology from the named packs, in the given order.
    pub fn bootstrap<S: AsRef<str>>(&self, pack_ids: &[S], max_depth: usize) -> SeedResult<Ontology> {
        let packs = pack_ids
            .iter()
            .map(|id| self.get(id.as_ref()))
            .collect::<SeedResult<Vec<_>>>()?;
        bootstrap(&packs, max_depth)
    }
}

fn load_seed_file(path: &Path) -> SeedResult<SeedPack> {
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let source_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parse_seed_toml(
        &content,
        &path.display().to_string(),
        SeedSource::External(source_dir),
    )
}

// ── Bootstrap ───────────────────────────────────────────────────────────

/// Build an [`Ontology`] from seed packs.
///
/// Types from every pack are collected first and checked as a whole
/// hierarchy (single root, parents present, acyclic, within `max_depth`),
/// so a pack may extend types defined by a later one. Relations are then
/// registered against the finished type registry.
pub fn bootstrap(packs: &[&SeedPack], max_depth: usize) -> SeedResult<Ontology> {
    let types = TypeRegistry::from_definitions(
        packs
            .iter()
            .flat_map(|p| p.types.iter().map(SeedType::to_definition)),
        max_depth,
    )?;

    let mut relations = RelationRegistry::new();
    for pack in packs {
        for rel in &pack.relations {
            relations.register(rel.to_definition(), &types)?;
        }
    }

    tracing::info!(
        packs = ?packs.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        types = types.len(),
        relations = relations.len(),
        "ontology bootstrapped"
    );
    Ok(Ontology::new(types, relations))
}
