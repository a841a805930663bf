//! Core domain types for placeseo brand pipelines.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlaceSeoError;

/// Current schema version written into every artifact's `meta` block.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// StageName
// ---------------------------------------------------------------------------

/// Identity of a pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    NormalizeTaxonomy,
    Collect,
    Analyze,
    Improve,
    Generate,
    Validate,
}

impl StageName {
    /// All stages in the fixed order a brand run executes them.
    pub const ALL: [StageName; 6] = [
        Self::NormalizeTaxonomy,
        Self::Collect,
        Self::Analyze,
        Self::Improve,
        Self::Generate,
        Self::Validate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NormalizeTaxonomy => "normalize-taxonomy",
            Self::Collect => "collect",
            Self::Analyze => "analyze",
            Self::Improve => "improve",
            Self::Generate => "generate",
            Self::Validate => "validate",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(StageName::as_str).collect();
                format!("unknown stage '{s}': expected one of {}", names.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// Artifacts and brand layout
// ---------------------------------------------------------------------------

/// The JSON artifacts a brand directory can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Intake,
    Collector,
    Analysis,
    Improved,
}

impl ArtifactKind {
    /// Every artifact, in pipeline order.
    pub const ALL: [ArtifactKind; 4] = [
        Self::Intake,
        Self::Collector,
        Self::Analysis,
        Self::Improved,
    ];

    /// The artifacts that must pass the schema gate.
    pub const GATED: [ArtifactKind; 3] = [Self::Collector, Self::Analysis, Self::Improved];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Intake => "intake.json",
            Self::Collector => "collector.json",
            Self::Analysis => "analysis.json",
            Self::Improved => "improved.json",
        }
    }

    /// Value of `meta.stage` inside artifacts of this kind.
    pub fn stage_tag(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Collector => "collector",
            Self::Analysis => "analysis",
            Self::Improved => "improved",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Paths inside one brand directory (`<clients_dir>/<brand>/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandPaths {
    root: PathBuf,
}

impl BrandPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the directory for `brand` under a clients directory.
    /// Call [`check_brand`] first on untrusted names.
    pub fn for_brand(clients_dir: &Path, brand: &str) -> Self {
        Self::new(clients_dir.join(brand))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.root.join("inputs")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }
}

/// A brand names exactly one directory directly under the clients directory.
pub fn check_brand(brand: &str) -> crate::Result<()> {
    let trimmed = brand.trim();
    if trimmed.is_empty() {
        return Err(PlaceSeoError::config("brand name is empty"));
    }
    if brand.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
        return Err(PlaceSeoError::config(format!(
            "brand name {brand:?} must be a single directory name"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// One schema violation: where in the document, and what is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer to the offending instance location (empty for the root).
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// The operator-supplied `intake.json` for a brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intake {
    #[serde(default)]
    pub brand: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub place_id: String,
    #[serde(default)]
    pub business: Business,
}

/// Business identity as registered by the operator. Unknown keys are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Business {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub category: Category,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub raw: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
}

/// Place ids show up both as strings and as bare numbers in intake files.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
