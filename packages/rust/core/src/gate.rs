//! Schema gate for pipeline artifacts.
//!
//! The schema is compiled once into a draft 2020-12 validator and reused for
//! every file. Validation collects every violation instead of stopping at the
//! first one.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use placeseo_shared::{ArtifactKind, BrandPaths, PlaceSeoError, Result, Violation};

use crate::artifact::read_json;

/// The schema shipped with placeseo.
pub const BUILTIN_SCHEMA: &str = include_str!("../schemas/artifact.schema.json");

/// A compiled artifact schema.
pub struct SchemaGate {
    validator: jsonschema::Validator,
    source: String,
}

impl std::fmt::Debug for SchemaGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaGate")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl SchemaGate {
    pub fn builtin() -> Result<Self> {
        let schema: Value = serde_json::from_str(BUILTIN_SCHEMA)
            .map_err(|e| PlaceSeoError::config(format!("built-in schema is not JSON: {e}")))?;
        Self::compile(&schema, "built-in".into())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let schema = read_json(path, "schema")?;
        Self::compile(&schema, path.display().to_string())
    }

    pub fn from_value(schema: &Value) -> Result<Self> {
        Self::compile(schema, "inline".into())
    }

    /// Schema from `path` when configured, else the built-in one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    fn compile(schema: &Value, source: String) -> Result<Self> {
        let validator = jsonschema::draft202012::new(schema)
            .map_err(|e| PlaceSeoError::config(format!("invalid JSON Schema ({source}): {e}")))?;
        debug!(%source, "compiled artifact schema");
        Ok(Self { validator, source })
    }

    /// Where the schema came from: `built-in`, `inline`, or a file path.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every violation in `instance`; empty when it conforms.
    pub fn validate_value(&self, instance: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(instance)
            .map(|err| Violation::new(err.instance_path.to_string(), err.to_string()))
            .collect()
    }

    /// Load `path` and validate it. Unreadable or non-JSON files are errors,
    /// not violations.
    pub fn validate(&self, path: &Path) -> Result<Vec<Violation>> {
        let what = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".into());
        let instance = read_json(path, &what)?;
        Ok(self.validate_value(&instance))
    }

    /// Validate each gated artifact of a brand independently.
    #[instrument(skip_all, fields(brand_dir = %paths.root().display()))]
    pub fn validate_brand(&self, paths: &BrandPaths) -> GateReport {
        let files = ArtifactKind::GATED
            .into_iter()
            .map(|kind| {
                let path = paths.artifact(kind);
                let outcome = match self.validate(&path) {
                    Ok(violations) if violations.is_empty() => FileOutcome::Valid,
                    Ok(violations) => {
                        warn!(file = kind.file_name(), count = violations.len(), "schema violations");
                        FileOutcome::Invalid(violations)
                    }
                    Err(err) => {
                        warn!(file = kind.file_name(), error = %err, "artifact unreadable");
                        FileOutcome::Unreadable(err.to_string())
                    }
                };
                FileReport { kind, path, outcome }
            })
            .collect();
        GateReport { files }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Valid,
    Invalid(Vec<Violation>),
    /// Missing, unreadable or not JSON.
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.outcome == FileOutcome::Valid
    }

    /// Violations to show for this file; an unreadable file yields one at the root.
    pub fn violations(&self) -> Vec<Violation> {
        match &self.outcome {
            FileOutcome::Valid => Vec::new(),
            FileOutcome::Invalid(violations) => violations.clone(),
            FileOutcome::Unreadable(reason) => vec![Violation::new("", reason.clone())],
        }
    }
}

/// Per-file results of gating one brand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    pub files: Vec<FileReport>,
}

impl GateReport {
    /// True only if every file is valid.
    pub fn passed(&self) -> bool {
        self.files.iter().all(FileReport::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.passed())
    }

    /// `Ok` when passed, else a `Validation` error listing every violation
    /// with its file name in front of the pointer (`improved.json#/analysis`).
    pub fn into_result(self) -> Result<()> {
        if self.passed() {
            return Ok(());
        }
        let failed: Vec<&str> = self.failed().map(|f| f.kind.file_name()).collect();
        let message = format!(
            "{} of {} artifacts failed schema validation: {}",
            failed.len(),
            self.files.len(),
            failed.join(", ")
        );
        let violations = self
            .failed()
            .flat_map(|file| {
                file.violations().into_iter().map(move |v| {
                    Violation::new(format!("{}#{}", file.kind.file_name(), v.path), v.message)
                })
            })
            .collect();
        Err(PlaceSeoError::Validation {
            message,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(name: &str) -> Value {
        let content = std::fs::read_to_string(format!("../../../fixtures/json/{name}"))
            .expect("read fixture");
        serde_json::from_str(&content).expect("parse fixture")
    }

    fn brand_with_fixtures() -> (tempfile::TempDir, BrandPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = BrandPaths::new(dir.path().join("cafe_mori"));
        std::fs::create_dir_all(paths.root()).unwrap();
        for kind in ArtifactKind::GATED {
            let doc = fixture(&format!("{}.fixture.json", kind.stage_tag()));
            std::fs::write(paths.artifact(kind), serde_json::to_string(&doc).unwrap()).unwrap();
        }
        (dir, paths)
    }

    #[test]
    fn builtin_schema_compiles() {
        let gate = SchemaGate::builtin().unwrap();
        assert_eq!(gate.source(), "built-in");
    }

    #[test]
    fn conformant_fixtures_pass() {
        let gate = SchemaGate::builtin().unwrap();
        for kind in ArtifactKind::GATED {
            let doc = fixture(&format!("{}.fixture.json", kind.stage_tag()));
            assert_eq!(gate.validate_value(&doc), Vec::<Violation>::new(), "{kind}");
        }
    }

    #[test]
    fn string_missing_is_exactly_one_violation() {
        let gate = SchemaGate::builtin().unwrap();
        let mut doc = fixture("improved.fixture.json");
        doc["analysis"]["missing"] = json!("assets.photos");

        let violations = gate.validate_value(&doc);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(violations[0].path, "/analysis/missing");
    }

    #[test]
    fn collects_all_violations() {
        let gate = SchemaGate::builtin().unwrap();
        let mut doc = fixture("collector.fixture.json");
        doc["analysis"]["missing"] = json!(1);
        doc["keywords"]["core"] = json!("카페");
        doc["client"]["brand"] = json!("");

        assert_eq!(gate.validate_value(&doc).len(), 3);
    }

    #[test]
    fn stage_specific_requirements() {
        let gate = SchemaGate::builtin().unwrap();

        let mut improved = fixture("improved.fixture.json");
        improved["analysis"]
            .as_object_mut()
            .unwrap()
            .remove("guidebook_compliance");
        improved["improvements"]["intro_text"] = json!("");
        assert_eq!(gate.validate_value(&improved).len(), 2);

        // the same gaps are fine in a collector document
        let mut collector = fixture("collector.fixture.json");
        collector["improvements"]["intro_text"] = json!("");
        assert!(gate.validate_value(&collector).is_empty());
    }

    #[test]
    fn custom_schema_from_value() {
        let gate = SchemaGate::from_value(&json!({
            "type": "object",
            "properties": { "analysis": { "properties": { "missing": { "type": "array" } } } }
        }))
        .unwrap();
        assert_eq!(gate.validate_value(&json!({"analysis": {"missing": "x"}})).len(), 1);
        assert!(gate.validate_value(&json!({"analysis": {"missing": []}})).is_empty());
    }

    #[test]
    fn invalid_schema_is_a_config_error() {
        let err = SchemaGate::from_value(&json!({"type": 12})).unwrap_err();
        assert!(matches!(err, PlaceSeoError::Config { .. }));
    }

    #[test]
    fn validate_reports_io_and_parse_failures_as_errors() {
        let gate = SchemaGate::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let missing = gate.validate(&dir.path().join("collector.json")).unwrap_err();
        assert!(matches!(missing, PlaceSeoError::NotFound { .. }));

        let bad = dir.path().join("analysis.json");
        std::fs::write(&bad, "{").unwrap();
        assert!(matches!(gate.validate(&bad).unwrap_err(), PlaceSeoError::Parse { .. }));
    }

    #[test]
    fn brand_report_accumulates_per_file() {
        let gate = SchemaGate::builtin().unwrap();
        let (_dir, paths) = brand_with_fixtures();
        assert!(gate.validate_brand(&paths).passed());

        let mut improved = fixture("improved.fixture.json");
        improved["analysis"]["missing"] = json!("assets.photos");
        std::fs::write(
            paths.artifact(ArtifactKind::Improved),
            serde_json::to_string(&improved).unwrap(),
        )
        .unwrap();
        std::fs::remove_file(paths.artifact(ArtifactKind::Collector)).unwrap();

        let report = gate.validate_brand(&paths);
        assert!(!report.passed());
        let outcomes: Vec<bool> = report.files.iter().map(FileReport::passed).collect();
        assert_eq!(outcomes, vec![false, true, false]);
        assert!(matches!(report.files[0].outcome, FileOutcome::Unreadable(_)));

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("2 of 3 artifacts"));
        let violations = err.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[1].path, "improved.json#/analysis/missing");
    }
}
