//! normalize-taxonomy: flatten the raw taxonomy into lookup tables.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use placeseo_shared::{PlaceSeoError, Result, StageName};
use placeseo_taxonomy::{NormalizedTaxonomy, TaxonomyIndex};

use crate::artifact::{read_json, write_json};
use crate::pipeline::{Stage, StageContext};

pub struct NormalizeTaxonomyStage {
    raw: PathBuf,
    normalized: PathBuf,
}

impl NormalizeTaxonomyStage {
    pub fn new(raw: PathBuf, normalized: PathBuf) -> Self {
        Self { raw, normalized }
    }
}

#[async_trait]
impl Stage for NormalizeTaxonomyStage {
    fn name(&self) -> StageName {
        StageName::NormalizeTaxonomy
    }

    #[instrument(skip_all, fields(raw = %self.raw.display()))]
    async fn run(&self, _ctx: &StageContext) -> Result<()> {
        if !self.raw.exists() {
            warn!("raw taxonomy not found, keyword mapping will use fallbacks only");
            return Ok(());
        }

        let document = read_json(&self.raw, "taxonomy")?;
        let index = TaxonomyIndex::build(&document);
        write_json(&self.normalized, &index.to_normalized())?;

        info!(
            entries = index.len(),
            output = %self.normalized.display(),
            "normalized taxonomy written"
        );
        Ok(())
    }
}

/// Where [`load_taxonomy`] found its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomySource {
    Normalized,
    Raw,
    Empty,
}

impl TaxonomySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normalized => "normalized",
            Self::Raw => "raw",
            Self::Empty => "empty",
        }
    }
}

/// The normalized file, else the raw document, else an empty index.
///
/// Unreadable sources are skipped with a warning; this never fails.
pub fn load_taxonomy(normalized: &Path, raw: &Path) -> (TaxonomyIndex, TaxonomySource) {
    match read_normalized(normalized) {
        Ok(Some(index)) => return (index, TaxonomySource::Normalized),
        Ok(None) => {}
        Err(e) => warn!(path = %normalized.display(), error = %e, "ignoring normalized taxonomy"),
    }

    if raw.exists() {
        match read_json(raw, "taxonomy") {
            Ok(document) => return (TaxonomyIndex::build(&document), TaxonomySource::Raw),
            Err(e) => warn!(path = %raw.display(), error = %e, "ignoring raw taxonomy"),
        }
    }

    warn!("no taxonomy available, continuing with an empty index");
    (TaxonomyIndex::default(), TaxonomySource::Empty)
}

fn read_normalized(path: &Path) -> Result<Option<TaxonomyIndex>> {
    if !path.exists() {
        return Ok(None);
    }
    let value = read_json(path, "normalized taxonomy")?;
    let normalized: NormalizedTaxonomy = serde_json::from_value(value)
        .map_err(|e| PlaceSeoError::parse(format!("{}: {e}", path.display())))?;
    Ok(Some(TaxonomyIndex::from_normalized(&normalized)))
}
