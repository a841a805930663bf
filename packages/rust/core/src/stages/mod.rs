//! Built-in stage implementations.

mod analyze;
mod collect;
mod generate;
mod guidebook;
mod improve;
mod taxonomy;
mod validate;

pub use analyze::{AnalyzeStage, Confidence, KeywordDetail, KeywordMapper, MappedKeywords};
pub use collect::CollectStage;
pub use generate::GenerateStage;
pub use guidebook::{Compliance, GuidebookLint, IntroSections};
pub use improve::ImproveStage;
pub use taxonomy::{NormalizeTaxonomyStage, TaxonomySource, load_taxonomy};
pub use validate::ValidateStage;

use placeseo_shared::{AppConfig, ProjectPaths, Result, StageName};

use crate::gate::SchemaGate;
use crate::pipeline::Stage;

/// The built-in implementation of `name`.
pub fn builtin(name: StageName, config: &AppConfig, project: &ProjectPaths) -> Result<Box<dyn Stage>> {
    Ok(match name {
        StageName::NormalizeTaxonomy => Box::new(NormalizeTaxonomyStage::new(
            project.taxonomy.clone(),
            project.normalized_taxonomy.clone(),
        )),
        StageName::Collect => Box::new(CollectStage::new(&config.collector)?),
        StageName::Analyze => Box::new(AnalyzeStage::new(
            project.normalized_taxonomy.clone(),
            project.taxonomy.clone(),
        )),
        StageName::Improve => Box::new(ImproveStage::new(config.improver.clone())),
        StageName::Generate => Box::new(GenerateStage),
        StageName::Validate => Box::new(ValidateStage::new(SchemaGate::load(
            project.schema.as_deref(),
        )?)),
    })
}
