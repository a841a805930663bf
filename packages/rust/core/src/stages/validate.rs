//! validate: the schema gate as the last pipeline stage.

use async_trait::async_trait;
use tracing::{info, instrument};

use placeseo_shared::{Result, StageName};

use crate::gate::SchemaGate;
use crate::pipeline::{Stage, StageContext};

pub struct ValidateStage {
    gate: SchemaGate,
}

impl ValidateStage {
    pub fn new(gate: SchemaGate) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl Stage for ValidateStage {
    fn name(&self) -> StageName {
        StageName::Validate
    }

    #[instrument(skip_all, fields(brand = %ctx.brand, schema = self.gate.source()))]
    async fn run(&self, ctx: &StageContext) -> Result<()> {
        self.gate.validate_brand(&ctx.paths).into_result()?;
        info!("all artifacts passed schema validation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placeseo_shared::{ArtifactKind, PlaceSeoError};

    #[tokio::test]
    async fn fails_with_every_violation() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StageContext::new(dir.path(), "cafe_mori", true);
        std::fs::create_dir_all(ctx.paths.root()).unwrap();
        for kind in ArtifactKind::GATED {
            std::fs::copy(
                format!("../../../fixtures/json/{}.fixture.json", kind.stage_tag()),
                ctx.paths.artifact(kind),
            )
            .unwrap();
        }

        let stage = ValidateStage::new(SchemaGate::builtin().unwrap());
        stage.run(&ctx).await.unwrap();

        std::fs::write(ctx.paths.artifact(ArtifactKind::Analysis), "{}").unwrap();
        let err = stage.run(&ctx).await.unwrap_err();
        assert!(matches!(err, PlaceSeoError::Validation { .. }));
        // seven required top-level keys
        assert_eq!(err.violations().len(), 7);
        assert!(err.violations().iter().all(|v| v.path.starts_with("analysis.json#")));
    }
}
