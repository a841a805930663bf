//! collect: intake + place data → `collector.json`.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{info, instrument};

use placeseo_collector::{Collected, NapMismatch, PlaceClient, acquire, detect_nap_mismatch};
use placeseo_shared::{ArtifactKind, CollectorConfig, Intake, PlaceSeoError, Result, StageName};

use crate::artifact::{read_intake, stamp, write_artifact};
use crate::pipeline::{Stage, StageContext};

pub struct CollectStage {
    client: PlaceClient,
    offline_fallback: bool,
}

impl CollectStage {
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        Ok(Self {
            client: PlaceClient::new(config)?,
            offline_fallback: config.offline_fallback,
        })
    }
}

#[async_trait]
impl Stage for CollectStage {
    fn name(&self) -> StageName {
        StageName::Collect
    }

    #[instrument(skip_all, fields(brand = %ctx.brand, mock = ctx.mock))]
    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let intake = read_intake(&ctx.paths)?;
        let collected = acquire(
            &self.client,
            &intake,
            &ctx.paths.inputs_dir(),
            ctx.mock,
            self.offline_fallback,
        )
        .await?;

        let nap = detect_nap_mismatch(&intake, &collected.place);
        let mut doc = collector_document(ctx, &intake, &collected, &nap)?;
        stamp(&mut doc, ArtifactKind::Collector);

        let path = write_artifact(&ctx.paths, ArtifactKind::Collector, &doc)?;
        info!(
            path = %path.display(),
            source = %collected.source,
            nap_mismatch = nap.any(),
            "collector.json written"
        );
        Ok(())
    }
}

/// The full artifact envelope with the collected parts filled in. Later
/// stages only add to it.
pub fn collector_document(
    ctx: &StageContext,
    intake: &Intake,
    collected: &Collected,
    nap: &NapMismatch,
) -> Result<Value> {
    let place = &collected.place;
    let to_value = |what: &str, value: serde_json::Result<Value>| {
        value.map_err(|e| PlaceSeoError::parse(format!("{what}: {e}")))
    };

    let brand = if intake.brand.trim().is_empty() {
        ctx.brand.as_str()
    } else {
        intake.brand.as_str()
    };
    let non_empty = |s: &str| {
        if s.trim().is_empty() {
            Vec::new()
        } else {
            vec![s.to_string()]
        }
    };

    Ok(json!({
        "meta": {},
        "client": {
            "brand": brand,
            "place_id": intake.place_id,
            "business": to_value("business", serde_json::to_value(&intake.business))?,
        },
        "keywords": {
            "core": non_empty(&place.category),
            "region": non_empty(&place.address),
            "attributes": [],
        },
        "assets": {
            "photos": to_value("photos", serde_json::to_value(&place.photos))?,
            "menus": to_value("menus", serde_json::to_value(&place.menu))?,
            "reviews": to_value("reviews", serde_json::to_value(&place.reviews))?,
            "description": place.description,
        },
        "analysis": {
            "issues": [],
            "missing": [],
            "relevance": {},
            "popularity": {},
            "trust": {},
            "nap_mismatch": to_value("nap_mismatch", serde_json::to_value(nap))?,
        },
        "improvements": {
            "keyword_proposals": [],
            "intro_text": "",
            "news_calendar": [],
            "review_templates": [],
            "visual_suggestions": [],
        },
        "provenance": {
            "collector": {
                "source": collected.source,
                "run_id": ctx.run_id,
                "collected_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            "analyzer": {},
            "improver": {},
            "generator": {},
        },
    }))
}
