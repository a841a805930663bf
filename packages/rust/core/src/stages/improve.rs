//! improve: content proposals and compliance lint → `improved.json`.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use placeseo_shared::{ArtifactKind, ImproverConfig, PlaceSeoError, Result, StageName};
use placeseo_taxonomy::dedupe;

use crate::artifact::{array_at, merge, object_at, read_artifact, stamp, strings_at, write_artifact};
use crate::pipeline::{Stage, StageContext};
use crate::stages::guidebook::{
    GuidebookLint, IntroSections, news_calendar, review_templates, visual_suggestions,
};

const MAX_PROPOSALS: usize = 20;

pub struct ImproveStage {
    config: ImproverConfig,
}

impl ImproveStage {
    pub fn new(config: ImproverConfig) -> Self {
        Self { config }
    }
}

/// `"<region> <core>"` pairs from the leading keywords.
pub fn keyword_proposals(doc: &Value) -> Vec<String> {
    let core = strings_at(doc, "/keywords/core");
    let region = strings_at(doc, "/keywords/region");
    let pairs = core.iter().take(3).flat_map(|c| {
        region
            .iter()
            .take(2)
            .map(move |r| format!("{r} {c}").trim().to_string())
    });
    dedupe(pairs).into_iter().take(MAX_PROPOSALS).collect()
}

/// One correction per mismatched NAP field.
pub fn nap_corrections(doc: &Value) -> Vec<String> {
    let flag = |field: &str| {
        doc.pointer(&format!("/analysis/nap_mismatch/{field}"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    let mut corrections = Vec::new();
    if flag("name") {
        corrections.push("상호명(N) 불일치: 네이버 등록명과 intake 비교 후 통일".to_string());
    }
    if flag("phone") {
        corrections.push("전화(P) 불일치: 하이픈/국번 포함 형식 통일".to_string());
    }
    if flag("address") {
        corrections.push("주소(A) 불일치: 도로명/지번 중 하나로 기준 통일".to_string());
    }
    corrections
}

#[async_trait]
impl Stage for ImproveStage {
    fn name(&self) -> StageName {
        StageName::Improve
    }

    #[instrument(skip_all, fields(brand = %ctx.brand))]
    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let mut doc = read_artifact(&ctx.paths, ArtifactKind::Analysis)?;

        let intro_text = IntroSections::from_document(&doc).compose(self.config.intro_min_chars);
        let compliance = GuidebookLint::new(self.config.intro_min_chars, self.config.intro_max_chars)
            .check(&intro_text);
        if !compliance.ok {
            warn!(issues = ?compliance.issues, "intro text is not guidebook compliant");
        }

        let to_value = |what: &str, value: serde_json::Result<Value>| {
            value.map_err(|e| PlaceSeoError::parse(format!("{what}: {e}")))
        };
        let improvements = json!({
            "keyword_proposals": keyword_proposals(&doc),
            "intro_text": intro_text,
            "news_calendar": to_value("news_calendar", serde_json::to_value(news_calendar()))?,
            "review_templates": to_value("review_templates", serde_json::to_value(review_templates()))?,
            "visual_suggestions": visual_suggestions(!array_at(&doc, "/assets/photos").is_empty()),
            "nap_corrections": nap_corrections(&doc),
        });
        let compliance_value = to_value("guidebook_compliance", serde_json::to_value(&compliance))?;

        object_at(&mut doc, "").insert("improvements".into(), improvements);
        object_at(&mut doc, "/analysis").insert("guidebook_compliance".into(), compliance_value);
        merge(
            &mut doc,
            json!({
                "provenance": {
                    "improver": {
                        "run_id": ctx.run_id,
                        "intro_min_chars": self.config.intro_min_chars,
                    }
                }
            }),
        );
        stamp(&mut doc, ArtifactKind::Improved);

        let path = write_artifact(&ctx.paths, ArtifactKind::Improved, &doc)?;
        info!(path = %path.display(), compliant = compliance.ok, "improved.json written");
        Ok(())
    }
}
