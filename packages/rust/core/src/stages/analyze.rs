//! analyze: keyword mapping and gap detection over `collector.json`.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use placeseo_shared::{ArtifactKind, Intake, Result, StageName};
use placeseo_taxonomy::{Facet, TaxonomyIndex, dedupe, normalize, tokenize};

use crate::artifact::{
    array_at, merge, object_at, read_artifact, read_intake, stamp, str_at, write_artifact,
};
use crate::pipeline::{Stage, StageContext};
use crate::stages::taxonomy::load_taxonomy;

/// Address tokens considered for region keywords.
const REGION_TOKENS: usize = 5;
/// Tokens per menu name or description considered for attributes.
const ATTRIBUTE_TOKENS: usize = 6;
/// Phones with fewer digits than this are flagged.
const MIN_PHONE_DIGITS: usize = 8;

// ---------------------------------------------------------------------------
// KeywordMapper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub rule: &'static str,
    pub source: &'static str,
    pub text: String,
}

/// Why a keyword was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordDetail {
    pub facet: Facet,
    pub canonical: String,
    pub confidence: Confidence,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedKeywords {
    pub core: Vec<String>,
    pub region: Vec<String>,
    pub attributes: Vec<String>,
    pub details: Vec<KeywordDetail>,
}

/// Maps business data onto canonical taxonomy terms.
pub struct KeywordMapper<'a> {
    index: &'a TaxonomyIndex,
}

impl<'a> KeywordMapper<'a> {
    pub fn new(index: &'a TaxonomyIndex) -> Self {
        Self { index }
    }

    pub fn map(&self, intake: &Intake, collected: &Value) -> MappedKeywords {
        let mut details = Vec::new();
        let core = self.map_core(intake, collected, &mut details);
        let region = self.map_region(intake, collected, &mut details);
        let attributes = self.map_attributes(collected, &mut details);
        MappedKeywords {
            core: dedupe(core),
            region: dedupe(region),
            attributes: dedupe(attributes),
            details,
        }
    }

    /// Categories: exact taxonomy hits are high confidence, anything else is
    /// kept verbatim at medium.
    fn map_core(&self, intake: &Intake, collected: &Value, details: &mut Vec<KeywordDetail>) -> Vec<String> {
        let collected_category = Some(str_at(collected, "/client/business/category/primary"))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| str_at(collected, "/keywords/core/0"));
        let sources = [
            ("collected.category", collected_category),
            ("intake.category", intake.business.category.primary.as_str()),
        ];

        let mut out = Vec::new();
        for (source, value) in sources {
            if normalize(value).is_empty() {
                continue;
            }
            let detail = match self.index.lookup(Facet::Core, value) {
                Some(canonical) => hit(Facet::Core, canonical, source, value),
                None => KeywordDetail {
                    facet: Facet::Core,
                    canonical: value.to_string(),
                    confidence: Confidence::Medium,
                    evidence: Evidence {
                        rule: "fallback-category",
                        source,
                        text: value.to_string(),
                    },
                },
            };
            out.push(detail.canonical.clone());
            details.push(detail);
        }
        out
    }

    /// Leading address tokens; unknown tokens are kept at medium confidence.
    fn map_region(&self, intake: &Intake, collected: &Value, details: &mut Vec<KeywordDetail>) -> Vec<String> {
        let address = [
            intake.business.address.raw.as_str(),
            str_at(collected, "/client/business/address/raw"),
            str_at(collected, "/keywords/region/0"),
        ]
        .into_iter()
        .find(|a| !a.trim().is_empty())
        .unwrap_or("");

        let mut out = Vec::new();
        for token in tokenize(address).into_iter().take(REGION_TOKENS) {
            let detail = match self.index.lookup(Facet::Region, &token) {
                Some(canonical) => hit(Facet::Region, canonical, "address.raw", &token),
                None => KeywordDetail {
                    facet: Facet::Region,
                    canonical: token.clone(),
                    confidence: Confidence::Medium,
                    evidence: Evidence {
                        rule: "token-address",
                        source: "address.raw",
                        text: token,
                    },
                },
            };
            out.push(detail.canonical.clone());
            details.push(detail);
        }
        out
    }

    /// Only exact taxonomy hits from menu names and the description count.
    fn map_attributes(&self, collected: &Value, details: &mut Vec<KeywordDetail>) -> Vec<String> {
        let menu_names = array_at(collected, "/assets/menus")
            .iter()
            .filter_map(|m| m.get("name").and_then(Value::as_str));
        let description = Some(str_at(collected, "/assets/description")).filter(|d| !d.is_empty());

        let mut out = Vec::new();
        for text in menu_names.chain(description) {
            for token in tokenize(text).into_iter().take(ATTRIBUTE_TOKENS) {
                if let Some(canonical) = self.index.lookup(Facet::Attributes, &token) {
                    out.push(canonical.to_string());
                    details.push(hit(Facet::Attributes, canonical, "menu/desc", &token));
                }
            }
        }
        out
    }
}

fn hit(facet: Facet, canonical: &str, source: &'static str, text: &str) -> KeywordDetail {
    KeywordDetail {
        facet,
        canonical: canonical.to_string(),
        confidence: Confidence::High,
        evidence: Evidence {
            rule: "exact-taxonomy",
            source,
            text: text.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Gap detection
// ---------------------------------------------------------------------------

/// Missing required listing fields and suspicious values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gaps {
    pub missing: Vec<String>,
    pub issues: Vec<String>,
}

pub fn detect_gaps(collected: &Value) -> Gaps {
    let mut gaps = Gaps::default();
    let blank = |pointer: &str| str_at(collected, pointer).trim().is_empty();

    if blank("/client/business/name") {
        gaps.missing.push("business.name".into());
    }
    if blank("/client/business/address/raw") {
        gaps.missing.push("business.address.raw".into());
    }
    if array_at(collected, "/assets/photos").is_empty() {
        gaps.missing.push("assets.photos".into());
    }
    if blank("/client/business/category/primary") {
        gaps.missing.push("business.category.primary".into());
    }

    let phone = str_at(collected, "/client/business/phone");
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !phone.is_empty() && digits < MIN_PHONE_DIGITS {
        gaps.issues.push("business.phone.format_suspect".into());
    }
    gaps
}

/// Ranking signals cannot be verified offline; they are reported as unknown.
fn unknown_metric() -> Value {
    json!({ "score": "unknown", "basis": [] })
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

pub struct AnalyzeStage {
    normalized_taxonomy: PathBuf,
    raw_taxonomy: PathBuf,
}

impl AnalyzeStage {
    pub fn new(normalized_taxonomy: PathBuf, raw_taxonomy: PathBuf) -> Self {
        Self {
            normalized_taxonomy,
            raw_taxonomy,
        }
    }
}

#[async_trait]
impl Stage for AnalyzeStage {
    fn name(&self) -> StageName {
        StageName::Analyze
    }

    #[instrument(skip_all, fields(brand = %ctx.brand))]
    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let intake = read_intake(&ctx.paths)?;
        let collected = read_artifact(&ctx.paths, ArtifactKind::Collector)?;

        let (index, taxonomy_source) = load_taxonomy(&self.normalized_taxonomy, &self.raw_taxonomy);
        let keywords = KeywordMapper::new(&index).map(&intake, &collected);
        let gaps = detect_gaps(&collected);

        let mut doc = collected;
        object_at(&mut doc, "").insert(
            "keywords".into(),
            json!({
                "core": keywords.core,
                "region": keywords.region,
                "attributes": keywords.attributes,
                "details": keywords.details,
            }),
        );
        merge(
            &mut doc,
            json!({
                "analysis": {
                    "relevance": unknown_metric(),
                    "popularity": unknown_metric(),
                    "trust": unknown_metric(),
                    "missing": gaps.missing,
                    "issues": gaps.issues,
                },
                "provenance": {
                    "analyzer": {
                        "run_id": ctx.run_id,
                        "taxonomy": taxonomy_source.as_str(),
                        "taxonomy_entries": index.len(),
                    }
                }
            }),
        );
        stamp(&mut doc, ArtifactKind::Analysis);

        let path = write_artifact(&ctx.paths, ArtifactKind::Analysis, &doc)?;
        info!(
            path = %path.display(),
            core = keywords.core.len(),
            region = keywords.region.len(),
            attributes = keywords.attributes.len(),
            missing = gaps.missing.len(),
            "analysis written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> TaxonomyIndex {
        let content = std::fs::read_to_string("../../../fixtures/json/taxonomy.fixture.json")
            .expect("read taxonomy fixture");
        TaxonomyIndex::build(&serde_json::from_str(&content).expect("parse taxonomy fixture"))
    }

    fn intake() -> Intake {
        let content = std::fs::read_to_string("../../../fixtures/json/intake.fixture.json")
            .expect("read intake fixture");
        serde_json::from_str(&content).expect("parse intake fixture")
    }

    fn collected() -> Value {
        json!({
            "client": {
                "business": {
                    "name": "카페 모리",
                    "phone": "02-123-4567",
                    "address": { "raw": "서울 마포구 연남동 123-4" },
                    "category": { "primary": "커피숍" }
                }
            },
            "assets": {
                "photos": [],
                "menus": [{ "name": "카페라떼" }, { "name": "수제디저트 세트" }, { "name": "아메리카노" }],
                "description": "latte 맛집"
            }
        })
    }

    #[test]
    fn core_uses_taxonomy_then_falls_back() {
        let index = taxonomy();
        let mut intake = intake();
        intake.business.category.primary = "브런치".into();

        let mapped = KeywordMapper::new(&index).map(&intake, &collected());
        assert_eq!(mapped.core, vec!["카페", "브런치"]);

        let core: Vec<_> = mapped.details.iter().filter(|d| d.facet == Facet::Core).collect();
        assert_eq!(core[0].confidence, Confidence::High);
        assert_eq!(core[0].evidence.rule, "exact-taxonomy");
        assert_eq!(core[0].evidence.text, "커피숍");
        assert_eq!(core[1].confidence, Confidence::Medium);
        assert_eq!(core[1].evidence.rule, "fallback-category");
    }

    #[test]
    fn region_maps_leading_address_tokens() {
        let index = taxonomy();
        let mapped = KeywordMapper::new(&index).map(&intake(), &collected());
        // "서울 마포구 연남동 123 4": three hits, two raw tokens
        assert_eq!(mapped.region, vec!["서울", "마포구", "연남동", "123", "4"]);
        let medium = mapped
            .details
            .iter()
            .filter(|d| d.facet == Facet::Region && d.confidence == Confidence::Medium)
            .count();
        assert_eq!(medium, 2);
    }

    #[test]
    fn attributes_only_keep_taxonomy_hits() {
        let index = taxonomy();
        let mapped = KeywordMapper::new(&index).map(&intake(), &collected());
        assert_eq!(mapped.attributes, vec!["라떼", "수제 디저트"]);
    }

    #[test]
    fn empty_taxonomy_still_maps_core_and_region() {
        let index = TaxonomyIndex::default();
        let mapped = KeywordMapper::new(&index).map(&intake(), &collected());
        assert_eq!(mapped.core, vec!["커피숍", "카페"]);
        assert!(mapped.attributes.is_empty());
        assert!(mapped.details.iter().all(|d| d.confidence == Confidence::Medium));
    }

    #[test]
    fn gaps_follow_listing_requirements() {
        let gaps = detect_gaps(&collected());
        assert_eq!(gaps.missing, vec!["assets.photos"]);
        assert!(gaps.issues.is_empty());

        let gaps = detect_gaps(&json!({"client": {"business": {"phone": "123-45"}}}));
        assert_eq!(
            gaps.missing,
            vec![
                "business.name",
                "business.address.raw",
                "assets.photos",
                "business.category.primary"
            ]
        );
        assert_eq!(gaps.issues, vec!["business.phone.format_suspect"]);
    }

    #[test]
    fn detail_serializes_lowercase() {
        let index = taxonomy();
        let mapped = KeywordMapper::new(&index).map(&intake(), &collected());
        let value = serde_json::to_value(&mapped.details[0]).unwrap();
        assert_eq!(value["facet"], "core");
        assert_eq!(value["confidence"], "high");
        assert_eq!(value["evidence"]["source"], "collected.category");
    }
}
