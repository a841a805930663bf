//! generate: deliverables under `outputs/` from `improved.json`.

use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{info, instrument};

use placeseo_shared::{ArtifactKind, PlaceSeoError, Result, StageName};

use crate::artifact::{read_artifact, str_at, strings_at, write_json};
use crate::pipeline::{Stage, StageContext};

pub const GUIDEBOOK_FILE: &str = "Guidebook.md";
pub const CHECKLIST_FILE: &str = "Deploy_Checklist.md";
pub const AUDIT_FILE: &str = "audit_report.json";

pub struct GenerateStage;

#[async_trait]
impl Stage for GenerateStage {
    fn name(&self) -> StageName {
        StageName::Generate
    }

    #[instrument(skip_all, fields(brand = %ctx.brand))]
    async fn run(&self, ctx: &StageContext) -> Result<()> {
        let improved = read_artifact(&ctx.paths, ArtifactKind::Improved)?;
        let outputs = ctx.paths.outputs_dir();
        std::fs::create_dir_all(&outputs).map_err(|e| PlaceSeoError::io(&outputs, e))?;

        write_text(&outputs.join(GUIDEBOOK_FILE), &guidebook(&improved))?;
        write_text(&outputs.join(CHECKLIST_FILE), &checklist(&improved))?;
        write_json(&outputs.join(AUDIT_FILE), &audit(&improved))?;

        info!(dir = %outputs.display(), "generator outputs written");
        Ok(())
    }
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| PlaceSeoError::io(path, e))
}

/// Business summary, keywords and the proposed intro as Markdown.
pub fn guidebook(improved: &Value) -> String {
    let mut out = String::from("# Guidebook\n\n## Business\n");
    let _ = writeln!(out, "- Name: {}", str_at(improved, "/client/business/name"));
    let _ = writeln!(
        out,
        "- Category: {}",
        str_at(improved, "/client/business/category/primary")
    );
    let _ = writeln!(
        out,
        "- Address: {}",
        str_at(improved, "/client/business/address/raw")
    );

    out.push_str("\n## Keywords\n");
    for (label, facet) in [("Core", "core"), ("Region", "region"), ("Attributes", "attributes")] {
        let _ = writeln!(
            out,
            "- {label}: {}",
            strings_at(improved, &format!("/keywords/{facet}")).join(", ")
        );
    }

    out.push_str("\n## Improvements\n");
    let _ = writeln!(
        out,
        "- Intro: {}",
        str_at(improved, "/improvements/intro_text")
    );
    out.push_str("- NAP Corrections:\n");
    for correction in strings_at(improved, "/improvements/nap_corrections") {
        let _ = writeln!(out, "  - {correction}");
    }
    out
}

/// Open tasks before the listing update goes live.
pub fn checklist(improved: &Value) -> String {
    let mut out = String::from("# Deploy Checklist\n- [ ] NAP 확인\n");
    for field in strings_at(improved, "/analysis/missing") {
        let _ = writeln!(out, "- [ ] 채움: {field}");
    }
    for issue in strings_at(improved, "/analysis/guidebook_compliance/issues") {
        let _ = writeln!(out, "- [ ] 가이드북: {issue}");
    }
    for correction in strings_at(improved, "/improvements/nap_corrections") {
        let _ = writeln!(out, "- [ ] 보정: {correction}");
    }
    out.push_str("- [ ] 대표 사진 5장 이상 등록\n- [ ] 카테고리/메뉴 최종 점검\n");
    out
}

pub fn audit(improved: &Value) -> Value {
    json!({
        "schema_version": str_at(improved, "/meta/schema_version"),
        "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "checks": {
            "nap_mismatch": improved
                .pointer("/analysis/nap_mismatch")
                .cloned()
                .unwrap_or_else(|| json!({})),
            "missing": strings_at(improved, "/analysis/missing"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn improved() -> Value {
        json!({
            "meta": { "schema_version": "1.0.0" },
            "client": { "business": {
                "name": "카페 모리",
                "category": { "primary": "카페" },
                "address": { "raw": "서울 마포구 연남동 123-4" }
            }},
            "keywords": { "core": ["카페"], "region": ["서울", "연남동"], "attributes": [] },
            "analysis": {
                "missing": ["assets.photos"],
                "nap_mismatch": { "name": false, "phone": true, "address": false },
                "guidebook_compliance": { "ok": false, "issues": ["분량 부족(<1200자)"] }
            },
            "improvements": {
                "intro_text": "카페 모리는(은) ...",
                "nap_corrections": ["전화(P) 불일치: 하이픈/국번 포함 형식 통일"]
            }
        })
    }

    #[test]
    fn guidebook_lists_business_and_keywords() {
        let md = guidebook(&improved());
        assert!(md.starts_with("# Guidebook\n\n## Business\n- Name: 카페 모리\n"));
        assert!(md.contains("- Region: 서울, 연남동\n"));
        assert!(md.contains("- Attributes: \n"));
        assert!(md.ends_with("- NAP Corrections:\n  - 전화(P) 불일치: 하이픈/국번 포함 형식 통일\n"));
    }

    #[test]
    fn checklist_collects_open_items() {
        let md = checklist(&improved());
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# Deploy Checklist",
                "- [ ] NAP 확인",
                "- [ ] 채움: assets.photos",
                "- [ ] 가이드북: 분량 부족(<1200자)",
                "- [ ] 보정: 전화(P) 불일치: 하이픈/국번 포함 형식 통일",
                "- [ ] 대표 사진 5장 이상 등록",
                "- [ ] 카테고리/메뉴 최종 점검",
            ]
        );
    }

    #[test]
    fn audit_copies_checks() {
        let report = audit(&improved());
        assert_eq!(report["schema_version"], "1.0.0");
        assert_eq!(report["checks"]["nap_mismatch"]["phone"], true);
        assert_eq!(report["checks"]["missing"], json!(["assets.photos"]));
        assert_eq!(audit(&json!({}))["checks"]["nap_mismatch"], json!({}));
    }

    #[tokio::test]
    async fn writes_three_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StageContext::new(dir.path(), "cafe_mori", true);
        std::fs::create_dir_all(ctx.paths.root()).unwrap();
        std::fs::write(
            ctx.paths.artifact(ArtifactKind::Improved),
            serde_json::to_string(&improved()).unwrap(),
        )
        .unwrap();

        GenerateStage.run(&ctx).await.unwrap();

        let outputs = ctx.paths.outputs_dir();
        for file in [GUIDEBOOK_FILE, CHECKLIST_FILE, AUDIT_FILE] {
            assert!(outputs.join(file).is_file(), "{file}");
        }
    }

    #[tokio::test]
    async fn missing_improved_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StageContext::new(dir.path(), "cafe_mori", true);
        let err = GenerateStage.run(&ctx).await.unwrap_err();
        assert!(matches!(err, PlaceSeoError::NotFound { .. }));
    }
}
