//! Human-readable summary of an `improved.json`.

use std::fmt::Write as _;

use serde_json::Value;

use placeseo_shared::{ArtifactKind, BrandPaths, Result};

use crate::artifact::{read_artifact, str_at, strings_at};

/// Read the improved artifact of a brand.
pub fn load(paths: &BrandPaths) -> Result<Value> {
    read_artifact(paths, ArtifactKind::Improved)
}

/// Findings a reviewer acts on: NAP mismatches, missing fields, issues,
/// guidebook compliance, corrections and keyword proposals.
pub fn render(improved: &Value) -> String {
    let mut out = String::new();

    let brand = str_at(improved, "/client/brand");
    let name = str_at(improved, "/client/business/name");
    let _ = writeln!(out, "Brand: {brand}");
    let _ = writeln!(out, "Business: {}", or_dash(name));
    let _ = writeln!(out, "Place ID: {}", or_dash(str_at(improved, "/client/place_id")));
    let generated = str_at(improved, "/meta/generated_at");
    if !generated.is_empty() {
        let _ = writeln!(out, "Generated: {generated}");
    }

    out.push_str("\nNAP consistency\n");
    for (label, field) in [("name", "name"), ("phone", "phone"), ("address", "address")] {
        let mismatch = improved
            .pointer(&format!("/analysis/nap_mismatch/{field}"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let intake = str_at(improved, &format!("/analysis/nap_mismatch/details/intake/{field}"));
        let collected = str_at(
            improved,
            &format!("/analysis/nap_mismatch/details/collected/{field}"),
        );
        if mismatch {
            let _ = writeln!(out, "  {label:<8} MISMATCH  intake={intake:?} collected={collected:?}");
        } else {
            let _ = writeln!(out, "  {label:<8} ok");
        }
    }

    section(&mut out, "Missing fields", &strings_at(improved, "/analysis/missing"));
    section(&mut out, "Issues", &strings_at(improved, "/analysis/issues"));

    out.push_str("\nGuidebook compliance\n");
    match improved
        .pointer("/analysis/guidebook_compliance/ok")
        .and_then(Value::as_bool)
    {
        Some(true) => out.push_str("  ok\n"),
        Some(false) => {
            for issue in strings_at(improved, "/analysis/guidebook_compliance/issues") {
                let _ = writeln!(out, "  - {issue}");
            }
        }
        None => out.push_str("  not checked\n"),
    }

    section(
        &mut out,
        "NAP corrections",
        &strings_at(improved, "/improvements/nap_corrections"),
    );
    section(
        &mut out,
        "Keyword proposals",
        &strings_at(improved, "/improvements/keyword_proposals"),
    );
    out
}

fn section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "\n{title} ({})", items.len());
    if items.is_empty() {
        out.push_str("  none\n");
    }
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
