//! Choosing where place data comes from.
//!
//! Mock mode never touches the network. Live mode asks the [`PlaceClient`]
//! and, when allowed, falls back to files under `inputs/` and finally to the
//! intake itself.

use std::path::Path;

use tracing::{info, warn};

use placeseo_shared::{Intake, Result};

use crate::client::PlaceClient;
use crate::extract::{page_title, place_name};
use crate::model::{Collected, PlaceSource, RawPlace};

/// Offline data file with a full or partial [`RawPlace`].
pub const RAW_INPUT: &str = "raw.json";
/// Saved place page; only its title is used.
pub const HTML_INPUT: &str = "page.html";

/// Collect a place for `intake`.
pub async fn acquire(
    client: &PlaceClient,
    intake: &Intake,
    inputs_dir: &Path,
    mock: bool,
    offline_fallback: bool,
) -> Result<Collected> {
    if mock {
        info!(brand = %intake.brand, "mock collection");
        return Ok(Collected {
            place: mock_place(intake),
            source: PlaceSource::Mock,
        });
    }

    match client.fetch_place(&intake.place_id).await {
        Ok(place) => Ok(Collected {
            place,
            source: PlaceSource::Live,
        }),
        Err(err) if offline_fallback => {
            warn!(error = %err, "live collection failed, trying offline inputs");
            Ok(offline_place(inputs_dir, intake))
        }
        Err(err) => Err(err),
    }
}

/// Place data synthesized from intake, with placeholders for blanks.
pub fn mock_place(intake: &Intake) -> RawPlace {
    let business = &intake.business;
    RawPlace {
        id: intake.place_id.clone(),
        name: non_empty_or(&business.name, "샘플가게"),
        category: non_empty_or(&business.category.primary, "카테고리"),
        address: non_empty_or(&business.address.raw, "주소 미상"),
        phone: business.phone.clone(),
        ..RawPlace::default()
    }
}

/// `inputs/raw.json`, else the title of `inputs/page.html`, else intake.
///
/// Unreadable or malformed files are skipped with a warning.
pub fn offline_place(inputs_dir: &Path, intake: &Intake) -> Collected {
    let business = &intake.business;

    let raw_path = inputs_dir.join(RAW_INPUT);
    if raw_path.is_file() {
        match read_raw(&raw_path) {
            Ok(raw) => {
                let place = RawPlace {
                    id: intake.place_id.clone(),
                    name: non_empty_or(&raw.name, &business.name),
                    address: non_empty_or(&raw.address, &business.address.raw),
                    ..raw
                };
                return Collected {
                    place,
                    source: PlaceSource::OfflineRaw,
                };
            }
            Err(e) => warn!(path = %raw_path.display(), error = %e, "skipping offline raw data"),
        }
    }

    let html_path = inputs_dir.join(HTML_INPUT);
    if html_path.is_file() {
        match std::fs::read_to_string(&html_path) {
            Ok(html) => {
                let doc = scraper::Html::parse_document(&html);
                let title = page_title(&doc).map(|t| place_name(&t)).unwrap_or_default();
                return Collected {
                    place: RawPlace {
                        id: intake.place_id.clone(),
                        name: non_empty_or(&title, &business.name),
                        address: business.address.raw.clone(),
                        phone: business.phone.clone(),
                        ..RawPlace::default()
                    },
                    source: PlaceSource::OfflineHtml,
                };
            }
            Err(e) => warn!(path = %html_path.display(), error = %e, "skipping offline page"),
        }
    }

    Collected {
        place: intake_place(intake),
        source: PlaceSource::Intake,
    }
}

/// Place data copied from intake as-is.
pub fn intake_place(intake: &Intake) -> RawPlace {
    let business = &intake.business;
    RawPlace {
        id: intake.place_id.clone(),
        name: business.name.clone(),
        category: business.category.primary.clone(),
        address: business.address.raw.clone(),
        phone: business.phone.clone(),
        ..RawPlace::default()
    }
}

fn read_raw(path: &Path) -> std::result::Result<RawPlace, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
