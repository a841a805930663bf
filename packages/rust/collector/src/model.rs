//! Collected place data.

use serde::{Deserialize, Serialize};

/// What a place page told us about a business.
///
/// Every field defaults so partially filled `inputs/raw.json` files load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub hours: Option<serde_json::Value>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default = "default_photo_category")]
    pub category: String,
    #[serde(default)]
    pub source: String,
}

fn default_photo_category() -> String {
    "general".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default, deserialize_with = "price_text")]
    pub price: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Prices appear as `"5,000원"` in some sources and as bare numbers in others.
fn price_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub date: Option<String>,
}

/// Where a [`RawPlace`] came from, recorded in the artifact's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceSource {
    /// Fetched from the place page.
    Live,
    /// Synthesized from intake without network access.
    Mock,
    /// `inputs/raw.json`.
    OfflineRaw,
    /// Title of `inputs/page.html`.
    OfflineHtml,
    /// Nothing else was available; intake data only.
    Intake,
}

impl PlaceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
            Self::OfflineRaw => "offline_raw",
            Self::OfflineHtml => "offline_html",
            Self::Intake => "intake",
        }
    }
}

impl std::fmt::Display for PlaceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place plus the source it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub place: RawPlace,
    pub source: PlaceSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_raw_json_loads() {
        let raw: RawPlace = serde_json::from_str(
            r#"{"name":"카페 모리","menu":[{"name":"라떼","price":"5000"},{"name":"쿠키","price":3500}],"photos":[{"url":"a.jpg"}]}"#,
        )
        .expect("deserialize");
        assert_eq!(raw.name, "카페 모리");
        assert_eq!(raw.menu[0].price.as_deref(), Some("5000"));
        assert_eq!(raw.menu[1].price.as_deref(), Some("3500"));
        assert_eq!(raw.photos[0].category, "general");
        assert!(raw.hours.is_none());
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&PlaceSource::OfflineRaw).expect("serialize");
        assert_eq!(json, "\"offline_raw\"");
    }
}
