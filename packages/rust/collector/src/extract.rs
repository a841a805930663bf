//! Pull place fields out of a place page.
//!
//! The page head gives the name and description. Embedded JSON blobs
//! (`<script type="application/json">`, `application/ld+json`) fill in whatever
//! else they carry: phone, category, address, photos, menu, reviews.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;

use crate::model::{MenuItem, Photo, RawPlace, Review};

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:description"], meta[name="description"]"#)
        .expect("valid selector")
});
static JSON_SCRIPTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/json"], script[type="application/ld+json"]"#)
        .expect("valid selector")
});

const PHOTO_KEYS: [&str; 3] = ["images", "photos", "photoList"];
const MENU_KEYS: [&str; 3] = ["menus", "menuList", "menu"];
const REVIEW_KEYS: [&str; 3] = ["reviews", "reviewList", "visitorReviews"];

/// Extract a [`RawPlace`] from page HTML.
pub fn extract_place(html: &str, place_id: &str) -> RawPlace {
    let doc = Html::parse_document(html);

    let mut place = RawPlace {
        id: place_id.to_string(),
        name: page_title(&doc).map(|t| place_name(&t)).unwrap_or_default(),
        description: meta_content(&doc, &DESCRIPTION).unwrap_or_default(),
        ..RawPlace::default()
    };

    for script in doc.select(&JSON_SCRIPTS) {
        let text = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
            merge_json(&mut place, &value);
        }
    }

    place
}

/// `og:title`, else the `<title>` text.
pub fn page_title(doc: &Html) -> Option<String> {
    meta_content(doc, &OG_TITLE).or_else(|| {
        doc.select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Place pages title themselves `"<name> : <site>"`; keep the name part.
pub fn place_name(title: &str) -> String {
    title.split(':').next().unwrap_or_default().trim().to_string()
}

fn meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Fill empty scalar fields and append list entries from one JSON blob.
fn merge_json(place: &mut RawPlace, value: &Value) {
    let Some(obj) = value.as_object() else {
        return;
    };

    fill(&mut place.name, text_at(value, &["name"]));
    fill(
        &mut place.phone,
        text_at(value, &["phone"]).or_else(|| text_at(value, &["telephone"])),
    );
    fill(
        &mut place.category,
        text_at(value, &["category", "name"]).or_else(|| text_at(value, &["category"])),
    );
    fill(
        &mut place.address,
        text_at(value, &["address", "roadAddress"])
            .or_else(|| text_at(value, &["address", "jibunAddress"]))
            .or_else(|| text_at(value, &["location", "address"]))
            .or_else(|| text_at(value, &["address"])),
    );
    fill(&mut place.description, text_at(value, &["description"]));
    if place.hours.is_none() {
        place.hours = obj.get("hours").filter(|h| !h.is_null()).cloned();
    }

    for item in arrays(obj, &PHOTO_KEYS) {
        let url = ["imageUrl", "url", "origin", "thumbnail"]
            .iter()
            .find_map(|k| item.get(*k).and_then(Value::as_str));
        if let Some(url) = url {
            place.photos.push(Photo {
                url: url.to_string(),
                category: item
                    .get("category")
                    .and_then(Value::as_str)
                    .unwrap_or("general")
                    .to_string(),
                source: "network".into(),
            });
        }
    }

    for item in arrays(obj, &MENU_KEYS) {
        let Some(name) = text_at(item, &["name"]).or_else(|| text_at(item, &["menuName"])) else {
            continue;
        };
        place.menu.push(MenuItem {
            name,
            price: text_at(item, &["price"]).or_else(|| text_at(item, &["amount"])),
            description: text_at(item, &["description"]).unwrap_or_default(),
        });
    }

    for item in arrays(obj, &REVIEW_KEYS) {
        let text = ["text", "comment", "contents"]
            .iter()
            .find_map(|k| text_at(item, &[*k]));
        let Some(text) = text else {
            continue;
        };
        let rating = ["rating", "score"]
            .iter()
            .find_map(|k| item.get(*k).and_then(Value::as_f64))
            .unwrap_or(0.0);
        let date = ["date", "createdAt", "regDate"]
            .iter()
            .find_map(|k| text_at(item, &[*k]));
        place.reviews.push(Review { text, rating, date });
    }
}

fn fill(field: &mut String, candidate: Option<String>) {
    if field.is_empty() {
        if let Some(value) = candidate {
            *field = value;
        }
    }
}

/// Scalar at `path` rendered as text; objects and arrays don't count.
fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut cur = value;
    for key in path {
        cur = cur.get(key)?;
    }
    match cur {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn arrays<'a>(
    obj: &'a serde_json::Map<String, Value>,
    keys: &'a [&str],
) -> impl Iterator<Item = &'a Value> + 'a {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_array))
        .flatten()
}
