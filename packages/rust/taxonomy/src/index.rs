//! Facet-scoped surface → canonical term index.
//!
//! The index is built once from a nested taxonomy document and is read-only
//! afterwards. Building never fails: malformed nodes are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::text::{dedupe, normalize};

/// Version of the normalized taxonomy file format.
pub const NORMALIZED_SCHEMA_VERSION: u32 = 1;

/// Fields that may hold a node's canonical term, in priority order.
const CANONICAL_FIELDS: [&str; 2] = ["canonical", "name"];

/// Fields that may hold synonyms (each absent, a string, or an array).
const SYNONYM_FIELDS: [&str; 3] = ["surface", "surfaces", "synonyms"];

// ---------------------------------------------------------------------------
// Facet
// ---------------------------------------------------------------------------

/// A taxonomy partition; lookups in one facet never see another's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Core,
    Region,
    Attributes,
}

impl Facet {
    pub const ALL: [Facet; 3] = [Self::Core, Self::Region, Self::Attributes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Region => "region",
            Self::Attributes => "attributes",
        }
    }

    /// Parse a `facet` field value. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Document tree
// ---------------------------------------------------------------------------

/// Shape of a taxonomy document node.
enum Node<'a> {
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Scalar,
}

impl<'a> From<&'a Value> for Node<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Node::Object(map),
            Value::Array(items) => Node::Array(items),
            _ => Node::Scalar,
        }
    }
}

// ---------------------------------------------------------------------------
// TaxonomyIndex
// ---------------------------------------------------------------------------

/// Maps normalized surface forms to canonical terms, independently per facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyIndex {
    core: BTreeMap<String, String>,
    region: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
}

impl TaxonomyIndex {
    /// Build the index from a raw taxonomy document.
    ///
    /// Objects declare a `facet` (inherited by descendants until overridden),
    /// a canonical term (`canonical` or `name`) and synonyms. For each facet
    /// and normalized key the first canonical term seen in document order wins.
    pub fn build(document: &Value) -> Self {
        let mut index = Self::default();
        index.visit(document, None);
        debug!(
            core = index.core.len(),
            region = index.region.len(),
            attributes = index.attributes.len(),
            "taxonomy index built"
        );
        index
    }

    /// Resolve `token` to its canonical term in `facet`, if any.
    pub fn lookup(&self, facet: Facet, token: &str) -> Option<&str> {
        let key = normalize(token);
        if key.is_empty() {
            return None;
        }
        self.entries(facet).get(&key).map(String::as_str)
    }

    /// All `normalized key → canonical term` entries of a facet.
    pub fn entries(&self, facet: Facet) -> &BTreeMap<String, String> {
        match facet {
            Facet::Core => &self.core,
            Facet::Region => &self.region,
            Facet::Attributes => &self.attributes,
        }
    }

    /// Total number of keys across all facets.
    pub fn len(&self) -> usize {
        self.core.len() + self.region.len() + self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattened, serializable form of the index.
    pub fn to_normalized(&self) -> NormalizedTaxonomy {
        NormalizedTaxonomy {
            schema_version: NORMALIZED_SCHEMA_VERSION,
            facets: Facet::ALL
                .into_iter()
                .map(|f| (f, self.entries(f).clone()))
                .collect(),
        }
    }

    /// Rebuild an index from its flattened form. Keys are re-normalized so a
    /// hand-edited file still resolves lookups.
    pub fn from_normalized(normalized: &NormalizedTaxonomy) -> Self {
        let mut index = Self::default();
        for (facet, entries) in &normalized.facets {
            let map = index.entries_mut(*facet);
            for (key, canonical) in entries {
                let key = normalize(key);
                if !key.is_empty() {
                    map.entry(key).or_insert_with(|| canonical.clone());
                }
            }
        }
        index
    }

    fn entries_mut(&mut self, facet: Facet) -> &mut BTreeMap<String, String> {
        match facet {
            Facet::Core => &mut self.core,
            Facet::Region => &mut self.region,
            Facet::Attributes => &mut self.attributes,
        }
    }

    /// Depth-first walk with the inherited facet threaded through.
    fn visit(&mut self, value: &Value, inherited: Option<Facet>) {
        match Node::from(value) {
            Node::Object(map) => {
                let facet = own_facet(map).or(inherited);
                if let (Some(facet), Some(canonical)) = (facet, canonical_term(map)) {
                    self.register(facet, canonical, &synonyms(map));
                }
                for child in map.values() {
                    self.visit(child, facet);
                }
            }
            Node::Array(items) => {
                for item in items {
                    self.visit(item, inherited);
                }
            }
            Node::Scalar => {}
        }
    }

    /// Insert the canonical term and its synonyms without overwriting keys.
    fn register(&mut self, facet: Facet, canonical: &str, synonyms: &[&str]) {
        let normalized_canonical = normalize(canonical);
        let surfaces = dedupe(
            [canonical, normalized_canonical.as_str()]
                .into_iter()
                .chain(synonyms.iter().copied()),
        );

        let map = self.entries_mut(facet);
        for surface in surfaces {
            let key = normalize(surface);
            if key.is_empty() {
                continue;
            }
            map.entry(key).or_insert_with(|| canonical.to_string());
        }
    }
}

fn own_facet(map: &Map<String, Value>) -> Option<Facet> {
    map.get("facet").and_then(Value::as_str).and_then(Facet::parse)
}

fn canonical_term(map: &Map<String, Value>) -> Option<&str> {
    CANONICAL_FIELDS
        .iter()
        .find_map(|field| {
            map.get(*field)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        })
}

fn synonyms(map: &Map<String, Value>) -> Vec<&str> {
    SYNONYM_FIELDS
        .iter()
        .filter_map(|field| map.get(*field))
        .flat_map(|value| match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Normalized file format
// ---------------------------------------------------------------------------

/// On-disk form written by the normalize-taxonomy stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTaxonomy {
    pub schema_version: u32,
    pub facets: BTreeMap<Facet, BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load_fixture() -> Value {
        let content = std::fs::read_to_string("../../../fixtures/json/taxonomy.fixture.json")
            .expect("read taxonomy fixture");
        serde_json::from_str(&content).expect("parse taxonomy fixture")
    }

    #[test]
    fn first_writer_wins() {
        let doc = json!({
            "facet": "core",
            "items": [
                { "canonical": "Coffee", "synonyms": ["Cafe"] },
                { "canonical": "CafeHouse", "synonyms": ["Cafe"] }
            ]
        });
        let index = TaxonomyIndex::build(&doc);
        assert_eq!(index.lookup(Facet::Core, "cafe"), Some("Coffee"));
        assert_eq!(index.lookup(Facet::Core, "CAFEHOUSE"), Some("CafeHouse"));
    }

    #[test]
    fn canonical_term_maps_to_itself_with_original_casing() {
        let doc = json!({ "facet": "attributes", "canonical": "Free Wi-Fi" });
        let index = TaxonomyIndex::build(&doc);
        assert_eq!(index.lookup(Facet::Attributes, "free wi fi"), Some("Free Wi-Fi"));
        assert_eq!(index.lookup(Facet::Attributes, "<i>FREE</i> WI-FI"), Some("Free Wi-Fi"));
    }

    #[test]
    fn blank_canonical_falls_back_to_name() {
        let doc = json!({ "facet": "core", "canonical": "  ", "name": "Bakery", "surface": "빵집" });
        let index = TaxonomyIndex::build(&doc);
        assert_eq!(index.lookup(Facet::Core, "bakery"), Some("Bakery"));
        assert_eq!(index.lookup(Facet::Core, "빵집"), Some("Bakery"));
    }

    #[test]
    fn unknown_tokens_are_absent() {
        let index = TaxonomyIndex::build(&load_fixture());
        assert_eq!(index.lookup(Facet::Core, "does not exist"), None);
        assert_eq!(index.lookup(Facet::Region, ""), None);
        assert_eq!(index.lookup(Facet::Attributes, "!!!"), None);
    }

    #[test]
    fn facets_are_independent() {
        let index = TaxonomyIndex::build(&load_fixture());
        assert_eq!(index.lookup(Facet::Core, "커피숍"), Some("카페"));
        assert_eq!(index.lookup(Facet::Region, "커피숍"), None);
        assert_eq!(index.lookup(Facet::Region, "마포"), Some("마포구"));
        assert_eq!(index.lookup(Facet::Core, "마포"), None);
    }

    #[test]
    fn facet_is_inherited_until_overridden() {
        let index = TaxonomyIndex::build(&load_fixture());
        // nested under an "attributes" group but declares its own facet
        assert_eq!(index.lookup(Facet::Region, "주차가능"), Some("주차"));
        assert_eq!(index.lookup(Facet::Attributes, "주차가능"), None);
        // inherited from the enclosing group
        assert_eq!(index.lookup(Facet::Attributes, "latte"), Some("라떼"));
    }

    #[test]
    fn synonym_fields_accept_string_or_array() {
        let index = TaxonomyIndex::build(&load_fixture());
        assert_eq!(index.lookup(Facet::Region, "연남"), Some("연남동"));
        assert_eq!(index.lookup(Facet::Region, "서울특별시"), Some("서울"));
        assert_eq!(index.lookup(Facet::Core, "디저트"), Some("디저트카페"));
    }

    #[test]
    fn first_writer_wins_in_fixture() {
        let index = TaxonomyIndex::build(&load_fixture());
        // "카페" is both a canonical term and a later synonym of 디저트카페
        assert_eq!(index.lookup(Facet::Core, "카페"), Some("카페"));
    }

    #[test]
    fn nodes_without_facet_are_skipped() {
        let index = TaxonomyIndex::build(&load_fixture());
        for facet in Facet::ALL {
            assert_eq!(index.lookup(facet, "no facet here"), None);
        }
    }

    #[test]
    fn malformed_nodes_do_not_fail_the_build() {
        let doc = json!([
            null,
            42,
            "loose string",
            { "facet": "core", "canonical": 7, "synonyms": [1, null] },
            { "facet": "galaxy", "canonical": "Ignored" },
            { "facet": "core", "name": "Bakery", "synonyms": [null, "빵집", { "x": 1 }] }
        ]);
        let index = TaxonomyIndex::build(&doc);
        assert_eq!(index.lookup(Facet::Core, "빵집"), Some("Bakery"));
        assert_eq!(index.lookup(Facet::Core, "ignored"), None);
        assert_eq!(index.entries(Facet::Core).len(), 2);
    }

    #[test]
    fn empty_document_builds_empty_index() {
        let index = TaxonomyIndex::build(&json!({}));
        assert!(index.is_empty());
    }

    #[test]
    fn normalized_form_rebuilds_the_same_index() {
        let index = TaxonomyIndex::build(&load_fixture());
        let normalized = index.to_normalized();
        assert_eq!(normalized.schema_version, NORMALIZED_SCHEMA_VERSION);

        let json = serde_json::to_string(&normalized).expect("serialize");
        let parsed: NormalizedTaxonomy = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(TaxonomyIndex::from_normalized(&parsed), index);
    }
}
