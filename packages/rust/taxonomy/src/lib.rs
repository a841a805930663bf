//! Text normalization and the facet-scoped taxonomy index.
//!
//! This crate provides:
//! - [`text`]: canonical lookup keys ([`normalize`], [`tokenize`], [`dedupe`])
//! - [`index`]: [`TaxonomyIndex`], mapping surface forms to canonical terms per [`Facet`]

pub mod index;
pub mod text;

pub use index::{Facet, NormalizedTaxonomy, TaxonomyIndex};
pub use text::{dedupe, normalize, tokenize};
