//! Place data acquisition for placeseo.
//!
//! This crate provides:
//! - [`PlaceClient`]: fetches a place page through breaker + retry
//! - [`acquire`]: mock, live and offline source selection
//! - [`detect_nap_mismatch`]: intake vs. collected NAP comparison

pub mod client;
pub mod extract;
pub mod model;
pub mod nap;
pub mod source;

pub use client::PlaceClient;
pub use extract::extract_place;
pub use model::{Collected, MenuItem, Photo, PlaceSource, RawPlace, Review};
pub use nap::{NapDetails, NapMismatch, NapRecord, detect_nap_mismatch};
pub use source::{acquire, intake_place, mock_place, offline_place};
