//! Name / address / phone consistency between intake and collected data.

use serde::Serialize;

use placeseo_shared::Intake;

use crate::model::RawPlace;

/// Which NAP fields disagree. A field only counts as mismatched when both
/// sides have a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NapMismatch {
    pub name: bool,
    pub phone: bool,
    pub address: bool,
    pub details: NapDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NapDetails {
    pub intake: NapRecord,
    pub collected: NapRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NapRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl NapMismatch {
    pub fn any(&self) -> bool {
        self.name || self.phone || self.address
    }
}

/// Compare intake against collected data. Phones are compared on digits only.
pub fn detect_nap_mismatch(intake: &Intake, collected: &RawPlace) -> NapMismatch {
    let business = &intake.business;

    let differs = |a: &str, b: &str| {
        let (a, b) = (a.trim(), b.trim());
        !a.is_empty() && !b.is_empty() && a != b
    };
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();

    NapMismatch {
        name: differs(&business.name, &collected.name),
        phone: !business.phone.is_empty()
            && !collected.phone.is_empty()
            && digits(&business.phone) != digits(&collected.phone),
        address: differs(&business.address.raw, &collected.address),
        details: NapDetails {
            intake: NapRecord {
                name: business.name.clone(),
                phone: business.phone.clone(),
                address: business.address.raw.clone(),
            },
            collected: NapRecord {
                name: collected.name.clone(),
                phone: collected.phone.clone(),
                address: collected.address.clone(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placeseo_shared::{Address, Business};

    fn intake() -> Intake {
        Intake {
            brand: "cafe_mori".into(),
            place_id: "1".into(),
            business: Business {
                name: "카페 모리".into(),
                phone: "02-123-4567".into(),
                address: Address {
                    raw: "서울 마포구 연남동 123-4".into(),
                    ..Address::default()
                },
                ..Business::default()
            },
        }
    }

    #[test]
    fn phone_formatting_is_ignored() {
        let collected = RawPlace {
            name: " 카페 모리 ".into(),
            phone: "(02) 123 4567".into(),
            address: "서울 마포구 연남동 123-4".into(),
            ..RawPlace::default()
        };
        let nap = detect_nap_mismatch(&intake(), &collected);
        assert!(!nap.any(), "{nap:?}");
    }

    #[test]
    fn reports_each_differing_field() {
        let collected = RawPlace {
            name: "모리 커피".into(),
            phone: "02-765-4321".into(),
            address: "서울 마포구 연남동 123-4".into(),
            ..RawPlace::default()
        };
        let nap = detect_nap_mismatch(&intake(), &collected);
        assert!(nap.name);
        assert!(nap.phone);
        assert!(!nap.address);
        assert_eq!(nap.details.collected.name, "모리 커피");
    }

    #[test]
    fn blank_collected_fields_are_not_mismatches() {
        let nap = detect_nap_mismatch(&intake(), &RawPlace::default());
        assert!(!nap.any());
        assert_eq!(nap.details.intake.phone, "02-123-4567");
    }
}
