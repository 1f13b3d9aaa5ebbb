use chrono::{FixedOffset, TimeZone};
use notafiscal::core::*;

fn issued_at() -> chrono::DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 15, 10, 30, 0)
        .unwrap()
}

fn parts() -> AccessKeyParts {
    AccessKeyParts {
        uf: Uf::Sp,
        emitted_at: issued_at(),
        cnpj: "11222333000181".into(),
        model: DocumentModel::Nfe,
        serie: 1,
        numero: 42,
        emission_mode: EmissionMode::Normal,
        numeric_code: 12_345_678,
    }
}

#[test]
fn known_key_round_trips() {
    let key = AccessKey::compose(&parts()).unwrap();
    assert_eq!(key.as_str(), "35240611222333000181550010000000421123456789");
    assert_eq!(AccessKey::parse(key.as_str()).unwrap(), key);
}

#[test]
fn second_vector_from_another_state() {
    let key = AccessKey::compose(&AccessKeyParts {
        uf: Uf::Rs,
        emitted_at: FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 20, 9, 0, 0)
            .unwrap(),
        cnpj: "04252011000110".into(),
        model: DocumentModel::Nfe,
        serie: 3,
        numero: 987_654,
        emission_mode: EmissionMode::Normal,
        numeric_code: 87_654_321,
    })
    .unwrap();
    assert_eq!(key.as_str(), "43250104252011000110550030009876541876543216");
}

#[test]
fn every_position_is_covered_by_the_check_digit() {
    let key = AccessKey::compose(&parts()).unwrap();
    for i in 0..44 {
        let mut bytes = key.as_str().as_bytes().to_vec();
        bytes[i] = b'0' + (bytes[i] - b'0' + 5) % 10;
        let corrupted = String::from_utf8(bytes).unwrap();
        assert!(!AccessKey::is_valid(&corrupted));
    }
}

#[test]
fn contingency_mode_changes_the_key() {
    let normal = AccessKey::compose(&parts()).unwrap();
    let mut p = parts();
    p.emission_mode = EmissionMode::ContingencyOffline;
    let contingency = AccessKey::compose(&p).unwrap();
    assert_ne!(normal, contingency);
    assert_eq!(&contingency.as_str()[34..35], "9");
}

#[test]
fn nfce_model_is_embedded() {
    let mut p = parts();
    p.model = DocumentModel::Nfce;
    let key = AccessKey::compose(&p).unwrap();
    assert_eq!(&key.as_str()[20..22], "65");
}

#[test]
fn display_matches_raw_digits() {
    let key = AccessKey::compose(&parts()).unwrap();
    assert_eq!(key.to_string(), key.as_str());
}
