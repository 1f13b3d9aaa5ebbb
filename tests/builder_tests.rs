use chrono::{DateTime, FixedOffset, TimeZone};
use notafiscal::core::*;
use rust_decimal_macros::dec;

fn issued_at() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 15, 10, 30, 0)
        .unwrap()
}

fn address(uf: Uf) -> Address {
    Address {
        street: "Rua das Flores".into(),
        number: "100".into(),
        complement: None,
        district: "Centro".into(),
        municipality_code: "3550308".into(),
        municipality: "Sao Paulo".into(),
        uf,
        cep: "01001000".into(),
        phone: None,
    }
}

fn issuer(regime: TaxRegime) -> Issuer {
    Issuer {
        cnpj: "11222333000181".into(),
        legal_name: "Aluforce Industria Ltda".into(),
        trading_name: None,
        address: address(Uf::Sp),
        state_registration: "123456789".into(),
        regime,
    }
}

fn recipient(uf: Uf) -> Recipient {
    Recipient {
        id: RecipientId::Cnpj("04252011000110".into()),
        name: "Cliente SA".into(),
        address: address(uf),
        state_registration: None,
        email: None,
    }
}

fn item(qty: &str, price: &str) -> ItemDraft {
    ItemDraft::new("P001", "Perfil de aluminio", "76042100", "5102", "KG")
        .quantity(qty.parse().unwrap())
        .unit_price(price.parse().unwrap())
}

#[test]
fn builds_generated_document_with_key() {
    let nfe = NfeBuilder::new(1, 42, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Sp))
        .numeric_code(12_345_678)
        .add_item(item("10", "25.50"))
        .build()
        .unwrap();

    assert_eq!(nfe.status, NfeStatus::Generated);
    assert_eq!(nfe.access_key.as_str(), "35240611222333000181550010000000421123456789");
    assert_eq!(nfe.destination, OperationDestination::Internal);
}

#[test]
fn interstate_recipient_classifies_destination() {
    let nfe = NfeBuilder::new(1, 43, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Rs))
        .add_item(item("1", "10"))
        .build()
        .unwrap();
    assert_eq!(nfe.destination, OperationDestination::Interstate);
}

#[test]
fn grand_total_reconciles_with_components() {
    let nfe = NfeBuilder::new(1, 44, issued_at())
        .issuer(issuer(TaxRegime::RegimeNormal))
        .recipient(recipient(Uf::Sp))
        .add_item(item("3", "19.90").discount(dec!(5.00)))
        .add_item(item("2.5", "120.00"))
        .freight_total(dec!(30.00))
        .other_expenses(dec!(1.50))
        .build()
        .unwrap();

    let t = nfe.totals.unwrap();
    assert_eq!(t.products_total, dec!(359.70));
    assert_eq!(
        t.grand_total,
        t.products_total + t.freight_total + t.insurance_total + t.other_expenses
            - t.discount_total
    );
    assert_eq!(t.discount_total, dec!(5.00));
    assert_eq!(t.freight_total, dec!(30.00));
}

#[test]
fn normal_regime_computes_icms_fields() {
    let nfe = NfeBuilder::new(1, 45, issued_at())
        .issuer(issuer(TaxRegime::RegimeNormal))
        .recipient(recipient(Uf::Sp))
        .add_item(item("10", "100"))
        .build()
        .unwrap();

    match &nfe.items[0].tax.icms {
        IcmsBlock::Normal { base, rate, amount, .. } => {
            assert_eq!(*base, dec!(1000.00));
            assert_eq!(*rate, dec!(18));
            assert_eq!(*amount, dec!(180.00));
        }
        other => panic!("expected full ICMS block, got {other:?}"),
    }
    assert_eq!(nfe.totals.unwrap().icms_amount, dec!(180.00));
}

#[test]
fn simples_regime_zeroes_icms_totals() {
    let nfe = NfeBuilder::new(1, 46, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Sp))
        .add_item(item("10", "100"))
        .build()
        .unwrap();

    assert!(matches!(nfe.items[0].tax.icms, IcmsBlock::Simples { .. }));
    let t = nfe.totals.unwrap();
    assert_eq!(t.icms_base, dec!(0.00));
    assert_eq!(t.icms_amount, dec!(0.00));
}

#[test]
fn half_cent_rounds_away_from_zero() {
    // 3 x 8.335 = 25.005 -> 25.01
    let nfe = NfeBuilder::new(1, 47, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Sp))
        .add_item(item("3", "8.335"))
        .build()
        .unwrap();
    assert_eq!(nfe.items[0].total, dec!(25.01));
}

#[test]
fn declared_total_mismatch_fails() {
    let err = NfeBuilder::new(1, 48, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Sp))
        .add_item(item("10", "25.50"))
        .declared_products_total(dec!(999.99))
        .build()
        .unwrap_err();
    assert!(matches!(err, NfeError::Validation(_)));
}

#[test]
fn missing_parts_are_reported_with_field_paths() {
    let err = NfeBuilder::new(1, 49, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(Recipient {
            id: RecipientId::Cnpj("123".into()),
            name: "".into(),
            address: address(Uf::Sp),
            state_registration: None,
            email: None,
        })
        .add_item(item("10", "25.50"))
        .build()
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("recipient"));
}

#[test]
fn zero_quantity_item_fails_validation() {
    let err = NfeBuilder::new(1, 50, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Sp))
        .add_item(item("0", "25.50"))
        .build()
        .unwrap_err();
    assert!(matches!(err, NfeError::Validation(_)));
}

#[test]
fn builder_without_items_fails() {
    let err = NfeBuilder::new(1, 51, issued_at())
        .issuer(issuer(TaxRegime::SimplesNacional))
        .recipient(recipient(Uf::Sp))
        .build()
        .unwrap_err();
    assert!(matches!(err, NfeError::Validation(_)));
}

#[test]
fn sequences_feed_unique_numbers() {
    let sequences = InMemorySequences::new();
    let a = sequences.reserve("11222333000181", 1);
    let b = sequences.reserve("11222333000181", 1);
    let other_series = sequences.reserve("11222333000181", 2);
    assert_eq!(b, a + 1);
    assert_eq!(other_series, 1);
}
