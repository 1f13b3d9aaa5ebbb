#![cfg(feature = "danfe")]

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use notafiscal::core::*;
use notafiscal::danfe::render_danfe;
use rust_decimal_macros::dec;

fn issued_at() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 15, 10, 30, 0)
        .unwrap()
}

fn address() -> Address {
    Address {
        street: "Rua das Flores".into(),
        number: "100".into(),
        complement: None,
        district: "Centro".into(),
        municipality_code: "3550308".into(),
        municipality: "Sao Paulo".into(),
        uf: Uf::Sp,
        cep: "01001000".into(),
        phone: None,
    }
}

fn sample_with_items(count: usize) -> Nfe {
    let mut builder = NfeBuilder::new(1, 42, issued_at())
        .numeric_code(12_345_678)
        .issuer(Issuer {
            cnpj: "11222333000181".into(),
            legal_name: "Aluforce Industria Ltda".into(),
            trading_name: None,
            address: address(),
            state_registration: "123456789".into(),
            regime: TaxRegime::SimplesNacional,
        })
        .recipient(Recipient {
            id: RecipientId::Cnpj("04252011000110".into()),
            name: "Cliente SA".into(),
            address: address(),
            state_registration: None,
            email: None,
        });
    for i in 0..count {
        builder = builder.add_item(
            ItemDraft::new(
                &format!("P{i:03}"),
                &format!("Perfil de aluminio {i}"),
                "76042100",
                "5102",
                "KG",
            )
            .quantity(dec!(10))
            .unit_price(dec!(25.50)),
        );
    }
    builder.build().unwrap()
}

fn page_count(pdf: &[u8]) -> usize {
    pdf.windows(b"/MediaBox".len())
        .filter(|w| *w == b"/MediaBox")
        .count()
}

#[test]
fn renders_a_single_page_document() {
    let pdf = render_danfe(&sample_with_items(3)).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.5"));
    assert_eq!(page_count(&pdf), 1);
}

#[test]
fn long_item_lists_paginate() {
    // 24 rows fit on the first page, 44 per continuation page.
    let pdf = render_danfe(&sample_with_items(60)).unwrap();
    assert_eq!(page_count(&pdf), 2);

    let pdf = render_danfe(&sample_with_items(120)).unwrap();
    assert_eq!(page_count(&pdf), 4);
}

#[test]
fn document_without_totals_is_refused() {
    let mut nfe = sample_with_items(1);
    nfe.totals = None;
    let err = render_danfe(&nfe).unwrap_err();
    assert!(matches!(err, NfeError::Structural(_)));
}

#[test]
fn authorized_document_carries_the_protocol() {
    let mut nfe = sample_with_items(1);
    nfe.status = NfeStatus::Authorized;
    nfe.authorization = Some(Authorization {
        protocol: "135240000000123".into(),
        authorized_at: issued_at().with_timezone(&Utc),
    });
    let pdf = render_danfe(&nfe).unwrap();

    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("135240000000123"));
    assert!(!text.contains("Aguardando autorizacao"));
}

#[test]
fn draft_document_renders_without_protocol() {
    let pdf = render_danfe(&sample_with_items(1)).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("Aguardando autorizacao"));
}

#[test]
fn homologation_banner_is_present() {
    let nfe = sample_with_items(1);
    assert_eq!(nfe.environment, Environment::Homologacao);
    let pdf = render_danfe(&nfe).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("SEM VALOR FISCAL"));
}

#[test]
fn consumer_document_embeds_a_qr_code() {
    let mut nfe = sample_with_items(1);
    nfe.model = DocumentModel::Nfce;
    nfe.qrcode_url =
        Some("https://www.homologacao.nfce.fazenda.sp.gov.br/qrcode?p=chave|2|2|1".into());
    let pdf = render_danfe(&nfe).unwrap();

    // QR modules are drawn as filled rectangles in the content stream.
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains(" re f"));
}
