//! DANFE page layout.
//!
//! The auxiliary document is the printable companion of the XML: header
//! with the formatted access key and authorization protocol, issuer and
//! recipient identification, the paginated item table, totals, transport
//! and free-text blocks. Consumer documents (model 65) additionally carry
//! the lookup QR code.

use rust_decimal::Decimal;

use crate::core::{DocumentModel, Environment, Nfe, NfeError, Totals};
use crate::xml::format_fixed;

use super::pdf::{Font, PAGE_HEIGHT, PAGE_WIDTH, PageCanvas, PdfBuilder};
use super::qr::qr_ops;

const MARGIN: f32 = 40.0;
const ROW_HEIGHT: f32 = 12.0;
const ITEMS_FIRST_PAGE: usize = 24;
const ITEMS_PER_PAGE: usize = 44;

/// Render the DANFE for an emitted document.
///
/// The document must carry computed totals; drafts without them are
/// refused. Authorization is not required — a DANFE printed before the
/// verdict simply has no protocol line.
pub fn render_danfe(nfe: &Nfe) -> Result<Vec<u8>, NfeError> {
    let totals = nfe
        .totals
        .as_ref()
        .ok_or_else(|| NfeError::Structural("document has no computed totals".into()))?;

    let mut builder = PdfBuilder::new();

    let mut first = PageCanvas::new();
    let mut y = draw_header(&mut first, nfe)?;
    y = draw_parties(&mut first, nfe, y);

    let mut remaining = nfe.items.as_slice();
    let first_chunk = remaining.len().min(ITEMS_FIRST_PAGE);
    let (chunk, rest) = remaining.split_at(first_chunk);
    draw_item_table(&mut first, chunk, y);
    remaining = rest;

    if remaining.is_empty() {
        draw_footer_blocks(&mut first, nfe, totals);
    }
    builder.add_page(first);

    while !remaining.is_empty() {
        let mut page = PageCanvas::new();
        draw_continuation_header(&mut page, nfe, builder.page_count() + 1);
        let chunk_len = remaining.len().min(ITEMS_PER_PAGE);
        let (chunk, rest) = remaining.split_at(chunk_len);
        draw_item_table(&mut page, chunk, PAGE_HEIGHT - 80.0);
        remaining = rest;
        if remaining.is_empty() {
            draw_footer_blocks(&mut page, nfe, totals);
        }
        builder.add_page(page);
    }

    builder.finish()
}

fn draw_header(canvas: &mut PageCanvas, nfe: &Nfe) -> Result<f32, NfeError> {
    let top = PAGE_HEIGHT - MARGIN;

    canvas.rect(MARGIN, top - 70.0, PAGE_WIDTH - 2.0 * MARGIN, 70.0);
    canvas.text(MARGIN + 8.0, top - 18.0, Font::Bold, 14.0, "DANFE");
    canvas.text(
        MARGIN + 8.0,
        top - 32.0,
        Font::Regular,
        7.0,
        "Documento Auxiliar da Nota Fiscal Eletronica",
    );
    canvas.text(
        MARGIN + 8.0,
        top - 46.0,
        Font::Regular,
        8.0,
        &format!(
            "Modelo {}  Serie {}  Numero {:09}",
            nfe.model.code(),
            nfe.serie,
            nfe.numero
        ),
    );

    canvas.text(MARGIN + 250.0, top - 18.0, Font::Regular, 7.0, "CHAVE DE ACESSO");
    canvas.text(
        MARGIN + 250.0,
        top - 30.0,
        Font::Mono,
        7.0,
        &nfe.access_key.formatted(),
    );

    match &nfe.authorization {
        Some(auth) => {
            canvas.text(
                MARGIN + 250.0,
                top - 46.0,
                Font::Regular,
                7.0,
                &format!(
                    "Protocolo de autorizacao: {} - {}",
                    auth.protocol,
                    auth.authorized_at.format("%d/%m/%Y %H:%M:%S")
                ),
            );
        }
        None => {
            canvas.text(
                MARGIN + 250.0,
                top - 46.0,
                Font::Regular,
                7.0,
                "Aguardando autorizacao",
            );
        }
    }

    if nfe.environment == Environment::Homologacao {
        canvas.text(
            MARGIN + 100.0,
            top - 64.0,
            Font::Bold,
            10.0,
            "AMBIENTE DE HOMOLOGACAO - SEM VALOR FISCAL",
        );
    }

    if nfe.model == DocumentModel::Nfce {
        if let Some(url) = &nfe.qrcode_url {
            let ops = qr_ops(url, PAGE_WIDTH - MARGIN - 90.0, top - 170.0, 80.0)?;
            canvas.raw_ops(&ops);
            canvas.text(
                PAGE_WIDTH - MARGIN - 90.0,
                top - 182.0,
                Font::Regular,
                6.0,
                "Consulta via leitor de QR Code",
            );
        }
    }

    Ok(top - 80.0)
}

fn draw_continuation_header(canvas: &mut PageCanvas, nfe: &Nfe, page: usize) {
    let top = PAGE_HEIGHT - MARGIN;
    canvas.text(
        MARGIN,
        top,
        Font::Bold,
        9.0,
        &format!(
            "DANFE - NF-e {:09} Serie {} - folha {page}",
            nfe.numero, nfe.serie
        ),
    );
    canvas.text(MARGIN, top - 12.0, Font::Mono, 7.0, &nfe.access_key.formatted());
}

fn draw_parties(canvas: &mut PageCanvas, nfe: &Nfe, y: f32) -> f32 {
    let block_h = 46.0;
    canvas.rect(MARGIN, y - block_h, PAGE_WIDTH - 2.0 * MARGIN, block_h);
    canvas.text(MARGIN + 4.0, y - 10.0, Font::Bold, 7.0, "EMITENTE");
    canvas.text(MARGIN + 4.0, y - 20.0, Font::Regular, 8.0, &nfe.issuer.legal_name);
    canvas.text(
        MARGIN + 4.0,
        y - 30.0,
        Font::Regular,
        7.0,
        &format!(
            "CNPJ {}  IE {}  {} - {}",
            nfe.issuer.cnpj,
            nfe.issuer.state_registration,
            nfe.issuer.address.municipality,
            nfe.issuer.address.uf.sigla()
        ),
    );
    canvas.text(
        MARGIN + 4.0,
        y - 40.0,
        Font::Regular,
        7.0,
        &format!(
            "{}, {} - {} - CEP {}",
            nfe.issuer.address.street,
            nfe.issuer.address.number,
            nfe.issuer.address.district,
            nfe.issuer.address.cep
        ),
    );

    let y2 = y - block_h;
    canvas.rect(MARGIN, y2 - block_h, PAGE_WIDTH - 2.0 * MARGIN, block_h);
    canvas.text(MARGIN + 4.0, y2 - 10.0, Font::Bold, 7.0, "DESTINATARIO");
    canvas.text(MARGIN + 4.0, y2 - 20.0, Font::Regular, 8.0, &nfe.recipient.name);
    canvas.text(
        MARGIN + 4.0,
        y2 - 30.0,
        Font::Regular,
        7.0,
        &format!(
            "{} {}  {} - {}",
            match &nfe.recipient.id {
                crate::core::RecipientId::Cnpj(_) => "CNPJ",
                crate::core::RecipientId::Cpf(_) => "CPF",
            },
            nfe.recipient.id.digits(),
            nfe.recipient.address.municipality,
            nfe.recipient.address.uf.sigla()
        ),
    );

    y2 - block_h - 10.0
}

fn draw_item_table(canvas: &mut PageCanvas, items: &[crate::core::Item], y: f32) {
    let cols: [(f32, &str); 7] = [
        (MARGIN + 2.0, "CODIGO"),
        (MARGIN + 60.0, "DESCRICAO"),
        (MARGIN + 250.0, "NCM"),
        (MARGIN + 300.0, "CFOP"),
        (MARGIN + 340.0, "QTD"),
        (MARGIN + 400.0, "VL UNIT"),
        (MARGIN + 470.0, "VL TOTAL"),
    ];

    for (x, title) in cols {
        canvas.text(x, y - 10.0, Font::Bold, 6.0, title);
    }
    canvas.line(MARGIN, y - 14.0, PAGE_WIDTH - MARGIN, y - 14.0);

    let mut row_y = y - 14.0 - ROW_HEIGHT;
    for item in items {
        canvas.text(cols[0].0, row_y, Font::Regular, 6.0, &clip(&item.code, 12));
        canvas.text(cols[1].0, row_y, Font::Regular, 6.0, &clip(&item.description, 45));
        canvas.text(cols[2].0, row_y, Font::Regular, 6.0, &item.ncm);
        canvas.text(cols[3].0, row_y, Font::Regular, 6.0, &item.cfop);
        canvas.text(
            cols[4].0,
            row_y,
            Font::Regular,
            6.0,
            &format!("{} {}", format_fixed(item.quantity, 4), item.unit),
        );
        canvas.text(cols[5].0, row_y, Font::Regular, 6.0, &format_fixed(item.unit_price, 2));
        canvas.text(cols[6].0, row_y, Font::Regular, 6.0, &format_fixed(item.total, 2));
        row_y -= ROW_HEIGHT;
    }
}

fn draw_footer_blocks(canvas: &mut PageCanvas, nfe: &Nfe, totals: &Totals) {
    let y = 180.0;

    canvas.rect(MARGIN, y - 50.0, PAGE_WIDTH - 2.0 * MARGIN, 50.0);
    canvas.text(MARGIN + 4.0, y - 10.0, Font::Bold, 7.0, "CALCULO DO IMPOSTO");
    canvas.text(
        MARGIN + 4.0,
        y - 24.0,
        Font::Regular,
        7.0,
        &format!(
            "Base ICMS {}  Valor ICMS {}  Total produtos {}",
            money(totals.icms_base),
            money(totals.icms_amount),
            money(totals.products_total)
        ),
    );
    canvas.text(
        MARGIN + 4.0,
        y - 36.0,
        Font::Regular,
        7.0,
        &format!(
            "Frete {}  Seguro {}  Desconto {}  Outras despesas {}",
            money(totals.freight_total),
            money(totals.insurance_total),
            money(totals.discount_total),
            money(totals.other_expenses)
        ),
    );
    canvas.text(
        MARGIN + 350.0,
        y - 36.0,
        Font::Bold,
        9.0,
        &format!("VALOR TOTAL {}", money(totals.grand_total)),
    );

    let y2 = y - 60.0;
    canvas.rect(MARGIN, y2 - 30.0, PAGE_WIDTH - 2.0 * MARGIN, 30.0);
    canvas.text(MARGIN + 4.0, y2 - 10.0, Font::Bold, 7.0, "TRANSPORTADOR");
    let transport_line = match &nfe.transport.carrier {
        Some(c) => format!("{} - CNPJ {}", c.legal_name, c.cnpj),
        None => format!("Modalidade do frete: {}", nfe.transport.mode.code()),
    };
    canvas.text(MARGIN + 4.0, y2 - 22.0, Font::Regular, 7.0, &transport_line);

    let y3 = y2 - 40.0;
    if let Some(text) = &nfe.additional_info.taxpayer {
        canvas.text(MARGIN + 4.0, y3, Font::Bold, 7.0, "INFORMACOES COMPLEMENTARES");
        canvas.text(MARGIN + 4.0, y3 - 10.0, Font::Regular, 6.0, &clip(text, 130));
    }

    canvas.text(
        MARGIN,
        30.0,
        Font::Regular,
        6.0,
        "Consulta de autenticidade no portal nacional da NF-e: www.nfe.fazenda.gov.br/portal",
    );
}

fn money(value: Decimal) -> String {
    format_fixed(value, 2)
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_owned()
    } else {
        let clipped: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{clipped}...")
    }
}
