//! Layout 4.00 document generation.
//!
//! The output is unindented on purpose: the signing gateway canonicalizes
//! over the exact byte stream, so no cosmetic whitespace is emitted.

use crate::core::access_key::digits_only;
use crate::core::{
    AdditionalInfo, IcmsBlock, Item, Nfe, NfeError, RateTax, Recipient, RecipientId, Totals,
    Transport,
};

use super::xml_utils::{XmlWriter, format_fixed};

pub const NFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";
pub const LAYOUT_VERSION: &str = "4.00";

/// Generate the complete `<NFe>` document for an already-built invoice.
///
/// The access key is embedded as `Id="NFe{chave}"`; every decimal field is
/// written at its mandated width (quantities 4, unit prices 10, monetary
/// values 2, weights 3 decimal places).
pub fn build_nfe_xml(nfe: &Nfe) -> Result<String, NfeError> {
    let totals = nfe
        .totals
        .as_ref()
        .ok_or_else(|| NfeError::Structural("document has no computed totals".into()))?;

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("NFe", &[("xmlns", NFE_NAMESPACE)])?;
    w.start_element_with_attrs(
        "infNFe",
        &[
            ("Id", &format!("NFe{}", nfe.access_key.as_str())),
            ("versao", LAYOUT_VERSION),
        ],
    )?;

    write_ide(&mut w, nfe)?;
    write_emit(&mut w, nfe)?;
    write_dest(&mut w, &nfe.recipient, nfe)?;
    for (i, item) in nfe.items.iter().enumerate() {
        write_det(&mut w, i + 1, item)?;
    }
    write_total(&mut w, totals)?;
    write_transp(&mut w, &nfe.transport)?;
    write_pag(&mut w, nfe)?;
    write_inf_adic(&mut w, &nfe.additional_info)?;

    w.end_element("infNFe")?;
    w.end_element("NFe")?;
    w.into_string()
}

fn write_ide(w: &mut XmlWriter, nfe: &Nfe) -> Result<(), NfeError> {
    let key = nfe.access_key.as_str();
    // cDV is the last digit of the composed key.
    let cdv = &key[43..];

    w.start_element("ide")?;
    w.text_element("cUF", &format!("{:02}", nfe.issuer.address.uf.code()))?;
    w.text_element("cNF", &format!("{:08}", nfe.numeric_code))?;
    w.text_element("natOp", &nfe.nature_of_operation)?;
    w.text_element("mod", &nfe.model.code().to_string())?;
    w.text_element("serie", &nfe.serie.to_string())?;
    w.text_element("nNF", &nfe.numero.to_string())?;
    w.text_element("dhEmi", &nfe.issued_at.format("%Y-%m-%dT%H:%M:%S%:z").to_string())?;
    w.text_element("tpNF", "1")?;
    w.text_element("idDest", &nfe.destination.code().to_string())?;
    w.text_element("cMunFG", &nfe.issuer.address.municipality_code)?;
    w.text_element("tpImp", "1")?;
    w.text_element("tpEmis", &nfe.emission_mode.code().to_string())?;
    w.text_element("cDV", cdv)?;
    w.text_element("tpAmb", &nfe.environment.tp_amb().to_string())?;
    w.text_element("finNFe", "1")?;
    w.text_element("indFinal", if nfe.consumer_final { "1" } else { "0" })?;
    w.text_element("indPres", "1")?;
    w.text_element("procEmi", "0")?;
    w.text_element("verProc", concat!("notafiscal ", env!("CARGO_PKG_VERSION")))?;
    w.end_element("ide")?;
    Ok(())
}

fn write_address(w: &mut XmlWriter, name: &str, nfe: &Nfe, recipient: bool) -> Result<(), NfeError> {
    let a = if recipient {
        &nfe.recipient.address
    } else {
        &nfe.issuer.address
    };
    w.start_element(name)?;
    w.text_element("xLgr", &a.street)?;
    w.text_element("nro", &a.number)?;
    w.opt_text_element("xCpl", a.complement.as_deref())?;
    w.text_element("xBairro", &a.district)?;
    w.text_element("cMun", &a.municipality_code)?;
    w.text_element("xMun", &a.municipality)?;
    w.text_element("UF", a.uf.sigla())?;
    w.text_element("CEP", &digits_only(&a.cep))?;
    w.text_element("cPais", "1058")?;
    w.text_element("xPais", "BRASIL")?;
    if let Some(phone) = &a.phone {
        w.text_element("fone", &digits_only(phone))?;
    }
    w.end_element(name)?;
    Ok(())
}

fn write_emit(w: &mut XmlWriter, nfe: &Nfe) -> Result<(), NfeError> {
    let issuer = &nfe.issuer;
    w.start_element("emit")?;
    w.text_element("CNPJ", &digits_only(&issuer.cnpj))?;
    w.text_element("xNome", &issuer.legal_name)?;
    w.opt_text_element("xFant", issuer.trading_name.as_deref())?;
    write_address(w, "enderEmit", nfe, false)?;
    w.text_element("IE", &digits_only(&issuer.state_registration))?;
    w.text_element("CRT", &issuer.regime.code().to_string())?;
    w.end_element("emit")?;
    Ok(())
}

fn write_dest(w: &mut XmlWriter, dest: &Recipient, nfe: &Nfe) -> Result<(), NfeError> {
    w.start_element("dest")?;
    match &dest.id {
        RecipientId::Cnpj(d) => w.text_element("CNPJ", &digits_only(d))?,
        RecipientId::Cpf(d) => w.text_element("CPF", &digits_only(d))?,
    };
    w.text_element("xNome", &dest.name)?;
    write_address(w, "enderDest", nfe, true)?;
    // indIEDest 9 marks a non-taxpayer recipient.
    match &dest.state_registration {
        Some(ie) => {
            w.text_element("indIEDest", "1")?;
            w.text_element("IE", &digits_only(ie))?;
        }
        None => {
            w.text_element("indIEDest", "9")?;
        }
    }
    w.opt_text_element("email", dest.email.as_deref())?;
    w.end_element("dest")?;
    Ok(())
}

fn write_det(w: &mut XmlWriter, n_item: usize, item: &Item) -> Result<(), NfeError> {
    w.start_element_with_attrs("det", &[("nItem", &n_item.to_string())])?;

    w.start_element("prod")?;
    w.text_element("cProd", &item.code)?;
    w.text_element("cEAN", item.ean.as_deref().unwrap_or("SEM GTIN"))?;
    w.text_element("xProd", &item.description)?;
    w.text_element("NCM", &item.ncm)?;
    w.opt_text_element("CEST", item.cest.as_deref())?;
    w.text_element("CFOP", &item.cfop)?;
    w.text_element("uCom", &item.unit)?;
    w.text_element("qCom", &format_fixed(item.quantity, 4))?;
    w.text_element("vUnCom", &format_fixed(item.unit_price, 10))?;
    w.money_element("vProd", item.total)?;
    w.text_element("cEANTrib", item.ean.as_deref().unwrap_or("SEM GTIN"))?;
    w.text_element("uTrib", &item.unit)?;
    w.text_element("qTrib", &format_fixed(item.quantity, 4))?;
    w.text_element("vUnTrib", &format_fixed(item.unit_price, 10))?;
    if let Some(freight) = item.freight {
        w.money_element("vFrete", freight)?;
    }
    if let Some(discount) = item.discount {
        w.money_element("vDesc", discount)?;
    }
    w.text_element("indTot", "1")?;
    w.end_element("prod")?;

    w.start_element("imposto")?;
    w.money_element("vTotTrib", item.tax.burden)?;
    write_icms(w, &item.tax.icms)?;
    write_rate_tax(w, "PIS", "PISAliq", "pPIS", "vPIS", &item.tax.pis)?;
    write_rate_tax(w, "COFINS", "COFINSAliq", "pCOFINS", "vCOFINS", &item.tax.cofins)?;
    w.end_element("imposto")?;

    w.end_element("det")?;
    Ok(())
}

fn write_icms(w: &mut XmlWriter, icms: &IcmsBlock) -> Result<(), NfeError> {
    w.start_element("ICMS")?;
    match icms {
        IcmsBlock::Simples { origin, csosn } => {
            w.start_element("ICMSSN102")?;
            w.text_element("orig", &origin.to_string())?;
            w.text_element("CSOSN", csosn)?;
            w.end_element("ICMSSN102")?;
        }
        IcmsBlock::Normal {
            origin,
            cst,
            base,
            rate,
            amount,
        } => {
            w.start_element("ICMS00")?;
            w.text_element("orig", &origin.to_string())?;
            w.text_element("CST", cst)?;
            w.text_element("modBC", "3")?;
            w.money_element("vBC", *base)?;
            w.text_element("pICMS", &format_fixed(*rate, 2))?;
            w.money_element("vICMS", *amount)?;
            w.end_element("ICMS00")?;
        }
    }
    w.end_element("ICMS")?;
    Ok(())
}

fn write_rate_tax(
    w: &mut XmlWriter,
    group: &str,
    variant: &str,
    rate_name: &str,
    amount_name: &str,
    tax: &RateTax,
) -> Result<(), NfeError> {
    w.start_element(group)?;
    w.start_element(variant)?;
    w.text_element("CST", &tax.cst)?;
    w.money_element("vBC", tax.base)?;
    w.text_element(rate_name, &format_fixed(tax.rate, 2))?;
    w.money_element(amount_name, tax.amount)?;
    w.end_element(variant)?;
    w.end_element(group)?;
    Ok(())
}

fn write_total(w: &mut XmlWriter, t: &Totals) -> Result<(), NfeError> {
    w.start_element("total")?;
    w.start_element("ICMSTot")?;
    w.money_element("vBC", t.icms_base)?;
    w.money_element("vICMS", t.icms_amount)?;
    w.money_element("vICMSDeson", rust_decimal::Decimal::ZERO)?;
    w.money_element("vFCP", rust_decimal::Decimal::ZERO)?;
    w.money_element("vBCST", t.icms_st_base)?;
    w.money_element("vST", t.icms_st_amount)?;
    w.money_element("vFCPST", rust_decimal::Decimal::ZERO)?;
    w.money_element("vFCPSTRet", rust_decimal::Decimal::ZERO)?;
    w.money_element("vProd", t.products_total)?;
    w.money_element("vFrete", t.freight_total)?;
    w.money_element("vSeg", t.insurance_total)?;
    w.money_element("vDesc", t.discount_total)?;
    w.money_element("vII", rust_decimal::Decimal::ZERO)?;
    w.money_element("vIPI", t.ipi_total)?;
    w.money_element("vIPIDevol", rust_decimal::Decimal::ZERO)?;
    w.money_element("vPIS", t.pis_total)?;
    w.money_element("vCOFINS", t.cofins_total)?;
    w.money_element("vOutro", t.other_expenses)?;
    w.money_element("vNF", t.grand_total)?;
    w.money_element("vTotTrib", t.tax_burden)?;
    w.end_element("ICMSTot")?;
    w.end_element("total")?;
    Ok(())
}

fn write_transp(w: &mut XmlWriter, transport: &Transport) -> Result<(), NfeError> {
    w.start_element("transp")?;
    w.text_element("modFrete", &transport.mode.code().to_string())?;
    if let Some(carrier) = &transport.carrier {
        w.start_element("transporta")?;
        w.text_element("CNPJ", &digits_only(&carrier.cnpj))?;
        w.text_element("xNome", &carrier.legal_name)?;
        w.opt_text_element("IE", carrier.state_registration.as_deref())?;
        w.opt_text_element("xEnder", carrier.address.as_deref())?;
        w.opt_text_element("xMun", carrier.municipality.as_deref())?;
        if let Some(uf) = carrier.uf {
            w.text_element("UF", uf.sigla())?;
        }
        w.end_element("transporta")?;
    }
    for vol in &transport.volumes {
        w.start_element("vol")?;
        w.text_element("qVol", &vol.quantity.to_string())?;
        w.text_element("esp", &vol.kind)?;
        w.opt_text_element("marca", vol.brand.as_deref())?;
        w.opt_text_element("nVol", vol.numbering.as_deref())?;
        w.text_element("pesoL", &format_fixed(vol.net_weight, 3))?;
        w.text_element("pesoB", &format_fixed(vol.gross_weight, 3))?;
        w.end_element("vol")?;
    }
    w.end_element("transp")?;
    Ok(())
}

fn write_pag(w: &mut XmlWriter, nfe: &Nfe) -> Result<(), NfeError> {
    w.start_element("pag")?;
    if nfe.payments.is_empty() {
        // Layout requires at least one detPag; 90 marks "no payment"
        // (typical for pure shipment operations).
        w.start_element("detPag")?;
        w.text_element("tPag", "90")?;
        w.money_element("vPag", rust_decimal::Decimal::ZERO)?;
        w.end_element("detPag")?;
    }
    for p in &nfe.payments {
        w.start_element("detPag")?;
        w.text_element("tPag", &format!("{:02}", p.kind.code()))?;
        w.money_element("vPag", p.amount)?;
        w.end_element("detPag")?;
    }
    w.end_element("pag")?;
    Ok(())
}

fn write_inf_adic(w: &mut XmlWriter, info: &AdditionalInfo) -> Result<(), NfeError> {
    if info.taxpayer.is_none() && info.authority.is_none() {
        return Ok(());
    }
    w.start_element("infAdic")?;
    w.opt_text_element("infAdFisco", info.authority.as_deref())?;
    w.opt_text_element("infCpl", info.taxpayer.as_deref())?;
    w.end_element("infAdic")?;
    Ok(())
}
