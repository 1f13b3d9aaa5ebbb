//! Request envelopes for the SEFAZ webservices.

use chrono::Utc;
use rand::Rng;

use crate::core::access_key::digits_only;
use crate::core::{AccessKey, Environment, NfeError, Uf};
use crate::xml::{NFE_NAMESPACE, XmlWriter};

/// Batch identifier: millisecond timestamp plus three random digits,
/// truncated to the 15-digit field width.
pub fn batch_id() -> String {
    let stamp = Utc::now().timestamp_millis().to_string();
    let random: u16 = rand::thread_rng().gen_range(0..1000);
    let full = format!("{stamp}{random:03}");
    full[full.len().saturating_sub(15)..].to_string()
}

/// enviNFe — authorization batch around a signed document.
pub fn authorization_batch(signed_xml: &str, id: &str) -> Result<String, NfeError> {
    let body = strip_declaration(signed_xml);
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("enviNFe", &[("xmlns", NFE_NAMESPACE), ("versao", "4.00")])?;
    w.text_element("idLote", id)?;
    w.text_element("indSinc", "0")?;
    w.raw_fragment(body)?;
    w.end_element("enviNFe")?;
    w.into_string()
}

/// consReciNFe — receipt poll after a queued batch.
pub fn receipt_query(receipt: &str, environment: Environment) -> Result<String, NfeError> {
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("consReciNFe", &[("xmlns", NFE_NAMESPACE), ("versao", "4.00")])?;
    w.text_element("tpAmb", &environment.tp_amb().to_string())?;
    w.text_element("nRec", receipt)?;
    w.end_element("consReciNFe")?;
    w.into_string()
}

/// consSitNFe — protocol lookup for an access key.
pub fn protocol_query(key: &AccessKey, environment: Environment) -> Result<String, NfeError> {
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("consSitNFe", &[("xmlns", NFE_NAMESPACE), ("versao", "4.00")])?;
    w.text_element("tpAmb", &environment.tp_amb().to_string())?;
    w.text_element("xServ", "CONSULTAR")?;
    w.text_element("chNFe", key.as_str())?;
    w.end_element("consSitNFe")?;
    w.into_string()
}

/// consStatServ — webservice health check.
pub fn status_query(uf: Uf, environment: Environment) -> Result<String, NfeError> {
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("consStatServ", &[("xmlns", NFE_NAMESPACE), ("versao", "4.00")])?;
    w.text_element("tpAmb", &environment.tp_amb().to_string())?;
    w.text_element("cUF", &format!("{:02}", uf.code()))?;
    w.text_element("xServ", "STATUS")?;
    w.end_element("consStatServ")?;
    w.into_string()
}

/// envEvento — event batch around a signed event document.
pub fn event_batch(signed_event_xml: &str, id: &str) -> Result<String, NfeError> {
    let body = strip_declaration(signed_event_xml);
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("envEvento", &[("xmlns", NFE_NAMESPACE), ("versao", "1.00")])?;
    w.text_element("idLote", id)?;
    w.raw_fragment(body)?;
    w.end_element("envEvento")?;
    w.into_string()
}

/// inutNFe — number range invalidation request.
///
/// The infInut Id concatenates cUF, two-digit year, CNPJ, model, padded
/// serie and the padded range bounds.
pub struct InvalidationEnvelope<'a> {
    pub uf: Uf,
    pub environment: Environment,
    pub year: u16,
    pub cnpj: &'a str,
    pub serie: u16,
    pub start: u64,
    pub end: u64,
    pub justification: &'a str,
}

pub fn invalidation_request(req: &InvalidationEnvelope<'_>) -> Result<String, NfeError> {
    let cnpj = digits_only(req.cnpj);
    let yy = req.year % 100;
    let id = format!(
        "ID{:02}{:02}{}55{:03}{:09}{:09}",
        req.uf.code(),
        yy,
        cnpj,
        req.serie,
        req.start,
        req.end,
    );

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("inutNFe", &[("xmlns", NFE_NAMESPACE), ("versao", "4.00")])?;
    w.start_element_with_attrs("infInut", &[("Id", &id)])?;
    w.text_element("tpAmb", &req.environment.tp_amb().to_string())?;
    w.text_element("xServ", "INUTILIZAR")?;
    w.text_element("cUF", &format!("{:02}", req.uf.code()))?;
    w.text_element("ano", &format!("{yy:02}"))?;
    w.text_element("CNPJ", &cnpj)?;
    w.text_element("mod", "55")?;
    w.text_element("serie", &req.serie.to_string())?;
    w.text_element("nNFIni", &req.start.to_string())?;
    w.text_element("nNFFin", &req.end.to_string())?;
    w.text_element("xJust", req.justification)?;
    w.end_element("infInut")?;
    w.end_element("inutNFe")?;
    w.into_string()
}

fn strip_declaration(xml: &str) -> &str {
    match xml.find("?>") {
        Some(pos) if xml.starts_with("<?xml") => xml[pos + 2..].trim_start(),
        _ => xml,
    }
}
