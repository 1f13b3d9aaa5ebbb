//! Flattened view over SEFAZ response envelopes.
//!
//! Responses nest differently per service (retEnviNFe, retConsReciNFe,
//! retEvento, retInutNFe, ...), but the decision-relevant fields are the
//! same handful of elements. The parser walks the whole envelope and keeps
//! every cStat it sees: the first one is the envelope verdict, the last
//! one the innermost protocol verdict, which is the one that decides the
//! document's fate when a processed batch (104) wraps a protNFe.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::core::NfeError;

#[derive(Debug, Clone, Default)]
pub struct SefazResponse {
    /// Every cStat in document order.
    pub stats: Vec<u16>,
    /// xMotivo accompanying the innermost cStat.
    pub reason: String,
    /// nRec — receipt of a queued batch.
    pub receipt: Option<String>,
    /// nProt — authorization/event/invalidation protocol.
    pub protocol: Option<String>,
    /// dhRecbto of the innermost protocol.
    pub received_at: Option<String>,
    /// dhRegEvento — event registration timestamp.
    pub event_registered_at: Option<String>,
    /// chNFe echoed back in protocols and events.
    pub access_key: Option<String>,
    /// nSeqEvento echoed back for events.
    pub event_sequence: Option<u32>,
}

impl SefazResponse {
    pub fn parse(xml: &str) -> Result<Self, NfeError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut resp = Self::default();
        let mut current: Option<String> = None;

        loop {
            match reader
                .read_event()
                .map_err(|e| NfeError::Xml(format!("malformed SEFAZ response: {e}")))?
            {
                Event::Start(e) => {
                    current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| NfeError::Xml(format!("malformed SEFAZ response: {e}")))?
                        .into_owned();
                    match current.as_deref() {
                        Some("cStat") => {
                            if let Ok(code) = text.parse() {
                                resp.stats.push(code);
                            }
                        }
                        Some("xMotivo") => resp.reason = text,
                        Some("nRec") => resp.receipt = Some(text),
                        Some("nProt") => resp.protocol = Some(text),
                        Some("dhRecbto") => resp.received_at = Some(text),
                        Some("dhRegEvento") => resp.event_registered_at = Some(text),
                        Some("chNFe") => resp.access_key = Some(text),
                        Some("nSeqEvento") => resp.event_sequence = text.parse().ok(),
                        _ => {}
                    }
                }
                Event::End(_) => current = None,
                Event::Eof => break,
                _ => {}
            }
        }

        if resp.stats.is_empty() {
            return Err(NfeError::Xml("SEFAZ response carries no cStat".into()));
        }
        Ok(resp)
    }

    /// The envelope-level verdict.
    pub fn envelope_stat(&self) -> u16 {
        self.stats.first().copied().unwrap_or(0)
    }

    /// The verdict that decides the document's fate: the innermost cStat.
    /// For a processed batch (envelope 104) this is the protNFe verdict.
    pub fn effective_stat(&self) -> u16 {
        self.stats.last().copied().unwrap_or(0)
    }
}
