//! Lifecycle events against authorized documents: cancellation and the
//! electronic correction letter (CCe).
//!
//! Both travel through the same event webservice. Sequence numbers come
//! from the maximum *accepted* sequence plus one, and are only recorded on
//! acceptance, so a rejected or failed attempt re-uses its number and the
//! accepted sequence stays gap-free. Every local precondition is checked
//! before signing or any network traffic.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use crate::core::access_key::digits_only;
use crate::core::{
    EventKind, EventRecord, EventStore, Nfe, NfeError, NfeStatus, Signer, normalize_text,
};
use crate::sefaz::{Outcome, SefazClient, Transport};
use crate::xml::{NFE_NAMESPACE, XmlWriter};

/// Statutory usage terms quoted verbatim inside every correction letter.
const CCE_TERMS: &str = "A Carta de Correcao e disciplinada pelo paragrafo 1o-A do art. 7o \
do Convenio S/N, de 15 de dezembro de 1970 e pode ser utilizada para regularizacao de erro \
ocorrido na emissao de documento fiscal, desde que o erro nao esteja relacionado com: I - as \
variaveis que determinam o valor do imposto tais como: base de calculo, aliquota, diferenca \
de preco, quantidade, valor da operacao ou da prestacao; II - a correcao de dados cadastrais \
que implique mudanca do remetente ou do destinatario; III - a data de emissao ou de saida.";

/// Maximum accepted correction letters per document.
const MAX_CCE_SEQUENCE: u32 = 20;

/// Cancellation window counted from the authorization timestamp.
const DEFAULT_CANCEL_WINDOW: Duration = Duration::from_secs(24 * 3600);

/// Manager for cancellation and correction events.
pub struct EventManager<T, S> {
    client: SefazClient<T>,
    signer: S,
    store: Arc<dyn EventStore>,
    cancel_window: Duration,
}

impl<T: Transport, S: Signer> EventManager<T, S> {
    pub fn new(client: SefazClient<T>, signer: S, store: Arc<dyn EventStore>) -> Self {
        Self {
            client,
            signer,
            store,
            cancel_window: DEFAULT_CANCEL_WINDOW,
        }
    }

    /// Override the 24h cancellation window (some states extend it).
    pub fn with_cancel_window(mut self, window: Duration) -> Self {
        self.cancel_window = window;
        self
    }

    /// Cancel an authorized document.
    ///
    /// Fails locally, without any network traffic, when the document is
    /// not authorized, the 24h window has passed, or the justification is
    /// out of bounds. On acceptance the event is recorded and the document
    /// moves to `Cancelled`.
    pub async fn cancel(
        &self,
        nfe: &mut Nfe,
        justification: &str,
        now: DateTime<FixedOffset>,
        tenant_id: u32,
    ) -> Result<EventRecord, NfeError> {
        let authorization = match (&nfe.status, &nfe.authorization) {
            (NfeStatus::Authorized, Some(auth)) => auth.clone(),
            (NfeStatus::Cancelled, _) => {
                return Err(NfeError::Conflict("document is already cancelled".into()));
            }
            _ => {
                return Err(NfeError::Conflict(
                    "only authorized documents can be cancelled".into(),
                ));
            }
        };

        let elapsed = now.with_timezone(&Utc) - authorization.authorized_at;
        let window = chrono::Duration::from_std(self.cancel_window)
            .map_err(|e| NfeError::Validation(format!("invalid cancel window: {e}")))?;
        if elapsed > window {
            return Err(NfeError::Deadline(format!(
                "cancellation window of {}h expired ({}h since authorization)",
                window.num_hours(),
                elapsed.num_hours()
            )));
        }

        // Normalization must not mask an over-limit text, so the length
        // check runs on the unclamped fold.
        let justification = normalize_text(justification, usize::MAX);
        check_length("justification", &justification, 15, 255)?;

        let sequence = self
            .store
            .max_accepted_sequence(&nfe.access_key, EventKind::Cancelamento)
            + 1;

        let xml = build_event_xml(&EventBody {
            nfe,
            kind: EventKind::Cancelamento,
            sequence,
            now,
            detail: EventDetail::Cancellation {
                protocol: &authorization.protocol,
                justification: &justification,
            },
        })?;

        let record = self
            .transmit(nfe, xml, EventKind::Cancelamento, sequence, justification, tenant_id)
            .await?;
        nfe.status = NfeStatus::Cancelled;
        info!(numero = nfe.numero, protocol = %record.protocol, "document cancelled");
        Ok(record)
    }

    /// Register a correction letter against an authorized document.
    ///
    /// The correction text cannot touch tax values, parties or dates; the
    /// statutory terms stating so are embedded in the event. At most 20
    /// letters are accepted per document; each new one supersedes the
    /// previous.
    pub async fn correct(
        &self,
        nfe: &Nfe,
        correction: &str,
        now: DateTime<FixedOffset>,
        tenant_id: u32,
    ) -> Result<EventRecord, NfeError> {
        match nfe.status {
            NfeStatus::Authorized => {}
            NfeStatus::Cancelled => {
                return Err(NfeError::Conflict(
                    "cancelled documents cannot receive correction letters".into(),
                ));
            }
            _ => {
                return Err(NfeError::Conflict(
                    "only authorized documents can receive correction letters".into(),
                ));
            }
        }

        let correction = normalize_text(correction, usize::MAX);
        check_length("correction", &correction, 15, 1000)?;

        let sequence = self
            .store
            .max_accepted_sequence(&nfe.access_key, EventKind::CartaCorrecao)
            + 1;
        if sequence > MAX_CCE_SEQUENCE {
            return Err(NfeError::Conflict(format!(
                "correction letter limit reached ({MAX_CCE_SEQUENCE} per document)"
            )));
        }

        let xml = build_event_xml(&EventBody {
            nfe,
            kind: EventKind::CartaCorrecao,
            sequence,
            now,
            detail: EventDetail::Correction { text: &correction },
        })?;

        self.transmit(nfe, xml, EventKind::CartaCorrecao, sequence, correction, tenant_id)
            .await
    }

    async fn transmit(
        &self,
        nfe: &Nfe,
        xml: String,
        kind: EventKind,
        sequence: u32,
        justification: String,
        tenant_id: u32,
    ) -> Result<EventRecord, NfeError> {
        let signed = self.signer.sign(&xml, tenant_id)?;
        let outcome = self
            .client
            .send_event(nfe.issuer.address.uf, nfe.environment, &signed)
            .await?;

        match outcome {
            Outcome::EventAccepted {
                protocol,
                registered_at,
                ..
            } => {
                let record = EventRecord {
                    access_key: nfe.access_key.clone(),
                    kind,
                    sequence,
                    justification,
                    protocol,
                    registered_at,
                };
                self.store.record(record.clone());
                Ok(record)
            }
            Outcome::Rejected { code, reason } => Err(NfeError::Rejection { code, reason }),
            other => Err(NfeError::Xml(format!(
                "unexpected event outcome {other:?}"
            ))),
        }
    }
}

enum EventDetail<'a> {
    Cancellation {
        protocol: &'a str,
        justification: &'a str,
    },
    Correction {
        text: &'a str,
    },
}

struct EventBody<'a> {
    nfe: &'a Nfe,
    kind: EventKind,
    sequence: u32,
    now: DateTime<FixedOffset>,
    detail: EventDetail<'a>,
}

fn build_event_xml(body: &EventBody<'_>) -> Result<String, NfeError> {
    let key = body.nfe.access_key.as_str();
    let id = format!("ID{}{key}{:02}", body.kind.code(), body.sequence);

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("evento", &[("xmlns", NFE_NAMESPACE), ("versao", "1.00")])?;
    w.start_element_with_attrs("infEvento", &[("Id", &id)])?;
    w.text_element("cOrgao", &key[..2])?;
    w.text_element("tpAmb", &body.nfe.environment.tp_amb().to_string())?;
    w.text_element("CNPJ", &digits_only(&body.nfe.issuer.cnpj))?;
    w.text_element("chNFe", key)?;
    w.text_element("dhEvento", &body.now.format("%Y-%m-%dT%H:%M:%S%:z").to_string())?;
    w.text_element("tpEvento", &body.kind.code().to_string())?;
    w.text_element("nSeqEvento", &body.sequence.to_string())?;
    w.text_element("verEvento", "1.00")?;
    w.start_element_with_attrs("detEvento", &[("versao", "1.00")])?;
    w.text_element("descEvento", body.kind.description())?;
    match body.detail {
        EventDetail::Cancellation {
            protocol,
            justification,
        } => {
            w.text_element("nProt", protocol)?;
            w.text_element("xJust", justification)?;
        }
        EventDetail::Correction { text } => {
            w.text_element("xCorrecao", text)?;
            w.text_element("xCondUso", CCE_TERMS)?;
        }
    }
    w.end_element("detEvento")?;
    w.end_element("infEvento")?;
    w.end_element("evento")?;
    w.into_string()
}

fn check_length(field: &str, text: &str, min: usize, max: usize) -> Result<(), NfeError> {
    let len = text.chars().count();
    if len < min || len > max {
        return Err(NfeError::Validation(format!(
            "{field} must have between {min} and {max} characters, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds() {
        assert!(check_length("justification", "curta", 15, 255).is_err());
        assert!(check_length("justification", &"x".repeat(256), 15, 255).is_err());
        assert!(check_length("justification", "justificativa de teste valida", 15, 255).is_ok());
    }
}
