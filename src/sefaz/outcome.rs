//! Mapping cStat verdicts onto typed outcomes.

use chrono::{DateTime, Utc};

use crate::core::NfeError;

use super::response::SefazResponse;

/// cStat codes with pipeline-level meaning. Any other code is a rejection.
pub mod cstat {
    pub const AUTHORIZED: u16 = 100;
    pub const INVALIDATION_HOMOLOGATED: u16 = 102;
    pub const BATCH_QUEUED: u16 = 103;
    pub const BATCH_PROCESSED: u16 = 104;
    pub const BATCH_PROCESSING: u16 = 105;
    pub const SERVICE_OPERATIONAL: u16 = 107;
    pub const EVENT_ACCEPTED: u16 = 135;
}

/// Typed verdict of a SEFAZ round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 100 — document authorized; protocol binds the authorization.
    Authorized {
        protocol: String,
        authorized_at: DateTime<Utc>,
    },
    /// 103 — batch accepted for asynchronous processing.
    Queued { receipt: String },
    /// 105 — batch still processing; poll again.
    Processing,
    /// 135 — lifecycle event registered.
    EventAccepted {
        protocol: String,
        sequence: u32,
        registered_at: DateTime<Utc>,
    },
    /// 102 — number range invalidation homologated.
    Homologated { protocol: String },
    /// 107 — webservice answered its health check.
    ServiceOperational,
    /// Any other cStat.
    Rejected { code: u16, reason: String },
}

/// Classify a parsed response by its effective cStat.
pub fn classify(resp: &SefazResponse) -> Result<Outcome, NfeError> {
    match resp.effective_stat() {
        cstat::AUTHORIZED => Ok(Outcome::Authorized {
            protocol: required(resp.protocol.as_deref(), "nProt")?,
            authorized_at: parse_timestamp(resp.received_at.as_deref(), "dhRecbto")?,
        }),
        cstat::BATCH_QUEUED => Ok(Outcome::Queued {
            receipt: required(resp.receipt.as_deref(), "nRec")?,
        }),
        cstat::BATCH_PROCESSING => Ok(Outcome::Processing),
        cstat::EVENT_ACCEPTED => Ok(Outcome::EventAccepted {
            protocol: required(resp.protocol.as_deref(), "nProt")?,
            sequence: resp.event_sequence.unwrap_or(1),
            registered_at: parse_timestamp(resp.event_registered_at.as_deref(), "dhRegEvento")?,
        }),
        cstat::INVALIDATION_HOMOLOGATED => Ok(Outcome::Homologated {
            protocol: required(resp.protocol.as_deref(), "nProt")?,
        }),
        cstat::SERVICE_OPERATIONAL => Ok(Outcome::ServiceOperational),
        // 104 with no inner protNFe verdict means the envelope itself was
        // the last word; report it as-is.
        code => Ok(Outcome::Rejected {
            code,
            reason: resp.reason.clone(),
        }),
    }
}

fn required(value: Option<&str>, element: &str) -> Result<String, NfeError> {
    value
        .map(str::to_owned)
        .ok_or_else(|| NfeError::Xml(format!("SEFAZ response missing {element}")))
}

fn parse_timestamp(value: Option<&str>, element: &str) -> Result<DateTime<Utc>, NfeError> {
    let raw = value.ok_or_else(|| NfeError::Xml(format!("SEFAZ response missing {element}")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NfeError::Xml(format!("invalid {element} timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(stats: &[u16]) -> SefazResponse {
        SefazResponse {
            stats: stats.to_vec(),
            reason: "motivo".into(),
            receipt: Some("351000012345678".into()),
            protocol: Some("135240000000123".into()),
            received_at: Some("2024-06-15T10:31:02-03:00".into()),
            event_registered_at: Some("2024-06-15T11:00:00-03:00".into()),
            access_key: None,
            event_sequence: Some(2),
        }
    }

    #[test]
    fn authorized_parses_protocol_and_timestamp() {
        match classify(&resp(&[104, 100])).unwrap() {
            Outcome::Authorized {
                protocol,
                authorized_at,
            } => {
                assert_eq!(protocol, "135240000000123");
                assert_eq!(authorized_at.to_rfc3339(), "2024-06-15T13:31:02+00:00");
            }
            other => panic!("expected Authorized, got {other:?}"),
        }
    }

    #[test]
    fn unknown_code_is_rejection() {
        assert_eq!(
            classify(&resp(&[204])).unwrap(),
            Outcome::Rejected {
                code: 204,
                reason: "motivo".into()
            }
        );
    }

    #[test]
    fn queued_without_receipt_is_malformed() {
        let mut r = resp(&[103]);
        r.receipt = None;
        assert!(classify(&r).is_err());
    }

    #[test]
    fn event_acceptance_carries_sequence() {
        match classify(&resp(&[135])).unwrap() {
            Outcome::EventAccepted { sequence, .. } => assert_eq!(sequence, 2),
            other => panic!("expected EventAccepted, got {other:?}"),
        }
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let mut r = resp(&[100]);
        r.received_at = Some("yesterday".into());
        assert!(classify(&r).is_err());
    }
}
