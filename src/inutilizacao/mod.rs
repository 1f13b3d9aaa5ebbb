//! Number range invalidation.
//!
//! Numbers skipped by a sequence (crash between reservation and emission,
//! renumbering) must be retired with the authority. The request is checked
//! against issued documents and previously homologated ranges before it is
//! signed or transmitted; conflicts name the offending number or range.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use crate::core::access_key::digits_only;
use crate::core::{
    DocumentStore, Environment, InvalidatedRange, InvalidationStore, NfeError, Signer, Uf,
    normalize_text,
};
use crate::sefaz::{Outcome, SefazClient, Transport};
use crate::sefaz::lote::{InvalidationEnvelope, invalidation_request};

/// Largest range accepted in a single request.
const MAX_RANGE_WIDTH: u64 = 10_000;

/// One invalidation request before homologation.
#[derive(Debug, Clone)]
pub struct InvalidationRequest {
    pub uf: Uf,
    pub environment: Environment,
    pub cnpj: String,
    pub year: u16,
    pub serie: u16,
    pub start: u64,
    pub end: u64,
    pub justification: String,
}

/// Suggested next range to retire, derived from the highest issued and
/// highest invalidated numbers of a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSuggestion {
    pub serie: u16,
    pub start: u64,
    pub suggested_end: u64,
}

pub struct InvalidationManager<T, S> {
    client: SefazClient<T>,
    signer: S,
    documents: Arc<dyn DocumentStore>,
    ranges: Arc<dyn InvalidationStore>,
}

impl<T: Transport, S: Signer> InvalidationManager<T, S> {
    pub fn new(
        client: SefazClient<T>,
        signer: S,
        documents: Arc<dyn DocumentStore>,
        ranges: Arc<dyn InvalidationStore>,
    ) -> Self {
        Self {
            client,
            signer,
            documents,
            ranges,
        }
    }

    /// Retire a number range. On homologation (cStat 102) the range is
    /// recorded so later requests and suggestions see it.
    pub async fn invalidate(
        &self,
        req: &InvalidationRequest,
        tenant_id: u32,
    ) -> Result<InvalidatedRange, NfeError> {
        // The 15-255 bound in validate_request must see the full folded
        // text, not a clamped prefix.
        let justification = normalize_text(&req.justification, usize::MAX);
        validate_request(req, &justification)?;
        self.check_conflicts(req)?;

        let xml = invalidation_request(&InvalidationEnvelope {
            uf: req.uf,
            environment: req.environment,
            year: req.year,
            cnpj: &req.cnpj,
            serie: req.serie,
            start: req.start,
            end: req.end,
            justification: &justification,
        })?;
        let signed = self.signer.sign(&xml, tenant_id)?;

        let outcome = self
            .client
            .send_invalidation(req.uf, req.environment, &signed)
            .await?;

        match outcome {
            Outcome::Homologated { protocol } => {
                let range = InvalidatedRange {
                    uf: req.uf,
                    cnpj: digits_only(&req.cnpj),
                    year: req.year,
                    serie: req.serie,
                    start: req.start,
                    end: req.end,
                    justification,
                    protocol,
                    homologated_at: Utc::now(),
                };
                self.ranges.record(range.clone());
                info!(
                    serie = req.serie,
                    start = req.start,
                    end = req.end,
                    "range invalidation homologated"
                );
                Ok(range)
            }
            Outcome::Rejected { code, reason } => Err(NfeError::Rejection { code, reason }),
            other => Err(NfeError::Xml(format!(
                "unexpected invalidation outcome {other:?}"
            ))),
        }
    }

    /// Next range worth retiring for an issuer's series: starts right
    /// after the highest issued or invalidated number, sized at 100 by
    /// default.
    pub fn suggest_next_range(&self, cnpj: &str, serie: u16) -> RangeSuggestion {
        let cnpj = digits_only(cnpj);
        let issued = self.documents.max_issued(&cnpj, serie).unwrap_or(0);
        let invalidated = self.ranges.max_invalidated(&cnpj, serie).unwrap_or(0);
        let start = issued.max(invalidated) + 1;
        RangeSuggestion {
            serie,
            start,
            suggested_end: start + 99,
        }
    }

    fn check_conflicts(&self, req: &InvalidationRequest) -> Result<(), NfeError> {
        let cnpj = digits_only(&req.cnpj);
        if let Some(numero) =
            self.documents
                .issued_number_in(&cnpj, req.serie, req.start..=req.end)
        {
            return Err(NfeError::Conflict(format!(
                "number {numero} of series {} was already issued",
                req.serie
            )));
        }
        if let Some((start, end)) =
            self.ranges
                .overlapping(&cnpj, req.year, req.serie, req.start, req.end)
        {
            return Err(NfeError::Conflict(format!(
                "range overlaps previously invalidated {start}-{end} of series {}",
                req.serie
            )));
        }
        Ok(())
    }
}

fn validate_request(req: &InvalidationRequest, justification: &str) -> Result<(), NfeError> {
    if !(2000..=2099).contains(&req.year) {
        return Err(NfeError::Validation(format!(
            "year {} out of range 2000-2099",
            req.year
        )));
    }
    if digits_only(&req.cnpj).len() != 14 {
        return Err(NfeError::Validation("CNPJ must have 14 digits".into()));
    }
    if req.serie > 999 {
        return Err(NfeError::Validation(format!(
            "serie {} out of range 0-999",
            req.serie
        )));
    }
    for (name, n) in [("start", req.start), ("end", req.end)] {
        if n == 0 || n > 999_999_999 {
            return Err(NfeError::Validation(format!(
                "{name} number {n} out of range 1-999999999"
            )));
        }
    }
    if req.end < req.start {
        return Err(NfeError::Validation(format!(
            "end number {} precedes start number {}",
            req.end, req.start
        )));
    }
    let width = req.end - req.start + 1;
    if width > MAX_RANGE_WIDTH {
        return Err(NfeError::Validation(format!(
            "range of {width} numbers exceeds the {MAX_RANGE_WIDTH} limit"
        )));
    }
    let len = justification.chars().count();
    if !(15..=255).contains(&len) {
        return Err(NfeError::Validation(format!(
            "justification must have between 15 and 255 characters, got {len}"
        )));
    }
    Ok(())
}

/// Current year helper for callers building requests.
pub fn current_year(now: DateTime<Utc>) -> u16 {
    now.year() as u16
}
