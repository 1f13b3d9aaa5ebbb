//! Emission orchestration: generate, validate, sign, transmit, record.

use tracing::info;

use crate::core::{
    Authorization, Nfe, NfeError, NfeStatus, Rejection as RejectionRecord, Signer,
};
use crate::xml::{StructuralValidator, build_nfe_xml};

use super::client::{SefazClient, Transport};
use super::outcome::Outcome;

/// End-to-end emission of one document.
///
/// The pipeline owns only sequencing; each stage lives in its module and
/// the document records the stage it reached, so a failed emission can be
/// resumed from where it stopped.
pub struct EmissionPipeline<T, S> {
    client: SefazClient<T>,
    signer: S,
    validator: StructuralValidator,
}

impl<T: Transport, S: Signer> EmissionPipeline<T, S> {
    pub fn new(client: SefazClient<T>, signer: S) -> Self {
        Self {
            client,
            signer,
            validator: StructuralValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: StructuralValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Run a generated document through validation, signing and
    /// transmission, updating its lifecycle state along the way.
    ///
    /// Returns the transmission outcome on a fiscal verdict: `Authorized`
    /// and `Queued` are `Ok`, a rejection is recorded on the document and
    /// surfaced as [`NfeError::Rejection`]. Validation and signing
    /// failures stop the pipeline before any network traffic.
    pub async fn emit(&self, nfe: &mut Nfe, tenant_id: u32) -> Result<Outcome, NfeError> {
        match nfe.status {
            NfeStatus::Draft | NfeStatus::Generated | NfeStatus::Signed | NfeStatus::Rejected => {}
            NfeStatus::Queued => {
                return Err(NfeError::Conflict(
                    "document is queued for processing; poll its receipt instead".into(),
                ));
            }
            NfeStatus::Authorized | NfeStatus::Cancelled => {
                return Err(NfeError::Conflict(format!(
                    "document in state {:?} cannot be transmitted again",
                    nfe.status
                )));
            }
        }

        let xml = build_nfe_xml(nfe)?;

        let report = self.validator.validate(&xml);
        if !report.valid {
            return Err(NfeError::Structural(report.errors.join("; ")));
        }

        let signed = self.signer.sign(&xml, tenant_id)?;
        nfe.status = NfeStatus::Signed;

        let uf = nfe.issuer.address.uf;
        let outcome = self.client.authorize(uf, nfe.environment, &signed).await?;

        match &outcome {
            Outcome::Authorized {
                protocol,
                authorized_at,
            } => {
                info!(numero = nfe.numero, protocol, "document authorized");
                nfe.status = NfeStatus::Authorized;
                nfe.authorization = Some(Authorization {
                    protocol: protocol.clone(),
                    authorized_at: *authorized_at,
                });
                Ok(outcome)
            }
            Outcome::Queued { .. } => {
                nfe.status = NfeStatus::Queued;
                Ok(outcome)
            }
            Outcome::Rejected { code, reason } => {
                nfe.status = NfeStatus::Rejected;
                nfe.rejection = Some(RejectionRecord {
                    code: *code,
                    reason: reason.clone(),
                });
                Err(NfeError::Rejection {
                    code: *code,
                    reason: reason.clone(),
                })
            }
            // Receipt polls resolve through authorize(); remaining
            // variants belong to other operations.
            other => Err(NfeError::Xml(format!(
                "unexpected authorization outcome {other:?}"
            ))),
        }
    }

    /// Resume a queued emission by polling its receipt.
    pub async fn resume(
        &self,
        nfe: &mut Nfe,
        receipt: &str,
    ) -> Result<Outcome, NfeError> {
        let uf = nfe.issuer.address.uf;
        let outcome = self
            .client
            .query_receipt(uf, nfe.environment, receipt)
            .await?;

        match &outcome {
            Outcome::Authorized {
                protocol,
                authorized_at,
            } => {
                nfe.status = NfeStatus::Authorized;
                nfe.authorization = Some(Authorization {
                    protocol: protocol.clone(),
                    authorized_at: *authorized_at,
                });
                Ok(outcome)
            }
            Outcome::Rejected { code, reason } => {
                nfe.status = NfeStatus::Rejected;
                nfe.rejection = Some(RejectionRecord {
                    code: *code,
                    reason: reason.clone(),
                });
                Err(NfeError::Rejection {
                    code: *code,
                    reason: reason.clone(),
                })
            }
            _ => Ok(outcome),
        }
    }
}
