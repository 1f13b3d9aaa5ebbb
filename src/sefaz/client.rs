//! Transmission client: transport abstraction, bounded retries, receipt
//! polling, and the audit trail.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::core::{
    AccessKey, Environment, LogEntry, NfeError, OperationKind, TransmissionLog, Uf,
};

use super::endpoints::{Service, endpoint_for};
use super::lote;
use super::outcome::{Outcome, classify};
use super::response::SefazResponse;

/// Raw HTTP exchange with a webservice. Production uses [`HttpTransport`];
/// tests substitute scripted doubles.
pub trait Transport: Send + Sync {
    fn post(&self, url: &str, body: &str)
    -> impl Future<Output = Result<String, NfeError>> + Send;
}

/// reqwest-backed transport posting the XML payload directly.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, NfeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| NfeError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &str) -> Result<String, NfeError> {
        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .body(body.to_owned())
            .send()
            .await
            .map_err(|e| NfeError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| NfeError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(NfeError::Transport(format!("HTTP {status}: {text}")));
        }
        Ok(text)
    }
}

/// Retry and polling knobs. Defaults follow the webservice guidance:
/// three attempts with exponential backoff from 2s, a 4s wait before the
/// first receipt poll, then up to five polls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub poll_attempts: u32,
    pub poll_initial_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(2),
            poll_attempts: 5,
            poll_initial_delay: Duration::from_secs(4),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Client for the SEFAZ webservices.
///
/// Every round-trip, successful or not, lands in the audit log. Transport
/// failures are retried with backoff; fiscal verdicts never are.
pub struct SefazClient<T> {
    transport: T,
    log: Arc<dyn TransmissionLog>,
    retry: RetryPolicy,
}

impl<T: Transport> SefazClient<T> {
    pub fn new(transport: T, log: Arc<dyn TransmissionLog>) -> Self {
        Self {
            transport,
            log,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Submit a signed document for authorization. A queued batch is
    /// polled until a final verdict or the polling budget runs out, in
    /// which case the receipt is handed back for a later
    /// [`query_receipt`](Self::query_receipt).
    pub async fn authorize(
        &self,
        uf: Uf,
        environment: Environment,
        signed_xml: &str,
    ) -> Result<Outcome, NfeError> {
        let url = endpoint_for(Service::Autorizacao, uf, environment);
        let envelope = lote::authorization_batch(signed_xml, &lote::batch_id())?;
        let outcome = self
            .roundtrip(OperationKind::Autorizacao, url, &envelope)
            .await?;

        match outcome {
            Outcome::Queued { receipt } => {
                debug!(receipt, "batch queued, polling receipt");
                self.poll_receipt(uf, environment, &receipt).await
            }
            other => Ok(other),
        }
    }

    /// Poll a queued batch receipt once.
    pub async fn query_receipt(
        &self,
        uf: Uf,
        environment: Environment,
        receipt: &str,
    ) -> Result<Outcome, NfeError> {
        let url = endpoint_for(Service::Autorizacao, uf, environment);
        let body = lote::receipt_query(receipt, environment)?;
        self.roundtrip(OperationKind::ConsultaRecibo, url, &body)
            .await
    }

    /// Look up the protocol bound to an access key.
    pub async fn query_protocol(
        &self,
        uf: Uf,
        environment: Environment,
        key: &AccessKey,
    ) -> Result<Outcome, NfeError> {
        let url = endpoint_for(Service::Autorizacao, uf, environment);
        let body = lote::protocol_query(key, environment)?;
        self.roundtrip(OperationKind::ConsultaProtocolo, url, &body)
            .await
    }

    /// Health check of the state's webservice.
    pub async fn service_status(
        &self,
        uf: Uf,
        environment: Environment,
    ) -> Result<Outcome, NfeError> {
        let url = endpoint_for(Service::Autorizacao, uf, environment);
        let body = lote::status_query(uf, environment)?;
        self.roundtrip(OperationKind::StatusServico, url, &body)
            .await
    }

    /// Transmit a signed lifecycle event.
    pub async fn send_event(
        &self,
        uf: Uf,
        environment: Environment,
        signed_event_xml: &str,
    ) -> Result<Outcome, NfeError> {
        let url = endpoint_for(Service::Evento, uf, environment);
        let envelope = lote::event_batch(signed_event_xml, &lote::batch_id())?;
        self.roundtrip(OperationKind::Evento, url, &envelope).await
    }

    /// Transmit a number range invalidation request.
    pub async fn send_invalidation(
        &self,
        uf: Uf,
        environment: Environment,
        signed_xml: &str,
    ) -> Result<Outcome, NfeError> {
        let url = endpoint_for(Service::Autorizacao, uf, environment);
        self.roundtrip(OperationKind::Inutilizacao, url, signed_xml)
            .await
    }

    async fn poll_receipt(
        &self,
        uf: Uf,
        environment: Environment,
        receipt: &str,
    ) -> Result<Outcome, NfeError> {
        tokio::time::sleep(self.retry.poll_initial_delay).await;
        for _ in 0..self.retry.poll_attempts {
            match self.query_receipt(uf, environment, receipt).await? {
                Outcome::Processing => {
                    tokio::time::sleep(self.retry.poll_interval).await;
                }
                Outcome::Queued { .. } => {
                    tokio::time::sleep(self.retry.poll_interval).await;
                }
                verdict => return Ok(verdict),
            }
        }
        warn!(receipt, "polling budget exhausted, batch still processing");
        Ok(Outcome::Queued {
            receipt: receipt.to_owned(),
        })
    }

    /// One operation with transport retries; every attempt is audited.
    async fn roundtrip(
        &self,
        operation: OperationKind,
        url: &str,
        body: &str,
    ) -> Result<Outcome, NfeError> {
        let mut attempt = 0;
        loop {
            debug!(?operation, url, attempt, "posting to SEFAZ");
            match self.transport.post(url, body).await {
                Ok(raw) => {
                    let resp = SefazResponse::parse(&raw)?;
                    self.log.append(LogEntry {
                        operation,
                        request: body.to_owned(),
                        response: raw,
                        status_code: Some(resp.effective_stat()),
                        at: Utc::now(),
                    });
                    return classify(&resp);
                }
                Err(NfeError::Transport(msg)) if attempt + 1 < self.retry.attempts => {
                    warn!(?operation, attempt, error = %msg, "transport failure, retrying");
                    self.log.append(LogEntry {
                        operation,
                        request: body.to_owned(),
                        response: msg,
                        status_code: None,
                        at: Utc::now(),
                    });
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.log.append(LogEntry {
                        operation,
                        request: body.to_owned(),
                        response: e.to_string(),
                        status_code: None,
                        at: Utc::now(),
                    });
                    return Err(e);
                }
            }
        }
    }
}
