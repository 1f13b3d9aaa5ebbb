//! SEFAZ transmission: endpoint routing, request envelopes, response
//! classification, retry/polling client, and the emission pipeline.

pub mod client;
pub mod emission;
pub mod endpoints;
pub mod lote;
pub mod outcome;
pub mod response;

pub use client::{HttpTransport, RetryPolicy, SefazClient, Transport};
pub use emission::EmissionPipeline;
pub use endpoints::{Service, endpoint_for};
pub use outcome::{Outcome, classify, cstat};
pub use response::SefazResponse;
