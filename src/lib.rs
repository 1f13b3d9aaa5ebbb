//! # notafiscal
//!
//! Brazilian NFe (layout 4.00) e-invoicing library covering the emission
//! lifecycle: access key derivation, XML generation, structural validation,
//! SEFAZ transmission with polling, cancellation and correction events,
//! number-range invalidation, and DANFE rendering.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! Field names in doc comments reference the fiscal layout elements
//! (`ide`, `emit`, `det`, `ICMSTot`, ...) they map to.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{FixedOffset, TimeZone};
//! use notafiscal::core::*;
//! use rust_decimal_macros::dec;
//!
//! // The caller reserves (serie, numero) atomically before building.
//! let sequences = InMemorySequences::new();
//! let numero = sequences.reserve("11222333000181", 1);
//!
//! let address = Address {
//!     street: "Rua das Flores".into(),
//!     number: "100".into(),
//!     complement: None,
//!     district: "Centro".into(),
//!     municipality_code: "3550308".into(),
//!     municipality: "Sao Paulo".into(),
//!     uf: Uf::Sp,
//!     cep: "01001000".into(),
//!     phone: None,
//! };
//! let issued_at = FixedOffset::west_opt(3 * 3600).unwrap()
//!     .with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
//!
//! let nfe = NfeBuilder::new(1, numero, issued_at)
//!     .issuer(Issuer {
//!         cnpj: "11222333000181".into(),
//!         legal_name: "Aluforce Industria Ltda".into(),
//!         trading_name: None,
//!         address: address.clone(),
//!         state_registration: "123456789".into(),
//!         regime: TaxRegime::SimplesNacional,
//!     })
//!     .recipient(Recipient {
//!         id: RecipientId::Cnpj("04252011000110".into()),
//!         name: "Cliente SA".into(),
//!         address,
//!         state_registration: None,
//!         email: None,
//!     })
//!     .add_item(ItemDraft::new("P001", "Perfil de aluminio", "76042100", "5102", "KG")
//!         .quantity(dec!(10))
//!         .unit_price(dec!(25.50)))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(nfe.status, NfeStatus::Generated);
//! assert!(AccessKey::is_valid(nfe.access_key.as_str()));
//! assert_eq!(nfe.totals.as_ref().unwrap().products_total, dec!(255.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Domain types, access key, tax math, sequences |
//! | `xml` | Layout 4.00 XML generation & structural validation |
//! | `sefaz` | Endpoint routing, batch transmission, polling, retries |
//! | `evento` | Cancellation and correction (CCe) events |
//! | `inutilizacao` | Number-range invalidation |
//! | `danfe` | DANFE PDF rendering, NFC-e QR code |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "xml")]
pub mod xml;

#[cfg(feature = "sefaz")]
pub mod sefaz;

#[cfg(feature = "evento")]
pub mod evento;

#[cfg(feature = "inutilizacao")]
pub mod inutilizacao;

#[cfg(feature = "danfe")]
pub mod danfe;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
