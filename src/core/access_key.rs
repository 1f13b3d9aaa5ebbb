use chrono::{DateTime, Datelike, FixedOffset};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::NfeError;
use super::regions::Uf;
use super::types::{DocumentModel, EmissionMode};

/// The 44-digit access key identifying an NFe nationally.
///
/// Layout (43 digits + check digit):
///
/// | field  | width | content                          |
/// |--------|-------|----------------------------------|
/// | cUF    | 2     | issuer state IBGE code           |
/// | AAMM   | 4     | emission year/month              |
/// | CNPJ   | 14    | issuer tax id                    |
/// | mod    | 2     | document model (55/65)           |
/// | serie  | 3     | series                           |
/// | nNF    | 9     | sequential number                |
/// | tpEmis | 1     | emission mode                    |
/// | cNF    | 8     | random numeric code              |
/// | cDV    | 1     | modulo-11 check digit            |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessKey(String);

/// Typed inputs for composing an access key.
#[derive(Debug, Clone)]
pub struct AccessKeyParts {
    pub uf: Uf,
    /// Emission timestamp; only year/month enter the key.
    pub emitted_at: DateTime<FixedOffset>,
    /// Issuer CNPJ, digits only or formatted.
    pub cnpj: String,
    pub model: DocumentModel,
    pub serie: u16,
    pub numero: u64,
    pub emission_mode: EmissionMode,
    /// 8-digit numeric code (cNF), see [`random_numeric_code`].
    pub numeric_code: u32,
}

impl AccessKey {
    /// Compose a key from its parts, deriving the check digit.
    pub fn compose(parts: &AccessKeyParts) -> Result<Self, NfeError> {
        let cnpj = digits_only(&parts.cnpj);
        if cnpj.len() != 14 {
            return Err(NfeError::Validation(format!(
                "issuer CNPJ must have 14 digits, got {}",
                cnpj.len()
            )));
        }
        if parts.serie > 999 {
            return Err(NfeError::Validation(format!(
                "serie {} out of range 0-999",
                parts.serie
            )));
        }
        if parts.numero == 0 || parts.numero > 999_999_999 {
            return Err(NfeError::Validation(format!(
                "document number {} out of range 1-999999999",
                parts.numero
            )));
        }
        if parts.numeric_code > 99_999_999 {
            return Err(NfeError::Validation(format!(
                "numeric code {} exceeds 8 digits",
                parts.numeric_code
            )));
        }

        let aamm = format!(
            "{:02}{:02}",
            parts.emitted_at.year() % 100,
            parts.emitted_at.month()
        );
        let bare = format!(
            "{:02}{}{}{:02}{:03}{:09}{}{:08}",
            parts.uf.code(),
            aamm,
            cnpj,
            parts.model.code(),
            parts.serie,
            parts.numero,
            parts.emission_mode.code(),
            parts.numeric_code,
        );
        debug_assert_eq!(bare.len(), 43);

        let dv = check_digit(&bare);
        Ok(Self(format!("{bare}{dv}")))
    }

    /// Parse a 44-digit string, re-deriving the check digit.
    ///
    /// Any single-character corruption fails this check.
    pub fn parse(key: &str) -> Result<Self, NfeError> {
        if key.len() != 44 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NfeError::Validation(format!(
                "access key must be 44 digits, got {:?}",
                key
            )));
        }
        let expected = check_digit(&key[..43]);
        let informed = key.as_bytes()[43] - b'0';
        if informed != expected {
            return Err(NfeError::Validation(format!(
                "access key check digit mismatch: informed {informed}, derived {expected}"
            )));
        }
        Ok(Self(key.to_string()))
    }

    /// Whether a string is a structurally valid access key.
    pub fn is_valid(key: &str) -> bool {
        Self::parse(key).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Issuer state embedded in the key.
    pub fn uf(&self) -> Option<Uf> {
        self.0[..2].parse::<u8>().ok().and_then(Uf::from_code)
    }

    /// Issuer CNPJ embedded in the key (digits 6..20).
    pub fn cnpj(&self) -> &str {
        &self.0[6..20]
    }

    /// Document number embedded in the key.
    pub fn numero(&self) -> u64 {
        self.0[25..34].parse().unwrap_or(0)
    }

    /// Display form: groups of 4 digits separated by spaces (DANFE header).
    pub fn formatted(&self) -> String {
        self.0
            .as_bytes()
            .chunks(4)
            .map(|c| std::str::from_utf8(c).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Modulo-11 check digit over the 43 leading digits.
///
/// Weights cycle 2..9 starting from the rightmost digit; `11 - (sum % 11)`,
/// with 0, 1 and anything >= 10 collapsing to 0. An emitted key therefore
/// never carries check digit 1.
pub fn check_digit(bare: &str) -> u8 {
    const WEIGHTS: [u32; 8] = [2, 3, 4, 5, 6, 7, 8, 9];
    let sum: u32 = bare
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * WEIGHTS[i % 8])
        .sum();
    let dv = 11 - (sum % 11);
    if dv == 1 || dv >= 10 { 0 } else { dv as u8 }
}

/// Random 8-digit cNF component.
///
/// The random code exists so the full document number cannot be guessed
/// from a sequential key.
pub fn random_numeric_code() -> u32 {
    rand::thread_rng().gen_range(10_000_000..=99_999_999)
}

pub(crate) fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}
