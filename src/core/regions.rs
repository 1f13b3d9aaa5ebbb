use serde::{Deserialize, Serialize};

/// Brazilian federative units with their IBGE numeric codes.
///
/// The numeric code is the first component of the access key and selects
/// the SEFAZ webservice endpoint for the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uf {
    Ro,
    Ac,
    Am,
    Rr,
    Pa,
    Ap,
    To,
    Ma,
    Pi,
    Ce,
    Rn,
    Pb,
    Pe,
    Al,
    Se,
    Ba,
    Mg,
    Es,
    Rj,
    Sp,
    Pr,
    Sc,
    Rs,
    Ms,
    Mt,
    Go,
    Df,
}

impl Uf {
    /// IBGE numeric code (two digits).
    pub fn code(&self) -> u8 {
        match self {
            Self::Ro => 11,
            Self::Ac => 12,
            Self::Am => 13,
            Self::Rr => 14,
            Self::Pa => 15,
            Self::Ap => 16,
            Self::To => 17,
            Self::Ma => 21,
            Self::Pi => 22,
            Self::Ce => 23,
            Self::Rn => 24,
            Self::Pb => 25,
            Self::Pe => 26,
            Self::Al => 27,
            Self::Se => 28,
            Self::Ba => 29,
            Self::Mg => 31,
            Self::Es => 32,
            Self::Rj => 33,
            Self::Sp => 35,
            Self::Pr => 41,
            Self::Sc => 42,
            Self::Rs => 43,
            Self::Ms => 50,
            Self::Mt => 51,
            Self::Go => 52,
            Self::Df => 53,
        }
    }

    /// Two-letter state abbreviation as used in addresses and endpoints.
    pub fn sigla(&self) -> &'static str {
        match self {
            Self::Ro => "RO",
            Self::Ac => "AC",
            Self::Am => "AM",
            Self::Rr => "RR",
            Self::Pa => "PA",
            Self::Ap => "AP",
            Self::To => "TO",
            Self::Ma => "MA",
            Self::Pi => "PI",
            Self::Ce => "CE",
            Self::Rn => "RN",
            Self::Pb => "PB",
            Self::Pe => "PE",
            Self::Al => "AL",
            Self::Se => "SE",
            Self::Ba => "BA",
            Self::Mg => "MG",
            Self::Es => "ES",
            Self::Rj => "RJ",
            Self::Sp => "SP",
            Self::Pr => "PR",
            Self::Sc => "SC",
            Self::Rs => "RS",
            Self::Ms => "MS",
            Self::Mt => "MT",
            Self::Go => "GO",
            Self::Df => "DF",
        }
    }

    /// Parse from the IBGE numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        ALL.iter().copied().find(|uf| uf.code() == code)
    }

    /// Parse from the two-letter abbreviation, case-insensitive.
    pub fn from_sigla(sigla: &str) -> Option<Self> {
        let upper = sigla.to_ascii_uppercase();
        ALL.iter().copied().find(|uf| uf.sigla() == upper)
    }
}

const ALL: [Uf; 27] = [
    Uf::Ro,
    Uf::Ac,
    Uf::Am,
    Uf::Rr,
    Uf::Pa,
    Uf::Ap,
    Uf::To,
    Uf::Ma,
    Uf::Pi,
    Uf::Ce,
    Uf::Rn,
    Uf::Pb,
    Uf::Pe,
    Uf::Al,
    Uf::Se,
    Uf::Ba,
    Uf::Mg,
    Uf::Es,
    Uf::Rj,
    Uf::Sp,
    Uf::Pr,
    Uf::Sc,
    Uf::Rs,
    Uf::Ms,
    Uf::Mt,
    Uf::Go,
    Uf::Df,
];

impl std::fmt::Display for Uf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sigla())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for uf in ALL {
            assert_eq!(Uf::from_code(uf.code()), Some(uf));
            assert_eq!(Uf::from_sigla(uf.sigla()), Some(uf));
        }
    }

    #[test]
    fn sp_is_35() {
        assert_eq!(Uf::Sp.code(), 35);
        assert_eq!(Uf::from_sigla("sp"), Some(Uf::Sp));
    }

    #[test]
    fn unknown_inputs() {
        assert_eq!(Uf::from_code(99), None);
        assert_eq!(Uf::from_sigla("XX"), None);
    }
}
