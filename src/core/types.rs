use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::access_key::AccessKey;
use super::regions::Uf;

/// Document model selecting layout and consumer-facing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentModel {
    /// 55 — NF-e, business-to-business invoice.
    Nfe,
    /// 65 — NFC-e, consumer-facing variant with QR code lookup.
    Nfce,
}

impl DocumentModel {
    pub fn code(&self) -> u8 {
        match self {
            Self::Nfe => 55,
            Self::Nfce => 65,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            55 => Some(Self::Nfe),
            65 => Some(Self::Nfce),
            _ => None,
        }
    }
}

/// tpEmis — how the document is being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionMode {
    /// 1 — normal, online authorization.
    Normal,
    /// 6 — contingency through SVC-AN.
    ContingencySvcAn,
    /// 7 — contingency through SVC-RS.
    ContingencySvcRs,
    /// 9 — NFC-e offline contingency.
    ContingencyOffline,
}

impl EmissionMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::ContingencySvcAn => 6,
            Self::ContingencySvcRs => 7,
            Self::ContingencyOffline => 9,
        }
    }
}

/// tpAmb — SEFAZ environment. Endpoint tables are disjoint per environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// Test environment; documents carry no fiscal value.
    Homologacao,
    /// Production.
    Producao,
}

impl Environment {
    /// Wire code for the tpAmb element.
    pub fn tp_amb(&self) -> u8 {
        match self {
            Self::Homologacao => 2,
            Self::Producao => 1,
        }
    }
}

/// CRT — issuer tax regime, selecting the per-item ICMS block shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxRegime {
    /// 1 — Simples Nacional; items carry the reduced CSOSN block.
    SimplesNacional,
    /// 3 — normal regime; items carry full base/rate/amount ICMS fields.
    RegimeNormal,
}

impl TaxRegime {
    pub fn code(&self) -> u8 {
        match self {
            Self::SimplesNacional => 1,
            Self::RegimeNormal => 3,
        }
    }
}

/// idDest — whether the operation crosses state borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationDestination {
    /// 1 — issuer and recipient in the same state.
    Internal,
    /// 2 — interstate operation.
    Interstate,
}

impl OperationDestination {
    pub fn code(&self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::Interstate => 2,
        }
    }

    pub fn classify(issuer: Uf, recipient: Uf) -> Self {
        if issuer == recipient {
            Self::Internal
        } else {
            Self::Interstate
        }
    }
}

/// Lifecycle status of a fiscal document.
///
/// Once `Authorized`, the signed body and access key are immutable; only
/// events (cancellation, correction) may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NfeStatus {
    /// Business data supplied, nothing generated yet.
    Draft,
    /// XML generated and access key derived.
    Generated,
    /// Signed by the signing gateway.
    Signed,
    /// Batch accepted for asynchronous processing, awaiting poll result.
    Queued,
    /// Authorized by SEFAZ; protocol stored.
    Authorized,
    /// Rejected by SEFAZ; rejection code and reason stored.
    Rejected,
    /// Cancelled through an accepted cancellation event.
    Cancelled,
}

/// Postal address shared by issuer, recipient and carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// xLgr — street.
    pub street: String,
    /// nro — number.
    pub number: String,
    /// xCpl — complement.
    pub complement: Option<String>,
    /// xBairro — district.
    pub district: String,
    /// cMun — IBGE municipality code (7 digits).
    pub municipality_code: String,
    /// xMun — municipality name.
    pub municipality: String,
    pub uf: Uf,
    /// CEP — postal code, 8 digits.
    pub cep: String,
    /// fone — phone, digits only.
    pub phone: Option<String>,
}

/// emit — the issuing company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issuer {
    /// CNPJ, 14 digits.
    pub cnpj: String,
    /// xNome — legal name.
    pub legal_name: String,
    /// xFant — trading name.
    pub trading_name: Option<String>,
    pub address: Address,
    /// IE — state registration.
    pub state_registration: String,
    /// CRT — tax regime.
    pub regime: TaxRegime,
}

/// Recipient identification: companies by CNPJ, individuals by CPF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientId {
    Cnpj(String),
    Cpf(String),
}

impl RecipientId {
    pub fn digits(&self) -> &str {
        match self {
            Self::Cnpj(d) | Self::Cpf(d) => d,
        }
    }
}

/// dest — the recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    /// xNome.
    pub name: String,
    pub address: Address,
    /// IE — state registration; absence marks a non-taxpayer (indIEDest 9).
    pub state_registration: Option<String>,
    pub email: Option<String>,
}

/// Per-item ICMS block. The shape depends on the issuer's regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IcmsBlock {
    /// ICMSSN102 — Simples Nacional, no base/rate/amount fields.
    Simples {
        /// orig — merchandise origin code.
        origin: u8,
        /// CSOSN situation code, e.g. "102".
        csosn: String,
    },
    /// ICMS00 — full taxation.
    Normal {
        origin: u8,
        /// CST situation code, e.g. "00".
        cst: String,
        base: Decimal,
        rate: Decimal,
        amount: Decimal,
    },
}

/// Flat-rate tax fields shared by the PIS and COFINS blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTax {
    /// CST situation code, e.g. "01".
    pub cst: String,
    pub base: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Computed tax fields of one item. Created at generation time, immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTax {
    pub icms: IcmsBlock,
    pub pis: RateTax,
    pub cofins: RateTax,
    /// vTotTrib — approximate total tax burden of the item.
    pub burden: Decimal,
}

/// det — one invoice line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// cProd — product code in the issuer's catalog.
    pub code: String,
    /// cEAN — GTIN barcode, when the product has one.
    pub ean: Option<String>,
    /// xProd.
    pub description: String,
    /// NCM — 8-digit tariff classification.
    pub ncm: String,
    /// CEST — when subject to tax substitution.
    pub cest: Option<String>,
    /// CFOP — 4-digit operation code.
    pub cfop: String,
    /// uCom — commercial unit.
    pub unit: String,
    /// qCom — quantity, 4 decimal places on the wire.
    pub quantity: Decimal,
    /// vUnCom — unit price, 10 decimal places on the wire.
    pub unit_price: Decimal,
    /// vProd — quantity × unit price, 2 decimal places.
    pub total: Decimal,
    /// vDesc.
    pub discount: Option<Decimal>,
    /// vFrete.
    pub freight: Option<Decimal>,
    pub tax: ItemTax,
}

/// ICMSTot — document totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub icms_base: Decimal,
    pub icms_amount: Decimal,
    pub icms_st_base: Decimal,
    pub icms_st_amount: Decimal,
    /// vProd — sum of item totals.
    pub products_total: Decimal,
    pub freight_total: Decimal,
    pub insurance_total: Decimal,
    pub discount_total: Decimal,
    pub ipi_total: Decimal,
    pub pis_total: Decimal,
    pub cofins_total: Decimal,
    pub other_expenses: Decimal,
    /// vNF — grand total.
    pub grand_total: Decimal,
    /// vTotTrib — approximate tax burden.
    pub tax_burden: Decimal,
}

/// modFrete — who pays the freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreightMode {
    /// 0 — issuer.
    Issuer,
    /// 1 — recipient.
    Recipient,
    /// 2 — third party.
    ThirdParty,
    /// 9 — no freight.
    None,
}

impl FreightMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Issuer => 0,
            Self::Recipient => 1,
            Self::ThirdParty => 2,
            Self::None => 9,
        }
    }
}

/// transporta — the carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub cnpj: String,
    pub legal_name: String,
    pub state_registration: Option<String>,
    pub address: Option<String>,
    pub municipality: Option<String>,
    pub uf: Option<Uf>,
}

/// vol — one transported volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub quantity: u32,
    /// esp — kind of package.
    pub kind: String,
    pub brand: Option<String>,
    pub numbering: Option<String>,
    /// pesoL — net weight in kg, 3 decimal places.
    pub net_weight: Decimal,
    /// pesoB — gross weight in kg, 3 decimal places.
    pub gross_weight: Decimal,
}

/// transp block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub mode: FreightMode,
    pub carrier: Option<Carrier>,
    pub volumes: Vec<Volume>,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            mode: FreightMode::None,
            carrier: None,
            volumes: Vec::new(),
        }
    }
}

/// tPag — payment method codes (subset of the fiscal table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    /// 01.
    Cash,
    /// 03.
    CreditCard,
    /// 04.
    DebitCard,
    /// 15.
    BankSlip,
    /// 17.
    Pix,
    /// 99.
    Other,
}

impl PaymentKind {
    pub fn code(&self) -> u8 {
        match self {
            Self::Cash => 1,
            Self::CreditCard => 3,
            Self::DebitCard => 4,
            Self::BankSlip => 15,
            Self::Pix => 17,
            Self::Other => 99,
        }
    }
}

/// detPag — one payment entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub kind: PaymentKind,
    pub amount: Decimal,
}

/// infAdic block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdditionalInfo {
    /// infCpl — taxpayer free text.
    pub taxpayer: Option<String>,
    /// infAdFisco — tax-authority directed text.
    pub authority: Option<String>,
}

/// Authorization protocol returned by SEFAZ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// nProt.
    pub protocol: String,
    /// dhRecbto.
    pub authorized_at: DateTime<Utc>,
}

/// Rejection verdict returned by SEFAZ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// cStat.
    pub code: u16,
    /// xMotivo.
    pub reason: String,
}

/// One emitted fiscal document and its lifecycle state.
///
/// `(serie, numero)` is unique per issuer and reserved through an atomic
/// sequence before generation. Items, totals and the access key are created
/// once by the builder and never mutated afterwards; only the lifecycle
/// fields (`status`, `authorization`, `rejection`) change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nfe {
    pub model: DocumentModel,
    pub serie: u16,
    pub numero: u64,
    pub access_key: AccessKey,
    pub environment: Environment,
    pub emission_mode: EmissionMode,
    /// natOp — nature of the operation, e.g. "Venda de mercadoria".
    pub nature_of_operation: String,
    pub destination: OperationDestination,
    pub issued_at: DateTime<FixedOffset>,
    /// cNF — random numeric code embedded in the access key.
    pub numeric_code: u32,
    pub issuer: Issuer,
    pub recipient: Recipient,
    pub items: Vec<Item>,
    /// Set by the builder; the renderer refuses documents without totals.
    pub totals: Option<Totals>,
    pub transport: Transport,
    pub payments: Vec<PaymentMethod>,
    pub additional_info: AdditionalInfo,
    /// indFinal — consumer-facing sale.
    pub consumer_final: bool,
    pub status: NfeStatus,
    pub authorization: Option<Authorization>,
    pub rejection: Option<Rejection>,
    /// Lookup URL rendered as a QR code on consumer documents.
    pub qrcode_url: Option<String>,
}

/// A lifecycle event accepted against an authorized document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub access_key: AccessKey,
    pub kind: EventKind,
    /// nSeqEvento — monotonic per document and kind, starting at 1.
    pub sequence: u32,
    pub justification: String,
    pub protocol: String,
    pub registered_at: DateTime<Utc>,
}

/// tpEvento kinds handled by the event pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// 110111 — cancellation.
    Cancelamento,
    /// 110110 — correction letter (CCe).
    CartaCorrecao,
}

impl EventKind {
    pub fn code(&self) -> u32 {
        match self {
            Self::Cancelamento => 110_111,
            Self::CartaCorrecao => 110_110,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Cancelamento => "Cancelamento",
            Self::CartaCorrecao => "Carta de Correcao",
        }
    }
}

/// A closed interval of document numbers retired without being issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidatedRange {
    pub uf: Uf,
    pub cnpj: String,
    pub year: u16,
    pub serie: u16,
    pub start: u64,
    pub end: u64,
    pub justification: String,
    pub protocol: String,
    pub homologated_at: DateTime<Utc>,
}
