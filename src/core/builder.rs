use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use super::access_key::{AccessKey, AccessKeyParts, digits_only, random_numeric_code};
use super::error::{NfeError, validation_error};
use super::tributos::{self, TaxProfile};
use super::types::*;

/// Builder assembling a generated [`Nfe`] from business data plus the
/// `(serie, numero)` the caller reserved through a sequence store.
///
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use notafiscal::core::*;
/// use rust_decimal_macros::dec;
///
/// let issued_at = FixedOffset::west_opt(3 * 3600).unwrap()
///     .with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
/// let nfe = NfeBuilder::new(1, 42, issued_at)
///     .issuer(sample_issuer())
///     .recipient(sample_recipient())
///     .numeric_code(12_345_678)
///     .add_item(ItemDraft::new("P001", "Perfil de aluminio", "76042100", "5102", "KG")
///         .quantity(dec!(10))
///         .unit_price(dec!(25.50)))
///     .build()
///     .unwrap();
///
/// assert_eq!(nfe.status, NfeStatus::Generated);
/// assert_eq!(nfe.access_key.as_str().len(), 44);
///
/// fn sample_issuer() -> Issuer {
///     Issuer {
///         cnpj: "11222333000181".into(),
///         legal_name: "Aluforce Industria Ltda".into(),
///         trading_name: None,
///         address: sample_address(),
///         state_registration: "123456789".into(),
///         regime: TaxRegime::SimplesNacional,
///     }
/// }
/// fn sample_recipient() -> Recipient {
///     Recipient {
///         id: RecipientId::Cnpj("04252011000110".into()),
///         name: "Cliente SA".into(),
///         address: sample_address(),
///         state_registration: None,
///         email: None,
///     }
/// }
/// fn sample_address() -> Address {
///     Address {
///         street: "Rua das Flores".into(),
///         number: "100".into(),
///         complement: None,
///         district: "Centro".into(),
///         municipality_code: "3550308".into(),
///         municipality: "Sao Paulo".into(),
///         uf: Uf::Sp,
///         cep: "01001000".into(),
///         phone: None,
///     }
/// }
/// ```
pub struct NfeBuilder {
    model: DocumentModel,
    serie: u16,
    numero: u64,
    issued_at: DateTime<FixedOffset>,
    environment: Environment,
    emission_mode: EmissionMode,
    nature_of_operation: String,
    issuer: Option<Issuer>,
    recipient: Option<Recipient>,
    items: Vec<ItemDraft>,
    transport: Transport,
    payments: Vec<PaymentMethod>,
    additional_info: AdditionalInfo,
    consumer_final: bool,
    numeric_code: Option<u32>,
    freight_total: Decimal,
    insurance_total: Decimal,
    other_expenses: Decimal,
    declared_products_total: Option<Decimal>,
    qrcode_url: Option<String>,
}

impl NfeBuilder {
    pub fn new(serie: u16, numero: u64, issued_at: DateTime<FixedOffset>) -> Self {
        Self {
            model: DocumentModel::Nfe,
            serie,
            numero,
            issued_at,
            environment: Environment::Homologacao,
            emission_mode: EmissionMode::Normal,
            nature_of_operation: "Venda de mercadoria".into(),
            issuer: None,
            recipient: None,
            items: Vec::new(),
            transport: Transport::default(),
            payments: Vec::new(),
            additional_info: AdditionalInfo::default(),
            consumer_final: false,
            numeric_code: None,
            freight_total: Decimal::ZERO,
            insurance_total: Decimal::ZERO,
            other_expenses: Decimal::ZERO,
            declared_products_total: None,
            qrcode_url: None,
        }
    }

    pub fn model(mut self, model: DocumentModel) -> Self {
        self.model = model;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn emission_mode(mut self, mode: EmissionMode) -> Self {
        self.emission_mode = mode;
        self
    }

    pub fn nature_of_operation(mut self, nature: impl Into<String>) -> Self {
        self.nature_of_operation = nature.into();
        self
    }

    pub fn issuer(mut self, issuer: Issuer) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn recipient(mut self, recipient: Recipient) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn add_item(mut self, item: ItemDraft) -> Self {
        self.items.push(item);
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn add_payment(mut self, kind: PaymentKind, amount: Decimal) -> Self {
        self.payments.push(PaymentMethod { kind, amount });
        self
    }

    pub fn additional_info(mut self, info: AdditionalInfo) -> Self {
        self.additional_info = info;
        self
    }

    pub fn consumer_final(mut self, value: bool) -> Self {
        self.consumer_final = value;
        self
    }

    /// Fix the cNF component instead of drawing it at random.
    pub fn numeric_code(mut self, code: u32) -> Self {
        self.numeric_code = Some(code);
        self
    }

    pub fn freight_total(mut self, value: Decimal) -> Self {
        self.freight_total = value;
        self
    }

    pub fn insurance_total(mut self, value: Decimal) -> Self {
        self.insurance_total = value;
        self
    }

    pub fn other_expenses(mut self, value: Decimal) -> Self {
        self.other_expenses = value;
        self
    }

    /// Cross-check the computed product total against an externally
    /// declared amount; a mismatch fails the build.
    pub fn declared_products_total(mut self, value: Decimal) -> Self {
        self.declared_products_total = Some(value);
        self
    }

    /// Lookup URL for the NFC-e QR code.
    pub fn qrcode_url(mut self, url: impl Into<String>) -> Self {
        self.qrcode_url = Some(url.into());
        self
    }

    /// Build the document: compute item taxes per the issuer regime,
    /// aggregate totals, and derive the access key.
    ///
    /// Pure except for the random cNF draw when no code was fixed; the
    /// caller is responsible for having reserved `(serie, numero)` exactly
    /// once.
    pub fn build(self) -> Result<Nfe, NfeError> {
        let issuer = self
            .issuer
            .ok_or_else(|| NfeError::Validation("issuer is required".into()))?;
        let recipient = self
            .recipient
            .ok_or_else(|| NfeError::Validation("recipient is required".into()))?;

        let items: Vec<Item> = self
            .items
            .into_iter()
            .map(|draft| draft.finish(issuer.regime))
            .collect();

        let issues = tributos::validate_parts(&issuer, &recipient, &items);
        if !issues.is_empty() {
            return Err(validation_error(&issues));
        }

        let totals = tributos::compute_totals(
            &items,
            self.freight_total,
            self.insurance_total,
            self.other_expenses,
        );
        if let Some(declared) = self.declared_products_total {
            if declared != totals.products_total {
                return Err(NfeError::Validation(format!(
                    "declared products total {declared} does not reconcile with item sum {}",
                    totals.products_total
                )));
            }
        }

        let numeric_code = self.numeric_code.unwrap_or_else(random_numeric_code);
        let access_key = AccessKey::compose(&AccessKeyParts {
            uf: issuer.address.uf,
            emitted_at: self.issued_at,
            cnpj: digits_only(&issuer.cnpj),
            model: self.model,
            serie: self.serie,
            numero: self.numero,
            emission_mode: self.emission_mode,
            numeric_code,
        })?;

        let destination =
            OperationDestination::classify(issuer.address.uf, recipient.address.uf);

        Ok(Nfe {
            model: self.model,
            serie: self.serie,
            numero: self.numero,
            access_key,
            environment: self.environment,
            emission_mode: self.emission_mode,
            nature_of_operation: self.nature_of_operation,
            destination,
            issued_at: self.issued_at,
            numeric_code,
            issuer,
            recipient,
            items,
            totals: Some(totals),
            transport: self.transport,
            payments: self.payments,
            additional_info: self.additional_info,
            consumer_final: self.consumer_final,
            status: NfeStatus::Generated,
            authorization: None,
            rejection: None,
            qrcode_url: self.qrcode_url,
        })
    }
}

/// Raw line-item data; taxes are computed at build time once the issuer's
/// regime is known.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    code: String,
    description: String,
    ncm: String,
    cfop: String,
    unit: String,
    ean: Option<String>,
    cest: Option<String>,
    quantity: Decimal,
    unit_price: Decimal,
    discount: Option<Decimal>,
    freight: Option<Decimal>,
    tax_profile: TaxProfile,
}

impl ItemDraft {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        ncm: impl Into<String>,
        cfop: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            ncm: ncm.into(),
            cfop: cfop.into(),
            unit: unit.into(),
            ean: None,
            cest: None,
            quantity: Decimal::ONE,
            unit_price: Decimal::ZERO,
            discount: None,
            freight: None,
            tax_profile: TaxProfile::default(),
        }
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn unit_price(mut self, price: Decimal) -> Self {
        self.unit_price = price;
        self
    }

    pub fn ean(mut self, ean: impl Into<String>) -> Self {
        self.ean = Some(ean.into());
        self
    }

    pub fn cest(mut self, cest: impl Into<String>) -> Self {
        self.cest = Some(cest.into());
        self
    }

    pub fn discount(mut self, value: Decimal) -> Self {
        self.discount = Some(value);
        self
    }

    pub fn freight(mut self, value: Decimal) -> Self {
        self.freight = Some(value);
        self
    }

    pub fn tax_profile(mut self, profile: TaxProfile) -> Self {
        self.tax_profile = profile;
        self
    }

    fn finish(self, regime: TaxRegime) -> Item {
        let total = tributos::item_total(self.quantity, self.unit_price);
        let tax = tributos::compute_item_tax(regime, total, &self.tax_profile);
        Item {
            code: self.code,
            ean: self.ean,
            description: self.description,
            ncm: self.ncm,
            cest: self.cest,
            cfop: self.cfop,
            unit: self.unit,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total,
            discount: self.discount,
            freight: self.freight,
            tax,
        }
    }
}
