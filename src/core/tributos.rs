//! Per-item tax computation and document totals.
//!
//! All arithmetic uses [`rust_decimal::Decimal`] and rounds half-away-from-zero
//! at the precision the fiscal layout mandates: monetary values at 2 decimal
//! places, quantities at 4, unit prices at 10.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::ValidationIssue;
use super::types::{IcmsBlock, Item, ItemTax, RateTax, TaxRegime, Totals};

/// Tax parameters applied to an item. Defaults match a plain domestic sale.
#[derive(Debug, Clone)]
pub struct TaxProfile {
    pub icms_rate: Decimal,
    pub pis_rate: Decimal,
    pub cofins_rate: Decimal,
    /// orig — merchandise origin code (0 = national).
    pub origin: u8,
    /// CSOSN used when the issuer is Simples Nacional.
    pub csosn: String,
    /// CST used for ICMS00 under the normal regime.
    pub cst_icms: String,
    pub cst_pis: String,
    pub cst_cofins: String,
}

impl Default for TaxProfile {
    fn default() -> Self {
        Self {
            icms_rate: dec!(18),
            pis_rate: dec!(1.65),
            cofins_rate: dec!(7.60),
            origin: 0,
            csosn: "102".into(),
            cst_icms: "00".into(),
            cst_pis: "01".into(),
            cst_cofins: "01".into(),
        }
    }
}

/// Round to 2 decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Item total: quantity × unit price at monetary precision.
pub fn item_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round_money(quantity * unit_price)
}

fn percentage_of(base: Decimal, rate: Decimal) -> Decimal {
    round_money(base * rate / dec!(100))
}

/// Compute the tax block of one item.
///
/// Simples Nacional issuers emit the reduced CSOSN block; normal-regime
/// issuers emit full ICMS base/rate/amount fields. PIS and COFINS are
/// computed over the item total either way.
pub fn compute_item_tax(regime: TaxRegime, base: Decimal, profile: &TaxProfile) -> ItemTax {
    let pis = RateTax {
        cst: profile.cst_pis.clone(),
        base,
        rate: profile.pis_rate,
        amount: percentage_of(base, profile.pis_rate),
    };
    let cofins = RateTax {
        cst: profile.cst_cofins.clone(),
        base,
        rate: profile.cofins_rate,
        amount: percentage_of(base, profile.cofins_rate),
    };

    let (icms, icms_amount) = match regime {
        TaxRegime::SimplesNacional => (
            IcmsBlock::Simples {
                origin: profile.origin,
                csosn: profile.csosn.clone(),
            },
            Decimal::ZERO,
        ),
        TaxRegime::RegimeNormal => {
            let amount = percentage_of(base, profile.icms_rate);
            (
                IcmsBlock::Normal {
                    origin: profile.origin,
                    cst: profile.cst_icms.clone(),
                    base,
                    rate: profile.icms_rate,
                    amount,
                },
                amount,
            )
        }
    };

    let burden = round_money(icms_amount + pis.amount + cofins.amount);
    ItemTax {
        icms,
        pis,
        cofins,
        burden,
    }
}

/// Aggregate document totals from finished items.
pub fn compute_totals(
    items: &[Item],
    freight: Decimal,
    insurance: Decimal,
    other_expenses: Decimal,
) -> Totals {
    let mut products = Decimal::ZERO;
    let mut discount = Decimal::ZERO;
    let mut icms_base = Decimal::ZERO;
    let mut icms_amount = Decimal::ZERO;
    let mut pis = Decimal::ZERO;
    let mut cofins = Decimal::ZERO;
    let mut burden = Decimal::ZERO;

    for item in items {
        products += item.total;
        discount += item.discount.unwrap_or(Decimal::ZERO);
        if let IcmsBlock::Normal { base, amount, .. } = &item.tax.icms {
            icms_base += *base;
            icms_amount += *amount;
        }
        pis += item.tax.pis.amount;
        cofins += item.tax.cofins.amount;
        burden += item.tax.burden;
    }

    let grand_total =
        round_money(products + freight + insurance + other_expenses - discount);

    Totals {
        icms_base: round_money(icms_base),
        icms_amount: round_money(icms_amount),
        icms_st_base: Decimal::ZERO,
        icms_st_amount: Decimal::ZERO,
        products_total: round_money(products),
        freight_total: round_money(freight),
        insurance_total: round_money(insurance),
        discount_total: round_money(discount),
        ipi_total: Decimal::ZERO,
        pis_total: round_money(pis),
        cofins_total: round_money(cofins),
        other_expenses: round_money(other_expenses),
        grand_total,
        tax_burden: round_money(burden),
    }
}

/// Required-field checks on a document about to be generated.
/// Returns all issues found, not just the first.
pub fn validate_parts(
    issuer: &super::types::Issuer,
    recipient: &super::types::Recipient,
    items: &[Item],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if super::access_key::digits_only(&issuer.cnpj).len() != 14 {
        issues.push(ValidationIssue::new("issuer.cnpj", "must have 14 digits"));
    }
    if issuer.legal_name.trim().is_empty() {
        issues.push(ValidationIssue::new("issuer.legal_name", "is required"));
    }
    if issuer.state_registration.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "issuer.state_registration",
            "is required",
        ));
    }
    validate_address("issuer.address", &issuer.address, &mut issues);

    match &recipient.id {
        super::types::RecipientId::Cnpj(d) => {
            if super::access_key::digits_only(d).len() != 14 {
                issues.push(ValidationIssue::new("recipient.cnpj", "must have 14 digits"));
            }
        }
        super::types::RecipientId::Cpf(d) => {
            if super::access_key::digits_only(d).len() != 11 {
                issues.push(ValidationIssue::new("recipient.cpf", "must have 11 digits"));
            }
        }
    }
    if recipient.name.trim().is_empty() {
        issues.push(ValidationIssue::new("recipient.name", "is required"));
    }
    validate_address("recipient.address", &recipient.address, &mut issues);

    if items.is_empty() {
        issues.push(ValidationIssue::new("items", "at least one item is required"));
    }
    for (i, item) in items.iter().enumerate() {
        let prefix = |field: &str| format!("items[{i}].{field}");
        if item.code.trim().is_empty() {
            issues.push(ValidationIssue::new(prefix("code"), "is required"));
        }
        if item.description.trim().is_empty() {
            issues.push(ValidationIssue::new(prefix("description"), "is required"));
        }
        if item.ncm.trim().is_empty() {
            issues.push(ValidationIssue::new(prefix("ncm"), "is required"));
        }
        if item.cfop.trim().is_empty() {
            issues.push(ValidationIssue::new(prefix("cfop"), "is required"));
        }
        if item.unit.trim().is_empty() {
            issues.push(ValidationIssue::new(prefix("unit"), "is required"));
        }
        if item.quantity <= Decimal::ZERO {
            issues.push(ValidationIssue::new(prefix("quantity"), "must be positive"));
        }
        if item.unit_price < Decimal::ZERO {
            issues.push(ValidationIssue::new(
                prefix("unit_price"),
                "must not be negative",
            ));
        }
        if item.total != item_total(item.quantity, item.unit_price) {
            issues.push(ValidationIssue::new(
                prefix("total"),
                "does not equal quantity x unit price",
            ));
        }
    }

    issues
}

fn validate_address(prefix: &str, address: &super::types::Address, issues: &mut Vec<ValidationIssue>) {
    if address.street.trim().is_empty() {
        issues.push(ValidationIssue::new(format!("{prefix}.street"), "is required"));
    }
    if address.municipality.trim().is_empty() {
        issues.push(ValidationIssue::new(
            format!("{prefix}.municipality"),
            "is required",
        ));
    }
    if super::access_key::digits_only(&address.cep).len() != 8 {
        issues.push(ValidationIssue::new(
            format!("{prefix}.cep"),
            "must have 8 digits",
        ));
    }
}
