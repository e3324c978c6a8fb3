// src/services/metrics.rs
//
// Calculadora de métricas derivadas. Funções puras sobre Decimal.
// Toda divisão por zero devolve 0: esses valores vão direto para a tela.
// Estouro de Decimal (payload absurdo) devolve `None` e aparece como "---".

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Cenários de margem usados para ler o ROI sobre lucro, não sobre faturamento.
pub const MARGIN_SCENARIOS: [Decimal; 3] = [
    Decimal::from_parts(15, 0, 0, false, 2),
    Decimal::from_parts(20, 0, 0, false, 2),
    Decimal::from_parts(25, 0, 0, false, 2),
];

/// Largura mínima de uma barra do funil (etapa vazia ainda aparece).
pub const FUNNEL_MIN_WIDTH: Decimal = Decimal::from_parts(2, 0, 0, false, 1);

fn safe_div(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return Some(Decimal::ZERO);
    }
    numerator.checked_div(denominator)
}

fn percent(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    safe_div(numerator, denominator)?.checked_mul(HUNDRED)
}

pub fn conversion_rate(wins: u64, total_leads: u64) -> Option<Decimal> {
    percent(Decimal::from(wins), Decimal::from(total_leads))
}

pub fn cost_per_lead(investment: Decimal, leads: u64) -> Option<Decimal> {
    safe_div(investment, Decimal::from(leads))
}

/// Custo por venda: o número que importa. Lead barato que não converte
/// sai mais caro que lead caro que converte.
pub fn cost_per_sale(investment: Decimal, sales: u64) -> Option<Decimal> {
    safe_div(investment, Decimal::from(sales))
}

/// ROI bruto: faturamento / investimento * 100. Calculado sobre receita, não lucro.
pub fn roi_percentage(revenue: Decimal, investment: Decimal) -> Option<Decimal> {
    percent(revenue, investment)
}

/// ROI sobre a margem: `roi_percentage * margem`. Nunca confundir com o ROI bruto.
pub fn margin_adjusted_roi(revenue: Decimal, investment: Decimal, margin: Decimal) -> Option<Decimal> {
    roi_percentage(revenue, investment)?.checked_mul(margin)
}

/// Parcela dos leads reportados pela agência que não aparece no CRM.
/// Sinal de qualidade de dado, não de desempenho.
pub fn leakage_percentage(reported_by_agency: u64, found_in_crm: u64) -> Option<Decimal> {
    let reported = Decimal::from(reported_by_agency);
    let missing = reported.checked_sub(Decimal::from(found_in_crm))?;
    percent(missing, reported)
}

/// Largura proporcional da barra, limitada a `[FUNNEL_MIN_WIDTH, 1]`.
pub fn funnel_stage_width(stage_count: u64, max_active_count: u64) -> Decimal {
    let ratio = safe_div(Decimal::from(stage_count), Decimal::from(max_active_count)).unwrap_or(Decimal::ONE);
    ratio.clamp(FUNNEL_MIN_WIDTH, Decimal::ONE)
}

pub fn share_of_total(part: Decimal, total: Decimal) -> Option<Decimal> {
    percent(part, total)
}

pub fn average_ticket(revenue: Decimal, sales: u64) -> Option<Decimal> {
    safe_div(revenue, Decimal::from(sales))
}

/// Quantas vezes a taxa `rate` supera `baseline`.
pub fn conversion_multiplier(rate: Decimal, baseline: Decimal) -> Option<Decimal> {
    safe_div(rate, baseline)
}

/// Soma que devolve `None` em vez de estourar.
pub trait CheckedSum: Copy {
    fn checked_plus(self, other: Self) -> Option<Self>;
}

impl CheckedSum for u64 {
    fn checked_plus(self, other: Self) -> Option<Self> {
        self.checked_add(other)
    }
}

impl CheckedSum for Decimal {
    fn checked_plus(self, other: Self) -> Option<Self> {
        self.checked_add(other)
    }
}

/// Soma todos os valores; `None` se a soma estourar ou não houver valores.
pub fn checked_total<T: CheckedSum>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut values = values.into_iter();
    let first = values.next()?;
    values.try_fold(first, |acc, v| acc.checked_plus(v))
}

/// Arredondamento meio-para-cima (política única do painel).
pub fn round_to(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadQuality {
    Alta,
    Media,
    Baixa,
}

impl LeadQuality {
    pub fn from_conversion_rate(rate: Decimal) -> Self {
        if rate >= Decimal::from(30) {
            LeadQuality::Alta
        } else if rate >= Decimal::from(10) {
            LeadQuality::Media
        } else {
            LeadQuality::Baixa
        }
    }
}
