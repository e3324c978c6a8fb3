// src/services/attribution.rs
//
// Atribuição indireta: uma fração fixa das vendas de Showroom, Indicação e
// Rede de Relacionamento é creditada à mídia paga (efeito de marca).
// É uma estimativa declarada; o resultado é sempre exibido separado da
// atribuição direta.

use std::collections::HashMap;

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::report::{Figure, IndirectBucket, IndirectSales},
    services::metrics::{self, round_to},
};

/// Fração padrão por fonte indireta (20%).
pub const DEFAULT_ATTRIBUTION_FRACTION: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

#[derive(Debug, Clone)]
pub struct AttributionModel {
    fractions: HashMap<IndirectBucket, Decimal>,
}

impl Default for AttributionModel {
    fn default() -> Self {
        Self::uniform(DEFAULT_ATTRIBUTION_FRACTION)
    }
}

impl AttributionModel {
    pub fn uniform(fraction: Decimal) -> Self {
        let fraction = fraction.clamp(Decimal::ZERO, Decimal::ONE);
        let fractions = IndirectBucket::ALL.iter().map(|b| (*b, fraction)).collect();
        Self { fractions }
    }

    /// Cada fonte tem sua própria fração, independente das outras.
    pub fn with_fraction(mut self, bucket: IndirectBucket, fraction: Decimal) -> Self {
        self.fractions.insert(bucket, fraction.clamp(Decimal::ZERO, Decimal::ONE));
        self
    }

    pub fn fraction(&self, bucket: IndirectBucket) -> Decimal {
        self.fractions.get(&bucket).copied().unwrap_or(Decimal::ZERO)
    }

    /// Vendas atribuídas = round_half_up(total * fração).
    /// Receita atribuída = receita * fração, arredondada em centavos.
    /// Somas que estouram ficam `None`.
    pub fn attribute(&self, sales: &[IndirectSales]) -> AttributionBreakdown {
        let mut buckets = Vec::with_capacity(IndirectBucket::ALL.len());

        // Fontes repetidas no payload são somadas; ausentes entram zeradas.
        for bucket in IndirectBucket::ALL {
            let rows = || sales.iter().filter(move |s| s.bucket == bucket);
            let total_sales = rows().try_fold(0u64, |acc, s| acc.checked_add(s.total_sales));
            let revenue = rows().try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.revenue));

            let fraction = self.fraction(bucket);
            let attributed_sales = total_sales
                .and_then(|total| Decimal::from(total).checked_mul(fraction))
                .and_then(|value| round_to(value, 0).to_u64());
            let attributed_revenue = revenue
                .and_then(|value| value.checked_mul(fraction))
                .map(|value| round_to(value, 2));

            buckets.push(AttributedBucket {
                bucket,
                fraction_percent: fraction * Decimal::ONE_HUNDRED,
                total_sales,
                attributed_sales,
                attributed_revenue,
            });
        }

        let total_attributed_sales = buckets
            .iter()
            .try_fold(0u64, |acc, b| acc.checked_add(b.attributed_sales?));
        let total_attributed_revenue = buckets
            .iter()
            .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(b.attributed_revenue?));

        AttributionBreakdown {
            buckets,
            total_attributed_sales,
            total_attributed_revenue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributedBucket {
    pub bucket: IndirectBucket,
    #[schema(value_type = f64)]
    pub fraction_percent: Decimal,
    pub total_sales: Option<u64>,
    pub attributed_sales: Option<u64>,
    #[schema(value_type = Option<f64>)]
    pub attributed_revenue: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributionBreakdown {
    pub buckets: Vec<AttributedBucket>,
    pub total_attributed_sales: Option<u64>,
    #[schema(value_type = Option<f64>)]
    pub total_attributed_revenue: Option<Decimal>,
}

/// Uma coluna do comparativo direto x com atribuição.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributionScenario {
    pub sales: Figure,
    pub revenue: Figure,
    pub cost_per_sale: Figure,
    pub roi_percentage: Figure,
}

impl AttributionScenario {
    fn new(investment: Decimal, sales: u64, revenue: Decimal) -> Self {
        Self {
            sales: Figure::count(Some(sales)),
            revenue: Figure::currency(Some(revenue)),
            cost_per_sale: Figure::currency_cents(metrics::cost_per_sale(investment, sales).map(|v| round_to(v, 2))),
            roi_percentage: Figure::kpi(metrics::roi_percentage(revenue, investment).map(|v| round_to(v, 2))),
        }
    }
}

/// Direto e com atribuição lado a lado, para o leitor julgar a sensibilidade à premissa.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectVsAttributed {
    pub direct: AttributionScenario,
    pub with_attribution: AttributionScenario,
    pub cost_per_sale_change: Figure,
    pub roi_change: Figure,
}

impl DirectVsAttributed {
    /// `None` quando os totais atribuídos são desconhecidos ou a soma estoura.
    pub fn compare(
        investment: Decimal,
        direct_sales: u64,
        direct_revenue: Decimal,
        breakdown: &AttributionBreakdown,
    ) -> Option<Self> {
        let total_sales = direct_sales.checked_add(breakdown.total_attributed_sales?)?;
        let total_revenue = direct_revenue.checked_add(breakdown.total_attributed_revenue?)?;

        let direct_cps = metrics::cost_per_sale(investment, direct_sales);
        let attributed_cps = metrics::cost_per_sale(investment, total_sales);
        let direct_roi = metrics::roi_percentage(direct_revenue, investment);
        let attributed_roi = metrics::roi_percentage(total_revenue, investment);

        Some(Self {
            direct: AttributionScenario::new(investment, direct_sales, direct_revenue),
            with_attribution: AttributionScenario::new(investment, total_sales, total_revenue),
            cost_per_sale_change: Figure::delta(relative_change(direct_cps, attributed_cps).map(|v| round_to(v, 1))),
            roi_change: Figure::delta(relative_change(direct_roi, attributed_roi).map(|v| round_to(v, 1))),
        })
    }
}

// Variação percentual de `before` para `after` (0 quando `before` é zero).
fn relative_change(before: Option<Decimal>, after: Option<Decimal>) -> Option<Decimal> {
    let (before, after) = (before?, after?);
    metrics::share_of_total(after.checked_sub(before)?, before)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn sales(bucket: IndirectBucket, total_sales: u64, revenue: &str) -> IndirectSales {
        IndirectSales { bucket, total_sales, revenue: dec(revenue) }
    }

    #[test]
    fn twenty_percent_of_ten_sales_is_two() {
        let model = AttributionModel::default();
        let out = model.attribute(&[sales(IndirectBucket::Showroom, 10, "900000")]);
        let showroom = &out.buckets[0];
        assert_eq!(showroom.bucket, IndirectBucket::Showroom);
        assert_eq!(showroom.attributed_sales, Some(2));
        assert_eq!(showroom.attributed_revenue, Some(dec("180000")));
        assert_eq!(showroom.fraction_percent, dec("20"));
    }

    #[test]
    fn attributed_sales_round_half_up() {
        let model = AttributionModel::default();
        // 7 * 0.2 = 1.4 -> 1 ; 13 * 0.2 = 2.6 -> 3 ; 5 * 0.5 = 2.5 -> 3
        let out = model.attribute(&[
            sales(IndirectBucket::Showroom, 7, "0"),
            sales(IndirectBucket::Indicacao, 13, "0"),
        ]);
        assert_eq!(out.buckets[0].attributed_sales, Some(1));
        assert_eq!(out.buckets[1].attributed_sales, Some(3));

        let half = AttributionModel::uniform(dec("0.5"));
        let out = half.attribute(&[sales(IndirectBucket::Showroom, 5, "0")]);
        assert_eq!(out.buckets[0].attributed_sales, Some(3));
    }

    #[test]
    fn fractions_are_independent_per_bucket() {
        let model = AttributionModel::default()
            .with_fraction(IndirectBucket::Indicacao, dec("0.10"))
            .with_fraction(IndirectBucket::RedeRelacionamento, Decimal::ZERO);
        let out = model.attribute(&[
            sales(IndirectBucket::Showroom, 10, "100000"),
            sales(IndirectBucket::Indicacao, 10, "100000"),
            sales(IndirectBucket::RedeRelacionamento, 10, "100000"),
        ]);
        let attributed: Vec<Option<u64>> = out.buckets.iter().map(|b| b.attributed_sales).collect();
        assert_eq!(attributed, vec![Some(2), Some(1), Some(0)]);
        assert_eq!(out.total_attributed_sales, Some(3));
        assert_eq!(out.total_attributed_revenue, Some(dec("30000")));
    }

    #[test]
    fn missing_buckets_contribute_nothing() {
        let out = AttributionModel::default().attribute(&[]);
        assert_eq!(out.buckets.len(), 3);
        assert_eq!(out.total_attributed_sales, Some(0));
        assert_eq!(out.total_attributed_revenue, Some(Decimal::ZERO));
    }

    #[test]
    fn overflowing_buckets_become_unknown() {
        let out = AttributionModel::default().attribute(&[
            sales(IndirectBucket::Showroom, u64::MAX, "1"),
            sales(IndirectBucket::Showroom, 1, "1"),
            sales(IndirectBucket::Indicacao, 10, "50000"),
        ]);
        assert_eq!(out.buckets[0].total_sales, None);
        assert_eq!(out.buckets[0].attributed_sales, None);
        assert_eq!(out.buckets[0].attributed_revenue, Some(dec("0.40")));
        assert_eq!(out.buckets[1].attributed_sales, Some(2));
        assert_eq!(out.total_attributed_sales, None);
        assert!(DirectVsAttributed::compare(dec("1000"), 5, dec("100000"), &out).is_none());

        let huge = AttributionModel::default().attribute(&[IndirectSales {
            bucket: IndirectBucket::RedeRelacionamento,
            total_sales: u64::MAX,
            revenue: Decimal::MAX,
        }]);
        // u64::MAX * 0,2 ainda cabe em u64
        assert!(huge.buckets[2].attributed_sales.is_some());
        let cmp = DirectVsAttributed::compare(Decimal::ONE, u64::MAX, Decimal::ONE, &huge);
        assert!(cmp.is_none());
    }

    #[test]
    fn direct_and_attributed_are_reported_side_by_side() {
        let breakdown = AttributionModel::default().attribute(&[sales(IndirectBucket::Showroom, 25, "2000000")]);
        let cmp = DirectVsAttributed::compare(dec("20693"), 20, dec("1970100"), &breakdown).unwrap();

        assert_eq!(cmp.direct.sales.value, Some(dec("20")));
        assert_eq!(cmp.direct.cost_per_sale.display, "R$ 1.034,65");
        assert_eq!(cmp.with_attribution.sales.value, Some(dec("25")));
        // 20693 / 25 = 827.72 -> -20% no CPV
        assert_eq!(cmp.with_attribution.cost_per_sale.value, Some(dec("827.72")));
        assert_eq!(cmp.cost_per_sale_change.value, Some(dec("-20.0")));
        assert_eq!(cmp.cost_per_sale_change.display, "-20,0%");
        // Receita +400.000 sobre 1.970.100
        assert_eq!(cmp.roi_change.display, "+20,3%");
    }
}
