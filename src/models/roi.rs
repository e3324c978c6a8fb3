// src/models/roi.rs
//
// Modelos de resposta das páginas do painel. Tudo já calculado e formatado;
// as views só exibem.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::report::{Channel, DealRecord, Figure, LeadOrigin, LossReason, StageKind, Widget},
    services::{
        attribution::{AttributionBreakdown, DirectVsAttributed},
        metrics::LeadQuality,
    },
};

// 1. ROI por canal
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetrics {
    pub channel: Channel,
    pub investment: Figure,
    pub leads_reported_by_agency: Figure,
    pub leads_in_crm: Figure,
    pub sales: Figure,
    pub revenue: Figure,
    pub cost_per_lead: Figure,
    pub cost_per_sale: Figure,
    pub roi_percentage: Figure,
    pub conversion_rate: Figure,
    pub leakage_percentage: Figure,
    pub investment_share: Figure,
    pub crm_exceeds_agency: bool,
}

/// ROI sobre a margem em um cenário nomeado (15%, 20%, 25%).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarginScenario {
    pub margin_percent: Figure,
    pub roi_percentage: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoiOverview {
    pub investment: Figure,
    pub leads_reported_by_agency: Figure,
    pub leads_in_crm: Figure,
    pub sales: Figure,
    pub revenue: Figure,
    pub cost_per_lead_agency: Figure,
    pub cost_per_lead_real: Figure,
    pub cost_per_sale: Figure,
    /// ROI bruto (sobre faturamento).
    pub roi_percentage: Figure,
    pub average_ticket: Figure,
    pub leakage_percentage: Figure,
    pub margin_scenarios: Vec<MarginScenario>,
    pub channels: Vec<ChannelMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributionSection {
    pub breakdown: AttributionBreakdown,
    /// Só existe quando os totais diretos do período estão disponíveis.
    pub comparison: Option<DirectVsAttributed>,
    pub note: String,
}

/// Venda de mídia paga com o ciclo calculado. Só existe nas páginas internas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    #[serde(flatten)]
    pub deal: DealRecord,
    pub days_to_close: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Alta,
    Media,
}

/// Ação sugerida a partir dos números do período.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: String,
    pub expected_result: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiReport {
    pub period: String,
    pub period_label: String,
    pub overview: Widget<RoiOverview>,
    pub attribution: Widget<AttributionSection>,
    pub sales: Widget<Vec<SaleView>>,
    pub alerts: Vec<String>,
    /// Textos agregados; nunca citam vendedor ou cliente pelo nome.
    pub insights: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

// 2. Qualidade dos leads
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetrics {
    pub origin: LeadOrigin,
    pub leads: Figure,
    pub wins: Figure,
    pub losses: Figure,
    pub revenue: Figure,
    /// Ganhos / (ganhos + perdidos).
    pub conversion_rate: Figure,
    pub quality: Option<LeadQuality>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaidMediaQuality {
    pub leads: Figure,
    pub wins: Figure,
    pub losses: Figure,
    pub conversion_rate: Figure,
    pub cost_per_lead: Figure,
    pub cost_per_sale: Figure,
    /// Quantas vezes indicação converte mais que mídia paga.
    pub referral_multiplier: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LossSection {
    pub reasons: Vec<LossReason>,
    pub total_losses: Figure,
    /// Participação dos dois principais motivos (leads frios).
    pub cold_leads_percentage: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalespersonMetrics {
    pub name: String,
    pub leads: Figure,
    pub wins: Figure,
    pub losses: Figure,
    pub revenue: Figure,
    pub average_deal_value: Figure,
    pub conversion_rate: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub period: String,
    pub period_label: String,
    pub sources: Widget<Vec<SourceMetrics>>,
    pub paid_media: Widget<PaidMediaQuality>,
    pub loss_reasons: Widget<LossSection>,
    pub salespeople: Widget<Vec<SalespersonMetrics>>,
}

// 3. Funil
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStageView {
    pub stage_id: u8,
    pub label: String,
    pub kind: StageKind,
    pub count: Figure,
    pub total_value: Figure,
    pub average_ticket: Figure,
    /// Fração da largura da barra, em [0.2, 1].
    #[schema(value_type = f64)]
    pub width: rust_decimal::Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelView {
    pub stages: Vec<FunnelStageView>,
    pub active_leads: Figure,
    pub won: Figure,
    pub lost: Figure,
    pub closed_conversion_rate: Figure,
}

// 4. Visão geral (widgets independentes)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    pub period: String,
    pub period_label: String,
    pub channels: Widget<Vec<ChannelMetrics>>,
    pub funnel: Widget<FunnelView>,
    pub sources: Widget<Vec<SourceMetrics>>,
    pub loss_reasons: Widget<LossSection>,
}

// 5. Comparativo mês a mês
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthComparison {
    pub period: String,
    pub period_label: String,
    pub investment: Figure,
    pub leads: Figure,
    pub sales: Figure,
    pub revenue: Figure,
    pub cost_per_sale: Figure,
    pub roi_percentage: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub periods: Vec<MonthComparison>,
    /// Meses cuja busca falhou (ficam fora da lista, não derrubam o resto).
    pub unavailable: Vec<String>,
}

// 6. Relatório completo (entrada do sanitizador)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReport {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub period: String,
    pub period_label: String,
    pub roi: RoiReport,
    pub quality: QualityReport,
}
