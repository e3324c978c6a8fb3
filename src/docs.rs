// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Sistema ---
        handlers::roi::health,

        // --- ROI ---
        handlers::roi::get_roi,
        handlers::roi::get_quality,

        // --- Funil / Painel ---
        handlers::roi::get_funnel,
        handlers::roi::get_dashboard,
        handlers::roi::get_comparison,

        // --- Público ---
        handlers::public::get_public_page,
        handlers::public::get_public_report,
    ),
    components(
        schemas(
            // --- Agregados ---
            models::report::Channel,
            models::report::LeadOrigin,
            models::report::IndirectBucket,
            models::report::StageKind,
            models::report::ChannelAggregate,
            models::report::FunnelStage,
            models::report::LeadSourceBreakdown,
            models::report::LossReason,
            models::report::SalespersonAggregate,
            models::report::IndirectSales,
            models::report::DealRecord,
            models::report::Figure,

            // --- Views ---
            models::roi::ChannelMetrics,
            models::roi::MarginScenario,
            models::roi::RoiOverview,
            models::roi::AttributionSection,
            models::roi::SourceMetrics,
            models::roi::PaidMediaQuality,
            models::roi::LossSection,
            models::roi::SalespersonMetrics,
            models::roi::FunnelStageView,
            models::roi::FunnelView,
            models::roi::MonthComparison,
            models::roi::ComparisonReport,
            models::roi::Priority,
            models::roi::Recommendation,

            // --- Métricas / Atribuição ---
            services::metrics::LeadQuality,
            services::attribution::AttributedBucket,
            services::attribution::AttributionBreakdown,
            services::attribution::AttributionScenario,
            services::attribution::DirectVsAttributed,
        )
    ),
    tags(
        (name = "Sistema", description = "Saúde do serviço"),
        (name = "ROI", description = "Retorno da mídia paga e qualidade dos leads"),
        (name = "Funil", description = "Etapas do funil de vendas"),
        (name = "Painel", description = "Visão geral e comparativo mensal"),
        (name = "Público", description = "Relatório compartilhável (protegido por token)")
    )
)]
pub struct ApiDoc;
