// src/handlers/roi.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        period::PeriodWindow,
        roi::{ComparisonReport, FunnelView},
    },
};

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub periodo: Option<String>,
}

impl PeriodQuery {
    /// Sem `periodo` vale o consolidado.
    pub fn window(&self) -> Result<PeriodWindow, AppError> {
        match self.periodo.as_deref().map(str::trim) {
            None | Some("") => Ok(PeriodWindow::Consolidated),
            Some(raw) => raw.parse(),
        }
    }
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Sistema",
    responses((status = 200, description = "Serviço no ar", body = String))
)]
pub async fn health() -> &'static str {
    "OK"
}

// GET /api/roi
#[utoipa::path(
    get,
    path = "/api/roi",
    tag = "ROI",
    params(
        ("periodo" = Option<String>, Query, description = "'consolidado' (padrão) ou AAAA-MM")
    ),
    responses(
        (status = 200, description = "Visão de ROI: canais, cenários de margem, vazamento, atribuição, alertas"),
        (status = 400, description = "Período inválido")
    )
)]
pub async fn get_roi(
    State(app_state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, AppError> {
    let period = query.window()?;
    let report = app_state.report_service.roi_report(period).await;
    Ok((StatusCode::OK, Json(report)))
}

// GET /api/roi/qualidade
#[utoipa::path(
    get,
    path = "/api/roi/qualidade",
    tag = "ROI",
    params(
        ("periodo" = Option<String>, Query, description = "'consolidado' (padrão) ou AAAA-MM")
    ),
    responses(
        (status = 200, description = "Qualidade dos leads: origens, mídia paga x indicação, perdas, vendedores"),
        (status = 400, description = "Período inválido")
    )
)]
pub async fn get_quality(
    State(app_state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, AppError> {
    let period = query.window()?;
    let report = app_state.report_service.quality_report(period).await;
    Ok((StatusCode::OK, Json(report)))
}

// GET /api/funil
#[utoipa::path(
    get,
    path = "/api/funil",
    tag = "Funil",
    params(
        ("periodo" = Option<String>, Query, description = "'consolidado' (padrão) ou AAAA-MM")
    ),
    responses(
        (status = 200, description = "Etapas do funil com largura proporcional", body = FunnelView),
        (status = 400, description = "Período inválido"),
        (status = 502, description = "API de dados indisponível")
    )
)]
pub async fn get_funnel(
    State(app_state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, AppError> {
    let period = query.window()?;
    let funnel = app_state.report_service.funnel_view(period).await?;
    Ok((StatusCode::OK, Json(funnel)))
}

// GET /api/painel
#[utoipa::path(
    get,
    path = "/api/painel",
    tag = "Painel",
    params(
        ("periodo" = Option<String>, Query, description = "'consolidado' (padrão) ou AAAA-MM")
    ),
    responses(
        (status = 200, description = "Visão geral; cada widget vem 'ready' ou 'unavailable'"),
        (status = 400, description = "Período inválido")
    )
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, AppError> {
    let period = query.window()?;
    let page = app_state.report_service.dashboard_page(period).await;
    Ok((StatusCode::OK, Json(page)))
}

// GET /api/comparativo
#[utoipa::path(
    get,
    path = "/api/comparativo",
    tag = "Painel",
    responses(
        (status = 200, description = "Comparativo mês a mês do período consolidado", body = ComparisonReport)
    )
)]
pub async fn get_comparison(State(app_state): State<AppState>) -> impl IntoResponse {
    let report = app_state.report_service.comparison().await;
    (StatusCode::OK, Json(report))
}
