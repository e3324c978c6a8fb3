// src/routes.rs

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::public_gate::public_report_gate,
};

pub fn build_router(app_state: AppState) -> Router {
    // Só estas duas rotas ficam atrás do portão
    let public_routes = Router::new()
        .route("/publico/roi", get(handlers::public::get_public_page))
        .route("/public-report.json", get(handlers::public::get_public_report))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            public_report_gate,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::roi::health))
        .route("/roi", get(handlers::roi::get_roi))
        .route("/roi/qualidade", get(handlers::roi::get_quality))
        .route("/funil", get(handlers::roi::get_funnel))
        .route("/painel", get(handlers::roi::get_dashboard))
        .route("/comparativo", get(handlers::roi::get_comparison));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .merge(public_routes)
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::Request,
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        config::Settings,
        models::period::DateRange,
        repo::MockReportsRepository,
        services::attribution::AttributionModel,
    };

    fn state(token: Option<&str>) -> AppState {
        let consolidated = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
        )
        .unwrap();
        let settings = Settings {
            api_base_url: None,
            public_report_token: token.map(str::to_string),
            bind_addr: "127.0.0.1:0".to_string(),
            refresh_interval: Duration::from_secs(120),
            consolidated,
            attribution: AttributionModel::default(),
            brand: Some("Loja Exemplo".to_string()),
        };
        AppState::with_repository(settings, Arc::new(MockReportsRepository::new(consolidated)))
    }

    async fn with_snapshot(token: Option<&str>) -> AppState {
        let state = state(token);
        let body = state.report_service.public_report().await.unwrap();
        state.snapshot.replace(body).await;
        state
    }

    async fn get(state: AppState, uri: &str) -> Response {
        build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_is_up() {
        let response = get(state(None), "/api/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn denied_access_looks_like_unknown_route() {
        let unknown = get(with_snapshot(Some("s3cr3t")).await, "/nao-existe").await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        let unknown_body = body_text(unknown).await;

        for uri in [
            "/publico/roi",
            "/publico/roi?t=errado",
            "/public-report.json",
            "/public-report.json?t=",
            "/public-report.json?t=S3CR3T",
        ] {
            let response = get(with_snapshot(Some("s3cr3t")).await, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(response.headers().get("x-robots-tag").is_none());
            assert_eq!(body_text(response).await, unknown_body, "{uri}");
        }
    }

    #[tokio::test]
    async fn valid_token_serves_sanitized_report() {
        let response = get(with_snapshot(Some("s3cr3t")).await, "/public-report.json?t=s3cr3t").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-robots-tag"], "noindex, nofollow");

        let report: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(report["brand"], "Loja Exemplo");
        assert!(report["roi"].get("sales").is_none());
        assert_eq!(report["quality"]["salespeople"]["data"][0]["name"], "Vendedor 1");
    }

    #[tokio::test]
    async fn public_page_is_served_with_token() {
        let response = get(state(Some("s3cr3t")), "/publico/roi?t=s3cr3t").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-robots-tag"], "noindex, nofollow");
        assert!(body_text(response).await.contains("/public-report.json"));
    }

    #[tokio::test]
    async fn gate_is_open_without_configured_token() {
        let response = get(with_snapshot(None).await, "/public-report.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-robots-tag"], "noindex, nofollow");
    }

    #[tokio::test]
    async fn missing_snapshot_is_service_unavailable() {
        let response = get(state(None), "/public-report.json").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn invalid_period_is_bad_request() {
        let response = get(state(None), "/api/roi?periodo=2025-13").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["details"], json!("2025-13"));
    }

    #[tokio::test]
    async fn roi_page_renders_widgets_for_a_month() {
        let response = get(state(None), "/api/roi?periodo=2025-11").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["periodLabel"], "11/2025");
        assert_eq!(body["overview"]["status"], "ready");
        assert_eq!(body["overview"]["data"]["investment"]["display"], "R$ 15.628");
    }

    #[tokio::test]
    async fn internal_pages_keep_row_level_sales() {
        let response = get(state(None), "/api/roi").await;
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["sales"]["status"], "ready");
        assert!(body["sales"]["data"][0]["customerName"].is_string());
    }

    #[tokio::test]
    async fn funnel_and_comparison_are_served() {
        let funnel = get(state(None), "/api/funil").await;
        assert_eq!(funnel.status(), StatusCode::OK);
        let funnel: Value = serde_json::from_str(&body_text(funnel).await).unwrap();
        assert_eq!(funnel["stages"].as_array().unwrap().len(), 8);

        let comparison = get(state(None), "/api/comparativo").await;
        let comparison: Value = serde_json::from_str(&body_text(comparison).await).unwrap();
        assert_eq!(comparison["periods"].as_array().unwrap().len(), 4);
    }
}
