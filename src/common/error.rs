use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Período inválido: {0}")]
    InvalidPeriod(String),

    // Resposta genérica: não confirmamos a existência do recurso protegido.
    #[error("Recurso não encontrado")]
    NotFound,

    #[error("Relatório público ainda não foi gerado")]
    SnapshotUnavailable,

    #[error("API de dados respondeu com status {status} em {resource}")]
    UpstreamStatus { resource: String, status: u16 },

    #[error("Erro de comunicação com a API de dados: {0}")]
    UpstreamError(#[from] reqwest::Error),

    #[error("Erro de serialização JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Falhas na busca de dados (rede, status ou payload malformado).
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamStatus { .. } | AppError::UpstreamError(_) | AppError::JsonError(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidPeriod(ref raw) => {
                let body = Json(json!({
                    "error": "Período inválido. Use 'consolidado' ou AAAA-MM.",
                    "details": raw,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            // Mesmo corpo do fallback do router, sem JSON.
            AppError::NotFound => {
                return (StatusCode::NOT_FOUND, "Not Found").into_response();
            }
            AppError::SnapshotUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Relatório ainda não disponível. Tente novamente em instantes.",
            ),
            ref e if e.is_fetch_failure() => {
                tracing::warn!("Falha ao buscar dados: {}", e);
                (StatusCode::BAD_GATEWAY, "Dados indisponíveis no momento.")
            }
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
