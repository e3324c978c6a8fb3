// src/middleware/public_gate.rs
//
// Portão das duas rotas públicas. Token errado ou ausente recebe o mesmo
// 404 do fallback do router: quem não tem o link não descobre que a página existe.

use axum::{
    extract::{Query, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Clone)]
pub struct PublicGate {
    token_digest: Option<[u8; 32]>,
}

impl PublicGate {
    /// Token vazio ou só espaços conta como não configurado (portão aberto).
    pub fn new(token: Option<&str>) -> Self {
        let token_digest = token.map(str::trim).filter(|t| !t.is_empty()).map(digest);
        Self { token_digest }
    }

    pub fn is_open(&self) -> bool {
        self.token_digest.is_none()
    }

    pub fn allows(&self, presented: Option<&str>) -> bool {
        let Some(expected) = &self.token_digest else {
            return true;
        };
        match presented {
            Some(presented) => constant_time_eq(expected, &digest(presented)),
            None => false,
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

// Percorre os 32 bytes sempre, sem sair no primeiro diferente.
fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Deserialize)]
struct GateQuery {
    t: Option<String>,
}

pub async fn public_report_gate(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = Query::<GateQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.t);

    if !app_state.public_gate.allows(token.as_deref()) {
        tracing::debug!("Acesso negado em {}", request.uri().path());
        return Err(AppError::NotFound);
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static("x-robots-tag"),
        HeaderValue::from_static("noindex, nofollow"),
    );
    Ok(response)
}
