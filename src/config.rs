// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    middleware::public_gate::PublicGate,
    models::{period::DateRange, report::IndirectBucket},
    repo::{HttpReportsRepository, MockReportsRepository, ReportsRepository},
    services::{
        attribution::AttributionModel,
        refresh::SnapshotStore,
        report_service::ReportService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REFRESH_SECS: u64 = 120;
const DEFAULT_CONSOLIDATED_START: &str = "2025-10-01";
const DEFAULT_CONSOLIDATED_END: &str = "2026-01-14";

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: Option<String>,
    pub public_report_token: Option<String>,
    pub bind_addr: String,
    pub refresh_interval: Duration,
    pub consolidated: DateRange,
    pub attribution: AttributionModel,
    pub brand: Option<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let refresh_secs = match non_empty("REFRESH_INTERVAL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("REFRESH_INTERVAL_SECS inválido: {raw}"))?,
            None => DEFAULT_REFRESH_SECS,
        };

        let start = date_var("CONSOLIDATED_START", DEFAULT_CONSOLIDATED_START)?;
        let end = date_var("CONSOLIDATED_END", DEFAULT_CONSOLIDATED_END)?;

        let mut attribution = AttributionModel::default();
        for (var, bucket) in [
            ("ATTRIBUTION_PERCENT_SHOWROOM", IndirectBucket::Showroom),
            ("ATTRIBUTION_PERCENT_INDICACAO", IndirectBucket::Indicacao),
            ("ATTRIBUTION_PERCENT_REDE", IndirectBucket::RedeRelacionamento),
        ] {
            if let Some(raw) = non_empty(var) {
                let percent: Decimal = raw.parse().with_context(|| format!("{var} inválido: {raw}"))?;
                attribution = attribution.with_fraction(bucket, percent / Decimal::ONE_HUNDRED);
            }
        }

        Ok(Self {
            api_base_url: non_empty("API_BASE_URL"),
            public_report_token: non_empty("PUBLIC_REPORT_TOKEN"),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            refresh_interval: Duration::from_secs(refresh_secs.max(1)),
            consolidated: DateRange::new(start, end)?,
            attribution,
            brand: non_empty("PUBLIC_REPORT_BRAND"),
        })
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn date_var(var: &str, default: &str) -> anyhow::Result<NaiveDate> {
    let raw = non_empty(var).unwrap_or_else(|| default.to_string());
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").with_context(|| format!("{var} inválido (use AAAA-MM-DD): {raw}"))
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub report_service: ReportService,
    pub snapshot: SnapshotStore,
    pub public_gate: PublicGate,
}

impl AppState {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        // --- Monta o gráfico de dependências ---
        let repo: Arc<dyn ReportsRepository> = match &settings.api_base_url {
            Some(base_url) => {
                tracing::info!("✅ Lendo dados da API em {}", base_url);
                Arc::new(HttpReportsRepository::new(base_url)?)
            }
            None => {
                tracing::warn!("API_BASE_URL não definida: usando dados de demonstração em memória");
                Arc::new(MockReportsRepository::new(settings.consolidated))
            }
        };

        Ok(Self::with_repository(settings, repo))
    }

    pub fn with_repository(settings: Settings, repo: Arc<dyn ReportsRepository>) -> Self {
        let public_gate = PublicGate::new(settings.public_report_token.as_deref());
        if public_gate.is_open() {
            tracing::warn!("PUBLIC_REPORT_TOKEN não definido: relatório público sem proteção");
        }

        let report_service = ReportService::new(
            repo,
            settings.attribution.clone(),
            settings.consolidated,
            settings.brand.clone(),
        );

        Self {
            settings: Arc::new(settings),
            report_service,
            snapshot: SnapshotStore::new(),
            public_gate,
        }
    }
}
