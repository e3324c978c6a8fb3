// src/repo/http_repo.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{
    common::error::AppError,
    models::{
        period::PeriodWindow,
        report::{
            ChannelAggregate, DealRecord, FunnelStage, IndirectSales, LeadSourceBreakdown,
            LossReason, SalespersonAggregate,
        },
    },
    repo::reports_repo::{ReportsRepository, Resource},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lê os agregados da API de dados: `GET {base}/api/dados/{recurso}?periodo=...`.
#[derive(Clone)]
pub struct HttpReportsRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportsRepository {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, resource: Resource) -> String {
        format!("{}/api/dados/{}", self.base_url, resource.path())
    }

    // O payload é validado aqui, na borda: formato errado falha neste ponto
    // e não espalha campos indefinidos pelas views.
    async fn get_json<T: DeserializeOwned>(&self, resource: Resource, period: PeriodWindow) -> Result<T, AppError> {
        let url = self.url_for(resource);
        tracing::debug!("GET {} periodo={}", url, period);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("periodo", period.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                resource: resource.path().to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Payload inválido em '{}': {}", resource.path(), e);
            AppError::JsonError(e)
        })
    }
}

#[async_trait]
impl ReportsRepository for HttpReportsRepository {
    async fn fetch_channel_aggregates(&self, period: PeriodWindow) -> Result<Vec<ChannelAggregate>, AppError> {
        self.get_json(Resource::Channels, period).await
    }

    async fn fetch_funnel(&self, period: PeriodWindow) -> Result<Vec<FunnelStage>, AppError> {
        self.get_json(Resource::Funnel, period).await
    }

    async fn fetch_lead_sources(&self, period: PeriodWindow) -> Result<Vec<LeadSourceBreakdown>, AppError> {
        self.get_json(Resource::LeadSources, period).await
    }

    async fn fetch_loss_reasons(&self, period: PeriodWindow) -> Result<Vec<LossReason>, AppError> {
        self.get_json(Resource::LossReasons, period).await
    }

    async fn fetch_salespeople(&self, period: PeriodWindow) -> Result<Vec<SalespersonAggregate>, AppError> {
        self.get_json(Resource::Salespeople, period).await
    }

    async fn fetch_indirect_sales(&self, period: PeriodWindow) -> Result<Vec<IndirectSales>, AppError> {
        self.get_json(Resource::IndirectSales, period).await
    }

    async fn fetch_deals(&self, period: PeriodWindow) -> Result<Vec<DealRecord>, AppError> {
        self.get_json(Resource::Deals, period).await
    }
}
