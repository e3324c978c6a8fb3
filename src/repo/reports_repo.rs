// src/repo/reports_repo.rs

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::{
        period::PeriodWindow,
        report::{
            ChannelAggregate, DealRecord, FunnelStage, IndirectSales, LeadSourceBreakdown,
            LossReason, SalespersonAggregate,
        },
    },
};

/// Recursos da API de dados, um por agregado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Channels,
    Funnel,
    LeadSources,
    LossReasons,
    Salespeople,
    IndirectSales,
    Deals,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Channels => "canais",
            Resource::Funnel => "funil",
            Resource::LeadSources => "origens",
            Resource::LossReasons => "motivos-perda",
            Resource::Salespeople => "vendedores",
            Resource::IndirectSales => "vendas-indiretas",
            Resource::Deals => "vendas",
        }
    }
}

/// Fonte dos agregados por período. Produção usa a API HTTP; dev e testes
/// usam o conjunto em memória.
#[async_trait]
pub trait ReportsRepository: Send + Sync {
    async fn fetch_channel_aggregates(&self, period: PeriodWindow) -> Result<Vec<ChannelAggregate>, AppError>;

    async fn fetch_funnel(&self, period: PeriodWindow) -> Result<Vec<FunnelStage>, AppError>;

    async fn fetch_lead_sources(&self, period: PeriodWindow) -> Result<Vec<LeadSourceBreakdown>, AppError>;

    async fn fetch_loss_reasons(&self, period: PeriodWindow) -> Result<Vec<LossReason>, AppError>;

    async fn fetch_salespeople(&self, period: PeriodWindow) -> Result<Vec<SalespersonAggregate>, AppError>;

    async fn fetch_indirect_sales(&self, period: PeriodWindow) -> Result<Vec<IndirectSales>, AppError>;

    async fn fetch_deals(&self, period: PeriodWindow) -> Result<Vec<DealRecord>, AppError>;
}
