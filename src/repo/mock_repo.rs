// src/repo/mock_repo.rs
//
// Conjunto em memória usado quando API_BASE_URL não está definida.
// Os números da agência são mensais; no consolidado, meses parciais entram
// proporcionais aos dias cobertos. Os dados do CRM contam o mês inteiro
// quando a janela toca o mês. Fora dos meses cobertos, listas vazias.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::{
    common::error::AppError,
    models::{
        period::{DateRange, PeriodWindow},
        report::{
            Channel, ChannelAggregate, DealRecord, FunnelStage, IndirectBucket, IndirectSales,
            LeadOrigin, LeadSourceBreakdown, LossReason, SalespersonAggregate, StageId,
        },
    },
    repo::reports_repo::ReportsRepository,
    services::metrics::round_to,
};

// Relatório mensal da agência por canal: (ano, mês, canal, investimento, leads reportados).
// Janeiro ainda sem relatório de leads.
const AGENCY_LEDGER: [(i32, u32, Channel, i64, Option<u64>); 8] = [
    (2025, 10, Channel::Meta, 8500, Some(245)),
    (2025, 10, Channel::Google, 7000, Some(186)),
    (2025, 11, Channel::Meta, 8914, Some(205)),
    (2025, 11, Channel::Google, 6714, Some(154)),
    (2025, 12, Channel::Meta, 8491, Some(141)),
    (2025, 12, Channel::Google, 6979, Some(200)),
    (2026, 1, Channel::Meta, 8500, None),
    (2026, 1, Channel::Google, 7000, None),
];

// Leads, vendas e faturamento por canal no CRM: (ano, mês, canal, leads, vendas, faturamento).
const CRM_LEDGER: [(i32, u32, Channel, u64, u64, i64); 8] = [
    (2025, 10, Channel::Meta, 180, 4, 356_000),
    (2025, 10, Channel::Google, 120, 3, 268_500),
    (2025, 11, Channel::Meta, 165, 3, 251_700),
    (2025, 11, Channel::Google, 110, 4, 342_000),
    (2025, 12, Channel::Meta, 128, 2, 189_900),
    (2025, 12, Channel::Google, 140, 5, 463_000),
    (2026, 1, Channel::Meta, 40, 1, 92_500),
    (2026, 1, Channel::Google, 35, 1, 88_900),
];

// Origens no CRM por mês: (ano, mês, origem, [leads, ganhos, perdidos, faturamento]).
// META e GOOGLE batem com o CRM_LEDGER.
const SOURCE_LEDGER: [(i32, u32, LeadOrigin, [u64; 4]); 32] = [
    (2025, 10, LeadOrigin::Meta, [180, 4, 55, 356_000]),
    (2025, 10, LeadOrigin::Google, [120, 3, 40, 268_500]),
    (2025, 10, LeadOrigin::Site, [18, 2, 8, 170_000]),
    (2025, 10, LeadOrigin::Portais, [25, 1, 15, 82_000]),
    (2025, 10, LeadOrigin::Presencial, [34, 11, 12, 1_030_000]),
    (2025, 10, LeadOrigin::Indicacao, [12, 5, 3, 470_000]),
    (2025, 10, LeadOrigin::Direto, [8, 2, 2, 180_000]),
    (2025, 10, LeadOrigin::Outros, [4, 0, 2, 0]),
    (2025, 11, LeadOrigin::Meta, [165, 3, 45, 251_700]),
    (2025, 11, LeadOrigin::Google, [110, 4, 45, 342_000]),
    (2025, 11, LeadOrigin::Site, [16, 1, 8, 85_000]),
    (2025, 11, LeadOrigin::Portais, [22, 2, 13, 164_300]),
    (2025, 11, LeadOrigin::Presencial, [30, 10, 10, 945_000]),
    (2025, 11, LeadOrigin::Indicacao, [11, 5, 3, 475_000]),
    (2025, 11, LeadOrigin::Direto, [7, 2, 2, 185_000]),
    (2025, 11, LeadOrigin::Outros, [3, 1, 2, 85_000]),
    (2025, 12, LeadOrigin::Meta, [128, 2, 45, 189_900]),
    (2025, 12, LeadOrigin::Google, [140, 5, 50, 463_000]),
    (2025, 12, LeadOrigin::Site, [20, 2, 10, 172_000]),
    (2025, 12, LeadOrigin::Portais, [28, 1, 16, 82_000]),
    (2025, 12, LeadOrigin::Presencial, [38, 12, 13, 1_135_000]),
    (2025, 12, LeadOrigin::Indicacao, [15, 6, 4, 565_000]),
    (2025, 12, LeadOrigin::Direto, [10, 2, 3, 185_000]),
    (2025, 12, LeadOrigin::Outros, [3, 0, 1, 0]),
    (2026, 1, LeadOrigin::Meta, [40, 1, 15, 92_500]),
    (2026, 1, LeadOrigin::Google, [35, 1, 15, 88_900]),
    (2026, 1, LeadOrigin::Site, [10, 1, 4, 85_000]),
    (2026, 1, LeadOrigin::Portais, [13, 1, 8, 82_000]),
    (2026, 1, LeadOrigin::Presencial, [18, 5, 6, 470_000]),
    (2026, 1, LeadOrigin::Indicacao, [7, 3, 2, 285_000]),
    (2026, 1, LeadOrigin::Direto, [5, 1, 2, 90_000]),
    (2026, 1, LeadOrigin::Outros, [2, 0, 1, 0]),
];

const ORIGINS: [LeadOrigin; 8] = [
    LeadOrigin::Meta,
    LeadOrigin::Google,
    LeadOrigin::Site,
    LeadOrigin::Portais,
    LeadOrigin::Presencial,
    LeadOrigin::Indicacao,
    LeadOrigin::Direto,
    LeadOrigin::Outros,
];

// Vendas das fontes indiretas: (ano, mês, fonte, [vendas, faturamento]).
const INDIRECT_LEDGER: [(i32, u32, IndirectBucket, [u64; 2]); 12] = [
    (2025, 10, IndirectBucket::Showroom, [11, 990_000]),
    (2025, 10, IndirectBucket::Indicacao, [5, 470_000]),
    (2025, 10, IndirectBucket::RedeRelacionamento, [3, 270_000]),
    (2025, 11, IndirectBucket::Showroom, [10, 900_000]),
    (2025, 11, IndirectBucket::Indicacao, [5, 475_000]),
    (2025, 11, IndirectBucket::RedeRelacionamento, [3, 265_000]),
    (2025, 12, IndirectBucket::Showroom, [12, 1_080_000]),
    (2025, 12, IndirectBucket::Indicacao, [6, 565_000]),
    (2025, 12, IndirectBucket::RedeRelacionamento, [4, 355_000]),
    (2026, 1, IndirectBucket::Showroom, [5, 450_000]),
    (2026, 1, IndirectBucket::Indicacao, [3, 285_000]),
    (2026, 1, IndirectBucket::RedeRelacionamento, [1, 90_000]),
];

const LOSS_REASONS: [&str; 6] = [
    "NÃO RESPONDE",
    "SEM INTERESSE",
    "PREÇO",
    "COMPROU EM OUTRA LOJA",
    "CRÉDITO REPROVADO",
    "NÃO INFORMADO",
];

// Perdas por motivo, na ordem de LOSS_REASONS: (ano, mês, motivo, [quantidade]).
const LOSS_LEDGER: [(i32, u32, &str, [u64; 1]); 24] = [
    (2025, 10, "NÃO RESPONDE", [55]),
    (2025, 10, "SEM INTERESSE", [30]),
    (2025, 10, "PREÇO", [12]),
    (2025, 10, "COMPROU EM OUTRA LOJA", [9]),
    (2025, 10, "CRÉDITO REPROVADO", [6]),
    (2025, 10, "NÃO INFORMADO", [3]),
    (2025, 11, "NÃO RESPONDE", [50]),
    (2025, 11, "SEM INTERESSE", [25]),
    (2025, 11, "PREÇO", [11]),
    (2025, 11, "COMPROU EM OUTRA LOJA", [8]),
    (2025, 11, "CRÉDITO REPROVADO", [5]),
    (2025, 11, "NÃO INFORMADO", [3]),
    (2025, 12, "NÃO RESPONDE", [52]),
    (2025, 12, "SEM INTERESSE", [28]),
    (2025, 12, "PREÇO", [12]),
    (2025, 12, "COMPROU EM OUTRA LOJA", [8]),
    (2025, 12, "CRÉDITO REPROVADO", [5]),
    (2025, 12, "NÃO INFORMADO", [3]),
    (2026, 1, "NÃO RESPONDE", [25]),
    (2026, 1, "SEM INTERESSE", [13]),
    (2026, 1, "PREÇO", [6]),
    (2026, 1, "COMPROU EM OUTRA LOJA", [3]),
    (2026, 1, "CRÉDITO REPROVADO", [3]),
    (2026, 1, "NÃO INFORMADO", [2]),
];

const SALESPEOPLE: [&str; 5] = ["Carlos Mendes", "Ana Ribeiro", "Rafael Souza", "Juliana Costa", "Bruno Lima"];

// Vendedores: (ano, mês, nome, [leads, ganhos, perdidos, faturamento]). Bruno entrou em janeiro.
const SALESPERSON_LEDGER: [(i32, u32, &str, [u64; 4]); 17] = [
    (2025, 10, "Carlos Mendes", [40, 5, 11, 460_000]),
    (2025, 10, "Ana Ribeiro", [36, 6, 10, 550_000]),
    (2025, 10, "Rafael Souza", [27, 3, 12, 275_000]),
    (2025, 10, "Juliana Costa", [17, 2, 7, 180_000]),
    (2025, 11, "Carlos Mendes", [38, 5, 10, 455_000]),
    (2025, 11, "Ana Ribeiro", [33, 6, 9, 545_000]),
    (2025, 11, "Rafael Souza", [25, 2, 12, 185_000]),
    (2025, 11, "Juliana Costa", [16, 2, 6, 180_000]),
    (2025, 12, "Carlos Mendes", [44, 6, 13, 550_000]),
    (2025, 12, "Ana Ribeiro", [40, 7, 11, 640_000]),
    (2025, 12, "Rafael Souza", [30, 3, 13, 280_000]),
    (2025, 12, "Juliana Costa", [19, 1, 8, 90_000]),
    (2026, 1, "Carlos Mendes", [20, 2, 6, 185_000]),
    (2026, 1, "Ana Ribeiro", [19, 3, 5, 275_000]),
    (2026, 1, "Rafael Souza", [14, 1, 7, 90_000]),
    (2026, 1, "Juliana Costa", [9, 1, 4, 90_000]),
    (2026, 1, "Bruno Lima", [7, 1, 3, 89_000]),
];

const STAGES: [(u8, &str); 8] = [
    (1, "1. NOVO LEAD"),
    (2, "2. EM CONTATO"),
    (3, "3. VISITA AGENDADA"),
    (4, "4. NEGOCIAÇÃO"),
    (5, "5. PROPOSTA"),
    (6, "6. GANHO"),
    (7, "7. PERDIDO"),
    (8, "8. ARQUIVADO"),
];

// Negócios criados no mês por etapa atual: (ano, mês, etapa, [quantidade, valor]).
const FUNNEL_LEDGER: [(i32, u32, u8, [u64; 2]); 32] = [
    (2025, 10, 1, [10, 0]),
    (2025, 10, 2, [8, 0]),
    (2025, 10, 3, [4, 360_000]),
    (2025, 10, 4, [3, 279_000]),
    (2025, 10, 5, [2, 190_000]),
    (2025, 10, 6, [6, 592_500]),
    (2025, 10, 7, [90, 0]),
    (2025, 10, 8, [20, 0]),
    (2025, 11, 1, [18, 0]),
    (2025, 11, 2, [15, 0]),
    (2025, 11, 3, [7, 630_000]),
    (2025, 11, 4, [5, 465_000]),
    (2025, 11, 5, [3, 285_000]),
    (2025, 11, 6, [5, 493_700]),
    (2025, 11, 7, [82, 0]),
    (2025, 11, 8, [18, 0]),
    (2025, 12, 1, [40, 0]),
    (2025, 12, 2, [33, 0]),
    (2025, 12, 3, [14, 1_260_000]),
    (2025, 12, 4, [9, 837_000]),
    (2025, 12, 5, [6, 570_000]),
    (2025, 12, 6, [6, 591_400]),
    (2025, 12, 7, [88, 0]),
    (2025, 12, 8, [16, 0]),
    (2026, 1, 1, [74, 0]),
    (2026, 1, 2, [40, 0]),
    (2026, 1, 3, [16, 1_440_000]),
    (2026, 1, 4, [10, 930_000]),
    (2026, 1, 5, [7, 665_000]),
    (2026, 1, 6, [3, 292_500]),
    (2026, 1, 7, [50, 0]),
    (2026, 1, 8, [10, 0]),
];

/// Soma, por chave e na ordem de `keys`, as linhas dos meses que a janela toca.
/// Chave sem nenhuma linha na janela fica de fora.
fn accumulate<K: Copy + PartialEq, const N: usize>(
    range: DateRange,
    keys: &[K],
    rows: &[(i32, u32, K, [u64; N])],
) -> Vec<(K, [u64; N])> {
    keys.iter()
        .filter_map(|&key| {
            let mut found = false;
            let mut sums = [0u64; N];
            for (year, month, row_key, values) in rows {
                if *row_key != key || range.month_fraction(*year, *month).is_zero() {
                    continue;
                }
                found = true;
                for (sum, value) in sums.iter_mut().zip(values) {
                    *sum += value;
                }
            }
            found.then_some((key, sums))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MockReportsRepository {
    consolidated: DateRange,
}

impl MockReportsRepository {
    pub fn new(consolidated: DateRange) -> Self {
        Self { consolidated }
    }

    fn channel_aggregate(&self, channel: Channel, range: DateRange) -> Option<ChannelAggregate> {
        let mut touched = false;
        let mut investment = Decimal::ZERO;
        let mut leads_reported: Option<u64> = None;

        for (year, month, ch, spend, leads) in AGENCY_LEDGER {
            let fraction = range.month_fraction(year, month);
            if ch != channel || fraction.is_zero() {
                continue;
            }
            touched = true;
            investment += Decimal::from(spend) * fraction;
            if let Some(leads) = leads {
                let prorated = round_to(Decimal::from(leads) * fraction, 0).to_u64().unwrap_or(0);
                leads_reported = Some(leads_reported.unwrap_or(0) + prorated);
            }
        }

        let (mut leads_in_crm, mut sales, mut revenue) = (0u64, 0u64, Decimal::ZERO);
        for (year, month, ch, leads, won, value) in CRM_LEDGER {
            if ch != channel || range.month_fraction(year, month).is_zero() {
                continue;
            }
            touched = true;
            leads_in_crm += leads;
            sales += won;
            revenue += Decimal::from(value);
        }

        touched.then(|| ChannelAggregate {
            channel,
            investment: Some(round_to(investment, 2)),
            leads_reported_by_agency: leads_reported,
            leads_in_crm: Some(leads_in_crm),
            sales: Some(sales),
            revenue: Some(revenue),
        })
    }
}

fn stage(id: u8, label: &str, [count, total_value]: [u64; 2]) -> Result<FunnelStage, AppError> {
    let stage_id = StageId::try_from(id).map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?;
    Ok(FunnelStage {
        stage_id,
        label: label.to_string(),
        count: Some(count),
        total_value: Some(Decimal::from(total_value)),
    })
}

fn source(origin: LeadOrigin, [leads, wins, losses, revenue]: [u64; 4]) -> LeadSourceBreakdown {
    LeadSourceBreakdown {
        origin,
        leads: Some(leads),
        wins: Some(wins),
        losses: Some(losses),
        revenue: Some(Decimal::from(revenue)),
    }
}

fn salesperson(name: &str, [leads, wins, losses, revenue]: [u64; 4]) -> SalespersonAggregate {
    SalespersonAggregate {
        name: name.to_string(),
        leads: Some(leads),
        wins: Some(wins),
        losses: Some(losses),
        revenue: Some(Decimal::from(revenue)),
    }
}

#[allow(clippy::too_many_arguments)]
fn deal(
    id: &str,
    channel: Channel,
    vehicle: &str,
    customer: &str,
    phone: &str,
    salesperson: &str,
    value: i64,
    opened: (i32, u32, u32),
    closed: (i32, u32, u32),
) -> DealRecord {
    DealRecord {
        id: id.to_string(),
        channel,
        vehicle: Some(vehicle.to_string()),
        customer_name: Some(customer.to_string()),
        phone: Some(phone.to_string()),
        salesperson: Some(salesperson.to_string()),
        value: Some(Decimal::from(value)),
        opened_at: NaiveDate::from_ymd_opt(opened.0, opened.1, opened.2),
        closed_at: NaiveDate::from_ymd_opt(closed.0, closed.1, closed.2),
    }
}

fn all_deals() -> Vec<DealRecord> {
    vec![
        deal(
            "V-1021", Channel::Meta, "Jeep Compass 2023", "Marcos Antunes", "(11) 98877-1020",
            "Ana Ribeiro", 142_900, (2025, 10, 3), (2025, 10, 17),
        ),
        deal(
            "V-1034", Channel::Google, "Toyota Corolla 2022", "Patrícia Nogueira", "(11) 97766-3344",
            "Carlos Mendes", 118_500, (2025, 10, 9), (2025, 10, 28),
        ),
        deal(
            "V-1102", Channel::Meta, "VW T-Cross 2024", "Diego Farias", "(11) 96655-7781",
            "Rafael Souza", 124_800, (2025, 11, 12), (2025, 11, 30),
        ),
        deal(
            "V-1187", Channel::Google, "Honda HR-V 2023", "Luciana Prado", "(11) 95544-2290",
            "Ana Ribeiro", 139_000, (2025, 12, 2), (2025, 12, 19),
        ),
    ]
}

#[async_trait]
impl ReportsRepository for MockReportsRepository {
    async fn fetch_channel_aggregates(&self, period: PeriodWindow) -> Result<Vec<ChannelAggregate>, AppError> {
        let range = period.date_range(self.consolidated);
        Ok([Channel::Meta, Channel::Google]
            .into_iter()
            .filter_map(|channel| self.channel_aggregate(channel, range))
            .collect())
    }

    async fn fetch_funnel(&self, period: PeriodWindow) -> Result<Vec<FunnelStage>, AppError> {
        let range = period.date_range(self.consolidated);
        let ids: Vec<u8> = STAGES.iter().map(|(id, _)| *id).collect();
        accumulate(range, &ids, &FUNNEL_LEDGER)
            .into_iter()
            .map(|(id, values)| {
                let label = STAGES.iter().find(|(stage_id, _)| *stage_id == id).map_or("", |(_, label)| *label);
                stage(id, label, values)
            })
            .collect()
    }

    async fn fetch_lead_sources(&self, period: PeriodWindow) -> Result<Vec<LeadSourceBreakdown>, AppError> {
        let range = period.date_range(self.consolidated);
        Ok(accumulate(range, &ORIGINS, &SOURCE_LEDGER)
            .into_iter()
            .map(|(origin, values)| source(origin, values))
            .collect())
    }

    async fn fetch_loss_reasons(&self, period: PeriodWindow) -> Result<Vec<LossReason>, AppError> {
        let range = period.date_range(self.consolidated);
        Ok(accumulate(range, &LOSS_REASONS, &LOSS_LEDGER)
            .into_iter()
            .map(|(reason, [count])| LossReason {
                reason: reason.to_string(),
                count,
                percentage_of_losses: None,
            })
            .collect())
    }

    async fn fetch_salespeople(&self, period: PeriodWindow) -> Result<Vec<SalespersonAggregate>, AppError> {
        let range = period.date_range(self.consolidated);
        Ok(accumulate(range, &SALESPEOPLE, &SALESPERSON_LEDGER)
            .into_iter()
            .map(|(name, values)| salesperson(name, values))
            .collect())
    }

    async fn fetch_indirect_sales(&self, period: PeriodWindow) -> Result<Vec<IndirectSales>, AppError> {
        let range = period.date_range(self.consolidated);
        Ok(accumulate(range, &IndirectBucket::ALL, &INDIRECT_LEDGER)
            .into_iter()
            .map(|(bucket, [total_sales, revenue])| IndirectSales {
                bucket,
                total_sales,
                revenue: Decimal::from(revenue),
            })
            .collect())
    }

    /// Vendas fechadas dentro da janela.
    async fn fetch_deals(&self, period: PeriodWindow) -> Result<Vec<DealRecord>, AppError> {
        let range = period.date_range(self.consolidated);
        Ok(all_deals()
            .into_iter()
            .filter(|d| d.closed_at.is_some_and(|closed| range.contains(closed)))
            .collect())
    }
}
