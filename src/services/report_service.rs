// src/services/report_service.rs
//
// Monta as páginas do painel a partir dos agregados do repositório.
// Cada widget é buscado em paralelo e resolvido sozinho: uma busca que
// falha vira `Widget::Unavailable` e o resto da página continua de pé.
// Somas e razões que estouram viram `None` e aparecem como "---".

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::{
    common::{
        error::AppError,
        format::{self, FormatKind, PercentStyle},
    },
    models::{
        period::{DateRange, PeriodWindow},
        report::{
            Channel, ChannelAggregate, DealRecord, Figure, FunnelStage, LeadOrigin, LeadSourceBreakdown,
            LossReason, SalespersonAggregate, StageId, StageKind, Widget,
        },
        roi::{
            AttributionSection, ChannelMetrics, ComparisonReport, DashboardPage, FullReport,
            FunnelStageView, FunnelView, LossSection, MarginScenario, MonthComparison,
            PaidMediaQuality, Priority, QualityReport, Recommendation, RoiOverview, RoiReport,
            SaleView, SalespersonMetrics, SourceMetrics,
        },
    },
    repo::ReportsRepository,
    services::{
        attribution::{AttributionModel, DirectVsAttributed},
        metrics::{self, round_to, CheckedSum, LeadQuality, MARGIN_SCENARIOS},
        sanitizer,
    },
};

pub const ATTRIBUTION_NOTE: &str = "Estimativa de efeito de marca: uma fração das vendas de Showroom, \
    Indicação e Rede de Relacionamento creditada à mídia paga. Exibida separada da atribuição direta.";

// Diferença agência x CRM a partir da qual o painel alerta.
const LEAKAGE_ALERT_LEADS: u64 = 50;
const LOW_RETURN_INVESTMENT: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);
const MIN_SALESPERSON_LEADS: u64 = 10;
const LOW_CONVERSION_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
const REFERRAL_PROGRAM_RATE: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
const REFERRAL_STAR_RATE: Decimal = Decimal::from_parts(40, 0, 0, false, 0);
const UNRESPONSIVE_LEADS: u64 = 20;

#[derive(Clone)]
pub struct ReportService {
    repo: Arc<dyn ReportsRepository>,
    attribution: AttributionModel,
    consolidated: DateRange,
    brand: Option<String>,
}

impl ReportService {
    pub fn new(
        repo: Arc<dyn ReportsRepository>,
        attribution: AttributionModel,
        consolidated: DateRange,
        brand: Option<String>,
    ) -> Self {
        Self { repo, attribution, consolidated, brand }
    }

    pub async fn roi_report(&self, period: PeriodWindow) -> RoiReport {
        let (channels, indirect, deals, sources, losses, sellers) = tokio::join!(
            self.repo.fetch_channel_aggregates(period),
            self.repo.fetch_indirect_sales(period),
            self.repo.fetch_deals(period),
            self.repo.fetch_lead_sources(period),
            self.repo.fetch_loss_reasons(period),
            self.repo.fetch_salespeople(period),
        );

        let channels = settle("canais", period, channels);
        let mut sales = settle("vendas", period, deals);
        if let Widget::Ready { data } = &mut sales {
            data.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        }

        let sources = signal("origens", period, sources);
        let losses = signal("motivos-perda", period, losses);
        let sellers = signal("vendedores", period, sellers);
        let signals = PeriodSignals {
            channels: channels.data().map(Vec::as_slice),
            sources: sources.as_deref(),
            losses: losses.as_deref(),
            sellers: sellers.as_deref(),
            deals: sales.data().map(Vec::as_slice),
        };
        let alerts = build_alerts(&signals);
        let insights = build_insights(&signals);
        let recommendations = build_recommendations(&signals);

        let direct = channels.data().and_then(|c| direct_totals(c));
        let attribution = settle("vendas-indiretas", period, indirect).map(|indirect| {
            let breakdown = self.attribution.attribute(&indirect);
            let comparison = direct.and_then(|(investment, sales, revenue)| {
                DirectVsAttributed::compare(investment, sales, revenue, &breakdown)
            });
            AttributionSection {
                breakdown,
                comparison,
                note: ATTRIBUTION_NOTE.to_string(),
            }
        });

        RoiReport {
            period: period.to_string(),
            period_label: period.label(self.consolidated),
            overview: channels.map(|c| build_overview(&c)),
            attribution,
            sales: sales.map(|deals| deals.into_iter().map(sale_view).collect()),
            alerts,
            insights,
            recommendations,
        }
    }

    pub async fn quality_report(&self, period: PeriodWindow) -> QualityReport {
        let (sources, losses, sellers, channels) = tokio::join!(
            self.repo.fetch_lead_sources(period),
            self.repo.fetch_loss_reasons(period),
            self.repo.fetch_salespeople(period),
            self.repo.fetch_channel_aggregates(period),
        );

        // Sem canais o widget de mídia paga sai sem custos ("---"), mas sai.
        let investment = signal("investimento", period, channels)
            .and_then(|channels| total(channels.iter().map(|c| c.investment)));

        let sources = settle("origens", period, sources);

        QualityReport {
            period: period.to_string(),
            period_label: period.label(self.consolidated),
            paid_media: sources.as_ref().map(|s| build_paid_media(s, investment)),
            sources: sources.map(|s| build_sources(&s)),
            loss_reasons: settle("motivos-perda", period, losses).map(|l| build_losses(&l)),
            salespeople: settle("vendedores", period, sellers).map(|s| build_salespeople(&s)),
        }
    }

    /// Página única do funil: sem dados não há o que mostrar, então o erro sobe.
    pub async fn funnel_view(&self, period: PeriodWindow) -> Result<FunnelView, AppError> {
        let stages = self.repo.fetch_funnel(period).await?;
        Ok(build_funnel(&stages))
    }

    pub async fn dashboard_page(&self, period: PeriodWindow) -> DashboardPage {
        let (channels, funnel, sources, losses) = tokio::join!(
            self.repo.fetch_channel_aggregates(period),
            self.repo.fetch_funnel(period),
            self.repo.fetch_lead_sources(period),
            self.repo.fetch_loss_reasons(period),
        );

        DashboardPage {
            period: period.to_string(),
            period_label: period.label(self.consolidated),
            channels: settle("canais", period, channels).map(|c| build_channel_metrics(&c)),
            funnel: settle("funil", period, funnel).map(|f| build_funnel(&f)),
            sources: settle("origens", period, sources).map(|s| build_sources(&s)),
            loss_reasons: settle("motivos-perda", period, losses).map(|l| build_losses(&l)),
        }
    }

    /// Comparativo dos meses cobertos pelo consolidado. Meses que falham
    /// saem da lista e são listados em `unavailable`.
    pub async fn comparison(&self) -> ComparisonReport {
        let mut tasks = JoinSet::new();
        for (year, month) in self.consolidated.months() {
            let Ok(period) = PeriodWindow::month(year, month) else {
                continue;
            };
            let repo = Arc::clone(&self.repo);
            tasks.spawn(async move { (period, repo.fetch_channel_aggregates(period).await) });
        }

        let mut periods = Vec::new();
        let mut unavailable = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((period, Ok(channels))) => periods.push(build_month(period, &channels, self.consolidated)),
                Ok((period, Err(e))) => {
                    tracing::warn!("Comparativo sem o mês {}: {}", period, e);
                    unavailable.push(period.to_string());
                }
                Err(e) => tracing::error!("Tarefa do comparativo abortada: {}", e),
            }
        }

        periods.sort_by(|a, b| a.period.cmp(&b.period));
        unavailable.sort();
        ComparisonReport { periods, unavailable }
    }

    pub async fn full_report(&self, period: PeriodWindow) -> FullReport {
        let (roi, quality) = tokio::join!(self.roi_report(period), self.quality_report(period));
        FullReport {
            generated_at: Utc::now(),
            brand: self.brand.clone(),
            period: period.to_string(),
            period_label: period.label(self.consolidated),
            roi,
            quality,
        }
    }

    /// Relatório completo do consolidado passado pela lista de permissão.
    pub async fn public_report(&self) -> Result<Value, AppError> {
        let full = self.full_report(PeriodWindow::Consolidated).await;
        Ok(sanitizer::sanitize(&to_json(&full)?))
    }
}

// Falha ao serializar um modelo nosso é bug interno, não falha da API de dados.
fn to_json<T: Serialize>(report: &T) -> Result<Value, AppError> {
    serde_json::to_value(report)
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("falha ao serializar o relatório: {e}")))
}

fn settle<T>(widget: &str, period: PeriodWindow, result: Result<T, AppError>) -> Widget<T> {
    match result {
        Ok(data) => Widget::Ready { data },
        Err(e) => {
            tracing::warn!("Widget '{}' indisponível ({}): {}", widget, period, e);
            Widget::unavailable()
        }
    }
}

// Dado auxiliar: a falha só silencia as regras que dependem dele.
fn signal<T>(name: &str, period: PeriodWindow, result: Result<T, AppError>) -> Option<T> {
    result
        .map_err(|e| tracing::warn!("Dados de '{}' indisponíveis ({}): {}", name, period, e))
        .ok()
}

// Soma só o que é conhecido; `None` se nada for ou se a soma estourar.
fn total<T: CheckedSum>(values: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    metrics::checked_total(values.into_iter().flatten())
}

fn ratio<A, B>(
    a: Option<A>,
    b: Option<B>,
    f: impl FnOnce(A, B) -> Option<Decimal>,
    dp: u32,
) -> Option<Decimal> {
    a.zip(b).and_then(|(a, b)| f(a, b)).map(|v| round_to(v, dp))
}

// Conversão sobre negócios fechados: ganhos / (ganhos + perdidos).
fn closed_conversion(wins: Option<u64>, losses: Option<u64>) -> Option<Decimal> {
    let (wins, losses) = (wins?, losses?);
    metrics::conversion_rate(wins, wins.checked_add(losses)?)
}

fn direct_totals(channels: &[ChannelAggregate]) -> Option<(Decimal, u64, Decimal)> {
    let investment = total(channels.iter().map(|c| c.investment))?;
    let sales = total(channels.iter().map(|c| c.sales))?;
    let revenue = total(channels.iter().map(|c| c.revenue))?;
    Some((investment, sales, revenue))
}

fn sale_view(deal: DealRecord) -> SaleView {
    SaleView { days_to_close: deal.days_to_close(), deal }
}

pub fn build_channel_metrics(channels: &[ChannelAggregate]) -> Vec<ChannelMetrics> {
    let total_investment = total(channels.iter().map(|c| c.investment));

    channels
        .iter()
        .map(|c| ChannelMetrics {
            channel: c.channel,
            investment: Figure::currency(c.investment),
            leads_reported_by_agency: Figure::count(c.leads_reported_by_agency),
            leads_in_crm: Figure::count(c.leads_in_crm),
            sales: Figure::count(c.sales),
            revenue: Figure::currency(c.revenue),
            cost_per_lead: Figure::currency_cents(ratio(c.investment, c.leads_in_crm, metrics::cost_per_lead, 2)),
            cost_per_sale: Figure::currency_cents(ratio(c.investment, c.sales, metrics::cost_per_sale, 2)),
            roi_percentage: Figure::kpi(ratio(c.revenue, c.investment, metrics::roi_percentage, 2)),
            conversion_rate: Figure::rate(ratio(c.sales, c.leads_in_crm, metrics::conversion_rate, 1)),
            leakage_percentage: Figure::rate(ratio(
                c.leads_reported_by_agency,
                c.leads_in_crm,
                metrics::leakage_percentage,
                1,
            )),
            investment_share: Figure::rate(ratio(c.investment, total_investment, metrics::share_of_total, 1)),
            crm_exceeds_agency: c.crm_exceeds_agency(),
        })
        .collect()
}

pub fn build_overview(channels: &[ChannelAggregate]) -> RoiOverview {
    let investment = total(channels.iter().map(|c| c.investment));
    let agency = total(channels.iter().map(|c| c.leads_reported_by_agency));
    let crm = total(channels.iter().map(|c| c.leads_in_crm));
    let sales = total(channels.iter().map(|c| c.sales));
    let revenue = total(channels.iter().map(|c| c.revenue));

    let margin_scenarios = MARGIN_SCENARIOS
        .iter()
        .map(|&margin| MarginScenario {
            margin_percent: Figure::kpi(Some(margin * Decimal::ONE_HUNDRED)),
            roi_percentage: Figure::kpi(ratio(
                revenue,
                investment,
                |r, i| metrics::margin_adjusted_roi(r, i, margin),
                2,
            )),
        })
        .collect();

    RoiOverview {
        investment: Figure::currency(investment),
        leads_reported_by_agency: Figure::count(agency),
        leads_in_crm: Figure::count(crm),
        sales: Figure::count(sales),
        revenue: Figure::currency(revenue),
        cost_per_lead_agency: Figure::currency_cents(ratio(investment, agency, metrics::cost_per_lead, 2)),
        cost_per_lead_real: Figure::currency_cents(ratio(investment, crm, metrics::cost_per_lead, 2)),
        cost_per_sale: Figure::currency_cents(ratio(investment, sales, metrics::cost_per_sale, 2)),
        roi_percentage: Figure::kpi(ratio(revenue, investment, metrics::roi_percentage, 2)),
        average_ticket: Figure::currency(ratio(revenue, sales, metrics::average_ticket, 2)),
        leakage_percentage: Figure::rate(ratio(agency, crm, metrics::leakage_percentage, 1)),
        margin_scenarios,
        channels: build_channel_metrics(channels),
    }
}

/// Dados do período que alimentam alertas, insights e recomendações.
/// Parte ausente desliga só as regras que dependem dela.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeriodSignals<'a> {
    pub channels: Option<&'a [ChannelAggregate]>,
    pub sources: Option<&'a [LeadSourceBreakdown]>,
    pub losses: Option<&'a [LossReason]>,
    pub sellers: Option<&'a [SalespersonAggregate]>,
    pub deals: Option<&'a [DealRecord]>,
}

impl PeriodSignals<'_> {
    fn referral(&self) -> Option<&LeadSourceBreakdown> {
        self.sources?.iter().find(|s| s.origin == LeadOrigin::Indicacao)
    }

    fn referral_rate(&self) -> Option<Decimal> {
        self.referral().and_then(|s| closed_conversion(s.wins, s.losses))
    }

    // Ganhos / fechados somando todas as origens; `None` sem nenhum fechamento.
    fn overall_conversion(&self) -> Option<Decimal> {
        let sources = self.sources?;
        let wins = total(sources.iter().map(|s| s.wins))?;
        let losses = total(sources.iter().map(|s| s.losses))?;
        let closed = wins.checked_add(losses).filter(|closed| *closed > 0)?;
        metrics::conversion_rate(wins, closed)
    }

    // Perdas cujo motivo é "não responde" (ou variação).
    fn unresponsive_leads(&self) -> Option<u64> {
        self.losses?
            .iter()
            .filter(|r| r.reason.to_lowercase().contains("responde"))
            .try_fold(0u64, |acc, r| acc.checked_add(r.count))
    }

    /// Maior conversão entre os vendedores exibidos que venderam: (vendas, taxa).
    fn best_salesperson(&self) -> Option<(u64, Decimal)> {
        self.sellers?
            .iter()
            .filter(|s| s.leads.is_some_and(|leads| leads >= MIN_SALESPERSON_LEADS))
            .filter_map(|s| {
                let wins = s.wins.filter(|wins| *wins > 0)?;
                Some((wins, closed_conversion(s.wins, s.losses)?))
            })
            .max_by(|a, b| a.1.cmp(&b.1))
    }

    fn average_days_to_close(&self) -> Option<Decimal> {
        let days: Vec<i64> = self.deals?.iter().filter_map(DealRecord::days_to_close).collect();
        if days.is_empty() {
            return None;
        }
        let sum = days.iter().try_fold(0i64, |acc, d| acc.checked_add(*d))?;
        Decimal::from(sum).checked_div(Decimal::from(days.len()))
    }
}

// META com muito gasto e quase nenhuma venda, ou GOOGLE sem venda nenhuma.
fn low_return(channel: &ChannelAggregate) -> Option<(Decimal, u64)> {
    let (sales, investment) = (channel.sales?, channel.investment?);
    if investment <= LOW_RETURN_INVESTMENT {
        return None;
    }
    match channel.channel {
        Channel::Meta if sales <= 2 => Some((investment, sales)),
        Channel::Google if sales == 0 => Some((investment, sales)),
        _ => None,
    }
}

fn rate_text(rate: Decimal) -> String {
    format::format_percentage(Some(round_to(rate, 1)), PercentStyle::Rate)
}

pub fn build_alerts(signals: &PeriodSignals) -> Vec<String> {
    let mut alerts = Vec::new();

    if let Some(channels) = signals.channels {
        let agency = total(channels.iter().map(|c| c.leads_reported_by_agency));
        let crm = total(channels.iter().map(|c| c.leads_in_crm));
        if let Some((agency, crm)) = agency.zip(crm) {
            if crm.checked_add(LEAKAGE_ALERT_LEADS).is_some_and(|limit| agency > limit) {
                alerts.push(format!(
                    "⚠️ Agência reporta ~{} leads a mais que o CRM no período",
                    format::format_count(agency - crm)
                ));
            }
        }

        for channel in channels {
            if channel.crm_exceeds_agency() {
                alerts.push(format!(
                    "⚠️ {}: CRM registra mais leads do que a agência reportou. Conferir rastreamento.",
                    channel.channel.label()
                ));
            }

            let Some((investment, sales)) = low_return(channel) else {
                continue;
            };
            let spent = format::format_currency(Some(investment), 0);
            match channel.channel {
                Channel::Meta => alerts.push(format!(
                    "🔴 META com baixo retorno: {} investidos geraram apenas {} venda(s)",
                    spent, sales
                )),
                Channel::Google => alerts.push(format!(
                    "🔴 GOOGLE sem vendas: {} investidos sem vendas atribuídas. Auditar UTMs.",
                    spent
                )),
            }
        }
    }

    if let Some(rate) = signals.overall_conversion().filter(|rate| *rate < LOW_CONVERSION_RATE) {
        alerts.push(format!("📉 Taxa de conversão geral baixa: {}", rate_text(rate)));
    }

    alerts
}

pub fn build_insights(signals: &PeriodSignals) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(channels) = signals.channels {
        let sales = total(channels.iter().map(|c| c.sales)).filter(|sales| *sales > 0);
        let revenue = total(channels.iter().map(|c| c.revenue));
        if let Some(ticket) = revenue.zip(sales).and_then(|(r, s)| metrics::average_ticket(r, s)) {
            insights.push(format!(
                "💰 Ticket médio de {} por venda de mídia paga",
                format::format_value(Some(ticket), FormatKind::Currency { decimals: 0 })
            ));
        }

        let ranked: Vec<(Channel, Decimal)> = channels
            .iter()
            .filter_map(|c| {
                let investment = c.investment.filter(|i| !i.is_zero())?;
                Some((c.channel, metrics::roi_percentage(c.revenue?, investment)?))
            })
            .collect();
        if ranked.len() > 1 {
            if let Some((channel, roi)) = ranked.iter().max_by(|a, b| a.1.cmp(&b.1)) {
                insights.push(format!(
                    "🏆 {} tem o melhor retorno do período: ROI de {}",
                    channel.label(),
                    format::format_percentage(Some(*roi), PercentStyle::Kpi)
                ));
            }
        }
    }

    if let Some(wins) = signals.referral().and_then(|s| s.wins).filter(|wins| *wins > 0) {
        let rate = signals.referral_rate().map(rate_text).unwrap_or_else(|| format::PLACEHOLDER.to_string());
        insights.push(format!("🏆 INDICAÇÃO: {wins} vendas ({rate} de conversão), custo zero de mídia"));
    }
    if let Some(rate) = signals.referral_rate().filter(|rate| *rate > REFERRAL_STAR_RATE) {
        insights.push(format!(
            "⭐ Indicação converte {}: vale investir em programa de indicação",
            rate_text(rate)
        ));
    }

    if let Some(count) = signals.unresponsive_leads().filter(|count| *count > UNRESPONSIVE_LEADS) {
        insights.push(format!(
            "📵 {} leads não respondem: leads frios ou resposta lenta",
            format::format_count(count)
        ));
    }

    // Sem nome: os insights vão para o relatório público como texto livre.
    if let Some((wins, rate)) = signals.best_salesperson() {
        insights.push(format!(
            "👤 O vendedor com maior conversão fechou {wins} vendas com {} dos negócios fechados",
            rate_text(rate)
        ));
    }

    if let Some(days) = signals.average_days_to_close() {
        insights.push(format!(
            "⏱️ Vendas de mídia paga fecham em média em {} dias",
            format::format_integer(Some(days))
        ));
    }

    insights
}

pub fn build_recommendations(signals: &PeriodSignals) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let mut push = |action: &str, expected_result: &str, priority: Priority| {
        recommendations.push(Recommendation {
            action: action.to_string(),
            expected_result: expected_result.to_string(),
            priority,
        })
    };

    for channel in signals.channels.unwrap_or_default() {
        if low_return(channel).is_none() {
            continue;
        }
        match channel.channel {
            Channel::Meta => push(
                "Revisar segmentação e criativos das campanhas META",
                "Aumentar a conversão de leads em vendas",
                Priority::Alta,
            ),
            Channel::Google => push(
                "Auditar UTMs e conferir se os leads chegam com a origem correta",
                "Encontrar vendas que estão sem atribuição",
                Priority::Alta,
            ),
        }
    }

    if signals.best_salesperson().is_some() {
        push(
            "Treinar a equipe com a metodologia do vendedor de maior conversão",
            "Aumentar a conversão geral do time",
            Priority::Media,
        );
    }

    if signals.unresponsive_leads().is_some_and(|count| count > UNRESPONSIVE_LEADS) {
        push(
            "Configurar alerta de lead novo para resposta imediata",
            "Reduzir pela metade as perdas por 'não responde'",
            Priority::Alta,
        );
    }

    if signals.referral_rate().is_some_and(|rate| rate > REFERRAL_PROGRAM_RATE) {
        push(
            "Criar programa de indicação com bonificação",
            "Dobrar as vendas por indicação em 3 meses",
            Priority::Alta,
        );
    }

    recommendations
}

pub fn build_sources(sources: &[LeadSourceBreakdown]) -> Vec<SourceMetrics> {
    let mut ordered: Vec<&LeadSourceBreakdown> = sources.iter().collect();
    ordered.sort_by(|a, b| b.leads.cmp(&a.leads));

    ordered
        .into_iter()
        .map(|s| {
            let rate = closed_conversion(s.wins, s.losses);
            SourceMetrics {
                origin: s.origin,
                leads: Figure::count(s.leads),
                wins: Figure::count(s.wins),
                losses: Figure::count(s.losses),
                revenue: Figure::currency(s.revenue),
                conversion_rate: Figure::rate(rate.map(|r| round_to(r, 1))),
                quality: rate.map(LeadQuality::from_conversion_rate),
            }
        })
        .collect()
}

/// Mídia paga (META + GOOGLE) contra indicação. `investment` ausente deixa os custos em "---".
pub fn build_paid_media(sources: &[LeadSourceBreakdown], investment: Option<Decimal>) -> PaidMediaQuality {
    let paid: Vec<&LeadSourceBreakdown> = sources.iter().filter(|s| s.origin.is_paid_media()).collect();
    let leads = total(paid.iter().map(|s| s.leads));
    let wins = total(paid.iter().map(|s| s.wins));
    let losses = total(paid.iter().map(|s| s.losses));
    let rate = closed_conversion(wins, losses);

    let referral_rate = sources
        .iter()
        .find(|s| s.origin == LeadOrigin::Indicacao)
        .and_then(|s| closed_conversion(s.wins, s.losses));

    PaidMediaQuality {
        leads: Figure::count(leads),
        wins: Figure::count(wins),
        losses: Figure::count(losses),
        conversion_rate: Figure::rate(rate.map(|r| round_to(r, 1))),
        cost_per_lead: Figure::currency_cents(ratio(investment, leads, metrics::cost_per_lead, 2)),
        cost_per_sale: Figure::currency_cents(ratio(investment, wins, metrics::cost_per_sale, 2)),
        referral_multiplier: Figure::multiplier(ratio(referral_rate, rate, metrics::conversion_multiplier, 1)),
    }
}

/// Ordena por quantidade e recalcula o percentual de cada motivo.
pub fn build_losses(reasons: &[LossReason]) -> LossSection {
    let mut ranked = reasons.to_vec();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    let total_losses = ranked.iter().try_fold(0u64, |acc, r| acc.checked_add(r.count));
    let total = total_losses.map(Decimal::from);
    for reason in &mut ranked {
        reason.percentage_of_losses = ratio(Some(Decimal::from(reason.count)), total, metrics::share_of_total, 1);
    }

    // Os dois motivos principais são, na prática, lead frio.
    let cold = ranked.iter().take(2).try_fold(0u64, |acc, r| acc.checked_add(r.count));

    LossSection {
        reasons: ranked,
        total_losses: Figure::count(total_losses),
        cold_leads_percentage: Figure::rate(ratio(cold.map(Decimal::from), total, metrics::share_of_total, 1)),
    }
}

pub fn build_salespeople(sellers: &[SalespersonAggregate]) -> Vec<SalespersonMetrics> {
    let mut ranked: Vec<&SalespersonAggregate> = sellers
        .iter()
        .filter(|s| s.leads.is_some_and(|leads| leads >= MIN_SALESPERSON_LEADS))
        .collect();
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue));

    ranked
        .into_iter()
        .map(|s| SalespersonMetrics {
            name: s.name.clone(),
            leads: Figure::count(s.leads),
            wins: Figure::count(s.wins),
            losses: Figure::count(s.losses),
            revenue: Figure::currency(s.revenue),
            average_deal_value: Figure::currency(ratio(s.revenue, s.wins, metrics::average_ticket, 2)),
            conversion_rate: Figure::rate(closed_conversion(s.wins, s.losses).map(|r| round_to(r, 1))),
        })
        .collect()
}

pub fn build_funnel(stages: &[FunnelStage]) -> FunnelView {
    let mut ordered = stages.to_vec();
    ordered.sort_by_key(|s| s.stage_id);

    let is_active = |s: &&FunnelStage| s.stage_id.kind() == StageKind::Active;
    let max_active = ordered.iter().filter(is_active).filter_map(|s| s.count).max().unwrap_or(0);
    let count_of = |id: StageId| ordered.iter().find(|s| s.stage_id == id).and_then(|s| s.count);

    let won = count_of(StageId::WON);
    let lost = count_of(StageId::LOST);
    let active_leads = total(ordered.iter().filter(is_active).map(|s| s.count));

    let views = ordered
        .iter()
        .map(|s| FunnelStageView {
            stage_id: s.stage_id.value(),
            label: s.label.clone(),
            kind: s.stage_id.kind(),
            count: Figure::count(s.count),
            total_value: Figure::currency(s.total_value),
            average_ticket: Figure::currency(ratio(s.total_value, s.count, metrics::average_ticket, 2)),
            width: metrics::funnel_stage_width(s.count.unwrap_or(0), max_active),
        })
        .collect();

    FunnelView {
        stages: views,
        active_leads: Figure::count(active_leads),
        won: Figure::count(won),
        lost: Figure::count(lost),
        closed_conversion_rate: Figure::rate(closed_conversion(won, lost).map(|r| round_to(r, 1))),
    }
}

fn build_month(period: PeriodWindow, channels: &[ChannelAggregate], consolidated: DateRange) -> MonthComparison {
    let investment = total(channels.iter().map(|c| c.investment));
    let leads = total(channels.iter().map(|c| c.leads_in_crm));
    let sales = total(channels.iter().map(|c| c.sales));
    let revenue = total(channels.iter().map(|c| c.revenue));

    MonthComparison {
        period: period.to_string(),
        period_label: period.label(consolidated),
        investment: Figure::currency(investment),
        leads: Figure::count(leads),
        sales: Figure::count(sales),
        revenue: Figure::currency(revenue),
        cost_per_sale: Figure::currency_cents(ratio(investment, sales, metrics::cost_per_sale, 2)),
        roi_percentage: Figure::kpi(ratio(revenue, investment, metrics::roi_percentage, 2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::report::{DealRecord, IndirectSales},
        repo::{MockReportsRepository, Resource},
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn consolidated() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
        )
        .unwrap()
    }

    // Repositório que falha nos recursos pedidos e delega o resto ao mock.
    struct FlakyRepo {
        inner: MockReportsRepository,
        failing: Vec<Resource>,
    }

    impl FlakyRepo {
        fn check(&self, resource: Resource) -> Result<(), AppError> {
            if self.failing.contains(&resource) {
                return Err(AppError::UpstreamStatus { resource: resource.path().to_string(), status: 503 });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReportsRepository for FlakyRepo {
        async fn fetch_channel_aggregates(&self, period: PeriodWindow) -> Result<Vec<ChannelAggregate>, AppError> {
            self.check(Resource::Channels)?;
            self.inner.fetch_channel_aggregates(period).await
        }

        async fn fetch_funnel(&self, period: PeriodWindow) -> Result<Vec<FunnelStage>, AppError> {
            self.check(Resource::Funnel)?;
            self.inner.fetch_funnel(period).await
        }

        async fn fetch_lead_sources(&self, period: PeriodWindow) -> Result<Vec<LeadSourceBreakdown>, AppError> {
            self.check(Resource::LeadSources)?;
            self.inner.fetch_lead_sources(period).await
        }

        async fn fetch_loss_reasons(&self, period: PeriodWindow) -> Result<Vec<LossReason>, AppError> {
            self.check(Resource::LossReasons)?;
            self.inner.fetch_loss_reasons(period).await
        }

        async fn fetch_salespeople(&self, period: PeriodWindow) -> Result<Vec<SalespersonAggregate>, AppError> {
            self.check(Resource::Salespeople)?;
            self.inner.fetch_salespeople(period).await
        }

        async fn fetch_indirect_sales(&self, period: PeriodWindow) -> Result<Vec<IndirectSales>, AppError> {
            self.check(Resource::IndirectSales)?;
            self.inner.fetch_indirect_sales(period).await
        }

        async fn fetch_deals(&self, period: PeriodWindow) -> Result<Vec<DealRecord>, AppError> {
            self.check(Resource::Deals)?;
            self.inner.fetch_deals(period).await
        }
    }

    fn service(failing: Vec<Resource>) -> ReportService {
        let repo = FlakyRepo { inner: MockReportsRepository::new(consolidated()), failing };
        ReportService::new(Arc::new(repo), AttributionModel::default(), consolidated(), None)
    }

    fn channel(channel: Channel, investment: &str, agency: u64, crm: u64, sales: u64, revenue: &str) -> ChannelAggregate {
        ChannelAggregate {
            channel,
            investment: Some(dec(investment)),
            leads_reported_by_agency: Some(agency),
            leads_in_crm: Some(crm),
            sales: Some(sales),
            revenue: Some(dec(revenue)),
        }
    }

    fn only_channels(channels: &[ChannelAggregate]) -> PeriodSignals<'_> {
        PeriodSignals { channels: Some(channels), ..Default::default() }
    }

    fn headline_channels() -> Vec<ChannelAggregate> {
        vec![
            channel(Channel::Meta, "11000", 330, 280, 8, "790100"),
            channel(Channel::Google, "9693", 270, 222, 12, "1180000"),
        ]
    }

    #[test]
    fn overview_matches_headline_scenario() {
        let overview = build_overview(&headline_channels());
        assert_eq!(overview.investment.display, "R$ 20.693");
        assert_eq!(overview.sales.value, Some(dec("20")));
        assert_eq!(overview.cost_per_sale.display, "R$ 1.034,65");
        assert_eq!(overview.roi_percentage.value, Some(dec("9520.61")));
        assert_eq!(overview.roi_percentage.display, "9.521%");
        assert_eq!(overview.leakage_percentage.value, Some(dec("16.3")));
        assert_eq!(overview.average_ticket.display, "R$ 98.505");
    }

    #[test]
    fn margin_scenarios_scale_gross_roi() {
        let overview = build_overview(&headline_channels());
        let rois: Vec<Option<Decimal>> =
            overview.margin_scenarios.iter().map(|s| s.roi_percentage.value).collect();
        assert_eq!(rois, vec![Some(dec("1428.09")), Some(dec("1904.12")), Some(dec("2380.15"))]);
        assert_eq!(overview.margin_scenarios[1].margin_percent.display, "20%");
    }

    #[test]
    fn unknown_measures_render_placeholder() {
        let partial = vec![ChannelAggregate {
            channel: Channel::Google,
            investment: Some(dec("7000")),
            leads_reported_by_agency: None,
            leads_in_crm: Some(35),
            sales: None,
            revenue: None,
        }];
        let overview = build_overview(&partial);
        assert_eq!(overview.sales.display, "---");
        assert_eq!(overview.cost_per_sale.display, "---");
        assert_eq!(overview.leakage_percentage.display, "---");
        assert_eq!(overview.cost_per_lead_real.display, "R$ 200,00");
    }

    #[test]
    fn alerts_flag_leakage_and_weak_channels() {
        let channels = vec![
            channel(Channel::Meta, "8500", 300, 200, 2, "180000"),
            channel(Channel::Google, "7000", 100, 120, 0, "0"),
        ];
        let alerts = build_alerts(&only_channels(&channels));
        assert!(alerts[0].contains("~80 leads a mais"));
        assert!(alerts.iter().any(|a| a.starts_with("⚠️ GOOGLE: CRM registra mais leads")));
        assert!(alerts.iter().any(|a| a.contains("META com baixo retorno: R$ 8.500")));
        assert!(alerts.iter().any(|a| a.contains("GOOGLE sem vendas")));
    }

    #[test]
    fn insights_name_the_best_channel() {
        let channels = headline_channels();
        let insights = build_insights(&only_channels(&channels));
        assert_eq!(insights[0], "💰 Ticket médio de R$ 98.505 por venda de mídia paga");
        assert!(insights[1].starts_with("🏆 GOOGLE"));
    }

    #[test]
    fn overflowing_totals_render_placeholder() {
        let huge = "1000000000000000000000000000";
        let channels = vec![
            ChannelAggregate {
                channel: Channel::Meta,
                investment: Some(dec("1")),
                leads_reported_by_agency: Some(u64::MAX),
                leads_in_crm: Some(u64::MAX),
                sales: Some(u64::MAX),
                revenue: Some(dec(huge)),
            },
            channel(Channel::Google, "1", 1, 1, 1, huge),
        ];
        let overview = build_overview(&channels);
        assert_eq!(overview.sales.display, "---");
        assert_eq!(overview.leads_in_crm.display, "---");
        assert_eq!(overview.revenue.value, Some(dec("2000000000000000000000000000")));
        assert_eq!(overview.roi_percentage.display, "---");
        assert!(overview.margin_scenarios.iter().all(|m| m.roi_percentage.display == "---"));
        assert_eq!(overview.channels[0].roi_percentage.display, "---");

        let alerts = build_alerts(&only_channels(&channels[..1]));
        assert!(alerts.iter().all(|a| !a.contains("leads a mais")));
        let insights = build_insights(&only_channels(&channels));
        assert!(insights.iter().all(|i| !i.starts_with("💰")));

        let sources = vec![LeadSourceBreakdown {
            origin: LeadOrigin::Indicacao,
            leads: Some(u64::MAX),
            wins: Some(u64::MAX),
            losses: Some(1),
            revenue: Some(Decimal::MAX),
        }];
        let rows = build_sources(&sources);
        assert_eq!(rows[0].conversion_rate.display, "---");
        assert_eq!(rows[0].quality, None);
        let signals = PeriodSignals { sources: Some(&sources), ..Default::default() };
        assert!(build_alerts(&signals).is_empty());
    }

    #[test]
    fn overflowing_loss_counts_render_placeholder() {
        let reasons = vec![
            LossReason { reason: "NÃO RESPONDE".into(), count: u64::MAX, percentage_of_losses: None },
            LossReason { reason: "PREÇO".into(), count: 1, percentage_of_losses: None },
        ];
        let section = build_losses(&reasons);
        assert_eq!(section.total_losses.display, "---");
        assert_eq!(section.cold_leads_percentage.display, "---");
        assert!(section.reasons.iter().all(|r| r.percentage_of_losses.is_none()));

        let unresponsive = vec![
            LossReason { reason: "NÃO RESPONDE".into(), count: u64::MAX, percentage_of_losses: None },
            LossReason { reason: "Não responde mais".into(), count: 1, percentage_of_losses: None },
        ];
        let signals = PeriodSignals { losses: Some(&unresponsive), ..Default::default() };
        assert!(build_insights(&signals).is_empty());
        assert!(build_recommendations(&signals).is_empty());
    }

    #[test]
    fn low_overall_conversion_is_alerted() {
        let sources = vec![
            LeadSourceBreakdown { origin: LeadOrigin::Meta, leads: Some(300), wins: Some(2), losses: Some(40), revenue: None },
            LeadSourceBreakdown { origin: LeadOrigin::Site, leads: Some(50), wins: Some(3), losses: Some(20), revenue: None },
        ];
        let signals = PeriodSignals { sources: Some(&sources), ..Default::default() };
        assert_eq!(build_alerts(&signals), vec!["📉 Taxa de conversão geral baixa: 7,7%".to_string()]);

        let none_closed = vec![LeadSourceBreakdown {
            origin: LeadOrigin::Site,
            leads: Some(10),
            wins: Some(0),
            losses: Some(0),
            revenue: None,
        }];
        let signals = PeriodSignals { sources: Some(&none_closed), ..Default::default() };
        assert!(build_alerts(&signals).is_empty());
    }

    #[test]
    fn weak_channels_get_recommendations() {
        let channels = vec![
            channel(Channel::Meta, "8500", 300, 200, 2, "180000"),
            channel(Channel::Google, "7000", 100, 90, 0, "0"),
        ];
        let recommendations = build_recommendations(&only_channels(&channels));
        assert_eq!(recommendations.len(), 2);
        assert!(recommendations.iter().all(|r| r.priority == Priority::Alta));
        assert!(recommendations[1].action.starts_with("Auditar UTMs"));

        assert!(build_recommendations(&only_channels(&headline_channels())).is_empty());
    }

    #[test]
    fn losses_are_ranked_with_local_percentages() {
        let reasons = vec![
            LossReason { reason: "PREÇO".into(), count: 10, percentage_of_losses: Some(dec("99")) },
            LossReason { reason: "NÃO RESPONDE".into(), count: 30, percentage_of_losses: None },
            LossReason { reason: "SEM INTERESSE".into(), count: 20, percentage_of_losses: None },
        ];
        let section = build_losses(&reasons);
        assert_eq!(section.reasons[0].reason, "NÃO RESPONDE");
        assert_eq!(section.reasons[0].percentage_of_losses, Some(dec("50.0")));
        assert_eq!(section.reasons[2].percentage_of_losses, Some(dec("16.7")));
        assert_eq!(section.cold_leads_percentage.display, "83,3%");
    }

    #[test]
    fn salespeople_below_ten_leads_are_hidden() {
        let sellers = vec![
            SalespersonAggregate { name: "A".into(), leads: Some(9), wins: Some(5), losses: Some(0), revenue: Some(dec("900000")) },
            SalespersonAggregate { name: "B".into(), leads: Some(40), wins: Some(4), losses: Some(12), revenue: Some(dec("400000")) },
            SalespersonAggregate { name: "C".into(), leads: None, wins: None, losses: None, revenue: None },
        ];
        let rows = build_salespeople(&sellers);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].conversion_rate.display, "25,0%");
        assert_eq!(rows[0].average_deal_value.display, "R$ 100.000");
    }

    #[test]
    fn source_quality_uses_closed_deals() {
        let sources = vec![LeadSourceBreakdown {
            origin: LeadOrigin::Indicacao,
            leads: Some(45),
            wins: Some(19),
            losses: Some(12),
            revenue: None,
        }];
        let rows = build_sources(&sources);
        assert_eq!(rows[0].conversion_rate.display, "61,3%");
        assert_eq!(rows[0].quality, Some(LeadQuality::Alta));
        assert_eq!(rows[0].revenue.display, "---");
    }

    #[test]
    fn funnel_view_clamps_widths_and_counts_closed_deals() {
        let view = build_funnel(&[
            FunnelStage { stage_id: StageId::LOST, label: "7. PERDIDO".into(), count: Some(310), total_value: None },
            FunnelStage { stage_id: StageId::try_from(1).unwrap(), label: "1".into(), count: Some(100), total_value: None },
            FunnelStage { stage_id: StageId::try_from(2).unwrap(), label: "2".into(), count: Some(5), total_value: None },
            FunnelStage { stage_id: StageId::WON, label: "6. GANHO".into(), count: Some(20), total_value: Some(dec("1970100")) },
        ]);
        let widths: Vec<Decimal> = view.stages.iter().map(|s| s.width).collect();
        assert_eq!(widths, vec![Decimal::ONE, dec("0.2"), dec("0.2"), Decimal::ONE]);
        assert_eq!(view.stages[0].stage_id, 1);
        assert_eq!(view.active_leads.value, Some(dec("105")));
        assert_eq!(view.closed_conversion_rate.display, "6,1%");
        assert_eq!(view.stages[2].average_ticket.display, "R$ 98.505");
    }

    #[tokio::test]
    async fn failed_fetch_only_blanks_its_widget() {
        let report = service(vec![Resource::IndirectSales]).roi_report(PeriodWindow::Consolidated).await;
        assert!(report.overview.data().is_some());
        assert!(report.sales.data().is_some());
        assert_eq!(report.attribution, Widget::unavailable());
        assert!(!report.alerts.is_empty());
    }

    #[tokio::test]
    async fn attribution_survives_without_channels() {
        let report = service(vec![Resource::Channels]).roi_report(PeriodWindow::Consolidated).await;
        assert!(report.overview.data().is_none());
        assert!(report.alerts.is_empty());
        let attribution = report.attribution.data().unwrap();
        assert!(attribution.comparison.is_none());
        assert_eq!(attribution.breakdown.total_attributed_sales, Some(14));
    }

    #[tokio::test]
    async fn quality_page_keeps_paid_media_without_investment() {
        let report = service(vec![Resource::Channels, Resource::Salespeople])
            .quality_report(PeriodWindow::Consolidated)
            .await;
        assert!(report.salespeople.data().is_none());
        let paid = report.paid_media.data().unwrap();
        assert_eq!(paid.cost_per_sale.display, "---");
        assert_eq!(paid.referral_multiplier.display, "8,9x");
    }

    #[tokio::test]
    async fn funnel_page_propagates_fetch_failure() {
        let err = service(vec![Resource::Funnel])
            .funnel_view(PeriodWindow::Consolidated)
            .await
            .unwrap_err();
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn comparison_lists_months_in_order() {
        let report = service(vec![]).comparison().await;
        let periods: Vec<&str> = report.periods.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2025-10", "2025-11", "2025-12", "2026-01"]);
        assert_eq!(report.periods[1].investment.display, "R$ 15.628");
        assert!(report.unavailable.is_empty());

        let broken = service(vec![Resource::Channels]).comparison().await;
        assert!(broken.periods.is_empty());
        assert_eq!(broken.unavailable.len(), 4);
    }

    #[tokio::test]
    async fn month_view_only_sees_its_own_month() {
        let november = PeriodWindow::month(2025, 11).unwrap();
        let report = service(vec![]).roi_report(november).await;

        let ids: Vec<&str> = report.sales.data().unwrap().iter().map(|s| s.deal.id.as_str()).collect();
        assert_eq!(ids, vec!["V-1102"]);
        assert_eq!(report.sales.data().unwrap()[0].days_to_close, Some(18));

        let comparison = report.attribution.data().unwrap().comparison.as_ref().unwrap();
        assert_eq!(comparison.direct.sales.value, Some(dec("7")));
        assert_eq!(comparison.with_attribution.sales.value, Some(dec("11")));

        let quality = service(vec![]).quality_report(PeriodWindow::month(2024, 5).unwrap()).await;
        assert_eq!(quality.sources.data().map(Vec::len), Some(0));
        assert_eq!(quality.salespeople.data().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn consolidated_insights_cover_referral_losses_and_team() {
        let report = service(vec![]).roi_report(PeriodWindow::Consolidated).await;
        let insights = report.insights.join("\n");
        assert!(insights.contains("🏆 INDICAÇÃO: 19 vendas (61,3% de conversão), custo zero de mídia"));
        assert!(insights.contains("⭐ Indicação converte 61,3%"));
        assert!(insights.contains("📵 182 leads não respondem"));
        assert!(insights.contains("fechou 22 vendas com 38,6%"));
        assert!(insights.contains("em média em 17 dias"));

        let priorities: Vec<Priority> = report.recommendations.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![Priority::Media, Priority::Alta, Priority::Alta]);
        assert!(report.alerts.iter().all(|a| !a.starts_with("📉")));

        let published = serde_json::to_string(&(&report.insights, &report.recommendations)).unwrap();
        for name in ["Carlos", "Ana", "Rafael", "Juliana", "Bruno", "Marcos", "Diego"] {
            assert!(!published.contains(name), "{name} apareceu em texto livre");
        }
    }

    #[test]
    fn serialization_failure_is_internal_not_upstream() {
        let unserializable: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();
        let err = to_json(&unserializable).unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));
        assert!(!err.is_fetch_failure());
    }

    #[tokio::test]
    async fn public_report_has_no_row_level_data() {
        let public = service(vec![]).public_report().await.unwrap();
        let text = public.to_string();
        assert!(public["roi"].get("sales").is_none());
        assert!(!text.contains("Marcos Antunes"));
        assert!(!text.contains("98877"));
        assert!(!text.contains("Ana Ribeiro"));
        assert_eq!(public["quality"]["salespeople"]["data"][0]["name"], "Vendedor 1");
        assert_eq!(public["quality"]["lossReasons"]["data"]["reasons"].as_array().unwrap().len(), 2);
        assert_eq!(public["roi"]["recommendations"][0]["priority"], "media");
        assert!(public["roi"]["recommendations"][0]["expectedResult"].is_string());
    }
}
