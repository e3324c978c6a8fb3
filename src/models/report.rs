// src/models/report.rs
//
// Agregados lidos da API de dados (CRM + agência). São snapshots somente
// leitura: o serviço nunca cria nem altera nada, só projeta.
// Valores medidos podem faltar no payload; `None` significa "desconhecido".

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::format::{self, PercentStyle};

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Meta,
    Google,
}

impl Channel {
    pub fn label(self) -> &'static str {
        match self {
            Channel::Meta => "META",
            Channel::Google => "GOOGLE",
        }
    }
}

/// Agrupamento de origem do lead no CRM. Strings desconhecidas caem em `OUTROS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadOrigin {
    Meta,
    Google,
    Site,
    Portais,
    Presencial,
    Direto,
    Indicacao,
    #[serde(other)]
    Outros,
}

impl LeadOrigin {
    pub fn is_paid_media(self) -> bool {
        matches!(self, LeadOrigin::Meta | LeadOrigin::Google)
    }
}

/// Fontes cujas vendas não são marcadas como mídia paga, mas recebem
/// uma fração atribuída (efeito de marca).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndirectBucket {
    Showroom,
    Indicacao,
    RedeRelacionamento,
}

impl IndirectBucket {
    pub const ALL: [IndirectBucket; 3] = [
        IndirectBucket::Showroom,
        IndirectBucket::Indicacao,
        IndirectBucket::RedeRelacionamento,
    ];
}

// --- ETAPAS DO FUNIL ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Active,
    Won,
    Lost,
    Archived,
}

/// Id de etapa do CRM (1..=8). Validado na desserialização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StageId(u8);

impl StageId {
    pub const WON: StageId = StageId(6);
    pub const LOST: StageId = StageId(7);

    pub fn kind(self) -> StageKind {
        match self.0 {
            6 => StageKind::Won,
            7 => StageKind::Lost,
            8 => StageKind::Archived,
            _ => StageKind::Active,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StageId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=8).contains(&value) {
            Ok(StageId(value))
        } else {
            Err(format!("etapa de funil inválida: {value}"))
        }
    }
}

impl From<StageId> for u8 {
    fn from(value: StageId) -> Self {
        value.0
    }
}

// --- AGREGADOS ---

// 1. Investimento x resultado por canal pago
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAggregate {
    pub channel: Channel,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub investment: Option<Decimal>,
    #[serde(default)]
    pub leads_reported_by_agency: Option<u64>,
    #[serde(default, rename = "leadsInCRM")]
    pub leads_in_crm: Option<u64>,
    #[serde(default)]
    pub sales: Option<u64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub revenue: Option<Decimal>,
}

impl ChannelAggregate {
    /// O CRM deveria ter no máximo o que a agência reporta. Só vira aviso.
    pub fn crm_exceeds_agency(&self) -> bool {
        matches!(
            (self.leads_in_crm, self.leads_reported_by_agency),
            (Some(crm), Some(agency)) if crm > agency
        )
    }
}

// 2. Etapa do funil
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    #[schema(value_type = u8)]
    pub stage_id: StageId,
    pub label: String,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub total_value: Option<Decimal>,
}

// 3. Resultado por origem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadSourceBreakdown {
    pub origin: LeadOrigin,
    #[serde(default)]
    pub leads: Option<u64>,
    #[serde(default)]
    pub wins: Option<u64>,
    #[serde(default)]
    pub losses: Option<u64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub revenue: Option<Decimal>,
}

// 4. Motivo de perda. O percentual é sempre recalculado localmente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LossReason {
    pub reason: String,
    pub count: u64,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub percentage_of_losses: Option<Decimal>,
}

// 5. Resultado por vendedor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalespersonAggregate {
    pub name: String,
    #[serde(default)]
    pub leads: Option<u64>,
    #[serde(default)]
    pub wins: Option<u64>,
    #[serde(default)]
    pub losses: Option<u64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub revenue: Option<Decimal>,
}

// 6. Vendas de fontes indiretas (base da atribuição)
// Sem dado = zero vendas: a atribuição nunca inventa vendas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndirectSales {
    pub bucket: IndirectBucket,
    #[serde(default)]
    pub total_sales: u64,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub revenue: Decimal,
}

// 7. Venda individual de mídia paga (dado sensível, nunca vai ao relatório público)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealRecord {
    pub id: String,
    pub channel: Channel,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub salesperson: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub opened_at: Option<NaiveDate>,
    #[serde(default)]
    pub closed_at: Option<NaiveDate>,
}

impl DealRecord {
    /// Dias entre a entrada do lead e o fechamento. `None` sem as duas datas
    /// ou com fechamento anterior à entrada.
    pub fn days_to_close(&self) -> Option<i64> {
        let days = (self.closed_at? - self.opened_at?).num_days();
        (days >= 0).then_some(days)
    }
}

// --- VALORES DE EXIBIÇÃO ---

/// Número pronto para tela: valor bruto + texto formatado pt-BR.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Figure {
    #[schema(value_type = Option<f64>)]
    pub value: Option<Decimal>,
    pub display: String,
}

impl Figure {
    /// Moeda sem centavos (cards e totais).
    pub fn currency(value: Option<Decimal>) -> Self {
        Self { value, display: format::format_currency(value, 0) }
    }

    /// Moeda com centavos (custos unitários).
    pub fn currency_cents(value: Option<Decimal>) -> Self {
        Self { value, display: format::format_currency(value, 2) }
    }

    pub fn count(value: Option<u64>) -> Self {
        let value = value.map(Decimal::from);
        Self { value, display: format::format_integer(value) }
    }

    pub fn rate(value: Option<Decimal>) -> Self {
        Self { value, display: format::format_percentage(value, PercentStyle::Rate) }
    }

    pub fn kpi(value: Option<Decimal>) -> Self {
        Self { value, display: format::format_percentage(value, PercentStyle::Kpi) }
    }

    /// Variação percentual com sinal (`+25,0%`).
    pub fn delta(value: Option<Decimal>) -> Self {
        Self { value, display: format::format_delta_percentage(value, PercentStyle::Rate) }
    }

    pub fn multiplier(value: Option<Decimal>) -> Self {
        Self { value, display: format::format_multiplier(value) }
    }
}

/// Estado de cada widget de uma página. Falhas são isoladas por widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Widget<T> {
    Ready { data: T },
    Unavailable { message: String },
}

pub const UNAVAILABLE_MESSAGE: &str = "dados indisponíveis";

impl<T> Widget<T> {
    pub fn unavailable() -> Self {
        Widget::Unavailable { message: UNAVAILABLE_MESSAGE.to_string() }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Widget<U> {
        match self {
            Widget::Ready { data } => Widget::Ready { data: f(data) },
            Widget::Unavailable { message } => Widget::Unavailable { message },
        }
    }

    pub fn as_ref(&self) -> Widget<&T> {
        match self {
            Widget::Ready { data } => Widget::Ready { data },
            Widget::Unavailable { message } => Widget::Unavailable { message: message.clone() },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Widget::Ready { data } => Some(data),
            Widget::Unavailable { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_aggregate_tolerates_missing_measures() {
        let parsed: ChannelAggregate = serde_json::from_value(json!({
            "channel": "META",
            "investment": 8500,
            "leadsInCRM": 180
        }))
        .unwrap();
        assert_eq!(parsed.investment, Some(Decimal::from(8500)));
        assert_eq!(parsed.leads_in_crm, Some(180));
        assert_eq!(parsed.sales, None);
        assert!(!parsed.crm_exceeds_agency());
    }

    #[test]
    fn crm_above_agency_is_flagged() {
        let parsed: ChannelAggregate = serde_json::from_value(json!({
            "channel": "GOOGLE",
            "leadsReportedByAgency": 100,
            "leadsInCRM": 120
        }))
        .unwrap();
        assert!(parsed.crm_exceeds_agency());
    }

    #[test]
    fn stage_ids_are_validated() {
        let ok: FunnelStage =
            serde_json::from_value(json!({ "stageId": 6, "label": "6. GANHO", "count": 20 })).unwrap();
        assert_eq!(ok.stage_id.kind(), StageKind::Won);
        assert_eq!(StageId::try_from(3).unwrap().kind(), StageKind::Active);
        assert_eq!(StageId::try_from(8).unwrap().kind(), StageKind::Archived);

        let bad = serde_json::from_value::<FunnelStage>(json!({ "stageId": 9, "label": "?" }));
        assert!(bad.is_err());
    }

    #[test]
    fn unknown_origin_falls_back_to_outros() {
        let parsed: LeadSourceBreakdown =
            serde_json::from_value(json!({ "origin": "TIKTOK", "leads": 3 })).unwrap();
        assert_eq!(parsed.origin, LeadOrigin::Outros);
        assert!(!parsed.origin.is_paid_media());
    }

    #[test]
    fn widget_serializes_with_status_tag() {
        let ready: Widget<u32> = Widget::Ready { data: 7 };
        assert_eq!(serde_json::to_value(&ready).unwrap(), json!({ "status": "ready", "data": 7 }));
        let down: Widget<u32> = Widget::unavailable();
        assert_eq!(
            serde_json::to_value(&down).unwrap(),
            json!({ "status": "unavailable", "message": "dados indisponíveis" })
        );
    }

    #[test]
    fn days_to_close_needs_both_dates_in_order() {
        let mut deal: DealRecord = serde_json::from_value(serde_json::json!({
            "id": "V-1", "channel": "META", "openedAt": "2025-10-03", "closedAt": "2025-10-17"
        }))
        .unwrap();
        assert_eq!(deal.days_to_close(), Some(14));

        deal.opened_at = NaiveDate::from_ymd_opt(2025, 10, 20);
        assert_eq!(deal.days_to_close(), None);
        deal.opened_at = None;
        assert_eq!(deal.days_to_close(), None);
    }

    #[test]
    fn figure_formats_unknown_as_placeholder() {
        assert_eq!(Figure::currency_cents(None).display, "---");
        assert_eq!(Figure::count(Some(431)).display, "431");
    }
}
