// src/common/format.rs
//
// Formatação pt-BR usada por todas as views. Nenhuma view deve formatar
// moeda ou percentual por conta própria.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// Texto exibido quando o valor é desconhecido (campo ausente no payload).
pub const PLACEHOLDER: &str = "---";

/// Precisão do percentual: taxas com 1 casa, KPIs grossos sem casas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentStyle {
    Rate,
    Kpi,
}

impl PercentStyle {
    fn decimals(self) -> u32 {
        match self {
            PercentStyle::Rate => 1,
            PercentStyle::Kpi => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Currency { decimals: u32 },
    Integer,
    Percentage(PercentStyle),
}

pub fn format_value(value: Option<Decimal>, kind: FormatKind) -> String {
    match kind {
        FormatKind::Currency { decimals } => format_currency(value, decimals),
        FormatKind::Integer => format_integer(value),
        FormatKind::Percentage(style) => format_percentage(value, style),
    }
}

/// `R$ 1.034,65`. Negativos ficam como `-R$ 10,00`.
pub fn format_currency(value: Option<Decimal>, decimals: u32) -> String {
    let Some(value) = value else {
        return PLACEHOLDER.to_string();
    };
    let (negative, body) = format_number(value, decimals);
    if negative {
        format!("-R$ {}", body)
    } else {
        format!("R$ {}", body)
    }
}

pub fn format_integer(value: Option<Decimal>) -> String {
    match value {
        Some(value) => signed(format_number(value, 0)),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_count(value: u64) -> String {
    format_integer(Some(Decimal::from(value)))
}

pub fn format_percentage(value: Option<Decimal>, style: PercentStyle) -> String {
    match value {
        Some(value) => format!("{}%", signed(format_number(value, style.decimals()))),
        None => PLACEHOLDER.to_string(),
    }
}

/// Variação com sinal explícito (`+12,5%`, `-30,0%`).
pub fn format_delta_percentage(value: Option<Decimal>, style: PercentStyle) -> String {
    match value {
        Some(value) => {
            let (negative, body) = format_number(value, style.decimals());
            let sign = if negative { '-' } else { '+' };
            format!("{}{}%", sign, body)
        }
        None => PLACEHOLDER.to_string(),
    }
}

/// Multiplicador com uma casa (`3,2x`).
pub fn format_multiplier(value: Option<Decimal>) -> String {
    match value {
        Some(value) => format!("{}x", signed(format_number(value, 1))),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn signed((negative, body): (bool, String)) -> String {
    if negative { format!("-{}", body) } else { body }
}

// Retorna (negativo?, corpo sem sinal) já arredondado meio-para-cima.
fn format_number(value: Decimal, decimals: u32) -> (bool, String) {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.*}", decimals as usize, rounded.abs());

    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut body = group_thousands(integer);
    if let Some(fraction) = fraction {
        body.push(',');
        body.push_str(fraction);
    }
    (negative, body)
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
