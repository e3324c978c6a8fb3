// src/models/period.rs

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::common::{error::AppError, format::format_date_br};

const CONSOLIDATED_KEY: &str = "consolidado";

/// Janela de apuração: o consolidado configurado ou um mês (`AAAA-MM`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodWindow {
    #[default]
    Consolidated,
    Month { year: i32, month: u32 },
}

impl PeriodWindow {
    pub fn month(year: i32, month: u32) -> Result<Self, AppError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| PeriodWindow::Month { year, month })
            .ok_or_else(|| AppError::InvalidPeriod(format!("{year:04}-{month:02}")))
    }

    pub fn date_range(&self, consolidated: DateRange) -> DateRange {
        match *self {
            PeriodWindow::Consolidated => consolidated,
            PeriodWindow::Month { year, month } => DateRange::for_month(year, month),
        }
    }

    /// Rótulo exibido no cabeçalho das páginas.
    pub fn label(&self, consolidated: DateRange) -> String {
        match *self {
            PeriodWindow::Consolidated => consolidated.label(),
            PeriodWindow::Month { year, month } => format!("{month:02}/{year}"),
        }
    }
}

impl fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodWindow::Consolidated => f.write_str(CONSOLIDATED_KEY),
            PeriodWindow::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl FromStr for PeriodWindow {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(CONSOLIDATED_KEY) {
            return Ok(PeriodWindow::Consolidated);
        }

        let invalid = || AppError::InvalidPeriod(raw.to_string());
        let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        PeriodWindow::month(year, month)
    }
}

/// Intervalo fechado de datas (início e fim inclusos).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> anyhow::Result<Self> {
        if end < start {
            anyhow::bail!("fim do período ({end}) anterior ao início ({start})");
        }
        Ok(Self { start, end })
    }

    pub fn for_month(year: i32, month: u32) -> Self {
        let start = first_day(year, month);
        Self { start, end: last_day(year, month) }
    }

    pub fn label(&self) -> String {
        format!("{} a {}", format_date_br(self.start), format_date_br(self.end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Meses (ano, mês) tocados pelo intervalo, em ordem.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.start.year(), self.start.month());
        while (year, month) <= (self.end.year(), self.end.month()) {
            months.push((year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        months
    }

    /// Fração dos dias do mês que cai dentro do intervalo (0..=1).
    pub fn month_fraction(&self, year: i32, month: u32) -> Decimal {
        let month_range = DateRange::for_month(year, month);
        let start = self.start.max(month_range.start);
        let end = self.end.min(month_range.end);
        if end < start {
            return Decimal::ZERO;
        }
        let days_in_range = (end - start).num_days() + 1;
        let days_in_month = (month_range.end - month_range.start).num_days() + 1;
        Decimal::from(days_in_range) / Decimal::from(days_in_month)
    }
}

fn first_day(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn last_day(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    first_day(next_year, next_month)
        .pred_opt()
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_consolidated_and_months() {
        assert_eq!("consolidado".parse::<PeriodWindow>().unwrap(), PeriodWindow::Consolidated);
        assert_eq!(
            "2025-10".parse::<PeriodWindow>().unwrap(),
            PeriodWindow::Month { year: 2025, month: 10 }
        );
        assert_eq!(PeriodWindow::Month { year: 2026, month: 1 }.to_string(), "2026-01");
    }

    #[test]
    fn rejects_malformed_periods() {
        for raw in ["2025-13", "2025-1", "25-10", "outubro", "", "2025-00"] {
            assert!(raw.parse::<PeriodWindow>().is_err(), "{raw} deveria ser rejeitado");
        }
    }

    #[test]
    fn display_parses_back_to_the_same_window() {
        for period in [PeriodWindow::Consolidated, PeriodWindow::Month { year: 2025, month: 12 }] {
            assert_eq!(period.to_string().parse::<PeriodWindow>().unwrap(), period);
        }
    }

    #[test]
    fn month_range_covers_calendar_days() {
        let range = DateRange::for_month(2025, 12);
        assert_eq!(range.start, ymd(2025, 12, 1));
        assert_eq!(range.end, ymd(2025, 12, 31));
        assert_eq!(DateRange::for_month(2024, 2).end, ymd(2024, 2, 29));
    }

    #[test]
    fn partial_month_fraction() {
        let range = DateRange::new(ymd(2025, 10, 1), ymd(2026, 1, 14)).unwrap();
        assert_eq!(range.months(), vec![(2025, 10), (2025, 11), (2025, 12), (2026, 1)]);
        assert_eq!(range.month_fraction(2025, 11), Decimal::ONE);
        assert_eq!(range.month_fraction(2026, 1), Decimal::from(14) / Decimal::from(31));
        assert_eq!(range.month_fraction(2026, 2), Decimal::ZERO);
        assert_eq!(range.label(), "01/10/2025 a 14/01/2026");
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let november = DateRange::for_month(2025, 11);
        assert!(november.contains(ymd(2025, 11, 1)));
        assert!(november.contains(ymd(2025, 11, 30)));
        assert!(!november.contains(ymd(2025, 10, 31)));
        assert!(!november.contains(ymd(2025, 12, 1)));
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(DateRange::new(ymd(2026, 1, 2), ymd(2026, 1, 1)).is_err());
    }
}
