//! Deterministic upstream fixtures.

use jiff::civil::{Date, Weekday, date};

use crate::model::{DateWindow, Observation};
use crate::recipes::{PairReturns, RegionalMetric};
use crate::source::MemorySource;

pub const TICKERS: [&str; 5] = ["AAPL", "GOOG", "MSFT", "NFLX", "TSLA"];

/// The first `count` weekdays on or after `start`.
pub fn trading_days(start: Date, count: usize) -> Vec<Date> {
    let mut days = Vec::with_capacity(count);
    let mut day = start;
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday) {
            days.push(day);
        }
        day = day.tomorrow().unwrap();
    }
    days
}

/// A smooth, strictly positive price path that differs per ticker.
pub fn price_series(days: &[Date], seed: usize) -> Vec<Observation> {
    days.iter()
        .enumerate()
        .map(|(i, d)| {
            let t = i as f64;
            let price = 100.0 + 10.0 * seed as f64 + 5.0 * (t / (7.0 + seed as f64)).sin() + 0.05 * t;
            Observation::new(*d, price)
        })
        .collect()
}

pub fn pair_window() -> DateWindow {
    DateWindow::new(date(2018, 1, 1), date(2020, 1, 1))
}

/// Every ticker with the same 500 trading days.
pub fn aligned_pair_source() -> MemorySource {
    let days = trading_days(date(2018, 1, 2), 500);
    TICKERS
        .iter()
        .enumerate()
        .fold(MemorySource::new(), |source, (seed, ticker)| {
            source.with_series(ticker, price_series(&days, seed))
        })
}

pub fn pair_recipe() -> PairReturns {
    PairReturns::new(TICKERS.iter().map(|t| t.to_string()).collect(), pair_window()).unwrap()
}

/// Daily cumulative counts for two regions over 2020 and 2021.
pub fn regional_source() -> MemorySource {
    let mut days = Vec::new();
    let mut day = date(2020, 1, 1);
    while day <= date(2021, 12, 31) {
        days.push(day);
        day = day.tomorrow().unwrap();
    }

    let mut source = MemorySource::new();
    for (r, region) in ["DKI Jakarta", "Bali"].iter().enumerate() {
        for (m, metric) in ["Total_Cases", "Total_Deaths"].iter().enumerate() {
            let step = 1.0 + (r * 2 + m) as f64;
            let series = days
                .iter()
                .enumerate()
                .map(|(i, d)| Observation::new(*d, step * i as f64))
                .collect();
            source = source.with_series(&format!("{region}/{metric}"), series);
        }
    }
    source
}

pub fn regional_recipe() -> RegionalMetric {
    RegionalMetric::new(
        vec!["DKI Jakarta".into(), "Bali".into()],
        vec!["Total_Cases".into(), "Total_Deaths".into()],
        vec!["2020".into(), "2021".into()],
        DateWindow::new(date(2020, 1, 1), date(2021, 12, 31)),
    )
    .unwrap()
}
