use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Half-open date range: `start` inclusive, `end` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Bars of one symbol, sorted by date
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bars: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn volume_series(&self) -> Vec<SeriesPoint> {
        self.bars
            .iter()
            .map(|bar| SeriesPoint {
                date: bar.date,
                value: bar.volume as f64,
            })
            .collect()
    }

    pub fn close_series(&self) -> Vec<SeriesPoint> {
        self.bars
            .iter()
            .map(|bar| SeriesPoint {
                date: bar.date,
                value: bar.close,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A titled line series, ready for a chart widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub title: String,
    pub points: Vec<SeriesPoint>,
}

impl ChartSeries {
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, point| match acc {
            None => Some((point.value, point.value)),
            Some((lo, hi)) => Some((lo.min(point.value), hi.max(point.value))),
        })
    }
}

/// Everything the stock viewer shows for one symbol and date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockView {
    pub title: String,
    pub symbol: String,
    pub range: DateRange,
    pub bars: Vec<PriceBar>,
    pub volume: ChartSeries,
    pub close: ChartSeries,
}

impl StockView {
    pub fn from_history(history: PriceHistory, range: DateRange) -> Self {
        let symbol = history.symbol.to_uppercase();
        Self {
            title: format!("{} Stock Analysis", symbol),
            volume: ChartSeries {
                title: "Volume Analysis".to_string(),
                points: history.volume_series(),
            },
            close: ChartSeries {
                title: "Close Price Analysis".to_string(),
                points: history.close_series(),
            },
            symbol,
            range,
            bars: history.bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
