use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use regex::Regex;

use crate::error::InputError;
use crate::models::price_history::{DateRange, PriceHistory, StockView};
use crate::services::market_data::MarketDataSource;
use crate::utils::{format_date, today_in, Logger};

/// Ticker characters accepted by the chart endpoint, e.g. `BRK.B`, `^GSPC`, `EURUSD=X`
const SYMBOL_PATTERN: &str = r"^[A-Za-z0-9.\-^=]{1,20}$";

pub fn earliest_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1965, 1, 1).unwrap_or_default()
}

pub fn earliest_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(1965, 1, 2).unwrap_or_default()
}

/// Fetches a symbol's history and shapes it into a table plus two chart series.
///
/// Lookup failures never reach the caller: an unknown symbol, an empty range
/// or a network error all produce an empty view.
pub struct StockViewer {
    source: Arc<dyn MarketDataSource>,
    market_tz: Tz,
    symbol_pattern: Regex,
    logger: Logger,
}

impl StockViewer {
    pub fn new(source: Arc<dyn MarketDataSource>, market_tz: Tz) -> Self {
        Self {
            source,
            market_tz,
            symbol_pattern: Regex::new(SYMBOL_PATTERN).expect("symbol pattern is valid"),
            logger: Logger::new("STOCK_VIEWER"),
        }
    }

    /// Reject dates outside what the date pickers allow
    pub fn check_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DateRange, InputError> {
        let today = today_in(self.market_tz);

        let out_of_range = |field: &'static str, value: NaiveDate, min: NaiveDate| InputError::OutOfRange {
            field,
            value: format_date(value),
            min: format_date(min),
            max: format_date(today),
        };

        if start < earliest_start() || start > today {
            return Err(out_of_range("start_date", start, earliest_start()));
        }
        if end < earliest_end() || end > today {
            return Err(out_of_range("end_date", end, earliest_end()));
        }

        Ok(DateRange::new(start, end))
    }

    pub async fn view(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<StockView, InputError> {
        let range = self.check_range(start, end)?;
        let symbol = symbol.trim();

        if symbol.is_empty() || range.is_empty() {
            self.logger.debug(&format!("Nothing to fetch for '{}' ({} to {})", symbol, start, end));
            return Ok(StockView::from_history(PriceHistory::empty(symbol), range));
        }

        if !self.symbol_pattern.is_match(symbol) {
            self.logger.warn(&format!("Ignoring malformed symbol '{}'", symbol));
            return Ok(StockView::from_history(PriceHistory::empty(symbol), range));
        }

        let fetch_symbol = symbol.to_uppercase();
        let history = match self.source.history(&fetch_symbol, range).await {
            Ok(history) => history,
            Err(e) => {
                self.logger.warn_with_error(&format!("No history for {}", fetch_symbol), &e);
                PriceHistory::empty(&fetch_symbol)
            }
        };

        Ok(StockView::from_history(history, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketDataError;
    use crate::models::price_history::PriceBar;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn history(&self, symbol: &str, range: DateRange) -> Result<PriceHistory, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketDataError::NoData(symbol.to_string()));
            }
            let bar = |day: u32, close: f64, volume: u64| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            };
            Ok(PriceHistory {
                symbol: symbol.to_string(),
                bars: vec![bar(2, 185.64, 82_488_700), bar(3, 184.25, 58_414_500)]
                    .into_iter()
                    .filter(|b| range.contains(b.date))
                    .collect(),
            })
        }
    }

    fn viewer(fail: bool) -> (StockViewer, Arc<FakeSource>) {
        let source = Arc::new(FakeSource {
            fail,
            calls: AtomicUsize::new(0),
        });
        (StockViewer::new(source.clone(), Tz::America__New_York), source)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_view_builds_title_and_series() {
        let (viewer, _) = viewer(false);
        let view = viewer.view("aapl", date(2024, 1, 1), date(2024, 1, 31)).await.unwrap();

        assert_eq!(view.title, "AAPL Stock Analysis");
        assert_eq!(view.bars.len(), 2);
        assert_eq!(view.volume.title, "Volume Analysis");
        assert_eq!(view.volume.points[0].value, 82_488_700.0);
        assert_eq!(view.close.title, "Close Price Analysis");
        assert_eq!(view.close.min_max(), Some((184.25, 185.64)));
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty_view() {
        let (viewer, source) = viewer(true);
        let view = viewer.view("NOPE", date(2024, 1, 1), date(2024, 1, 31)).await.unwrap();

        assert!(view.is_empty());
        assert!(view.close.points.is_empty());
        assert_eq!(view.title, "NOPE Stock Analysis");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_inputs_skip_the_fetch() {
        let (viewer, source) = viewer(false);

        let view = viewer.view("", date(2024, 1, 1), date(2024, 1, 31)).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.title, " Stock Analysis");

        let view = viewer.view("AAPL", date(2024, 1, 31), date(2024, 1, 1)).await.unwrap();
        assert!(view.is_empty());

        let view = viewer.view("not a symbol!", date(2024, 1, 1), date(2024, 1, 31)).await.unwrap();
        assert!(view.is_empty());

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dates_outside_picker_bounds_are_rejected() {
        let (viewer, _) = viewer(false);

        assert!(matches!(
            viewer.view("AAPL", date(1964, 12, 31), date(2024, 1, 1)).await,
            Err(InputError::OutOfRange { field: "start_date", .. })
        ));
        assert!(matches!(
            viewer.view("AAPL", date(1965, 1, 1), date(1965, 1, 1)).await,
            Err(InputError::OutOfRange { field: "end_date", .. })
        ));
        assert!(matches!(
            viewer.view("AAPL", date(2024, 1, 1), date(9999, 1, 1)).await,
            Err(InputError::OutOfRange { field: "end_date", .. })
        ));
    }
}
