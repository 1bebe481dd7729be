use std::time::{Duration as StdDuration, SystemTime};

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::MarketDataError;
use crate::models::price_history::{DateRange, PriceBar, PriceHistory};
use crate::utils::{date_to_timestamp, timestamp_to_local_date, Logger, Timer};

pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com";

/// Source of daily price history
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn history(&self, symbol: &str, range: DateRange) -> Result<PriceHistory, MarketDataError>;
}

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub rate_limit_per_minute: u32,
    pub timeout: StdDuration,
    pub max_retries: u32,
    pub random_agent: bool,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MARKET_DATA_URL.to_string(),
            rate_limit_per_minute: 30,
            timeout: StdDuration::from_secs(30),
            max_retries: 3,
            random_agent: true,
        }
    }
}

// --- Chart API response ---

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decode a chart response into bars inside `range`.
///
/// Rows without a close are dropped; missing open/high/low fall back to the
/// close. Dates are taken in the exchange's own time zone.
pub fn parse_chart_response(symbol: &str, body: &str, range: DateRange) -> Result<PriceHistory, MarketDataError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        return match error.code.as_str() {
            "Not Found" => Err(MarketDataError::NoData(symbol.to_string())),
            _ => Err(MarketDataError::InvalidResponse(format!(
                "{}: {}",
                error.code,
                error.description.unwrap_or_default()
            ))),
        };
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))?;

    let tz: Tz = result
        .meta
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or(Tz::UTC);

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let length = result.timestamp.len();
    if length > 0
        && [quote.open.len(), quote.high.len(), quote.low.len(), quote.close.len(), quote.volume.len()]
            .iter()
            .any(|&len| len != length)
    {
        return Err(MarketDataError::InvalidResponse("Inconsistent array lengths".to_string()));
    }

    let mut bars = Vec::with_capacity(length);
    for (i, &timestamp) in result.timestamp.iter().enumerate() {
        let Some(close) = quote.close[i] else {
            continue;
        };
        let date = timestamp_to_local_date(timestamp, tz).ok_or_else(|| {
            MarketDataError::InvalidResponse(format!("Cannot convert timestamp {} at index {}", timestamp, i))
        })?;
        if !range.contains(date) {
            continue;
        }

        bars.push(PriceBar {
            date,
            open: quote.open[i].unwrap_or(close),
            high: quote.high[i].unwrap_or(close),
            low: quote.low[i].unwrap_or(close),
            close,
            volume: quote.volume[i].map_or(0, |v| v.max(0.0) as u64),
        });
    }

    // Intraday updates can repeat the last date; the later row wins
    bars.sort_by_key(|bar| bar.date);
    bars.reverse();
    bars.dedup_by_key(|bar| bar.date);
    bars.reverse();

    Ok(PriceHistory {
        symbol: symbol.to_string(),
        bars,
    })
}

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15",
];

/// HTTP client for a Yahoo-style `/v8/finance/chart` endpoint
pub struct ChartApiClient {
    client: Client,
    config: MarketDataConfig,
    request_timestamps: Mutex<Vec<SystemTime>>,
    logger: Logger,
}

impl ChartApiClient {
    pub fn new(config: MarketDataConfig) -> Result<Self, MarketDataError> {
        let client = Client::builder().timeout(config.timeout).gzip(true).build()?;

        Ok(Self {
            client,
            config,
            request_timestamps: Mutex::new(Vec::new()),
            logger: Logger::new("MARKET_DATA"),
        })
    }

    pub fn chart_url(&self, symbol: &str, range: DateRange) -> Result<Url, MarketDataError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| MarketDataError::InvalidResponse(format!("Invalid base url: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| MarketDataError::InvalidResponse("Base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);

        url.query_pairs_mut()
            .append_pair("period1", &date_to_timestamp(range.start).to_string())
            .append_pair("period2", &date_to_timestamp(range.end).to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");

        Ok(url)
    }

    fn user_agent(&self) -> &'static str {
        if self.config.random_agent {
            use rand::seq::IndexedRandom;
            USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
        } else {
            USER_AGENTS[0]
        }
    }

    async fn enforce_rate_limit(&self) {
        let mut timestamps = self.request_timestamps.lock().await;
        let current_time = SystemTime::now();

        // Remove timestamps older than 1 minute
        timestamps.retain(|&timestamp| {
            current_time.duration_since(timestamp).unwrap_or(StdDuration::from_secs(0)) < StdDuration::from_secs(60)
        });

        if timestamps.len() >= self.config.rate_limit_per_minute.max(1) as usize {
            if let Some(&oldest_request) = timestamps.first() {
                let waited = current_time.duration_since(oldest_request).unwrap_or(StdDuration::from_secs(0));
                let wait_time = StdDuration::from_secs(60).saturating_sub(waited);
                if !wait_time.is_zero() {
                    self.logger.debug(&format!("Rate limit reached, waiting {:?}", wait_time));
                    sleep(wait_time + StdDuration::from_millis(100)).await;
                }
            }
        }

        timestamps.push(SystemTime::now());
    }

    async fn fetch_chart(&self, url: Url) -> Result<String, MarketDataError> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries.max(1) {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>());
                sleep(delay.min(StdDuration::from_secs(60))).await;
            }

            let response = self
                .client
                .get(url.clone())
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("User-Agent", self.user_agent())
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    // 404 carries a JSON error body naming the missing symbol
                    if status.is_success() || status == StatusCode::NOT_FOUND {
                        return Ok(resp.text().await?);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        self.logger.warn(&format!("HTTP {} on attempt {}, retrying", status, attempt + 1));
                        last_error = Some(MarketDataError::InvalidResponse(format!("HTTP {}", status)));
                        continue;
                    }
                    return Err(MarketDataError::InvalidResponse(format!("HTTP {}", status)));
                }
                Err(e) => {
                    self.logger.warn_with_error(&format!("Request failed on attempt {}", attempt + 1), &e);
                    last_error = Some(MarketDataError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| MarketDataError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl MarketDataSource for ChartApiClient {
    async fn history(&self, symbol: &str, range: DateRange) -> Result<PriceHistory, MarketDataError> {
        let timer = Timer::start(&format!("{} history fetch", symbol));
        let url = self.chart_url(symbol, range)?;

        let body = self.fetch_chart(url).await?;
        let history = parse_chart_response(symbol, &body, range)?;

        self.logger.info(&format!(
            "Fetched {} bars for {} ({} to {})",
            history.bars.len(),
            symbol,
            range.start,
            range.end
        ));
        timer.log_elapsed("MARKET_DATA");
        Ok(history)
    }
}
