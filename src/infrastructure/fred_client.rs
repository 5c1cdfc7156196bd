// FRED graph CSV client (public, no API key)
use crate::application::series_source::{FetchOptions, ObservationRange, SeriesPoint, SeriesSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CACHE_CAPACITY: u64 = 512;

/// Cached series together with the revalidate hint it was fetched under
#[derive(Clone)]
struct CachedSeries {
    points: Arc<Vec<SeriesPoint>>,
    revalidate: Duration,
}

/// Each entry lives for the revalidate hint of the request that filled it.
struct RevalidateExpiry;

impl Expiry<(String, ObservationRange), CachedSeries> for RevalidateExpiry {
    fn expire_after_create(
        &self,
        _key: &(String, ObservationRange),
        value: &CachedSeries,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.revalidate)
    }
}

#[derive(Clone)]
pub struct FredClient {
    base_url: String,
    client: reqwest::Client,
    cache: Cache<(String, ObservationRange), CachedSeries>,
}

impl FredClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .expire_after(RevalidateExpiry)
                .build(),
        }
    }

    fn build_csv_url(&self, series_id: &str, range: &ObservationRange) -> String {
        format!(
            "{}/graph/fredgraph.csv?id={}&cosd={}&coed={}",
            self.base_url,
            urlencoding::encode(series_id),
            urlencoding::encode(&range.start),
            urlencoding::encode(&range.end)
        )
    }

    async fn download(&self, series_id: &str, range: &ObservationRange) -> Result<Vec<SeriesPoint>> {
        let url = self.build_csv_url(series_id, range);
        tracing::debug!("FRED request {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach FRED for {}", series_id))?;

        if !response.status().is_success() {
            anyhow::bail!("FRED fetch failed: {}", response.status().as_u16());
        }

        let body = response
            .text()
            .await
            .context("Failed to read FRED response")?;
        let points = parse_fred_csv(&body);

        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            tracing::debug!(
                "FRED {} returned {} points ({} .. {})",
                series_id,
                points.len(),
                first.date,
                last.date
            );
        }
        Ok(points)
    }
}

#[async_trait]
impl SeriesSource for FredClient {
    /// Served from cache while younger than `options.revalidate`; a zero hint
    /// always goes upstream and drops any cached copy.
    async fn fetch_series(
        &self,
        series_id: &str,
        range: &ObservationRange,
        options: FetchOptions,
    ) -> Result<Vec<SeriesPoint>> {
        let key = (series_id.to_string(), range.clone());
        if options.revalidate.is_zero() {
            self.cache.invalidate(&key).await;
            return self.download(series_id, range).await;
        }

        let cached = self
            .cache
            .try_get_with(key, async {
                self.download(series_id, range).await.map(|points| CachedSeries {
                    points: Arc::new(points),
                    revalidate: options.revalidate,
                })
            })
            .await
            .map_err(|e: Arc<anyhow::Error>| anyhow::anyhow!("{:#}", e))?;
        Ok(cached.points.as_ref().clone())
    }
}

/// `DATE,VALUE` lines after a header. Empty or `.` values are missing.
pub fn parse_fred_csv(text: &str) -> Vec<SeriesPoint> {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let mut points: Vec<SeriesPoint> = lines[1..]
        .iter()
        .map(|line| {
            let mut parts = line.split(',');
            let date = parts.next().unwrap_or("").trim();
            let raw = parts.next().unwrap_or("").trim();
            let value = match raw {
                "" | "." => None,
                _ => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
            };
            SeriesPoint::new(date, value)
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn range() -> ObservationRange {
        ObservationRange::new("1985-01-01", "2025-12-31")
    }

    #[test]
    fn test_parse_csv_missing_values() {
        let csv = "observation_date,UNRATE\r\n2020-02-01,3.5\r\n2020-01-01,.\r\n2020-03-01,\r\n2020-04-01,abc\n";
        let points = parse_fred_csv(csv);
        assert_eq!(
            points,
            vec![
                SeriesPoint::new("2020-01-01", None),
                SeriesPoint::new("2020-02-01", Some(3.5)),
                SeriesPoint::new("2020-03-01", None),
                SeriesPoint::new("2020-04-01", None),
            ]
        );
    }

    #[test]
    fn test_parse_csv_header_only() {
        assert!(parse_fred_csv("DATE,VALUE\n").is_empty());
        assert!(parse_fred_csv("").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_and_cache_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/graph/fredgraph.csv"))
            .and(query_param("id", "GDP"))
            .and(query_param("cosd", "1985-01-01"))
            .and(query_param("coed", "2025-12-31"))
            .respond_with(ResponseTemplate::new(200).set_body_string("DATE,GDP\n1990-01-01,5872.7\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = FredClient::new(server.uri());
        let first = client
            .fetch_series("GDP", &range(), FetchOptions::default())
            .await
            .unwrap();
        let second = client
            .fetch_series("GDP", &range(), FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(first, vec![SeriesPoint::new("1990-01-01", Some(5872.7))]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = FredClient::new(server.uri());
        let err = client
            .fetch_series("UNRATE", &range(), FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FRED fetch failed: 503"));
    }

    #[tokio::test]
    async fn test_zero_revalidate_always_goes_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("id", "UNRATE"))
            .respond_with(ResponseTemplate::new(200).set_body_string("DATE,UNRATE\n2020-01-01,3.5\n"))
            .expect(3)
            .mount(&server)
            .await;

        let client = FredClient::new(server.uri());
        // Cached under the default hint, then bypassed twice
        client
            .fetch_series("UNRATE", &range(), FetchOptions::default())
            .await
            .unwrap();
        for _ in 0..2 {
            let points = client
                .fetch_series("UNRATE", &range(), FetchOptions::revalidate_seconds(0))
                .await
                .unwrap();
            assert_eq!(points, vec![SeriesPoint::new("2020-01-01", Some(3.5))]);
        }
    }

    #[tokio::test]
    async fn test_short_revalidate_expires_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("id", "CPIAUCSL"))
            .respond_with(ResponseTemplate::new(200).set_body_string("DATE,CPIAUCSL\n2020-01-01,258.7\n"))
            .expect(2)
            .mount(&server)
            .await;

        let client = FredClient::new(server.uri());
        let options = FetchOptions {
            revalidate: Duration::from_millis(50),
        };
        client.fetch_series("CPIAUCSL", &range(), options).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        client.fetch_series("CPIAUCSL", &range(), options).await.unwrap();
    }
}
