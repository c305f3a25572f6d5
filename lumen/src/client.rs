//! Typed endpoints of the sensor data service, built on the request executor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use lumen_core::{
    AggregatedPoint, CancellationToken, HeatmapCell, LumenConfig, LumenError, Method, Payload,
    ReadingReceipt, ReportRange, ReportRow, Sample, SensorId, SeriesQuery, TimeWindow,
    aggregate_in,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::executor::{RequestConfig, RequestExecutor};

/// Outcome of one sensor in a multi-sensor fetch.
#[derive(Debug, Clone)]
pub struct SensorSeries {
    /// Sensor the outcome belongs to.
    pub sensor_id: SensorId,
    /// Aggregated series, or why it could not be produced.
    pub outcome: Result<Vec<AggregatedPoint>, LumenError>,
}

#[derive(Deserialize)]
struct HeatmapEnvelope {
    grid: Vec<HeatmapCell>,
}

#[derive(Serialize)]
struct NewReading {
    sensor_id: SensorId,
    lux: f64,
}

/// Client for the data service's HTTP API.
#[derive(Debug, Clone)]
pub struct DataServiceClient {
    executor: RequestExecutor,
    base: Url,
    cfg: Arc<LumenConfig>,
}

impl DataServiceClient {
    /// Client for `cfg.base_url` issuing requests through `executor`.
    ///
    /// # Errors
    /// Returns `LumenError::InvalidArg` if the base URL does not parse or cannot carry a path.
    pub fn new(executor: RequestExecutor, cfg: LumenConfig) -> Result<Self, LumenError> {
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| LumenError::invalid_arg(format!("base url {:?}: {e}", cfg.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(LumenError::invalid_arg(format!(
                "base url {:?} cannot carry a path",
                cfg.base_url
            )));
        }
        Ok(Self {
            executor,
            base,
            cfg: Arc::new(cfg),
        })
    }

    /// Underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LumenConfig {
        &self.cfg
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url
    }

    fn read_config(&self, ttl: Duration, token: &CancellationToken) -> RequestConfig {
        RequestConfig::from(self.cfg.request)
            .cache_ttl(ttl)
            .cancellation(token.clone())
    }

    /// URL of the series endpoint for `query`, resolving relative windows against `now`.
    #[must_use]
    pub fn series_url(&self, query: &SeriesQuery, now: DateTime<Utc>) -> Url {
        let mut url = self.endpoint("api/series");
        let (from, to) = query.window.bounds(now);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("sensorId", &query.sensor_id.to_string());
            if let Some(from) = from {
                pairs.append_pair("from", &from.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
            if let Some(to) = to {
                pairs.append_pair("to", &to.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
        }
        url
    }

    // Relative windows get a stable key per service, sensor and window so the
    // key space stays bounded; absolute windows key on their full URL.
    fn series_cache_key(&self, query: &SeriesQuery) -> Option<String> {
        let window = match query.window {
            TimeWindow::All => "all".to_string(),
            TimeWindow::LastHours(h) => format!("last{h}h"),
            TimeWindow::Between { .. } => return None,
        };
        let endpoint = self.endpoint("api/series");
        Some(format!(
            "GET:{endpoint}?sensorId={}&window={window}",
            query.sensor_id
        ))
    }

    /// Raw samples of one sensor over a window, oldest first as served.
    ///
    /// Rows with a missing or unparseable timestamp or value, and rows older
    /// than the window start, are dropped.
    ///
    /// # Errors
    /// Executor errors, or `Data` if the payload is not a JSON array.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            target = "lumen::client",
            skip(self, token),
            fields(sensor_id = query.sensor_id),
        )
    )]
    pub async fn series(
        &self,
        query: &SeriesQuery,
        token: &CancellationToken,
    ) -> Result<Vec<Sample>, LumenError> {
        let now = Utc::now();
        let url = self.series_url(query, now);
        let mut req = self.read_config(self.cfg.series_cache_ttl, token);
        if let Some(key) = self.series_cache_key(query) {
            req = req.cache_key(key);
        }
        let payload = self.executor.execute(url.as_str(), &req).await?;
        let (since, _) = query.window.bounds(now);
        decode_samples(&payload, &self.cfg.value_field, since)
    }

    /// Samples of one sensor re-bucketed with the configured interval and zone.
    ///
    /// # Errors
    /// See [`series`](Self::series).
    pub async fn aggregated_series(
        &self,
        query: &SeriesQuery,
        token: &CancellationToken,
    ) -> Result<Vec<AggregatedPoint>, LumenError> {
        let samples = self.series(query, token).await?;
        Ok(aggregate_in(
            &samples,
            self.cfg.bucket_interval,
            &self.cfg.time_zone,
        ))
    }

    /// Aggregated series for several sensors, fetched concurrently on the current task.
    ///
    /// One sensor failing does not affect the others.
    pub async fn series_for_sensors(
        &self,
        sensors: &[SensorId],
        window: TimeWindow,
        token: &CancellationToken,
    ) -> Vec<SensorSeries> {
        let calls = sensors.iter().map(|&sensor_id| async move {
            let outcome = self
                .aggregated_series(&SeriesQuery::new(sensor_id, window), token)
                .await;
            #[cfg(feature = "tracing")]
            if let Err(e) = &outcome {
                tracing::warn!(target: "lumen::client", sensor_id, error = %e, "sensor series failed");
            }
            SensorSeries { sensor_id, outcome }
        });
        futures::future::join_all(calls).await
    }

    /// Latest reading of every sensor with its grid position.
    ///
    /// # Errors
    /// Executor errors, or `Data` if the payload has no `grid` array of cells.
    pub async fn heatmap(&self, token: &CancellationToken) -> Result<Vec<HeatmapCell>, LumenError> {
        let url = self.endpoint("api/heatmap");
        let req = self.read_config(self.cfg.heatmap_cache_ttl, token);
        let env: HeatmapEnvelope = self.executor.execute_json(url.as_str(), &req).await?;
        Ok(env.grid)
    }

    /// Server-side aggregate rows for a report range.
    ///
    /// # Errors
    /// Executor errors, or `Data` if the payload is not a list of rows.
    pub async fn reports(
        &self,
        range: ReportRange,
        token: &CancellationToken,
    ) -> Result<Vec<ReportRow>, LumenError> {
        let mut url = self.endpoint("api/reports");
        url.query_pairs_mut().append_pair("range", range.as_str());
        let req = self.read_config(self.cfg.reports_cache_ttl, token);
        self.executor.execute_json(url.as_str(), &req).await
    }

    /// Submit one reading. Never cached and never retried, since a repeated
    /// insert would store the reading twice.
    ///
    /// # Errors
    /// Executor errors; a rejected reading surfaces as `Http { status: 400, .. }`
    /// with the service's error document.
    pub async fn submit_reading(
        &self,
        sensor_id: SensorId,
        lux: f64,
        token: &CancellationToken,
    ) -> Result<ReadingReceipt, LumenError> {
        let url = self.endpoint("api/lecturas");
        let req = RequestConfig::from(self.cfg.request)
            .method(Method::Post)
            .retries(0)
            .cancellation(token.clone())
            .json_body(&NewReading { sensor_id, lux })?;
        self.executor.execute_json(url.as_str(), &req).await
    }
}

/// Decode a series payload into samples.
///
/// Each row must carry an RFC 3339 `ts` and a numeric (or numeric string)
/// `value_field`; rows that do not, and rows older than `since`, are skipped.
///
/// # Errors
/// Returns `LumenError::Data` if the payload is not a JSON array.
pub fn decode_samples(
    payload: &Payload,
    value_field: &str,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Sample>, LumenError> {
    let Some(serde_json::Value::Array(rows)) = payload.as_json() else {
        return Err(LumenError::data("series payload is not a JSON array"));
    };

    let parsed: Vec<Sample> = rows
        .iter()
        .filter_map(|row| parse_row(row, value_field))
        .collect();

    #[cfg(feature = "tracing")]
    if parsed.len() < rows.len() {
        tracing::warn!(
            target: "lumen::client",
            malformed = rows.len() - parsed.len(),
            parsed = parsed.len(),
            "dropped malformed series rows"
        );
    }

    let out = parsed
        .into_iter()
        .filter(|sample| since.is_none_or(|from| sample.ts >= from))
        .collect();
    Ok(out)
}

fn parse_row(row: &serde_json::Value, value_field: &str) -> Option<Sample> {
    let ts = row.get("ts")?.as_str()?;
    let ts = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    let value = match row.get(value_field)? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(Sample::new(ts, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn client_for(base_url: &str) -> DataServiceClient {
        let executor = RequestExecutor::with_transport(Arc::new(crate::ReqwestTransport::new()));
        let cfg = LumenConfig {
            base_url: base_url.to_string(),
            ..LumenConfig::default()
        };
        DataServiceClient::new(executor, cfg).unwrap()
    }

    #[test]
    fn series_keys_cover_every_window_and_carry_the_service() {
        let client = client_for("http://a.test:3000");
        assert_eq!(
            client.series_cache_key(&SeriesQuery::new(3, TimeWindow::All)),
            Some("GET:http://a.test:3000/api/series?sensorId=3&window=all".to_string())
        );
        assert_eq!(
            client.series_cache_key(&SeriesQuery::new(3, TimeWindow::LastHours(6))),
            Some("GET:http://a.test:3000/api/series?sensorId=3&window=last6h".to_string())
        );
        let between = TimeWindow::Between {
            from: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            to: None,
        };
        assert_eq!(client.series_cache_key(&SeriesQuery::new(3, between)), None);

        let other = client_for("http://b.test:3000");
        let q = SeriesQuery::new(3, TimeWindow::LastHours(6));
        assert_ne!(client.series_cache_key(&q), other.series_cache_key(&q));
    }

    #[test]
    fn decode_skips_bad_rows_and_old_rows() {
        let payload = Payload::Json(json!([
            { "ts": "2024-05-01T09:01:00.000Z", "lux": 10 },
            { "ts": "2024-05-01T09:02:00Z", "lux": "20.5" },
            { "ts": "not a date", "lux": 1 },
            { "lux": 1 },
            { "ts": "2024-05-01T09:03:00Z", "lux": null },
            { "ts": "2024-05-01T08:00:00Z", "lux": 99 },
        ]));
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let out = decode_samples(&payload, "lux", Some(since)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].value, 20.5);
    }

    #[test]
    fn decode_honours_custom_value_field() {
        let payload = Payload::Json(json!([
            { "ts": "2024-05-01T09:01:00+02:00", "irradiance": 512.0 }
        ]));
        let out = decode_samples(&payload, "irradiance", None).unwrap();
        assert_eq!(out[0].ts, Utc.with_ymd_and_hms(2024, 5, 1, 7, 1, 0).unwrap());
        assert!(decode_samples(&payload, "lux", None).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_non_arrays() {
        assert!(matches!(
            decode_samples(&Payload::Json(json!({ "error": "x" })), "lux", None),
            Err(LumenError::Data(_))
        ));
        assert!(matches!(
            decode_samples(&Payload::Text("[]".into()), "lux", None),
            Err(LumenError::Data(_))
        ));
    }
}
