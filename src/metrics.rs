use std::collections::HashMap;
use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use reqwest::{self, Client, ClientBuilder};
use serde_derive::Deserialize;
use url::Url;

use crate::core::GenericResult;
use crate::error::{ReportError, ReportResult};
use crate::types::{DataPoint, ReportWindow};

pub const DIMENSION_NAME: &str = "HealthcheckTarget";
pub const PERIOD: Duration = Duration::from_secs(300);

/// Maximum of the metric per period for a single dimension value.
pub struct MetricQuery<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub dimension_value: &'a str,
    pub window: ReportWindow,
}

impl MetricQuery<'_> {
    pub fn selector(&self) -> String {
        let labels = [
            ("__name__", self.name),
            ("namespace", self.namespace),
            (DIMENSION_NAME, self.dimension_value),
        ];

        let mut selector = String::from("{");

        for (index, (name, value)) in labels.iter().enumerate() {
            if index != 0 {
                selector.push_str(", ");
            }
            _ = write!(&mut selector, "{name}=\"{}\"", escape_label_value(value));
        }

        selector.push('}');
        selector
    }

    pub fn expression(&self) -> String {
        format!("max_over_time({}[{}s])", self.selector(), PERIOD.as_secs())
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for char in value.chars() {
        match char {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(char),
        }
    }

    escaped
}

#[allow(async_fn_in_trait)]
pub trait MetricsSource {
    /// Returns the points of a single series within the query window in any order.
    async fn query(&self, query: &MetricQuery<'_>) -> ReportResult<Vec<DataPoint>>;
}

pub struct VictoriaMetrics {
    url: Url,
    client: Client,
}

impl VictoriaMetrics {
    pub fn new(url: &Url) -> GenericResult<VictoriaMetrics> {
        Ok(VictoriaMetrics {
            url: url.clone(),
            client: new_client()?,
        })
    }
}

impl MetricsSource for VictoriaMetrics {
    async fn query(&self, query: &MetricQuery<'_>) -> ReportResult<Vec<DataPoint>> {
        let mut query_url = self.url.join("/api/v1/query_range").map_err(|e| ReportError::Query(format!(
            "Invalid URL: {e}")))?;

        let expression = query.expression();
        debug!("Querying {expression} over {}...", query.window);

        query_url.query_pairs_mut()
            .append_pair("query", &expression)
            .append_pair("start", &query.window.start.timestamp().to_string())
            .append_pair("end", &query.window.end.timestamp().to_string())
            .append_pair("step", &format!("{}s", PERIOD.as_secs()));

        let response = self.client.get(query_url).send().await.map_err(|e| {
            if e.is_connect() {
                ReportError::Query(format!("Failed to establish connection to VictoriaMetrics: {e}"))
            } else {
                ReportError::Query(format!("VictoriaMetrics connection error: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(ReportError::Query(format!(
                "VictoriaMetrics returned an error ({status}): {}", message.trim())));
        }

        let body = response.text().await.map_err(|e| ReportError::Query(format!(
            "VictoriaMetrics connection error: {e}")))?;
        trace!("Query response: {body}");

        parse_response(&body, &query.window)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    data: Option<QueryData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: Vec<RangeSeries>,
}

#[derive(Deserialize)]
struct RangeSeries {
    #[serde(default)]
    metric: HashMap<String, String>,
    values: Vec<(f64, String)>,
}

fn parse_response(body: &str, window: &ReportWindow) -> ReportResult<Vec<DataPoint>> {
    let response: QueryResponse = serde_json::from_str(body).map_err(|e| ReportError::Query(format!(
        "Got an invalid response ({e})")))?;

    if response.status != "success" {
        return Err(ReportError::Query(format!("The query has failed ({}): {}",
            response.status, response.error.as_deref().unwrap_or("unknown error"))));
    }

    let data = response.data.ok_or_else(|| ReportError::Query(
        "Got a response without data".to_owned()))?;

    if data.result_type != "matrix" {
        return Err(ReportError::Query(format!("Got an unexpected result type: {}", data.result_type)));
    }

    let mut result = data.result.into_iter();
    let Some(series) = result.next() else {
        return Ok(Vec::new());
    };

    if result.next().is_some() {
        return Err(ReportError::Query(format!(
            "The query matches more than one time series (including {:?})", series.metric)));
    }

    let mut points = Vec::with_capacity(series.values.len());

    for (timestamp, value) in series.values {
        let timestamp = DateTime::from_timestamp_millis((timestamp * 1000.0).round() as i64)
            .ok_or_else(|| ReportError::Query(format!("Got an invalid timestamp: {timestamp}")))?;

        let value: f64 = value.parse().map_err(|_| ReportError::Query(format!(
            "Got an invalid value: {value:?}")))?;

        if window.contains(timestamp) {
            points.push(DataPoint {timestamp, value});
        }
    }

    Ok(points)
}

fn new_client() -> GenericResult<Client> {
    Ok(ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}
