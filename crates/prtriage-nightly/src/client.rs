use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use prtriage_core::{NightlyConfig, TriageError};
use prtriage_engine::source::{NightlyReport, NightlyReports, NightlyTests};
use serde::Deserialize;

/// Reader for the nightly report board API.
///
/// Reports are listed by `GET {api_url}/reports` filtered on date, version
/// (the tested branch) and campaign; the first match is the day's report.
///
/// # Examples
///
/// ```
/// use prtriage_core::NightlyConfig;
/// use prtriage_nightly::NightlyClient;
///
/// let client = NightlyClient::new(&NightlyConfig::default()).unwrap();
/// ```
pub struct NightlyClient {
    client: reqwest::Client,
    api_url: String,
}

impl NightlyClient {
    /// Create a client for the configured board.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Nightly`] if the HTTP client cannot be built.
    pub fn new(config: &NightlyConfig) -> Result<Self, TriageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TriageError::Nightly(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl NightlyReports for NightlyClient {
    async fn report(
        &self,
        date: NaiveDate,
        branch: &str,
        campaign: &str,
    ) -> Result<Option<NightlyReport>, TriageError> {
        let url = format!("{}/reports", self.api_url);
        let date = date.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("filter_date", date.as_str()),
                ("filter_version", branch),
                ("filter_campaign", campaign),
            ])
            .send()
            .await
            .map_err(|e| TriageError::Nightly(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TriageError::Nightly(format!(
                "nightly API error {status}: {body_text}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TriageError::Nightly(format!("failed to parse response: {e}")))?;
        let report = first_report(body)?;
        tracing::debug!(%branch, %campaign, found = report.is_some(), "nightly report lookup");
        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct ReportWire {
    id: u64,
    start_date: String,
    end_date: String,
    #[serde(default)]
    tests: Option<NightlyTests>,
}

/// Board timestamps come either as RFC 3339 or as `YYYY-MM-DD HH:MM:SS` UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TriageError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| TriageError::Nightly(format!("invalid timestamp '{value}': {e}")))
}

fn first_report(body: serde_json::Value) -> Result<Option<NightlyReport>, TriageError> {
    let reports: Vec<ReportWire> = serde_json::from_value(body)?;
    let Some(wire) = reports.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(NightlyReport {
        id: wire.id,
        start_date: parse_timestamp(&wire.start_date)?,
        end_date: parse_timestamp(&wire.end_date)?,
        tests: wire.tests,
    }))
}
