// src/sheets.rs

use crate::config::SheetsConfig;
use crate::heuristics::InvoiceRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

#[derive(Debug, Error)]
pub enum AppendError {
    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ledger rejected the append ({status}): {body}")]
    Status { status: u16, body: String },
}

/// Seam the flow session appends through, so it can be driven against a
/// stub ledger in tests.
#[async_trait]
pub trait LedgerAppend: Send {
    async fn append(&self, record: &InvoiceRecord) -> Result<(), AppendError>;
}

#[derive(Serialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

/// Thin client for the spreadsheet append endpoint. Append-only: one
/// network write per call, never reads, never overwrites existing rows.
/// No retry and no idempotency key — a second call after a timeout may
/// append a duplicate row, which is accepted.
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: String,
    range: String,
}

impl SheetsClient {
    /// Destination and credential always arrive through configuration,
    /// never as embedded literals.
    pub fn new(http: Client, config: &SheetsConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_key: config.resolved_api_key(),
            range: config.range.clone(),
        }
    }

    async fn append_at(&self, record: &InvoiceRecord, captured_at: String) -> Result<(), AppendError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=RAW&key={}",
            self.base_url, self.spreadsheet_id, self.range, self.api_key
        );

        // Fixed column order: timestamp, date, vendor, number, total, excerpt.
        let body = AppendBody {
            values: vec![vec![
                captured_at,
                record.date.clone(),
                record.vendor.clone(),
                record.invoice_number.clone(),
                record.total.clone(),
                record.excerpt.clone(),
            ]],
        };

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            spreadsheet = %self.spreadsheet_id,
            range = %self.range,
            vendor = %record.vendor,
            total = %record.total,
            "Row appended to ledger"
        );
        Ok(())
    }
}

#[async_trait]
impl LedgerAppend for SheetsClient {
    /// Append one record as a row. The `captured_at` timestamp is stamped
    /// here, at append time, not at capture time.
    async fn append(&self, record: &InvoiceRecord) -> Result<(), AppendError> {
        let captured_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        self.append_at(record, captured_at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> SheetsConfig {
        SheetsConfig {
            spreadsheet_id: "sheet-1".to_string(),
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            range: "A1".to_string(),
        }
    }

    fn record() -> InvoiceRecord {
        InvoiceRecord {
            date: "2024-03-05".to_string(),
            vendor: "ACME Corp Ltd".to_string(),
            invoice_number: "A-1023".to_string(),
            total: "12.50".to_string(),
            excerpt: "ACME Corp Ltd\nTotal: 12,50".to_string(),
        }
    }

    #[tokio::test]
    async fn appends_row_in_fixed_column_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1/values/A1:append"))
            .and(query_param("valueInputOption", "RAW"))
            .and(query_param("key", "test-key"))
            .and(body_json(serde_json::json!({
                "values": [[
                    "2026-08-27T10:00:00Z",
                    "2024-03-05",
                    "ACME Corp Ltd",
                    "A-1023",
                    "12.50",
                    "ACME Corp Ltd\nTotal: 12,50"
                ]]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = SheetsClient::new(Client::new(), &test_config(&server));
        client
            .append_at(&record(), "2026-08-27T10:00:00Z".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_2xx_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("key invalid"))
            .mount(&server)
            .await;

        let client = SheetsClient::new(Client::new(), &test_config(&server));
        let err = client.append(&record()).await.unwrap_err();
        match err {
            AppendError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "key invalid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
