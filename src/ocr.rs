// src/ocr.rs

use crate::camera::CapturedImage;
use crate::config::OcrConfig;
use crate::recognizer::{RecognizerUpdate, TextRecognizer};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Maximum number of status polls before the pass is reported as failed.
const MAX_POLLS: u32 = 60;

/// Recognizer backed by a remote OCR service: submit the encoded image,
/// then poll the returned operation URL until the service resolves.
/// The heavy lifting happens entirely on the service side — this client
/// only moves bytes and forwards progress.
pub struct RemoteOcr {
    http: Client,
    endpoint: String,
    api_key: String,
    poll_interval: Duration,
}

impl RemoteOcr {
    pub fn new(http: Client, config: &OcrConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            poll_interval: Duration::from_secs(2),
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn run(
        http: Client,
        endpoint: String,
        api_key: String,
        poll_interval: Duration,
        image: CapturedImage,
        language: String,
        updates: &mpsc::Sender<RecognizerUpdate>,
    ) -> Result<String, String> {
        let url = format!("{endpoint}?language={language}");
        info!(bytes = image.bytes.len(), language = %language, "Submitting image for recognition");

        let response = http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &api_key)
            .header("Content-Type", "application/octet-stream")
            .body(image.bytes)
            .send()
            .await
            .map_err(|e| format!("submit failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("OCR service rejected the image ({status}): {body}"));
        }

        let operation_url = response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .ok_or("no Operation-Location in OCR response")?
            .to_string();

        for attempt in 1..=MAX_POLLS {
            tokio::time::sleep(poll_interval).await;

            let poll: serde_json::Value = http
                .get(&operation_url)
                .header("Ocp-Apim-Subscription-Key", &api_key)
                .send()
                .await
                .map_err(|e| format!("poll failed: {e}"))?
                .json()
                .await
                .map_err(|e| format!("invalid poll JSON: {e}"))?;

            match poll.get("status").and_then(|s| s.as_str()).unwrap_or("") {
                "succeeded" => {
                    let text = recognized_text(&poll)
                        .ok_or("no recognized text in OCR result")?;
                    info!(chars = text.len(), polls = attempt, "Recognition complete");
                    return Ok(text);
                }
                "failed" => {
                    let reason = poll
                        .get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .unwrap_or("unknown error");
                    return Err(format!("OCR analysis failed: {reason}"));
                }
                _ => {
                    // Prefer the service-reported fraction, fall back to the
                    // poll count so the bar still moves on silent services.
                    let fraction = poll
                        .get("progress")
                        .and_then(|p| p.as_f64())
                        .unwrap_or(f64::from(attempt) / f64::from(MAX_POLLS));
                    let _ = updates.send(RecognizerUpdate::Progress(fraction)).await;
                }
            }
        }

        Err("OCR service did not resolve in time".to_string())
    }
}

/// Pull the plain text out of a completed operation: a top-level content
/// string when the service provides one, otherwise the per-page lines
/// joined with newlines.
fn recognized_text(poll: &serde_json::Value) -> Option<String> {
    let result = poll.get("analyzeResult")?;
    if let Some(content) = result.get("content").and_then(|c| c.as_str()) {
        return Some(content.to_string());
    }
    let pages = result.get("pages")?.as_array()?;
    let empty = Vec::new();
    let mut lines = Vec::new();
    for page in pages {
        let page_lines = page.get("lines").and_then(|l| l.as_array()).unwrap_or(&empty);
        for line in page_lines {
            if let Some(text) = line.get("content").and_then(|c| c.as_str()) {
                lines.push(text.to_string());
            }
        }
    }
    Some(lines.join("\n"))
}

impl TextRecognizer for RemoteOcr {
    fn recognize(&self, image: CapturedImage, language: &str) -> mpsc::Receiver<RecognizerUpdate> {
        let (tx, rx) = mpsc::channel(16);
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let poll_interval = self.poll_interval;
        let language = language.to_string();

        tokio::spawn(async move {
            let terminal =
                match Self::run(http, endpoint, api_key, poll_interval, image, language, &tx).await
                {
                    Ok(text) => RecognizerUpdate::Completed(text),
                    Err(reason) => {
                        warn!(reason = %reason, "Remote OCR pass failed");
                        RecognizerUpdate::Failed(reason)
                    }
                };
            let _ = tx.send(terminal).await;
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::await_text;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> OcrConfig {
        OcrConfig {
            endpoint: format!("{}/analyze", server.uri()),
            api_key: "test-key".to_string(),
            language: "spa".to_string(),
        }
    }

    fn image() -> CapturedImage {
        CapturedImage {
            bytes: b"jpeg bytes".to_vec(),
        }
    }

    #[tokio::test]
    async fn polls_until_succeeded_and_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Operation-Location", format!("{}/op/1", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/op/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "running",
                "progress": 0.5
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/op/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "succeeded",
                "analyzeResult": { "content": "Total: 12,50" }
            })))
            .mount(&server)
            .await;

        let ocr = RemoteOcr::new(Client::new(), &test_config(&server))
            .with_poll_interval(Duration::from_millis(5));
        let updates = ocr.recognize(image(), "spa");

        let mut seen = Vec::new();
        let text = await_text(updates, |p| seen.push(p)).await.unwrap();
        assert_eq!(text, "Total: 12,50");
        assert_eq!(seen, vec![0.5]);
    }

    #[tokio::test]
    async fn service_rejection_is_a_failed_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let ocr = RemoteOcr::new(Client::new(), &test_config(&server))
            .with_poll_interval(Duration::from_millis(5));
        let err = await_text(ocr.recognize(image(), "spa"), |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[tokio::test]
    async fn failed_operation_carries_service_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Operation-Location", format!("{}/op/2", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/op/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "failed",
                "error": { "message": "image too blurry" }
            })))
            .mount(&server)
            .await;

        let ocr = RemoteOcr::new(Client::new(), &test_config(&server))
            .with_poll_interval(Duration::from_millis(5));
        let err = await_text(ocr.recognize(image(), "spa"), |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("image too blurry"));
    }

    #[test]
    fn joins_page_lines_when_no_content_field() {
        let poll = serde_json::json!({
            "analyzeResult": {
                "pages": [
                    { "lines": [ { "content": "ACME Corp Ltd" }, { "content": "Total: 9,99" } ] }
                ]
            }
        });
        assert_eq!(
            recognized_text(&poll).unwrap(),
            "ACME Corp Ltd\nTotal: 9,99"
        );
    }
}
