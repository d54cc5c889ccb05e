use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Thin Resend client. Without an API key, sends are logged and dropped so
/// local development works without credentials.
pub struct ResendMailer {
    client: Client,
    api_key: Option<String>,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            from,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let Some(api_key) = &self.api_key else {
            warn!("RESEND_API_KEY not set; skipping email \"{subject}\" to {to}");
            return Ok(());
        };

        let body = ResendRequest {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post(RESEND_URL)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("Response read failed: {e}"))?;

        if status.is_success() {
            Ok(())
        } else {
            Err(format!("Resend error {status}: {text}"))
        }
    }
}
