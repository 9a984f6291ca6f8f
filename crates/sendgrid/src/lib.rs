//! SendGrid email service using the v3 Mail Send API.
//!
//! Sends fully rendered messages (no hosted templates). Sandbox mode
//! asks SendGrid to validate the message without delivering it, which
//! keeps staging environments from emailing real applicants.
//!
//! # Configuration
//!
//! Environment variables:
//! - `EMAIL_SENDER` - Sender in format "Name <email@example.com>"
//! - `SENDGRID_API_KEY` - API key, always prefixed "SG."
//!
//! # Example
//!
//! ```ignore
//! let service = SendGridService::new(config);
//! service.send("applicant@example.com", "Maria", "Assunto", html, text).await?;
//! ```

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

/// SendGrid API endpoint for sending emails.
const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Email service errors.
#[derive(Debug, thiserror::Error)]
pub enum SendGridError {
    #[error("Failed to send email: {0}")]
    SendError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// SendGrid service configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    /// SendGrid API key.
    pub api_key: SecretString,
    /// Sender name.
    pub sender_name: String,
    /// Sender email address (must be verified in SendGrid).
    pub sender_email: String,
    /// Validate without delivering (SendGrid sandbox mode).
    pub sandbox: bool,
    /// API endpoint. Overridable for tests.
    pub api_url: String,
}

impl SendGridConfig {
    /// Creates a configuration for the production endpoint.
    #[must_use]
    pub fn new(api_key: SecretString, sender_name: &str, sender_email: &str) -> Self {
        Self {
            api_key,
            sender_name: sender_name.to_string(),
            sender_email: sender_email.to_string(),
            sandbox: false,
            api_url: SENDGRID_API_URL.to_string(),
        }
    }
}

/// SendGrid email service.
#[derive(Clone)]
pub struct SendGridService {
    client: Client,
    config: SendGridConfig,
}

impl std::fmt::Debug for SendGridService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridService")
            .field("sender_email", &self.config.sender_email)
            .field("sender_name", &self.config.sender_name)
            .field("sandbox", &self.config.sandbox)
            .finish_non_exhaustive()
    }
}

// SendGrid v3 Mail Send request structures
#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: EmailAddress<'a>,
    subject: &'a str,
    content: [Content<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    mail_settings: Option<MailSettings>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [EmailAddress<'a>; 1],
}

#[derive(Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    name: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailSettings {
    sandbox_mode: SandboxMode,
}

#[derive(Serialize)]
struct SandboxMode {
    enable: bool,
}

impl SendGridService {
    /// Create a new SendGrid service.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to create.
    #[must_use]
    pub fn new(config: SendGridConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            sender = %config.sender_email,
            sandbox = config.sandbox,
            "SendGrid service initialized"
        );

        Self { client, config }
    }

    /// Send an email with HTML and plain text body.
    ///
    /// SendGrid acknowledges accepted messages with `202 Accepted`; any
    /// other status is reported as a send failure.
    ///
    /// # Errors
    /// Returns `SendGridError::SendError` if the email fails to send.
    #[instrument(skip(self, html_body, text_body), fields(to = %to_email, subject))]
    pub async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), SendGridError> {
        let request = SendRequest {
            personalizations: [Personalization {
                to: [EmailAddress {
                    email: to_email,
                    name: to_name,
                }],
            }],
            from: EmailAddress {
                email: &self.config.sender_email,
                name: &self.config.sender_name,
            },
            subject,
            // SendGrid requires text/plain before text/html
            content: [
                Content {
                    content_type: "text/plain",
                    value: text_body,
                },
                Content {
                    content_type: "text/html",
                    value: html_body,
                },
            ],
            mail_settings: self.config.sandbox.then_some(MailSettings {
                sandbox_mode: SandboxMode { enable: true },
            }),
        };

        debug!(to = %to_email, sandbox = self.config.sandbox, "Sending email via SendGrid");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| SendGridError::SendError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "SendGrid API error");
            return Err(SendGridError::SendError(format!("{status}: {body}")));
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        info!(to = %to_email, %message_id, "Email sent");
        Ok(())
    }

    /// Validate configuration (does not make network calls).
    ///
    /// # Errors
    /// Returns `SendGridError::ConfigError` if any required configuration is missing.
    pub fn validate_config(&self) -> Result<(), SendGridError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(SendGridError::ConfigError("API key is empty".to_string()));
        }
        if self.config.sender_email.is_empty() {
            return Err(SendGridError::ConfigError(
                "Sender email is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_config(api_url: String) -> SendGridConfig {
        SendGridConfig {
            api_key: SecretString::from("SG.test_key"),
            sender_name: "Credenciamento".to_string(),
            sender_email: "no-reply@example.com".to_string(),
            sandbox: false,
            api_url,
        }
    }

    #[test]
    fn validate_config_passes() {
        let service = SendGridService::new(test_config(SENDGRID_API_URL.to_string()));
        assert!(service.validate_config().is_ok());
    }

    #[test]
    fn validate_config_fails_with_empty_key() {
        let mut config = test_config(SENDGRID_API_URL.to_string());
        config.api_key = SecretString::from("");
        let service = SendGridService::new(config);
        assert!(service.validate_config().is_err());
    }

    #[tokio::test]
    async fn sends_with_bearer_auth_and_both_bodies() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/mail/send")
                    .header("authorization", "Bearer SG.test_key")
                    .json_body_partial(
                        r#"{
                            "subject": "Assunto",
                            "content": [
                                {"type": "text/plain", "value": "corpo"},
                                {"type": "text/html", "value": "<p>corpo</p>"}
                            ]
                        }"#,
                    );
                then.status(202).header("x-message-id", "msg-123");
            })
            .await;

        let service =
            SendGridService::new(test_config(format!("{}/v3/mail/send", server.base_url())));
        let result = service
            .send(
                "applicant@example.com",
                "Maria",
                "Assunto",
                "<p>corpo</p>",
                "corpo",
            )
            .await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn sandbox_mode_is_serialized_when_enabled() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/mail/send").json_body_partial(
                    r#"{"mail_settings": {"sandbox_mode": {"enable": true}}}"#,
                );
                then.status(202);
            })
            .await;

        let mut config = test_config(format!("{}/v3/mail/send", server.base_url()));
        config.sandbox = true;
        let service = SendGridService::new(config);
        let result = service
            .send("applicant@example.com", "Maria", "Assunto", "<p>x</p>", "x")
            .await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn api_error_surfaces_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/mail/send");
                then.status(401).body("{\"errors\":[{\"message\":\"bad key\"}]}");
            })
            .await;

        let service =
            SendGridService::new(test_config(format!("{}/v3/mail/send", server.base_url())));
        let err = service
            .send("applicant@example.com", "Maria", "Assunto", "<p>x</p>", "x")
            .await
            .unwrap_err();

        match err {
            SendGridError::SendError(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("bad key"));
            }
            SendGridError::ConfigError(_) => panic!("expected send error"),
        }
    }
}
