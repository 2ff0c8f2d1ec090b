use crate::config::MailerConfig;
use crate::error::{AppError, AppResult};
use crate::models::AllocationView;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Notice of a successful plan allocation. Implementations must never fail the
/// allocation that triggered them; delivery errors stay internal.
#[async_trait]
pub trait PlanNotifier: Send + Sync {
    async fn plan_purchased(&self, email: &str, issuer_name: &str, latest: &AllocationView);
}

#[derive(Clone)]
pub struct MailerService {
    client: Client,
    config: MailerConfig,
}

impl MailerService {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn deliver(&self, to: &str, subject: &str, body: serde_json::Value) -> AppResult<()> {
        let url = format!("{}/v1/mail/send", self.config.base_url);

        let payload = json!({
            "from": self.config.sender,
            "to": to,
            "subject": subject,
            "body": body,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Failed to send mail: {error_text}"
            )))
        }
    }

    /// Relays a payment grievance to the support inbox. Unlike plan-purchase
    /// notices this is the operation itself, so failures propagate.
    pub async fn send_grievance(
        &self,
        issuer_email: &str,
        issuer_name: &str,
        payment_id: &str,
    ) -> AppResult<()> {
        self.deliver(
            &self.config.support_inbox,
            "Payment grievance",
            json!({
                "issuer_email": issuer_email,
                "issuer_name": issuer_name,
                "payment_id": payment_id,
            }),
        )
        .await
    }
}

#[async_trait]
impl PlanNotifier for MailerService {
    async fn plan_purchased(&self, email: &str, issuer_name: &str, latest: &AllocationView) {
        let mailer = self.clone();
        let email = email.to_owned();
        let issuer_name = issuer_name.to_owned();
        let latest = latest.clone();

        // Delivery happens off the request path; the allocation already
        // succeeded and must not wait on, or fail with, the mail API.
        tokio::spawn(async move {
            let subject = format!("{} plan activated", latest.plan_title);
            let body = json!({
                "issuer_name": issuer_name,
                "plan": latest,
            });
            if let Err(e) = mailer.deliver(&email, &subject, body).await {
                log::error!("Failed to send plan purchase mail to {email}: {e:?}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailer_service_creation() {
        let config = MailerConfig {
            base_url: "https://mail.example.com".to_string(),
            api_key: "key_123".to_string(),
            sender: "noreply@example.com".to_string(),
            support_inbox: "support@example.com".to_string(),
        };
        let service = MailerService::new(config);
        assert!(!service.config.api_key.is_empty());
    }
}
