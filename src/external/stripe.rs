use crate::config::StripeConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
}

#[derive(Clone)]
pub struct StripeService {
    client: Client,
    config: StripeConfig,
}

/// Stripe takes integer cents; catalog fees are decimal dollars.
fn fee_to_cents(fee: f64) -> i64 {
    (fee * 100.0).round() as i64
}

impl StripeService {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// One-time card payment for a plan purchase. Redirect URLs come from the
    /// caller; plan terms ride along as session metadata.
    pub async fn create_checkout_session(
        &self,
        plan_name: &str,
        fee: f64,
        credits: i64,
        rate: f64,
        success_url: &str,
        cancel_url: &str,
    ) -> AppResult<CheckoutSession> {
        let url = "https://api.stripe.com/v1/checkout/sessions";

        let params = [
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                fee_to_cents(fee).to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                format!("{plan_name} plan"),
            ),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("metadata[name]", format!("{plan_name} plan")),
            ("metadata[price]", fee.to_string()),
            ("metadata[credits]", credits.to_string()),
            ("metadata[rate]", rate.to_string()),
        ];

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let session: CheckoutSession = response.json().await?;
            Ok(session)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Failed to create checkout session: {error_text}"
            )))
        }
    }

    pub async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
        let url = format!("https://api.stripe.com/v1/checkout/sessions/{session_id}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        if response.status().is_success() {
            let session: CheckoutSession = response.json().await?;
            Ok(session)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Failed to retrieve checkout session: {error_text}"
            )))
        }
    }
}
