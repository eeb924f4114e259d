use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::{GatewayError, GatewayResult};
use crate::domain::format_amount;

/// What to charge for.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
    pub currency: String,
    /// Our reference, e.g. the invoice number.
    pub reference: String,
}

/// Handle the payer uses to approve the checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutHandle {
    pub provider_order_id: String,
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Completed,
    Pending,
    Declined,
    Refunded,
    Other,
}

impl CaptureStatus {
    pub fn from_provider(status: &str) -> Self {
        match status {
            "COMPLETED" => CaptureStatus::Completed,
            "PENDING" => CaptureStatus::Pending,
            "DECLINED" | "FAILED" => CaptureStatus::Declined,
            "REFUNDED" | "PARTIALLY_REFUNDED" => CaptureStatus::Refunded,
            _ => CaptureStatus::Other,
        }
    }
}

/// Provider-side truth about a captured transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub transaction_id: String,
    pub status: CaptureStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub payer_email: Option<String>,
    /// The `reference` the checkout was opened with, as echoed by the provider.
    pub invoice_reference: Option<String>,
}

/// Payment provider. Capture status is always re-read from the provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutHandle>;

    async fn fetch_capture(&self, transaction_id: &str) -> GatewayResult<CaptureReport>;
}

/// Parses a decimal provider amount (`"82.49"`) into cents.
pub fn parse_amount(value: &str) -> GatewayResult<i64> {
    let invalid = || GatewayError::Protocol(format!("Invalid amount: {:?}", value));
    let (whole, fraction) = value.trim().split_once('.').unwrap_or((value.trim(), "0"));
    if fraction.len() > 2 {
        return Err(invalid());
    }
    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let fraction: i64 = format!("{:0<2}", fraction).parse().map_err(|_| invalid())?;
    Ok(whole * 100 + fraction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalMode {
    Sandbox,
    Live,
}

impl PayPalMode {
    fn base_url(self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "https://api-m.sandbox.paypal.com",
            PayPalMode::Live => "https://api-m.paypal.com",
        }
    }
}

/// PayPal REST client (Orders v2 + Payments v2).
pub struct PayPalClient {
    client_id: String,
    client_secret: String,
    mode: PayPalMode,
    client: Client,
    token: Mutex<Option<AccessToken>>,
}

/// Tokens are refreshed this long before the provider expires them.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn new(value: String, expires_in: u64, issued_at: Instant) -> Self {
        let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_MARGIN);
        Self { value, expires_at: issued_at + lifetime }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Deserialize)]
struct CreatedOrder {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct Money {
    currency_code: String,
    value: String,
}

#[derive(Deserialize)]
struct Capture {
    id: String,
    status: String,
    amount: Money,
    #[serde(default)]
    invoice_id: Option<String>,
}

impl PayPalClient {
    pub fn new(client_id: String, client_secret: String, mode: PayPalMode) -> Self {
        Self {
            client_id,
            client_secret,
            mode,
            client: Client::new(),
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> GatewayResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }
        let issued_at = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.mode.base_url()))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let response = Self::check(response).await?;
        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Access token refreshed");
        *cached = Some(AccessToken::new(token.access_token.clone(), token.expires_in, issued_at));
        Ok(token.access_token)
    }

    async fn check(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        Err(GatewayError::Rejected(format!("PayPal API error ({}): {}", status, body)))
    }
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    #[instrument(skip(self), fields(reference = %request.reference))]
    async fn create_checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.reference,
                "invoice_id": request.reference,
                "amount": {
                    "currency_code": request.currency,
                    "value": format_amount(request.amount_cents),
                }
            }]
        });
        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.mode.base_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let created: CreatedOrder = Self::check(response).await?.json().await?;
        let approval_url = created
            .links
            .into_iter()
            .find(|l| l.rel == "approve" || l.rel == "payer-action")
            .map(|l| l.href);
        debug!(provider_order_id = %created.id, "Checkout created");
        Ok(CheckoutHandle { provider_order_id: created.id, approval_url })
    }

    #[instrument(skip(self))]
    async fn fetch_capture(&self, transaction_id: &str) -> GatewayResult<CaptureReport> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}/v2/payments/captures/{}", self.mode.base_url(), transaction_id))
            .bearer_auth(token)
            .send()
            .await?;
        let capture: Capture = Self::check(response).await?.json().await?;
        Ok(CaptureReport {
            transaction_id: capture.id,
            status: CaptureStatus::from_provider(&capture.status),
            amount_cents: parse_amount(&capture.amount.value)?,
            currency: capture.amount.currency_code,
            payer_email: None,
            invoice_reference: capture.invoice_id,
        })
    }
}

/// Stand-in used when no provider credentials are configured: every call fails.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredPayments;

#[async_trait]
impl PaymentProvider for UnconfiguredPayments {
    async fn create_checkout(&self, _request: CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        Err(GatewayError::NotConfigured("payment provider".into()))
    }

    async fn fetch_capture(&self, _transaction_id: &str) -> GatewayResult<CaptureReport> {
        Err(GatewayError::NotConfigured("payment provider".into()))
    }
}
