// REST gateway for a JSON spot venue with HMAC-signed private endpoints

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

use crate::clients::gateway::ExchangeGateway;
use crate::config::ExchangeConfig;
use crate::core::types::{Balances, OpenOrder, Side, Ticker};
use crate::error::{TradingError, TradingResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    currency: String,
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct PlacedOrder {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DepositAddress {
    address: String,
}

#[derive(Debug, Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    base_currency: String,
    quote_currency: String,
}

impl RestGateway {
    pub fn new(config: &ExchangeConfig) -> TradingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_currency: config.base_currency.clone(),
            quote_currency: config.quote_currency.clone(),
        })
    }

    /// base64(HMAC-SHA256(secret, timestamp + METHOD + path + body))
    fn sign(&self, timestamp: &str, method: &Method, path: &str, body: &str) -> TradingResult<String> {
        let secret_bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.api_secret)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(&self.api_secret))
            .map_err(|e| TradingError::ApiAuthentication(format!("API secret is not base64: {}", e)))?;

        let mut mac = HmacSha256::new_from_slice(&secret_bytes)
            .map_err(|e| TradingError::ApiAuthentication(e.to_string()))?;
        mac.update(format!("{}{}{}{}", timestamp, method.as_str(), path, body).as_bytes());

        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    async fn public_get(&self, path: &str) -> TradingResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        check_status(response, path).await
    }

    async fn signed(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> TradingResult<Response> {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, &method, path, &body)?;

        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header("API-KEY", &self.api_key)
            .header("API-TIMESTAMP", &timestamp)
            .header("API-SIGNATURE", &signature);

        if !body.is_empty() {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request.send().await?;
        check_status(response, path).await
    }
}

/// Map non-2xx responses onto the error taxonomy
async fn check_status(response: Response, context: &str) -> TradingResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("{} returned {}: {}", context, status, body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TradingError::ApiAuthentication(message),
        StatusCode::TOO_MANY_REQUESTS => TradingError::ApiRateLimit(message),
        StatusCode::NOT_FOUND => TradingError::OrderNotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => TradingError::OrderRejected(message),
        _ => TradingError::ApiResponse(message),
    })
}

#[async_trait]
impl ExchangeGateway for RestGateway {
    async fn place_order(&self, side: Side, price: Decimal, size: Decimal) -> TradingResult<String> {
        let body = json!({
            "side": side.as_str(),
            "price": price.to_string(),
            "amount": size.to_string(),
        });
        let placed: PlacedOrder = self
            .signed(Method::POST, "/api/orders", Some(body))
            .await?
            .json()
            .await?;
        Ok(placed.id)
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<()> {
        let path = format!("/api/orders/{}", order_id);
        match self.signed(Method::DELETE, &path, None).await {
            Ok(_) => Ok(()),
            Err(TradingError::OrderNotFound(_)) => Err(TradingError::OrderNotFound(order_id.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn list_open_orders(&self) -> TradingResult<Vec<OpenOrder>> {
        let orders: Vec<OpenOrder> = self
            .signed(Method::GET, "/api/orders", None)
            .await?
            .json()
            .await?;
        Ok(orders)
    }

    async fn get_balances(&self) -> TradingResult<Balances> {
        let entries: Vec<BalanceEntry> = self
            .signed(Method::GET, "/api/balances", None)
            .await?
            .json()
            .await?;

        let mut balances = Balances::default();
        for entry in entries {
            if entry.currency.eq_ignore_ascii_case(&self.base_currency) {
                balances.base = entry.amount;
            } else if entry.currency.eq_ignore_ascii_case(&self.quote_currency) {
                balances.quote = entry.amount;
            }
        }
        Ok(balances)
    }

    async fn get_ticker(&self) -> TradingResult<Ticker> {
        let ticker: Ticker = self.public_get("/api/ticker").await?.json().await?;
        Ok(ticker)
    }

    async fn get_deposit_address(&self) -> TradingResult<String> {
        let address: DepositAddress = self
            .signed(Method::POST, "/api/deposit-address", None)
            .await?
            .json()
            .await?;
        Ok(address.address)
    }
}
