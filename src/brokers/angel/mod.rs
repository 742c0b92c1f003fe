//! Angel One SmartAPI market-data adapter

#![allow(non_snake_case)]

use crate::brokers::types::*;
use crate::brokers::{AuthResponse, BrokerCredentials, MarketDataBroker};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use chrono_tz::Asia::Kolkata;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const MOVERS_PATH: &str = "/rest/secure/angelbroking/marketData/v1/gainersLosers";
const PCR_PATH: &str = "/rest/secure/angelbroking/marketData/v1/putCallRatio";
const CANDLE_PATH: &str = "/rest/secure/angelbroking/historical/v1/getCandleData";

/// Angel error codes that mean the session token is no longer usable
const SESSION_ERROR_CODES: [&str; 3] = ["AG8001", "AG8002", "AG8003"];

/// Standard Angel response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    errorcode: String,
    data: Option<T>,
}

/// Angel One broker implementation
pub struct AngelBroker {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AngelBroker {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("X-UserType", HeaderValue::from_static("USER"));
        headers.insert("X-SourceID", HeaderValue::from_static("WEB"));
        headers.insert("X-ClientLocalIP", HeaderValue::from_static("127.0.0.1"));
        headers.insert("X-ClientPublicIP", HeaderValue::from_static("127.0.0.1"));
        headers.insert("X-MACAddress", HeaderValue::from_static("00:00:00:00:00:00"));
        headers.insert(
            "X-PrivateKey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| AppError::Config("API key contains invalid characters".to_string()))?,
        );

        if let Some(token) = auth_token {
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                    AppError::Auth("Session token contains invalid characters".to_string())
                })?,
            );
        }

        Ok(headers)
    }

    /// Check HTTP status and unwrap the Angel envelope
    async fn read_envelope<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<Option<T>> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "{} rejected the session (HTTP {})",
                endpoint, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(AppError::Broker(format!(
                "{} returned HTTP {}: {}",
                endpoint, status, snippet
            )));
        }

        let envelope: Envelope<T> = response.json().await?;
        if !envelope.status {
            if SESSION_ERROR_CODES.contains(&envelope.errorcode.as_str()) {
                return Err(AppError::Auth(format!(
                    "{}: {} ({})",
                    endpoint, envelope.message, envelope.errorcode
                )));
            }
            return Err(AppError::Broker(format!(
                "{}: {} ({})",
                endpoint, envelope.message, envelope.errorcode
            )));
        }

        Ok(envelope.data)
    }
}

#[async_trait]
impl MarketDataBroker for AngelBroker {
    fn id(&self) -> &'static str {
        "angel"
    }

    fn name(&self) -> &'static str {
        "Angel One"
    }

    fn is_live(&self) -> bool {
        true
    }

    fn min_request_interval(&self) -> Duration {
        // gainersLosers and putCallRatio allow one request per second
        Duration::from_millis(1100)
    }

    async fn authenticate(&self, credentials: BrokerCredentials) -> Result<AuthResponse> {
        if credentials.client_id.is_empty() || credentials.password.is_empty() {
            return Err(AppError::Validation(
                "Client ID and password are required for Angel One".to_string(),
            ));
        }
        if credentials.totp.is_empty() {
            return Err(AppError::Validation("TOTP is required for Angel One".to_string()));
        }

        #[derive(Serialize)]
        struct LoginRequest<'a> {
            clientcode: &'a str,
            password: &'a str,
            totp: &'a str,
        }

        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct LoginData {
            jwtToken: String,
            refreshToken: Option<String>,
            feedToken: Option<String>,
        }

        let request = LoginRequest {
            clientcode: &credentials.client_id,
            password: &credentials.password,
            totp: &credentials.totp,
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .headers(self.get_headers(None)?)
            .json(&request)
            .send()
            .await?;

        let data = match Self::read_envelope::<LoginData>(LOGIN_PATH, response).await {
            Ok(Some(data)) => data,
            Ok(None) => return Err(AppError::Auth("No data in login response".to_string())),
            Err(AppError::Broker(msg)) => return Err(AppError::Auth(msg)),
            Err(e) => return Err(e),
        };

        Ok(AuthResponse {
            auth_token: data.jwtToken,
            feed_token: data.feedToken,
            user_id: credentials.client_id,
        })
    }

    async fn get_movers(
        &self,
        auth_token: &str,
        kind: MoversKind,
        expiry: ExpiryType,
    ) -> Result<Vec<MoverItem>> {
        #[derive(Serialize)]
        struct MoversRequest {
            datatype: &'static str,
            expirytype: &'static str,
        }

        let request = MoversRequest {
            datatype: kind.datatype(),
            expirytype: expiry.as_str(),
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, MOVERS_PATH))
            .headers(self.get_headers(Some(auth_token))?)
            .json(&request)
            .send()
            .await?;

        let items: Vec<MoverItem> = Self::read_envelope(MOVERS_PATH, response)
            .await?
            .unwrap_or_default();

        debug!("{} {}: {} items", kind.datatype(), expiry.as_str(), items.len());
        Ok(items)
    }

    async fn get_put_call_ratio(&self, auth_token: &str) -> Result<Vec<PcrItem>> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, PCR_PATH))
            .headers(self.get_headers(Some(auth_token))?)
            .send()
            .await?;

        let items: Vec<PcrItem> = Self::read_envelope(PCR_PATH, response)
            .await?
            .unwrap_or_default();

        debug!("putCallRatio: {} items", items.len());
        Ok(items)
    }

    async fn get_last_price(
        &self,
        auth_token: &str,
        exchange: &str,
        token: &str,
    ) -> Result<Option<f64>> {
        #[derive(Serialize)]
        struct CandleRequest<'a> {
            exchange: &'a str,
            symboltoken: &'a str,
            interval: &'static str,
            fromdate: String,
            todate: String,
        }

        // Candle timestamps are exchange-local
        let now = Utc::now().with_timezone(&Kolkata);
        let from = now - ChronoDuration::days(1);

        let request = CandleRequest {
            exchange,
            symboltoken: token,
            interval: "ONE_MINUTE",
            fromdate: from.format("%Y-%m-%d %H:%M").to_string(),
            todate: now.format("%Y-%m-%d %H:%M").to_string(),
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CANDLE_PATH))
            .headers(self.get_headers(Some(auth_token))?)
            .json(&request)
            .send()
            .await?;

        // Candle format: [timestamp, open, high, low, close, volume]
        let candles: Vec<Vec<serde_json::Value>> = Self::read_envelope(CANDLE_PATH, response)
            .await?
            .unwrap_or_default();

        let close = candles.last().and_then(|candle| candle.get(4)).and_then(|v| v.as_f64());
        if close.is_none() {
            warn!("No candle data for {}:{}", exchange, token);
        }
        Ok(close)
    }
}
