//! HTTP backend for the ESP32 dispenser.
//!
//! The firmware exposes two endpoints:
//! - `GET /status` -> `{state, glass_present, last_pour_ml, uptime}`
//! - `POST /dispense` with `{amount_ml, request_id}`; HTTP 200 means accepted

use std::time::Duration;

use async_trait::async_trait;
use pour_traits::{BoxError, Device, DeviceReading};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::{DeviceError, Result};

#[derive(Debug, Serialize)]
struct DispenseBody<'a> {
    amount_ml: u32,
    request_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpDevice {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDevice {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DeviceError::Http(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current status. Non-2xx answers and unparseable bodies are errors.
    pub async fn fetch_status(&self, timeout: Duration) -> Result<DeviceReading> {
        let resp = self
            .client
            .get(format!("{}/status", self.base_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "device status call failed");
            return Err(DeviceError::Status(status.as_u16()));
        }

        let reading = resp.json::<DeviceReading>().await.map_err(|e| {
            if e.is_timeout() {
                classify(e, timeout)
            } else {
                DeviceError::Payload(e.to_string())
            }
        })?;
        tracing::debug!(
            state = %reading.state,
            glass_present = reading.glass_present,
            uptime = reading.uptime,
            "device status"
        );
        Ok(reading)
    }

    /// Send a dispense command. Only HTTP 200 counts as accepted.
    pub async fn send_dispense(
        &self,
        amount_ml: u32,
        request_id: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let resp = self
            .client
            .post(format!("{}/dispense", self.base_url))
            .timeout(timeout)
            .json(&DispenseBody {
                amount_ml,
                request_id,
            })
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        if status == StatusCode::OK {
            tracing::debug!(amount_ml, request_id, "device accepted dispense");
            Ok(true)
        } else {
            tracing::warn!(
                amount_ml,
                request_id,
                status = status.as_u16(),
                "device declined dispense"
            );
            Ok(false)
        }
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> DeviceError {
    if e.is_timeout() {
        DeviceError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }
    } else if e.is_connect() {
        DeviceError::Connect(e.without_url().to_string())
    } else {
        DeviceError::Http(e.without_url().to_string())
    }
}

#[async_trait]
impl Device for HttpDevice {
    async fn status(&self, timeout: Duration) -> std::result::Result<DeviceReading, BoxError> {
        Ok(self.fetch_status(timeout).await?)
    }

    async fn dispense(
        &self,
        amount_ml: u32,
        request_id: &str,
        timeout: Duration,
    ) -> std::result::Result<bool, BoxError> {
        Ok(self.send_dispense(amount_ml, request_id, timeout).await?)
    }
}
