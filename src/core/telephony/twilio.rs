use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{CallRecord, OutboundCall, TelephonyClient, TelephonyError};
use crate::config::{Secret, ServerConfig};

const STATUS_CALLBACK_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: Secret,
    pub from_number: Option<String>,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl TwilioConfig {
    pub fn from_server_config(config: &ServerConfig) -> Result<Self, TelephonyError> {
        let telephony = &config.telephony;
        let account_sid = telephony
            .account_sid
            .clone()
            .filter(|sid| !sid.trim().is_empty())
            .ok_or_else(|| TelephonyError::NotConfigured("TWILIO_ACCOUNT_SID is not set".into()))?;
        let auth_token = config
            .get_api_key("twilio")
            .map_err(TelephonyError::NotConfigured)?;

        Ok(Self {
            account_sid,
            auth_token,
            from_number: telephony.from_number.clone(),
            api_base_url: telephony.api_base_url.clone(),
            request_timeout: config.calls.downstream_timeout(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls",
            self.api_base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

pub struct TwilioClient {
    config: TwilioConfig,
    http_client: Client,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self, TelephonyError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                TelephonyError::NotConfigured(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn read_record(response: reqwest::Response) -> Result<CallRecord, TelephonyError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelephonyError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<TwilioErrorBody>(&body).ok();
            let code = parsed.as_ref().and_then(|b| b.code);
            let message = parsed
                .and_then(|b| b.message)
                .unwrap_or_else(|| body.clone());
            warn!(status = status.as_u16(), code = ?code, "Twilio request failed");
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| TelephonyError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TelephonyClient for TwilioClient {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallRecord, TelephonyError> {
        let from = call
            .from
            .clone()
            .or_else(|| self.config.from_number.clone())
            .ok_or_else(|| TelephonyError::NotConfigured("TWILIO_PHONE_NUMBER is not set".into()))?;

        let mut form: Vec<(&str, String)> = vec![
            ("To", call.to.clone()),
            ("From", from),
            ("Url", call.url.clone()),
            ("Method", "POST".to_string()),
        ];
        if call.machine_detection {
            form.push(("MachineDetection", "Enable".to_string()));
        }
        if let Some(callback) = &call.status_callback {
            form.push(("StatusCallback", callback.clone()));
            form.push(("StatusCallbackMethod", "POST".to_string()));
            for event in STATUS_CALLBACK_EVENTS {
                form.push(("StatusCallbackEvent", event.to_string()));
            }
        }

        let response = self
            .http_client
            .post(format!("{}.json", self.config.calls_url()))
            .basic_auth(&self.config.account_sid, Some(self.config.auth_token.expose()))
            .form(&form)
            .send()
            .await
            .map_err(|e| TelephonyError::Network(format!("Request failed: {e}")))?;

        let record = Self::read_record(response).await?;
        info!(
            call_sid = %record.sid,
            status = ?record.status,
            to = %call.to,
            "Outbound call placed"
        );
        Ok(record)
    }

    async fn fetch_call(&self, call_sid: &str) -> Result<CallRecord, TelephonyError> {
        let response = self
            .http_client
            .get(format!("{}/{call_sid}.json", self.config.calls_url()))
            .basic_auth(&self.config.account_sid, Some(self.config.auth_token.expose()))
            .send()
            .await
            .map_err(|e| TelephonyError::Network(format!("Request failed: {e}")))?;

        Self::read_record(response).await
    }
}
