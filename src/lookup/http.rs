//! HTTP transaction source
//!
//! Each network has a fixed public API base. The raw-transaction endpoint
//! answers JSON; the hex payload has moved between field names across API
//! versions, so several are probed in order.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::{LookupError, TxSource};
use crate::types::Network;

const MAINNET_BASE: &str = "https://api.turingchain.io";
const TESTNET_BASE: &str = "https://api.tbcdev.org";

/// Field names the raw hex has been published under, in probe order
const HEX_FIELDS: &[&str] = &["txraw", "hex", "raw"];

pub struct HttpTxSource {
    client: reqwest::Client,
}

impl HttpTxSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn base_url(network: Network) -> &'static str {
        match network {
            Network::Mainnet => MAINNET_BASE,
            Network::Testnet => TESTNET_BASE,
        }
    }

    fn extract_hex(body: &serde_json::Value) -> Option<String> {
        for field in HEX_FIELDS {
            if let Some(hex) = body.get(field).and_then(|v| v.as_str()) {
                return Some(hex.to_string());
            }
        }
        // Older responses wrap the payload in a "data" envelope
        let data = body.get("data")?;
        for field in HEX_FIELDS {
            if let Some(hex) = data.get(field).and_then(|v| v.as_str()) {
                return Some(hex.to_string());
            }
        }
        None
    }
}

impl Default for HttpTxSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TxSource for HttpTxSource {
    async fn raw_transaction(&self, txid: &str, network: Network) -> Result<String, LookupError> {
        let url = format!(
            "{}/api/tbc/txraw/txid/{}",
            Self::base_url(network),
            txid
        );
        debug!(%url, "fetching raw transaction");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound {
                txid: txid.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(LookupError::Failed(format!(
                "unexpected status {} for {}",
                response.status(),
                txid
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        // Some deployments report a miss inside a 200 body
        if let Some(message) = body.get("error").and_then(|e| e.as_str()) {
            let lowered = message.to_ascii_lowercase();
            if lowered.contains("not found") || lowered.contains("no such") {
                return Err(LookupError::NotFound {
                    txid: txid.to_string(),
                });
            }
            return Err(LookupError::Failed(message.to_string()));
        }

        Self::extract_hex(&body).ok_or_else(|| {
            LookupError::Failed(format!("no raw hex field in response for {}", txid))
        })
    }
}
