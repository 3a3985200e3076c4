//! HTTP clients for the external collaborators: the wallet that serves chain
//! height, public keys and signatures, and the overlay endpoint that accepts
//! finished transactions for broadcast.

use async_trait::async_trait;
use hodlock_primitives::keys::KeyRef;
use hodlock_watchman::{
    ChainSource, ChainSourceError, CustodianError, KeyCustodian, SubmitError, TxSubmitter,
};
use serde::Deserialize;
use serde_json::json;

/// JSON-API wallet client. The wallet custodies all private material; this
/// client only ever sees public keys and finished signatures.
#[derive(Debug, Clone)]
pub(crate) struct WalletHttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl WalletHttpClient {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, reqwest::Error> {
        self.http
            .post(format!("{}/{method}", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[derive(Deserialize)]
struct HeightResponse {
    height: u32,
}

#[derive(Deserialize)]
struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Deserialize)]
struct SignatureResponse {
    signature: Vec<u8>,
}

#[async_trait]
impl ChainSource for WalletHttpClient {
    async fn current_height(&self) -> Result<u32, ChainSourceError> {
        let resp: HeightResponse = self
            .call("getHeight", json!({}))
            .await
            .map_err(|e| ChainSourceError::Unreachable(e.to_string()))?;
        Ok(resp.height)
    }
}

#[async_trait]
impl KeyCustodian for WalletHttpClient {
    async fn public_key(&self, key_ref: &KeyRef) -> Result<Vec<u8>, CustodianError> {
        let body = json!({
            "protocolID": [0, key_ref.protocol_id()],
            "keyID": key_ref.key_id(),
        });
        let resp: PublicKeyResponse = self
            .call("getPublicKey", body)
            .await
            .map_err(|e| CustodianError::Unreachable(e.to_string()))?;
        hex::decode(&resp.public_key)
            .map_err(|e| CustodianError::Rejected(format!("public key not hex: {e}")))
    }

    async fn sign(&self, key_ref: &KeyRef, data: &[u8]) -> Result<Vec<u8>, CustodianError> {
        let body = json!({
            "protocolID": [0, key_ref.protocol_id()],
            "keyID": key_ref.key_id(),
            "data": data,
        });
        let resp: SignatureResponse = self
            .call("createSignature", body)
            .await
            .map_err(|e| CustodianError::Unreachable(e.to_string()))?;
        if resp.signature.is_empty() {
            return Err(CustodianError::Rejected("empty signature".into()));
        }
        Ok(resp.signature)
    }
}

/// Posts finished transactions to the overlay for topic-tagged broadcast.
#[derive(Debug, Clone)]
pub(crate) struct OverlaySubmitClient {
    http: reqwest::Client,
    url: String,
}

impl OverlaySubmitClient {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    status: String,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl TxSubmitter for OverlaySubmitClient {
    async fn submit(&self, tx_bytes: Vec<u8>, topic: &str) -> Result<(), SubmitError> {
        let body = json!({
            "rawTx": hex::encode(&tx_bytes),
            "topics": [topic],
        });
        let resp: SubmitResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SubmitError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| SubmitError::Unreachable(e.to_string()))?;

        if resp.status == "error" {
            return Err(SubmitError::Rejected(
                resp.description.unwrap_or_else(|| "no reason given".into()),
            ));
        }
        Ok(())
    }
}
