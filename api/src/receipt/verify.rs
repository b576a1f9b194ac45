//! Optional LLM-backed verification of a rules-parsed receipt.
//!
//! The verifier is a plain HTTP call to a configured endpoint. It is
//! injectable (handlers receive it as optional app data) and fail-open:
//! when unconfigured, unreachable, slow, or returning nonsense, the rules
//! result stands and the request still succeeds.

use std::time::Duration;

use payloads::responses::ParsedReceipt;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretBox};

pub struct ReceiptVerifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretBox<String>>,
}

impl ReceiptVerifier {
    pub fn new(
        endpoint: String,
        api_key: Option<SecretBox<String>>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Ask the verifier to correct the draft parse. Returns None on any
    /// transport or shape failure; the caller keeps the draft.
    pub async fn verify(
        &self,
        raw_text: &str,
        draft: &ParsedReceipt,
    ) -> Option<ParsedReceipt> {
        let body = serde_json::json!({
            "rawText": raw_text,
            "draft": draft,
        });
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("receipt verifier unreachable: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                "receipt verifier rejected the request"
            );
            return None;
        }
        let verified: ParsedReceipt = match response.json().await {
            Ok(verified) => verified,
            Err(e) => {
                tracing::warn!("receipt verifier returned a malformed body: {e}");
                return None;
            }
        };

        is_sane(&verified).then_some(verified)
    }
}

/// A correction that violates the receipt invariants is discarded.
fn is_sane(receipt: &ParsedReceipt) -> bool {
    receipt.subtotal >= Decimal::ZERO
        && receipt.tax >= Decimal::ZERO
        && receipt.tip >= Decimal::ZERO
        && receipt.total >= Decimal::ZERO
        && receipt
            .items
            .iter()
            .all(|item| item.price > Decimal::ZERO && !item.name.is_empty())
        && (0.0..=1.0).contains(&receipt.confidence)
}
