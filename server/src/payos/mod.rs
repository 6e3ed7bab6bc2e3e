//! PayOS integration via REST API (no SDK dependency)
//!
//! Two responsibilities:
//! - create hosted payment links (`POST /v2/payment-requests`)
//! - verify inbound webhook payloads against the merchant checksum key
//!
//! PayOS signs requests and webhooks with HMAC-SHA256 over a canonical
//! `key=value&key=value` string built from alphabetically sorted fields.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

/// PayOS truncates item names beyond this length
const ITEM_NAME_LIMIT: usize = 25;

/// Result code PayOS uses for success, in API responses and webhooks alike
const PAYOS_SUCCESS_CODE: &str = "00";

#[derive(Debug, Error)]
pub enum PayOsError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request: {code} {desc}")]
    Gateway { code: String, desc: String },

    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("webhook signature mismatch")]
    InvalidSignature,
}

/// Line-item summary sent to the gateway
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    pub name: String,
    pub quantity: i64,
    pub price: i64,
}

impl PaymentItem {
    /// Build an item, truncating the name to the gateway's length limit
    pub fn new(name: &str, quantity: i64, price: i64) -> Self {
        Self {
            name: name.chars().take(ITEM_NAME_LIMIT).collect(),
            quantity,
            price,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentLinkBody<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    items: &'a [PaymentItem],
    return_url: &'a str,
    cancel_url: &'a str,
    signature: String,
}

#[derive(Deserialize)]
struct ApiEnvelope {
    code: String,
    #[serde(default)]
    desc: String,
    data: Option<Value>,
}

/// Created payment link
#[derive(Debug, Clone)]
pub struct PaymentLink {
    pub checkout_url: String,
    pub payment_link_id: String,
}

#[derive(Deserialize)]
struct WebhookBody {
    #[serde(default)]
    code: String,
    data: Value,
    signature: String,
}

/// Verified webhook content
#[derive(Debug, Clone)]
pub struct WebhookData {
    /// The merchant order code the event refers to
    pub order_code: i64,
    /// Gateway result code ("00" = payment successful)
    pub code: String,
}

impl WebhookData {
    pub fn is_success(&self) -> bool {
        self.code == PAYOS_SUCCESS_CODE
    }
}

/// Generate a gateway order code from a millisecond timestamp.
///
/// Kept under the gateway's numeric limit. Timestamp-derived codes can
/// collide under high concurrency; uniqueness is enforced by the unique
/// index on `orders.payment_reference`, not here.
pub fn generate_order_code(now_millis: i64) -> i64 {
    now_millis % 1_000_000_000
}

/// PayOS REST client
#[derive(Clone)]
pub struct PayOsClient {
    http: reqwest::Client,
    client_id: String,
    api_key: String,
    checksum_key: String,
    api_base: String,
}

impl PayOsClient {
    pub fn new(client_id: String, api_key: String, checksum_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            api_key,
            checksum_key,
            api_base,
        }
    }

    /// Create a hosted payment link for an order
    pub async fn create_payment_link(
        &self,
        order_code: i64,
        amount: i64,
        description: &str,
        items: &[PaymentItem],
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PaymentLink, PayOsError> {
        let signature = self.sign_payment_request(
            amount,
            cancel_url,
            description,
            order_code,
            return_url,
        );

        let body = CreatePaymentLinkBody {
            order_code,
            amount,
            description,
            items,
            return_url,
            cancel_url,
            signature,
        };

        let resp: ApiEnvelope = self
            .http
            .post(format!("{}/v2/payment-requests", self.api_base))
            .header("x-client-id", &self.client_id)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if resp.code != PAYOS_SUCCESS_CODE {
            return Err(PayOsError::Gateway {
                code: resp.code,
                desc: resp.desc,
            });
        }

        let data = resp
            .data
            .ok_or_else(|| PayOsError::InvalidResponse("missing data".into()))?;
        let checkout_url = data["checkoutUrl"]
            .as_str()
            .ok_or_else(|| PayOsError::InvalidResponse("missing checkoutUrl".into()))?
            .to_string();
        let payment_link_id = data["paymentLinkId"]
            .as_str()
            .ok_or_else(|| PayOsError::InvalidResponse("missing paymentLinkId".into()))?
            .to_string();

        Ok(PaymentLink {
            checkout_url,
            payment_link_id,
        })
    }

    /// Verify a raw webhook payload and extract its order code and result
    /// code. Rejects payloads whose signature does not match the checksum
    /// key (constant-time comparison).
    pub fn verify_webhook(&self, raw: &[u8]) -> Result<WebhookData, PayOsError> {
        let body: WebhookBody = serde_json::from_slice(raw)
            .map_err(|e| PayOsError::InvalidPayload(e.to_string()))?;

        let canonical = canonical_data_string(&body.data)
            .ok_or_else(|| PayOsError::InvalidPayload("data is not an object".into()))?;

        let mut mac = Hmac::<Sha256>::new_from_slice(self.checksum_key.as_bytes())
            .map_err(|_| PayOsError::InvalidSignature)?;
        mac.update(canonical.as_bytes());

        let sig_bytes =
            hex::decode(&body.signature).map_err(|_| PayOsError::InvalidSignature)?;
        mac.verify_slice(&sig_bytes)
            .map_err(|_| PayOsError::InvalidSignature)?;

        let order_code = body.data["orderCode"]
            .as_i64()
            .ok_or_else(|| PayOsError::InvalidPayload("missing orderCode".into()))?;
        // result code lives inside the signed data; fall back to the envelope
        let code = body.data["code"]
            .as_str()
            .map(str::to_string)
            .unwrap_or(body.code);

        Ok(WebhookData { order_code, code })
    }

    /// HMAC-SHA256 over the canonical request string, hex-encoded.
    /// Field order is fixed by the gateway: amount, cancelUrl, description,
    /// orderCode, returnUrl (alphabetical).
    fn sign_payment_request(
        &self,
        amount: i64,
        cancel_url: &str,
        description: &str,
        order_code: i64,
        return_url: &str,
    ) -> String {
        let payload = format!(
            "amount={amount}&cancelUrl={cancel_url}&description={description}&orderCode={order_code}&returnUrl={return_url}"
        );
        hmac_hex(&self.checksum_key, &payload)
    }

    #[cfg(test)]
    fn sign_webhook_data(&self, data: &Value) -> String {
        let canonical = canonical_data_string(data).expect("test data must be an object");
        hmac_hex(&self.checksum_key, &canonical)
    }
}

/// Build the canonical `key=value&key=value` string from a webhook `data`
/// object: keys sorted alphabetically, null rendered as empty string.
fn canonical_data_string(data: &Value) -> Option<String> {
    let obj = data.as_object()?;
    let mut keys: Vec<&String> = obj.keys().collect();
    keys.sort();

    let parts: Vec<String> = keys
        .into_iter()
        .map(|k| format!("{k}={}", canonical_value(&obj[k])))
        .collect();
    Some(parts.join("&"))
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn hmac_hex(key: &str, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client() -> PayOsClient {
        PayOsClient::new(
            "client-id".into(),
            "api-key".into(),
            "checksum-key".into(),
            "https://api-merchant.payos.test".into(),
        )
    }

    #[test]
    fn test_canonical_data_sorted_and_null_empty() {
        let data = json!({
            "orderCode": 123,
            "amount": 25000,
            "desc": null,
            "code": "00",
        });
        let canonical = canonical_data_string(&data).unwrap();
        assert_eq!(canonical, "amount=25000&code=00&desc=&orderCode=123");
    }

    #[test]
    fn test_verify_webhook_roundtrip() {
        let client = test_client();
        let data = json!({
            "orderCode": 729345123,
            "amount": 25000,
            "code": "00",
            "desc": "success",
        });
        let signature = client.sign_webhook_data(&data);
        let payload = json!({
            "code": "00",
            "desc": "success",
            "success": true,
            "data": data,
            "signature": signature,
        });

        let verified = client
            .verify_webhook(payload.to_string().as_bytes())
            .expect("valid signature must verify");
        assert_eq!(verified.order_code, 729345123);
        assert!(verified.is_success());
    }

    #[test]
    fn test_verify_webhook_rejects_tampered_data() {
        let client = test_client();
        let data = json!({ "orderCode": 1, "amount": 1000, "code": "00" });
        let signature = client.sign_webhook_data(&data);

        // Amount altered after signing
        let payload = json!({
            "code": "00",
            "data": { "orderCode": 1, "amount": 999999, "code": "00" },
            "signature": signature,
        });

        let err = client.verify_webhook(payload.to_string().as_bytes());
        assert!(matches!(err, Err(PayOsError::InvalidSignature)));
    }

    #[test]
    fn test_verify_webhook_rejects_garbage() {
        let client = test_client();
        assert!(matches!(
            client.verify_webhook(b"not json"),
            Err(PayOsError::InvalidPayload(_))
        ));
        assert!(matches!(
            client.verify_webhook(br#"{"code":"00","data":{"orderCode":1},"signature":"zz"}"#),
            Err(PayOsError::InvalidSignature)
        ));
    }

    #[test]
    fn test_non_success_code_preserved() {
        let client = test_client();
        let data = json!({ "orderCode": 7, "code": "01" });
        let signature = client.sign_webhook_data(&data);
        let payload = json!({ "code": "01", "data": data, "signature": signature });

        let verified = client.verify_webhook(payload.to_string().as_bytes()).unwrap();
        assert!(!verified.is_success());
        assert_eq!(verified.code, "01");
    }

    #[test]
    fn test_item_name_truncated() {
        let item = PaymentItem::new("a very long handcrafted ceramic vase name", 1, 10000);
        assert_eq!(item.name.chars().count(), 25);
    }

    #[test]
    fn test_order_code_within_gateway_limit() {
        let code = generate_order_code(1_754_000_000_123);
        assert!(code < 1_000_000_000);
        assert!(code >= 0);
    }
}
