//! MoMo e-wallet payments.
//!
//! Checkout asks MoMo for a hosted payment page (`captureWallet`) and hands
//! the `payUrl` to the client. MoMo later calls the IPN webhook with the
//! outcome. Both directions are signed with HMAC-SHA256 over a fixed,
//! alphabetically ordered `key=value&...` string.

use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use techmart_core::{OrderId, to_minor_units};

use crate::config::MomoConfig;

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TYPE: &str = "captureWallet";
/// MoMo accepts amounts between these bounds (VND).
const MIN_AMOUNT: i64 = 1_000;
const MAX_AMOUNT: i64 = 50_000_000;

/// Errors from the MoMo gateway.
#[derive(Debug, Error)]
pub enum MomoError {
    /// Transport failure talking to MoMo.
    #[error("MoMo request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// MoMo answered with a non-zero `resultCode`.
    #[error("MoMo rejected the payment ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// The order total cannot be paid through MoMo.
    #[error("amount {0} is outside the MoMo limits")]
    AmountOutOfRange(Decimal),

    /// Signature did not match the payload.
    #[error("invalid MoMo signature")]
    InvalidSignature,

    /// The MoMo `orderId` does not embed one of our orders.
    #[error("unrecognised MoMo order id: {0}")]
    UnknownOrder(String),
}

/// Body of a create-payment request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest<'a> {
    partner_code: &'a str,
    request_id: &'a str,
    amount: i64,
    order_id: &'a str,
    order_info: &'a str,
    redirect_url: &'a str,
    ipn_url: &'a str,
    request_type: &'static str,
    extra_data: &'a str,
    lang: &'static str,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    result_code: i64,
    #[serde(default)]
    message: String,
    pay_url: Option<String>,
}

/// A created payment.
#[derive(Debug, Clone)]
pub struct PaymentLink {
    pub pay_url: String,
    pub momo_order_id: String,
}

/// IPN payload posted by MoMo.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpnPayload {
    pub partner_code: String,
    pub order_id: String,
    pub request_id: String,
    pub amount: i64,
    pub order_info: String,
    pub order_type: String,
    pub trans_id: i64,
    pub result_code: i64,
    pub message: String,
    pub pay_type: String,
    pub response_time: i64,
    pub extra_data: String,
    pub signature: String,
}

/// Client for the MoMo payment gateway.
#[derive(Clone)]
pub struct MomoClient {
    http: reqwest::Client,
    config: MomoConfig,
    ipn_url: String,
    redirect_base: String,
}

impl MomoClient {
    /// `base_url` is where MoMo reaches the IPN webhook; customers return to
    /// `frontend_url` after paying.
    #[must_use]
    pub fn new(http: reqwest::Client, config: MomoConfig, base_url: &str, frontend_url: &str) -> Self {
        Self {
            http,
            config,
            ipn_url: format!("{}/api/payments/momo/ipn", base_url.trim_end_matches('/')),
            redirect_base: format!("{}/orders", frontend_url.trim_end_matches('/')),
        }
    }

    /// Request a payment page for an order.
    ///
    /// # Errors
    ///
    /// Returns `MomoError::AmountOutOfRange` for totals MoMo does not accept,
    /// `MomoError::Http` on transport failure and `MomoError::Rejected` when
    /// MoMo answers with a non-zero result code.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_payment(
        &self,
        order_id: OrderId,
        total: Decimal,
    ) -> Result<PaymentLink, MomoError> {
        let amount = to_minor_units(total)
            .filter(|a| (MIN_AMOUNT..=MAX_AMOUNT).contains(a))
            .ok_or(MomoError::AmountOutOfRange(total))?;

        let momo_order_id = momo_order_id(order_id, Utc::now().timestamp_millis());
        let request_id = uuid::Uuid::new_v4().to_string();
        let order_info = format!("TechMart order #{order_id}");
        let redirect_url = format!("{}/{order_id}", self.redirect_base);
        let extra_data = "";

        let raw = format!(
            "accessKey={}&amount={amount}&extraData={extra_data}&ipnUrl={}&orderId={momo_order_id}\
             &orderInfo={order_info}&partnerCode={}&redirectUrl={redirect_url}\
             &requestId={request_id}&requestType={REQUEST_TYPE}",
            self.config.access_key.expose_secret(),
            self.ipn_url,
            self.config.partner_code,
        );

        let body = CreatePaymentRequest {
            partner_code: &self.config.partner_code,
            request_id: &request_id,
            amount,
            order_id: &momo_order_id,
            order_info: &order_info,
            redirect_url: &redirect_url,
            ipn_url: &self.ipn_url,
            request_type: REQUEST_TYPE,
            extra_data,
            lang: "vi",
            signature: self.sign(&raw),
        };

        let response: CreatePaymentResponse = self
            .http
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match response.pay_url {
            Some(pay_url) if response.result_code == 0 => {
                tracing::info!(momo_order_id = %momo_order_id, "MoMo payment created");
                Ok(PaymentLink {
                    pay_url,
                    momo_order_id,
                })
            }
            _ => Err(MomoError::Rejected {
                code: response.result_code,
                message: response.message,
            }),
        }
    }

    /// Check an IPN signature and return the local order it refers to.
    ///
    /// # Errors
    ///
    /// Returns `MomoError::InvalidSignature` if the signature does not match
    /// and `MomoError::UnknownOrder` if the order id is not one of ours.
    pub fn verify_ipn(&self, ipn: &IpnPayload) -> Result<OrderId, MomoError> {
        let expected = self.sign(&ipn_signature_string(
            self.config.access_key.expose_secret(),
            ipn,
        ));
        if !constant_time_eq(&expected, &ipn.signature) {
            return Err(MomoError::InvalidSignature);
        }
        parse_momo_order_id(&ipn.order_id).ok_or_else(|| MomoError::UnknownOrder(ipn.order_id.clone()))
    }

    fn sign(&self, raw: &str) -> String {
        sign(self.config.secret_key.expose_secret(), raw)
    }
}

/// HMAC-SHA256 of `raw`, hex encoded.
fn sign(secret: &str, raw: &str) -> String {
    // HMAC accepts keys of any length, so this never yields the empty string
    // in practice; an empty signature never verifies.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(raw.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn ipn_signature_string(access_key: &str, ipn: &IpnPayload) -> String {
    format!(
        "accessKey={access_key}&amount={}&extraData={}&message={}&orderId={}&orderInfo={}\
         &orderType={}&partnerCode={}&payType={}&requestId={}&responseTime={}&resultCode={}\
         &transId={}",
        ipn.amount,
        ipn.extra_data,
        ipn.message,
        ipn.order_id,
        ipn.order_info,
        ipn.order_type,
        ipn.partner_code,
        ipn.pay_type,
        ipn.request_id,
        ipn.response_time,
        ipn.result_code,
        ipn.trans_id,
    )
}

/// MoMo order ids must be unique per attempt, so the local id is embedded
/// with a millisecond suffix: `TM{order_id}_{millis}`.
#[must_use]
pub fn momo_order_id(order_id: OrderId, millis: i64) -> String {
    format!("TM{order_id}_{millis}")
}

/// Extract the local order id from a MoMo order id.
#[must_use]
pub fn parse_momo_order_id(momo_order_id: &str) -> Option<OrderId> {
    let rest = momo_order_id.strip_prefix("TM")?;
    let (id, millis) = rest.split_once('_')?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> MomoClient {
        MomoClient::new(
            reqwest::Client::new(),
            MomoConfig {
                partner_code: "MOMOTEST".to_owned(),
                access_key: SecretString::from("F8BBA842ECF85"),
                secret_key: SecretString::from("K951B6PE1waDMi640xX08PD3vg6EkVlz"),
                endpoint: "https://test-payment.momo.vn/v2/gateway/api/create".to_owned(),
            },
            "https://api.techmart.vn",
            "https://techmart.vn",
        )
    }

    fn signed_ipn(client: &MomoClient) -> IpnPayload {
        let mut ipn = IpnPayload {
            partner_code: "MOMOTEST".to_owned(),
            order_id: "TM42_1718000000000".to_owned(),
            request_id: "req-1".to_owned(),
            amount: 1_250_000,
            order_info: "TechMart order #42".to_owned(),
            order_type: "momo_wallet".to_owned(),
            trans_id: 4_088_878_653,
            result_code: 0,
            message: "Successful.".to_owned(),
            pay_type: "qr".to_owned(),
            response_time: 1_718_000_005_000,
            extra_data: String::new(),
            signature: String::new(),
        };
        ipn.signature = client.sign(&ipn_signature_string("F8BBA842ECF85", &ipn));
        ipn
    }

    #[test]
    fn test_order_id_round_trip() {
        let id = momo_order_id(OrderId::new(42), 1_718_000_000_000);
        assert_eq!(id, "TM42_1718000000000");
        assert_eq!(parse_momo_order_id(&id), Some(OrderId::new(42)));
    }

    #[test]
    fn test_parse_rejects_foreign_ids() {
        assert_eq!(parse_momo_order_id("42_1718"), None);
        assert_eq!(parse_momo_order_id("TMabc_1718"), None);
        assert_eq!(parse_momo_order_id("TM42"), None);
        assert_eq!(parse_momo_order_id("TM42_"), None);
    }

    #[test]
    fn test_signature_is_hex_hmac() {
        let signature = sign("key", "The quick brown fox jumps over the lazy dog");
        assert_eq!(
            signature,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_ipn_verifies_after_signing() {
        let client = client();
        let ipn = signed_ipn(&client);
        assert_eq!(client.verify_ipn(&ipn).unwrap(), OrderId::new(42));
    }

    #[test]
    fn test_ipn_tampering_is_detected() {
        let client = client();
        let mut ipn = signed_ipn(&client);
        ipn.amount = 1_000;
        assert!(matches!(
            client.verify_ipn(&ipn),
            Err(MomoError::InvalidSignature)
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
