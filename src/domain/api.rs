//! Request and reply bodies of the gateway API.
//!
//! Field names follow the gateway's PascalCase JSON. Every reply field is
//! optional on the wire, so replies derive `Default` and tolerate missing
//! keys.

use super::payment::{Amount, Payer, PaymentScheme};
use super::transaction::{
    BankApp, ChallengeRequest, QrDetails, Transaction, TransactionId, TransactionStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of Charge and Auth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardPaymentRequest {
    pub amount: Amount,
    pub currency: String,
    #[serde(rename = "CardCryptogramPacket")]
    pub cryptogram: String,
    pub invoice_id: String,
    pub description: String,
    pub account_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<Payer>,
    pub json_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_card: Option<bool>,
}

/// Body of both Get-QR-Link operations. Redirect URLs are only sent for the
/// bank-app method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QrLinkRequest {
    pub amount: Amount,
    pub currency: String,
    pub description: String,
    pub account_id: String,
    pub email: String,
    pub json_data: Value,
    pub invoice_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_redirect_url: Option<String>,
    pub scheme: PaymentScheme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_card: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThreeDsRequest {
    pub transaction_id: String,
    pub pa_res: String,
    pub three_ds_callback_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QrStatusRequest {
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PublicKeyResponse {
    pub pem: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExternalPaymentMethod {
    #[serde(rename = "Type")]
    pub method_type: i32,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MerchantFeatures {
    pub is_save_card: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MerchantConfiguration {
    pub terminal_full_url: Option<String>,
    pub external_payment_methods: Vec<ExternalPaymentMethod>,
    pub features: Option<MerchantFeatures>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MerchantConfigurationResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub model: Option<MerchantConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransactionModel {
    pub transaction_id: Option<TransactionId>,
    pub reason_code: Option<i32>,
    pub card_holder_message: Option<String>,
    pub pa_req: Option<String>,
    pub acs_url: Option<String>,
    pub three_ds_callback_id: Option<String>,
}

impl TransactionModel {
    /// Challenge data, if both the token and the target URL are non-empty.
    pub fn challenge(&self) -> Option<ChallengeRequest> {
        let token = self.pa_req.as_deref().filter(|s| !s.is_empty())?;
        let target_url = self.acs_url.as_deref().filter(|s| !s.is_empty())?;
        Some(ChallengeRequest {
            token: token.to_string(),
            target_url: target_url.to_string(),
            callback_id: self.three_ds_callback_id.clone().unwrap_or_default(),
        })
    }

    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            id: self.transaction_id.unwrap_or_default(),
            status: TransactionStatus::default(),
            reason_code: self.reason_code,
            card_holder_message: self.card_holder_message.clone(),
            challenge: self.challenge(),
            qr: None,
        }
    }
}

/// Reply of Charge and Auth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransactionResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    #[serde(rename = "Model")]
    pub transaction: Option<TransactionModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ThreeDsResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub reason_code: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankDirectory {
    pub version: Option<String>,
    pub dictionary: Vec<BankApp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QrLinkModel {
    pub transaction_id: Option<TransactionId>,
    pub qr_url: Option<String>,
    pub provider_qr_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub banks: Option<BankDirectory>,
    pub message: Option<String>,
}

impl QrLinkModel {
    pub fn to_transaction(&self) -> Transaction {
        let qr = self
            .qr_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| QrDetails {
                redirect_url: url.to_string(),
                provider_qr_id: self.provider_qr_id.clone(),
                bank_apps: self
                    .banks
                    .as_ref()
                    .map(|banks| banks.dictionary.clone())
                    .unwrap_or_default(),
            });
        Transaction {
            id: self.transaction_id.unwrap_or_default(),
            qr,
            ..Transaction::default()
        }
    }
}

/// Reply of both Get-QR-Link operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QrLinkResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    #[serde(rename = "Model")]
    pub transaction: Option<QrLinkModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QrStatusModel {
    pub transaction_id: Option<TransactionId>,
    pub status: Option<String>,
    pub reason_code: Option<i32>,
}

impl QrStatusModel {
    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            id: self.transaction_id.unwrap_or_default(),
            status: TransactionStatus::from_gateway(self.status.as_deref()),
            reason_code: self.reason_code,
            ..Transaction::default()
        }
    }
}

/// Reply of QrLinkStatusWait.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QrStatusResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    #[serde(rename = "Model")]
    pub transaction: Option<QrStatusModel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_response_deserialization() {
        let json = r#"{
            "Success": false,
            "Message": null,
            "Model": {
                "TransactionId": 77,
                "PaReq": "X",
                "AcsUrl": "https://acs",
                "ThreeDsCallbackId": "cb-1"
            }
        }"#;
        let response: TransactionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.success, Some(false));
        let model = response.transaction.unwrap();
        let challenge = model.challenge().unwrap();
        assert_eq!(challenge.token, "X");
        assert_eq!(challenge.target_url, "https://acs");
        assert_eq!(challenge.callback_id, "cb-1");
        assert_eq!(model.to_transaction().id, 77);
    }

    #[test]
    fn test_empty_challenge_fields_are_not_a_challenge() {
        let model = TransactionModel {
            pa_req: Some(String::new()),
            acs_url: Some("https://acs".into()),
            ..TransactionModel::default()
        };
        assert!(model.challenge().is_none());
    }

    #[test]
    fn test_no_login_qr_link_response_deserialization() {
        let json = r#"{
            "Success": true,
            "Model": {
                "TransactionId": 456,
                "QrUrl": "https://qr.example/pay",
                "ProviderQrId": "AD100",
                "Banks": {"version": "1", "dictionary": [
                    {
                        "bankName": "Bank",
                        "logoURL": "https://logo",
                        "schema": "bank100000000001",
                        "package_name": "com.bank"
                    }
                ]}
            }
        }"#;
        let response: QrLinkResponse = serde_json::from_str(json).unwrap();
        let tx = response.transaction.unwrap().to_transaction();
        let qr = tx.qr.unwrap();
        assert_eq!(tx.id, 456);
        assert_eq!(qr.provider_qr_id.as_deref(), Some("AD100"));
        assert_eq!(qr.bank_apps.len(), 1);
        assert_eq!(qr.bank_apps[0].package_name.as_deref(), Some("com.bank"));
    }

    #[test]
    fn test_status_request_serialization() {
        let body = QrStatusRequest {
            transaction_id: 456,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"TransactionId":456}"#
        );
    }
}
