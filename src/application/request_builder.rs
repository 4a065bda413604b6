use crate::domain::api::{CardPaymentRequest, QrLinkRequest};
use crate::domain::payment::{PaymentParameters, PaymentScheme, QrMethod};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Where a bank-app QR payment returns the payer after the banking app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct RedirectUrls {
    pub success: String,
    pub fail: String,
}

/// Builds gateway request bodies from payment parameters.
///
/// Pure: the same parameters, scheme and save-card flag always produce the
/// same body.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRequestBuilder<'a> {
    params: &'a PaymentParameters,
    scheme: PaymentScheme,
    save_card: Option<bool>,
}

impl<'a> TransactionRequestBuilder<'a> {
    pub fn new(params: &'a PaymentParameters, scheme: PaymentScheme) -> Self {
        Self {
            params,
            scheme,
            save_card: None,
        }
    }

    /// `None` leaves the flag out of the body entirely.
    pub fn save_card(mut self, save_card: Option<bool>) -> Self {
        self.save_card = save_card;
        self
    }

    /// Body for Charge or Auth.
    pub fn card_payment(&self, cryptogram: &str) -> CardPaymentRequest {
        let params = self.params;
        CardPaymentRequest {
            amount: params.amount,
            currency: params.currency.clone(),
            cryptogram: cryptogram.to_string(),
            invoice_id: params.invoice_id.clone().unwrap_or_default(),
            description: params.description.clone().unwrap_or_default(),
            account_id: params.account_id.clone().unwrap_or_default(),
            email: params.email.clone().unwrap_or_default(),
            payer: params.payer.clone(),
            json_data: metadata_or_empty(params.metadata.as_deref()),
            save_card: self.save_card,
        }
    }

    /// Body for either QR link operation. Redirect URLs are only sent for
    /// the bank-app method.
    pub fn qr_link(&self, method: QrMethod, redirects: &RedirectUrls) -> QrLinkRequest {
        let params = self.params;
        let (success_redirect_url, fail_redirect_url) = match method {
            QrMethod::BankAppQr => (Some(redirects.success.clone()), Some(redirects.fail.clone())),
            QrMethod::NoLoginQr => (None, None),
        };
        QrLinkRequest {
            amount: params.amount,
            currency: params.currency.clone(),
            description: params.description.clone().unwrap_or_default(),
            account_id: params.account_id.clone().unwrap_or_default(),
            email: params.email.clone().unwrap_or_default(),
            json_data: metadata_or_empty(params.metadata.as_deref()),
            invoice_id: params.invoice_id.clone().unwrap_or_default(),
            success_redirect_url,
            fail_redirect_url,
            scheme: self.scheme,
            save_card: self.save_card,
        }
    }
}

/// Parses merchant metadata text as JSON.
pub fn parse_metadata(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(PaymentError::MetadataParse)
}

/// Metadata as it goes on the wire: the parsed value, or an empty object when
/// the text is missing, blank or not JSON.
pub fn metadata_or_empty(text: Option<&str>) -> Value {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Value::Object(Map::new());
    };
    match parse_metadata(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Merchant metadata dropped, sending empty object");
            Value::Object(Map::new())
        }
    }
}
