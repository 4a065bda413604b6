use super::request_builder::RedirectUrls;
use crate::domain::payment::QrMethod;
use crate::domain::ports::GatewayClient;
use crate::error::{PaymentError, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct MerchantOptions {
    /// Hides the no-login QR method even when the terminal enables it.
    pub disable_no_login_qr: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKey {
    pub pem: String,
    pub version: i32,
}

/// What the terminal behind a public id allows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantProfile {
    pub public_key: PublicKey,
    pub terminal_url: Option<String>,
    pub bank_app_qr: bool,
    pub no_login_qr: bool,
    /// Raw save-card feature value of the terminal, if it reports one.
    pub save_card_feature: Option<i32>,
}

impl MerchantProfile {
    /// Whether the terminal has this QR method turned on.
    pub fn is_available(&self, method: QrMethod) -> bool {
        match method {
            QrMethod::BankAppQr => self.bank_app_qr,
            QrMethod::NoLoginQr => self.no_login_qr,
        }
    }

    /// Configured redirect URLs, with empty ones replaced by the terminal URL.
    pub fn redirect_urls(&self, configured: &RedirectUrls) -> RedirectUrls {
        let fallback = self.terminal_url.clone().unwrap_or_default();
        let pick = |url: &str| {
            if url.is_empty() {
                fallback.clone()
            } else {
                url.to_string()
            }
        };
        RedirectUrls {
            success: pick(&configured.success),
            fail: pick(&configured.fail),
        }
    }
}

/// Fetches the public key and the terminal configuration for `public_id`.
pub async fn load_merchant_profile(
    gateway: &dyn GatewayClient,
    public_id: &str,
    options: MerchantOptions,
) -> Result<MerchantProfile> {
    let key = gateway.get_public_key().await?;
    let response = gateway.get_merchant_configuration(public_id).await?;

    if response.success != Some(true) {
        let message = response.message.unwrap_or_default();
        warn!(public_id, %message, "Merchant configuration rejected");
        return Err(PaymentError::GatewayRejected(message));
    }

    let config = response.model.unwrap_or_default();
    let enabled = |method: QrMethod| {
        config
            .external_payment_methods
            .iter()
            .any(|m| m.method_type == method.method_type() && m.enabled == Some(true))
    };

    let profile = MerchantProfile {
        public_key: PublicKey {
            pem: key.pem.unwrap_or_default(),
            version: key.version.unwrap_or_default(),
        },
        terminal_url: config.terminal_full_url.clone().filter(|url| !url.is_empty()),
        bank_app_qr: enabled(QrMethod::BankAppQr),
        no_login_qr: enabled(QrMethod::NoLoginQr) && !options.disable_no_login_qr,
        save_card_feature: config.features.as_ref().and_then(|f| f.is_save_card),
    };
    info!(
        public_id,
        bank_app_qr = profile.bank_app_qr,
        no_login_qr = profile.no_login_qr,
        "Merchant profile loaded"
    );
    Ok(profile)
}
