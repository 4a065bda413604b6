//! Scripted gateway conversations replayed through the real orchestrators.
//!
//! A scenario file names the payment mode, the payment parameters and the
//! replies the gateway gives, per operation, in order. A reply is either the
//! gateway's JSON body or `{"transportError": ...}` for a failed exchange.

use crate::application::card::CardPaymentOrchestrator;
use crate::application::merchant::{MerchantOptions, MerchantProfile, load_merchant_profile};
use crate::application::qr::QrPaymentOrchestrator;
use crate::config::OrchestratorConfig;
use crate::domain::api::{
    MerchantConfigurationResponse, PublicKeyResponse, QrLinkResponse, QrStatusResponse,
    ThreeDsResponse, TransactionResponse,
};
use crate::domain::payment::{PaymentParameters, QrMethod, TransactionMode};
use crate::domain::state::{OrchestratorState, Phase};
use crate::domain::transaction::TransactionId;
use crate::error::{PaymentError, Result, TransportError, TransportResult};
use crate::infrastructure::scripted::ScriptedGateway;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One scripted answer: a gateway body, or a failed exchange.
#[derive(Debug, Clone)]
pub enum ScriptedReply<T> {
    TransportFailure { transport_error: TransportError },
    Reply(T),
}

// Parsed through `Value` rather than `#[serde(untagged)]`: untagged enums
// buffer their input, which loses numbers under `arbitrary_precision`.
impl<'de, T: DeserializeOwned> Deserialize<'de> for ScriptedReply<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        let failure = value
            .as_object_mut()
            .and_then(|fields| fields.remove("transportError"));
        match failure {
            Some(error) => serde_json::from_value(error)
                .map(|transport_error| Self::TransportFailure { transport_error })
                .map_err(D::Error::custom),
            None => serde_json::from_value(value)
                .map(Self::Reply)
                .map_err(D::Error::custom),
        }
    }
}

impl<T> ScriptedReply<T> {
    pub fn into_result(self) -> TransportResult<T> {
        match self {
            Self::TransportFailure { transport_error } => Err(transport_error),
            Self::Reply(reply) => Ok(reply),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioReplies {
    pub public_key: Vec<ScriptedReply<PublicKeyResponse>>,
    pub merchant_configuration: Vec<ScriptedReply<MerchantConfigurationResponse>>,
    pub charge: Vec<ScriptedReply<TransactionResponse>>,
    pub auth: Vec<ScriptedReply<TransactionResponse>>,
    pub three_ds: Vec<ScriptedReply<ThreeDsResponse>>,
    pub bank_app_qr_link: Vec<ScriptedReply<QrLinkResponse>>,
    pub no_login_qr_link: Vec<ScriptedReply<QrLinkResponse>>,
    pub status: Vec<ScriptedReply<QrStatusResponse>>,
}

impl ScenarioReplies {
    /// Loads every queue into a fresh scripted gateway.
    pub fn into_gateway(self) -> ScriptedGateway {
        let mut gateway = ScriptedGateway::new();
        for reply in self.public_key {
            gateway = gateway.with_public_key(reply.into_result());
        }
        for reply in self.merchant_configuration {
            gateway = gateway.with_merchant_configuration(reply.into_result());
        }
        for reply in self.charge {
            gateway = gateway.with_charge(reply.into_result());
        }
        for reply in self.auth {
            gateway = gateway.with_auth(reply.into_result());
        }
        for reply in self.three_ds {
            gateway = gateway.with_three_ds(reply.into_result());
        }
        for reply in self.bank_app_qr_link {
            gateway = gateway.with_bank_app_qr_link(reply.into_result());
        }
        for reply in self.no_login_qr_link {
            gateway = gateway.with_no_login_qr_link(reply.into_result());
        }
        gateway.with_statuses(self.status.into_iter().map(ScriptedReply::into_result))
    }
}

/// The host's answer to a 3-D Secure challenge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChallengeAnswer {
    /// Posted as the transaction id of the challenge result; the issued
    /// transaction id when absent.
    pub token: Option<String>,
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingLink {
    pub transaction_id: TransactionId,
    #[serde(default)]
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub mode: TransactionMode,
    pub parameters: PaymentParameters,
    #[serde(default)]
    pub cryptogram: String,
    #[serde(default)]
    pub save_card: Option<bool>,
    #[serde(default)]
    pub challenge: Option<ChallengeAnswer>,
    #[serde(default)]
    pub link: Option<ExistingLink>,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub replies: ScenarioReplies,
}

impl Scenario {
    /// Parses a scenario from JSON.
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        serde_json::from_reader(source).map_err(PaymentError::from)
    }

    /// Replays the scenario and returns every published snapshot in order.
    pub async fn run(self, config: &OrchestratorConfig) -> Result<Vec<OrchestratorState>> {
        let loads_profile = !self.replies.merchant_configuration.is_empty();
        let gateway = Arc::new(self.replies.into_gateway());

        let profile = if loads_profile {
            let public_id = self
                .public_id
                .or_else(|| config.public_id.clone())
                .unwrap_or_default();
            let options = MerchantOptions {
                disable_no_login_qr: config.disable_no_login_qr,
            };
            Some(load_merchant_profile(&*gateway, &public_id, options).await?)
        } else {
            None
        };

        let params = Arc::new(self.parameters);
        let states = match self.mode {
            TransactionMode::CardAndOptions => {
                let mut card = CardPaymentOrchestrator::new(
                    gateway,
                    params,
                    config.scheme(),
                    self.cryptogram,
                )
                .with_save_card(self.save_card);
                let rx = card.subscribe();
                drive_card(&mut card, self.challenge).await?;
                drop(card);
                collect(rx).await
            }
            TransactionMode::DirectQrMethod(method) => {
                let mut qr = qr_orchestrator(gateway, params, method, config, profile.as_ref())?;
                if let Some(link) = self.link {
                    qr = qr.with_link(link.transaction_id, link.redirect_url);
                }
                let rx = qr.subscribe();
                drive_qr(&mut qr, self.save_card).await?;
                drop(qr);
                collect(rx).await
            }
        };
        Ok(states)
    }
}

fn qr_orchestrator(
    gateway: Arc<ScriptedGateway>,
    params: Arc<PaymentParameters>,
    method: QrMethod,
    config: &OrchestratorConfig,
    profile: Option<&MerchantProfile>,
) -> Result<QrPaymentOrchestrator> {
    let redirects = match profile {
        Some(profile) if !profile.is_available(method) => {
            return Err(PaymentError::ValidationError(format!(
                "{method} is not enabled for this terminal"
            )));
        }
        Some(profile) => profile.redirect_urls(&config.redirect),
        None => config.redirect.clone(),
    };
    Ok(
        QrPaymentOrchestrator::new(gateway, params, method, config.scheme())
            .with_redirects(redirects)
            .with_poll_policy(config.poll),
    )
}

async fn drive_card(
    card: &mut CardPaymentOrchestrator,
    challenge: Option<ChallengeAnswer>,
) -> Result<()> {
    card.submit().await?;
    if card.state().phase != Phase::AwaitingChallenge {
        return Ok(());
    }
    let Some(answer) = challenge else {
        warn!("Scenario has no challenge answer, stopping at the challenge");
        return Ok(());
    };
    let token = answer
        .token
        .unwrap_or_else(|| card.state().transaction_id().to_string());
    card.complete_challenge(&token, &answer.response).await
}

async fn drive_qr(qr: &mut QrPaymentOrchestrator, save_card: Option<bool>) -> Result<()> {
    if qr.state().phase == Phase::RequestingLink {
        qr.request_link(save_card).await?;
    }
    if qr.state().phase != Phase::AwaitingAction {
        return Ok(());
    }
    if let Some(url) = qr.redirect_url() {
        info!(redirect_url = url, "Handing QR link to the banking app");
    }
    let transaction_id = qr.state().transaction_id();
    qr.begin_polling(transaction_id).await
}

async fn collect(mut rx: mpsc::UnboundedReceiver<OrchestratorState>) -> Vec<OrchestratorState> {
    let mut states = Vec::new();
    while let Some(state) = rx.recv().await {
        states.push(state);
    }
    states
}
