use crate::application::poller::PollPolicy;
use crate::application::request_builder::RedirectUrls;
use crate::domain::payment::PaymentScheme;
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::path::Path;

/// Host-side settings of the orchestrators.
///
/// Layered from an optional file and `PAYFLOW__*` environment variables,
/// e.g. `PAYFLOW__POLL__MAX_ATTEMPTS=50`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub public_id: Option<String>,
    pub use_dual_message_payment: bool,
    pub disable_no_login_qr: bool,
    pub redirect: RedirectUrls,
    pub poll: PollPolicy,
}

impl OrchestratorConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("PAYFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: OrchestratorConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.poll.max_attempts == Some(0) {
            return Err(PaymentError::ValidationError(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.poll.max_duration_secs == Some(0) {
            return Err(PaymentError::ValidationError(
                "poll.max_duration_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Charge or Auth, from the dual-message switch.
    pub fn scheme(&self) -> PaymentScheme {
        PaymentScheme::from_dual_message(self.use_dual_message_payment)
    }
}
