use crate::domain::api::{
    CardPaymentRequest, MerchantConfigurationResponse, PublicKeyResponse, QrLinkRequest,
    QrLinkResponse, QrStatusRequest, QrStatusResponse, ThreeDsRequest, ThreeDsResponse,
    TransactionResponse,
};
use crate::domain::ports::GatewayClient;
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A request the scripted gateway received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    PublicKey,
    MerchantConfiguration(String),
    Charge(CardPaymentRequest),
    Auth(CardPaymentRequest),
    ThreeDs(ThreeDsRequest),
    BankAppQrLink(QrLinkRequest),
    NoLoginQrLink(QrLinkRequest),
    Status(QrStatusRequest),
}

#[derive(Debug, Default)]
struct Script {
    public_key: VecDeque<TransportResult<PublicKeyResponse>>,
    merchant_configuration: VecDeque<TransportResult<MerchantConfigurationResponse>>,
    charge: VecDeque<TransportResult<TransactionResponse>>,
    auth: VecDeque<TransportResult<TransactionResponse>>,
    three_ds: VecDeque<TransportResult<ThreeDsResponse>>,
    bank_app_qr_link: VecDeque<TransportResult<QrLinkResponse>>,
    no_login_qr_link: VecDeque<TransportResult<QrLinkResponse>>,
    status: VecDeque<TransportResult<QrStatusResponse>>,
    requests: Vec<RecordedRequest>,
}

/// In-memory `GatewayClient` that replays queued replies.
///
/// Each operation has its own FIFO queue; an operation whose queue is empty
/// answers `TransportError::NoResponse`. Clones share the same script, so a
/// test can keep one handle and inspect `requests()` after the run.
#[derive(Debug, Default, Clone)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
    latency: Option<Duration>,
}

impl ScriptedGateway {
    /// A gateway with empty queues; every call answers `NoResponse`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_public_key(self, reply: TransportResult<PublicKeyResponse>) -> Self {
        self.script().public_key.push_back(reply);
        self
    }

    pub fn with_merchant_configuration(
        self,
        reply: TransportResult<MerchantConfigurationResponse>,
    ) -> Self {
        self.script().merchant_configuration.push_back(reply);
        self
    }

    pub fn with_charge(self, reply: TransportResult<TransactionResponse>) -> Self {
        self.script().charge.push_back(reply);
        self
    }

    pub fn with_auth(self, reply: TransportResult<TransactionResponse>) -> Self {
        self.script().auth.push_back(reply);
        self
    }

    pub fn with_three_ds(self, reply: TransportResult<ThreeDsResponse>) -> Self {
        self.script().three_ds.push_back(reply);
        self
    }

    pub fn with_bank_app_qr_link(self, reply: TransportResult<QrLinkResponse>) -> Self {
        self.script().bank_app_qr_link.push_back(reply);
        self
    }

    pub fn with_no_login_qr_link(self, reply: TransportResult<QrLinkResponse>) -> Self {
        self.script().no_login_qr_link.push_back(reply);
        self
    }

    pub fn with_status(self, reply: TransportResult<QrStatusResponse>) -> Self {
        self.script().status.push_back(reply);
        self
    }

    /// Queues several status replies at once.
    pub fn with_statuses(
        self,
        replies: impl IntoIterator<Item = TransportResult<QrStatusResponse>>,
    ) -> Self {
        self.script().status.extend(replies);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script().requests.clone()
    }

    /// Replies still queued across all operations.
    pub fn pending_replies(&self) -> usize {
        let script = self.script();
        script.public_key.len()
            + script.merchant_configuration.len()
            + script.charge.len()
            + script.auth.len()
            + script.three_ds.len()
            + script.bank_app_qr_link.len()
            + script.no_login_qr_link.len()
            + script.status.len()
    }

    async fn answer<T>(
        &self,
        request: RecordedRequest,
        queue: impl FnOnce(&mut Script) -> &mut VecDeque<TransportResult<T>>,
    ) -> TransportResult<T> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut script = self.script();
        debug!(?request, "Scripted gateway received request");
        script.requests.push(request);
        queue(&mut *script)
            .pop_front()
            .unwrap_or(Err(TransportError::NoResponse))
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn get_public_key(&self) -> TransportResult<PublicKeyResponse> {
        self.answer(RecordedRequest::PublicKey, |s| &mut s.public_key)
            .await
    }

    async fn get_merchant_configuration(
        &self,
        public_id: &str,
    ) -> TransportResult<MerchantConfigurationResponse> {
        self.answer(
            RecordedRequest::MerchantConfiguration(public_id.to_string()),
            |s| &mut s.merchant_configuration,
        )
        .await
    }

    async fn charge(&self, body: &CardPaymentRequest) -> TransportResult<TransactionResponse> {
        self.answer(RecordedRequest::Charge(body.clone()), |s| &mut s.charge)
            .await
    }

    async fn auth(&self, body: &CardPaymentRequest) -> TransportResult<TransactionResponse> {
        self.answer(RecordedRequest::Auth(body.clone()), |s| &mut s.auth)
            .await
    }

    async fn post_three_ds(&self, body: &ThreeDsRequest) -> TransportResult<ThreeDsResponse> {
        self.answer(RecordedRequest::ThreeDs(body.clone()), |s| &mut s.three_ds)
            .await
    }

    async fn get_bank_app_qr_link(&self, body: &QrLinkRequest) -> TransportResult<QrLinkResponse> {
        self.answer(RecordedRequest::BankAppQrLink(body.clone()), |s| {
            &mut s.bank_app_qr_link
        })
        .await
    }

    async fn get_no_login_qr_link(
        &self,
        body: &QrLinkRequest,
    ) -> TransportResult<QrLinkResponse> {
        self.answer(RecordedRequest::NoLoginQrLink(body.clone()), |s| {
            &mut s.no_login_qr_link
        })
        .await
    }

    async fn qr_link_status_wait(
        &self,
        body: &QrStatusRequest,
    ) -> TransportResult<QrStatusResponse> {
        self.answer(RecordedRequest::Status(*body), |s| &mut s.status)
            .await
    }
}
