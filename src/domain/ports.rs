use super::api::{
    CardPaymentRequest, MerchantConfigurationResponse, PublicKeyResponse, QrLinkRequest,
    QrLinkResponse, QrStatusRequest, QrStatusResponse, ThreeDsRequest, ThreeDsResponse,
    TransactionResponse,
};
use crate::error::TransportResult;
use async_trait::async_trait;
use std::sync::Arc;

/// The payment gateway as seen by the orchestrators.
///
/// Implementations own the transport (TLS, headers, timeouts). A failed
/// exchange comes back as `TransportError`; any reply that was received,
/// including a business rejection, is `Ok`.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn get_public_key(&self) -> TransportResult<PublicKeyResponse>;
    async fn get_merchant_configuration(
        &self,
        public_id: &str,
    ) -> TransportResult<MerchantConfigurationResponse>;
    async fn charge(&self, body: &CardPaymentRequest) -> TransportResult<TransactionResponse>;
    async fn auth(&self, body: &CardPaymentRequest) -> TransportResult<TransactionResponse>;
    async fn post_three_ds(&self, body: &ThreeDsRequest) -> TransportResult<ThreeDsResponse>;
    async fn get_bank_app_qr_link(&self, body: &QrLinkRequest) -> TransportResult<QrLinkResponse>;
    async fn get_no_login_qr_link(&self, body: &QrLinkRequest)
    -> TransportResult<QrLinkResponse>;
    /// Long-poll: the gateway holds the request until the status changes or
    /// its own timeout fires.
    async fn qr_link_status_wait(&self, body: &QrStatusRequest)
    -> TransportResult<QrStatusResponse>;
}

pub type SharedGatewayClient = Arc<dyn GatewayClient>;
