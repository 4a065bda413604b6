//! Application layer: the payment orchestrators and the pieces they share.
//!
//! Each orchestrator owns a `StatePublisher` and talks to the gateway only
//! through the `GatewayClient` port. Request bodies come from the
//! `TransactionRequestBuilder`, replies are read by the classifier, and the
//! QR flow hands its transaction to the `StatusPoller`.

pub mod card;
pub mod classifier;
pub mod merchant;
pub mod poller;
pub mod publisher;
pub mod qr;
pub mod request_builder;
