#![allow(dead_code)]

use payflow::domain::api::{
    QrLinkModel, QrLinkResponse, QrStatusModel, QrStatusResponse, TransactionModel,
    TransactionResponse,
};
use payflow::domain::payment::{Amount, PaymentParameters};
use payflow::domain::state::OrchestratorState;
use payflow::error::TransportResult;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn params() -> Arc<PaymentParameters> {
    let amount = Amount::new(dec!(100.00)).unwrap();
    Arc::new(
        PaymentParameters::new(amount, "RUB")
            .with_invoice_id("INV-100")
            .with_description("Order #100")
            .with_email("payer@example.com"),
    )
}

pub fn transaction_reply(
    success: bool,
    model: TransactionModel,
) -> TransportResult<TransactionResponse> {
    Ok(TransactionResponse {
        success: Some(success),
        message: None,
        transaction: Some(model),
    })
}

pub fn link_reply(transaction_id: i64, qr_url: &str) -> TransportResult<QrLinkResponse> {
    Ok(QrLinkResponse {
        success: Some(true),
        message: None,
        transaction: Some(QrLinkModel {
            transaction_id: Some(transaction_id),
            qr_url: Some(qr_url.to_string()),
            ..QrLinkModel::default()
        }),
    })
}

pub fn status_reply(transaction_id: i64, status: &str) -> TransportResult<QrStatusResponse> {
    Ok(QrStatusResponse {
        success: Some(true),
        message: None,
        transaction: Some(QrStatusModel {
            transaction_id: Some(transaction_id),
            status: Some(status.to_string()),
            reason_code: None,
        }),
    })
}

/// Everything published so far, without waiting.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OrchestratorState>) -> Vec<OrchestratorState> {
    let mut states = Vec::new();
    while let Ok(state) = rx.try_recv() {
        states.push(state);
    }
    states
}
