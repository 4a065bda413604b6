//! Domain layer: payment data, gateway wire models, the gateway port and the
//! orchestration state machine.

pub mod api;
pub mod payment;
pub mod ports;
pub mod state;
pub mod transaction;
