// wallet-core/src/signing/failure.rs
//
// Outcome reporting - route a signing result to wherever its caller listens

use crate::error::WalletError;
use crate::signing::request::{SignRequest, Transport};
use tracing::{debug, warn};

/// Where a failure ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSurface {
    /// Show this message in the wallet UI
    InApp(String),
    /// Delivered to the request's handler
    Relayed,
    /// External request with nobody listening
    Unhandled,
}

pub fn report_sign_failure(request: &SignRequest, error: &WalletError) -> FailureSurface {
    match request.transport {
        Transport::Algod => FailureSurface::InApp(error.to_string()),
        Transport::Callback | Transport::WalletConnect => match &request.handler {
            Some(handler) => {
                debug!(
                    request_id = ?request.id(),
                    transport = ?request.transport,
                    "relaying sign failure"
                );
                handler.on_error(error);
                FailureSurface::Relayed
            }
            None => {
                warn!(
                    request_id = ?request.id(),
                    transport = ?request.transport,
                    error = %error,
                    "sign failure has no handler"
                );
                FailureSurface::Unhandled
            }
        },
    }
}

/// Hand signatures to the request's handler, if it has one
///
/// Returns whether a handler received them.
pub fn report_sign_success(request: &SignRequest, signatures: &[Vec<u8>]) -> bool {
    match &request.handler {
        Some(handler) => {
            handler.on_success(signatures);
            true
        }
        None => false,
    }
}
