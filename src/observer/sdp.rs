//! Pending create/set description requests

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::error;

use crate::engine::SdpObserver;
use crate::error::{BridgeError, Result};
use crate::types::SessionDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpRequestKind {
    /// create offer / create answer
    Create,
    /// set local / set remote description
    Set,
}

type Completion = Result<Option<SessionDescription>>;

/// Engine-side half of one description request
///
/// Resolves the waiting command exactly once. A callback of the wrong kind
/// rejects the command as a contract violation; any callback after the
/// first is logged and dropped.
pub struct SdpRequest {
    kind: SdpRequestKind,
    failure_code: &'static str,
    tx: Mutex<Option<oneshot::Sender<Completion>>>,
}

/// Command-side half of one description request
pub struct SdpResponse {
    failure_code: &'static str,
    rx: oneshot::Receiver<Completion>,
}

impl SdpRequest {
    pub fn new(kind: SdpRequestKind, failure_code: &'static str) -> (Arc<Self>, SdpResponse) {
        let (tx, rx) = oneshot::channel();
        let request = Arc::new(Self {
            kind,
            failure_code,
            tx: Mutex::new(Some(tx)),
        });
        (request, SdpResponse { failure_code, rx })
    }

    fn resolve(&self, callback: &str, completion: Completion) {
        let Some(tx) = self.tx.lock().take() else {
            error!(
                "SDP request ({}) resolved twice, dropping {}",
                self.failure_code, callback
            );
            return;
        };
        let _ = tx.send(completion);
    }

    fn violation(&self, callback: &str) {
        let message = format!("{} must not be called for a {:?} request", callback, self.kind);
        error!("{}", message);
        self.resolve(callback, Err(BridgeError::FatalContractViolation(message)));
    }
}

impl SdpObserver for SdpRequest {
    fn on_create_success(&self, description: SessionDescription) {
        match self.kind {
            SdpRequestKind::Create => self.resolve("on_create_success", Ok(Some(description))),
            SdpRequestKind::Set => self.violation("on_create_success"),
        }
    }

    fn on_set_success(&self) {
        match self.kind {
            SdpRequestKind::Set => self.resolve("on_set_success", Ok(None)),
            SdpRequestKind::Create => self.violation("on_set_success"),
        }
    }

    fn on_create_failure(&self, reason: String) {
        match self.kind {
            SdpRequestKind::Create => self.resolve(
                "on_create_failure",
                Err(BridgeError::native(self.failure_code, reason)),
            ),
            SdpRequestKind::Set => self.violation("on_create_failure"),
        }
    }

    fn on_set_failure(&self, reason: String) {
        match self.kind {
            SdpRequestKind::Set => self.resolve(
                "on_set_failure",
                Err(BridgeError::native(self.failure_code, reason)),
            ),
            SdpRequestKind::Create => self.violation("on_set_failure"),
        }
    }
}

impl SdpResponse {
    async fn wait(self) -> Completion {
        match self.rx.await {
            Ok(completion) => completion,
            Err(_) => Err(BridgeError::native(
                self.failure_code,
                "request dropped by the engine",
            )),
        }
    }

    /// Wait for a create request
    pub async fn description(self) -> Result<SessionDescription> {
        let failure_code = self.failure_code;
        self.wait().await?.ok_or_else(|| {
            BridgeError::FatalContractViolation(format!(
                "{} request completed without a description",
                failure_code
            ))
        })
    }

    /// Wait for a set request
    pub async fn completion(self) -> Result<()> {
        self.wait().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SdpType;

    #[tokio::test]
    async fn test_create_success() {
        let (request, response) = SdpRequest::new(SdpRequestKind::Create, "CreateOfferFailed");
        request.on_create_success(SessionDescription::new(SdpType::Offer, "v=0"));
        let description = response.description().await.unwrap();
        assert_eq!(description.sdp_type, SdpType::Offer);
    }

    #[tokio::test]
    async fn test_failure_carries_engine_reason() {
        let (request, response) =
            SdpRequest::new(SdpRequestKind::Set, "SetRemoteDescriptionFailed");
        request.on_set_failure("bad fingerprint".to_string());
        let err = response.completion().await.unwrap_err();
        assert_eq!(err.code(), "SetRemoteDescriptionFailed");
        assert!(err.to_string().contains("bad fingerprint"));
    }

    #[tokio::test]
    async fn test_wrong_callback_is_fatal() {
        let (request, response) =
            SdpRequest::new(SdpRequestKind::Set, "SetLocalDescriptionFailed");
        request.on_create_success(SessionDescription::new(SdpType::Answer, "v=0"));
        let err = response.completion().await.unwrap_err();
        assert!(matches!(err, BridgeError::FatalContractViolation(_)));
    }

    #[tokio::test]
    async fn test_second_resolution_is_dropped() {
        let (request, response) = SdpRequest::new(SdpRequestKind::Create, "CreateOfferFailed");
        request.on_create_failure("no transceivers".to_string());
        request.on_create_success(SessionDescription::new(SdpType::Offer, "v=0"));
        let err = response.description().await.unwrap_err();
        assert_eq!(err.code(), "CreateOfferFailed");
    }

    #[tokio::test]
    async fn test_dropped_request_rejects() {
        let (request, response) = SdpRequest::new(SdpRequestKind::Create, "CreateAnswerFailed");
        drop(request);
        let err = response.description().await.unwrap_err();
        assert_eq!(err.code(), "CreateAnswerFailed");
    }

    #[test]
    fn test_resolved_from_engine_thread() {
        let (request, response) = SdpRequest::new(SdpRequestKind::Set, "SetLocalDescriptionFailed");
        std::thread::spawn(move || request.on_set_success())
            .join()
            .unwrap();
        tokio_test::block_on(response.completion()).unwrap();
    }
}
