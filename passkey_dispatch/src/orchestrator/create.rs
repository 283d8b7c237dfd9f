use super::events::BackendCall;
use super::task::RequestTask;
use crate::dispatch::{self, BackendKind, DispatchMode};
use crate::request::CredentialRequest;
use crate::status::{AuthStatus, Outcome};

impl RequestTask {
    pub(super) fn dispatch_create(&mut self) {
        let CredentialRequest::Create(request) = &self.request else {
            return;
        };
        let request = request.clone();

        let backend = match dispatch::decide(&self.dispatch_input()) {
            DispatchMode::OnlyLegacy => BackendKind::LegacyPlatformApi,
            DispatchMode::OnlyUnified => BackendKind::UnifiedCredentialBroker,
            DispatchMode::OnlyIdentity => BackendKind::IdentityBroker,
            DispatchMode::Reject { status, outcome } => {
                self.fail(status, Some(outcome));
                return;
            }
            mode => {
                tracing::error!(?mode, "Dispatch mode not applicable to create");
                self.fail(AuthStatus::UnknownError, Some(Outcome::OtherFailure));
                return;
            }
        };

        self.issue(BackendCall::Create { backend, request });
    }
}
