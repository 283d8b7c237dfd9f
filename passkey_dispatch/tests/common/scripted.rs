//! Scripted collaborators: every call parks until the test answers it, so
//! the interleaving of replies is decided by the test alone.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};

use passkey_dispatch::{
    BackendFailure, Collaborators, CreateReply, CreateRequest, CredentialSummary,
    GetCredentialReply, GetReply, GetRequest, IdentityBroker, LegacyPlatformApi, Outcome,
    OutcomeRecorder, PickerBridge, SecurityCheckParams, SecurityCheckResult, SecurityChecker,
    SelectionSender, UnifiedCredentialBroker,
};

const WAIT: Duration = Duration::from_secs(2);

/// A call waiting for the test to answer it.
pub struct Pending<Req, Resp> {
    pub request: Req,
    reply: oneshot::Sender<Resp>,
}

impl<Req, Resp> Pending<Req, Resp> {
    pub fn reply(self, response: Resp) {
        // The request may have finished already; that is what some tests check
        let _ = self.reply.send(response);
    }

    /// Make the collaborator call panic instead of replying.
    pub fn abandon(self) {
        drop(self.reply);
    }
}

pub struct CallQueue<Req, Resp> {
    tx: mpsc::UnboundedSender<Pending<Req, Resp>>,
    rx: Mutex<mpsc::UnboundedReceiver<Pending<Req, Resp>>>,
    calls: AtomicUsize,
}

impl<Req, Resp> Default for CallQueue<Req, Resp> {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<Req: Send, Resp: Send> CallQueue<Req, Resp> {
    /// Called by the collaborator. A call the test abandons panics, the way
    /// a misbehaving backend would.
    async fn call(&self, request: Req) -> Resp {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (reply, response) = oneshot::channel();
        let _ = self.tx.send(Pending { request, reply });
        match response.await {
            Ok(response) => response,
            Err(_) => panic!("scripted collaborator call abandoned"),
        }
    }

    /// The next call made to this collaborator.
    pub async fn next(&self) -> Pending<Req, Resp> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a collaborator call")
            .expect("call queue closed")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// What the picker was asked to show.
pub struct Shown {
    pub candidates: Vec<CredentialSummary>,
    pub is_conditional: bool,
    pub selection: SelectionSender,
    pub offer_hybrid: bool,
}

struct ShownQueue {
    tx: mpsc::UnboundedSender<Shown>,
    rx: Mutex<mpsc::UnboundedReceiver<Shown>>,
    count: AtomicUsize,
}

impl Default for ShownQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            count: AtomicUsize::new(0),
        }
    }
}

#[derive(Default)]
pub struct Script {
    pub security: CallQueue<SecurityCheckParams, SecurityCheckResult>,
    pub legacy_create: CallQueue<CreateRequest, Result<CreateReply, BackendFailure>>,
    pub legacy_get: CallQueue<GetRequest, Result<GetReply, BackendFailure>>,
    pub legacy_hybrid: CallQueue<GetRequest, Result<GetReply, BackendFailure>>,
    pub legacy_enumerate: CallQueue<String, Result<Vec<CredentialSummary>, BackendFailure>>,
    pub legacy_platform_available: CallQueue<(), Result<bool, BackendFailure>>,
    pub unified_create: CallQueue<CreateRequest, Result<CreateReply, BackendFailure>>,
    pub unified_get: CallQueue<GetRequest, Result<GetCredentialReply, BackendFailure>>,
    pub unified_prefetch: CallQueue<GetRequest, Result<Vec<CredentialSummary>, BackendFailure>>,
    pub identity_create: CallQueue<CreateRequest, Result<CreateReply, BackendFailure>>,
    shown: ShownQueue,
    cleanups: AtomicUsize,
    outcomes: StdMutex<Vec<Outcome>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            security: Arc::new(ScriptedSecurity(self.clone())),
            legacy: Arc::new(ScriptedLegacy(self.clone())),
            unified: Arc::new(ScriptedUnified(self.clone())),
            identity: Arc::new(ScriptedIdentity(self.clone())),
            picker: Arc::new(ScriptedPicker(self.clone())),
        }
    }

    pub fn recorder(self: &Arc<Self>) -> Arc<dyn OutcomeRecorder> {
        Arc::new(ScriptedRecorder(self.clone()))
    }

    /// Wait until the picker has been asked to show candidates.
    pub async fn next_shown(&self) -> Shown {
        let mut rx = self.shown.rx.lock().await;
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for the picker")
            .expect("picker queue closed")
    }

    pub fn picker_shows(&self) -> usize {
        self.shown.count.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn backend_calls(&self) -> usize {
        self.legacy_create.calls()
            + self.legacy_get.calls()
            + self.legacy_hybrid.calls()
            + self.legacy_enumerate.calls()
            + self.unified_create.calls()
            + self.unified_get.calls()
            + self.unified_prefetch.calls()
            + self.identity_create.calls()
    }
}

/// Let spawned tasks run so that calls that should not happen would show up.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

struct ScriptedSecurity(Arc<Script>);
struct ScriptedLegacy(Arc<Script>);
struct ScriptedUnified(Arc<Script>);
struct ScriptedIdentity(Arc<Script>);
struct ScriptedPicker(Arc<Script>);
struct ScriptedRecorder(Arc<Script>);

#[async_trait]
impl SecurityChecker for ScriptedSecurity {
    async fn check_create(&self, params: SecurityCheckParams) -> SecurityCheckResult {
        self.0.security.call(params).await
    }

    async fn check_get(&self, params: SecurityCheckParams) -> SecurityCheckResult {
        self.0.security.call(params).await
    }
}

#[async_trait]
impl LegacyPlatformApi for ScriptedLegacy {
    async fn make_credential(&self, request: CreateRequest) -> Result<CreateReply, BackendFailure> {
        self.0.legacy_create.call(request).await
    }

    async fn get_assertion(&self, request: GetRequest) -> Result<GetReply, BackendFailure> {
        self.0.legacy_get.call(request).await
    }

    async fn hybrid_get_assertion(&self, request: GetRequest) -> Result<GetReply, BackendFailure> {
        self.0.legacy_hybrid.call(request).await
    }

    async fn enumerate_credentials(
        &self,
        rp_id: &str,
    ) -> Result<Vec<CredentialSummary>, BackendFailure> {
        self.0.legacy_enumerate.call(rp_id.to_string()).await
    }

    async fn is_platform_authenticator_available(&self) -> Result<bool, BackendFailure> {
        self.0.legacy_platform_available.call(()).await
    }
}

#[async_trait]
impl UnifiedCredentialBroker for ScriptedUnified {
    async fn make_credential(&self, request: CreateRequest) -> Result<CreateReply, BackendFailure> {
        self.0.unified_create.call(request).await
    }

    async fn get_credential(
        &self,
        request: GetRequest,
    ) -> Result<GetCredentialReply, BackendFailure> {
        self.0.unified_get.call(request).await
    }

    async fn prefetch_candidates(
        &self,
        request: GetRequest,
    ) -> Result<Vec<CredentialSummary>, BackendFailure> {
        self.0.unified_prefetch.call(request).await
    }
}

#[async_trait]
impl IdentityBroker for ScriptedIdentity {
    async fn create_credential(
        &self,
        request: CreateRequest,
    ) -> Result<CreateReply, BackendFailure> {
        self.0.identity_create.call(request).await
    }
}

impl PickerBridge for ScriptedPicker {
    fn show_candidates(
        &self,
        candidates: Vec<CredentialSummary>,
        is_conditional: bool,
        selection: SelectionSender,
        offer_hybrid: bool,
    ) {
        self.0.shown.count.fetch_add(1, Ordering::SeqCst);
        let _ = self.0.shown.tx.send(Shown {
            candidates,
            is_conditional,
            selection,
            offer_hybrid,
        });
    }

    fn cleanup(&self) {
        self.0.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

impl OutcomeRecorder for ScriptedRecorder {
    fn record(&self, outcome: Outcome) {
        self.0.outcomes.lock().unwrap().push(outcome);
    }
}
