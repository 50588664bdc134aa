//! Login handshake state machine.
//!
//! One instance lives for one page load. The UI calls [`LoginHandshake::detect`]
//! when the page loads and [`LoginHandshake::trigger`] when the user presses
//! the sign-in action; everything in between is driven by the wallet.
//!
//! ```text
//! Idle -> WalletDetecting -> AccountRequesting -> Signing -> Redirecting -> Done
//!              |                    |               |            |
//!              +--------------------+---------------+------------+--> Failed(..)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{
    ChallengeError, FailurePayload, HandshakeError, HandshakeFailure, WalletError,
};
use crate::handshake::context::ChallengeContext;
use crate::handshake::message::{MessageFormat, SignedProof, build_message, encode_proof};
use crate::navigator::Navigator;
use crate::wallet::{WalletAccount, WalletGateway, looks_like_evm_address, redact_signature};

const TIMELINE_CAP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failure", rename_all = "snake_case")]
pub enum HandshakeState {
    Idle,
    /// Probing for a provider, or provider found and waiting for the user.
    WalletDetecting,
    AccountRequesting,
    Signing,
    Redirecting,
    Done,
    Failed(HandshakeFailure),
}

impl HandshakeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WalletDetecting => "wallet_detecting",
            Self::AccountRequesting => "account_requesting",
            Self::Signing => "signing",
            Self::Redirecting => "redirecting",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }

    fn in_flight(&self) -> bool {
        matches!(
            self,
            Self::AccountRequesting | Self::Signing | Self::Redirecting
        )
    }
}

impl std::fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(failure) => write!(f, "failed({failure})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Protocol knobs agreed with the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOptions {
    /// Path (absolute or relative to the login page) of the authorization
    /// endpoint.
    pub authorize_path: String,
    pub message_format: MessageFormat,
    /// `false` selects the nonce-only revision that omits `chain_id`.
    pub include_chain_id: bool,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            authorize_path: "/authorize".to_string(),
            message_format: MessageFormat::default(),
            include_chain_id: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransitionEvent {
    pub seq: u64,
    pub state: HandshakeState,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Snapshot rendered by the UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct HandshakeStatus {
    pub state: HandshakeState,
    pub can_sign: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailurePayload>,
}

#[derive(Debug)]
struct MachineState {
    state: HandshakeState,
    provider_detected: bool,
    last_error: Option<String>,
    timeline: Vec<TransitionEvent>,
    next_seq: u64,
}

impl MachineState {
    fn new() -> Self {
        let mut machine = Self {
            state: HandshakeState::Idle,
            provider_detected: false,
            last_error: None,
            timeline: Vec::new(),
            next_seq: 1,
        };
        machine.record("page loaded");
        machine
    }

    fn transition(&mut self, state: HandshakeState, detail: &str) {
        self.state = state;
        self.record(detail);
    }

    fn record(&mut self, detail: &str) {
        tracing::info!(state = %self.state, detail, "handshake transition");
        self.timeline.push(TransitionEvent {
            seq: self.next_seq,
            state: self.state,
            detail: detail.to_string(),
            at: Utc::now(),
        });
        self.next_seq += 1;
        if self.timeline.len() > TIMELINE_CAP {
            let overflow = self.timeline.len() - TIMELINE_CAP;
            self.timeline.drain(0..overflow);
        }
    }

    fn fail(&mut self, err: &HandshakeError) {
        if let Some(failure) = err.failure() {
            self.last_error = Some(err.to_string());
            self.transition(HandshakeState::Failed(failure), &err.to_string());
        }
    }
}

pub struct LoginHandshake {
    context: Result<ChallengeContext, ChallengeError>,
    wallet: Arc<dyn WalletGateway>,
    navigator: Arc<dyn Navigator>,
    options: HandshakeOptions,
    machine: Mutex<MachineState>,
}

impl LoginHandshake {
    /// Parse the challenge out of `page_url` and set up an idle machine.
    pub fn new(
        page_url: &str,
        wallet: Arc<dyn WalletGateway>,
        navigator: Arc<dyn Navigator>,
        options: HandshakeOptions,
    ) -> Self {
        let context = ChallengeContext::parse(page_url);
        if let Err(ref err) = context {
            tracing::warn!(error = %err, "login page opened without a usable challenge");
        }
        Self {
            context,
            wallet,
            navigator,
            options,
            machine: Mutex::new(MachineState::new()),
        }
    }

    pub fn context(&self) -> Option<&ChallengeContext> {
        self.context.as_ref().ok()
    }

    pub fn state(&self) -> HandshakeState {
        self.lock().state
    }

    /// Whether the sign-in action should be enabled.
    pub fn can_sign(&self) -> bool {
        let machine = self.lock();
        match machine.state {
            HandshakeState::WalletDetecting => machine.provider_detected,
            HandshakeState::Failed(failure) => failure.retryable(),
            _ => false,
        }
    }

    pub fn timeline(&self) -> Vec<TransitionEvent> {
        self.lock().timeline.clone()
    }

    pub fn failure_payload(&self) -> Option<FailurePayload> {
        let machine = self.lock();
        match machine.state {
            HandshakeState::Failed(failure) => Some(FailurePayload::new(
                failure,
                machine
                    .last_error
                    .clone()
                    .unwrap_or_else(|| failure.guidance().to_string()),
            )),
            _ => None,
        }
    }

    pub fn status(&self) -> HandshakeStatus {
        HandshakeStatus {
            state: self.state(),
            can_sign: self.can_sign(),
            failure: self.failure_payload(),
        }
    }

    /// Page-load step: look for a wallet provider.
    ///
    /// A link without a nonce fails here without touching the wallet.
    pub async fn detect(&self) -> HandshakeState {
        {
            let mut machine = self.lock();
            if machine.state != HandshakeState::Idle {
                return machine.state;
            }
            machine.transition(HandshakeState::WalletDetecting, "detecting wallet provider");
            if let Err(ref err) = self.context {
                machine.fail(&HandshakeError::from(err.clone()));
                return machine.state;
            }
        }

        let available = self.wallet.is_available().await;

        let mut machine = self.lock();
        if available {
            machine.provider_detected = true;
            machine.record("wallet provider detected");
        } else {
            tracing::warn!("No Web3 wallet detected; sign-in is disabled until one is installed");
            machine.fail(&HandshakeError::NoProvider);
        }
        machine.state
    }

    /// User-triggered login attempt.
    ///
    /// Returns the navigation target handed to the [`Navigator`]. A trigger
    /// while another attempt is running is rejected rather than queued.
    pub async fn trigger(&self) -> Result<String, HandshakeError> {
        if self.state() == HandshakeState::Idle {
            self.detect().await;
        }

        let (context, attempt_id) = self.begin_attempt()?;
        let mut guard = AttemptGuard {
            handshake: self,
            armed: true,
        };

        let result = self.run_attempt(context, attempt_id).await;
        guard.armed = false;

        let mut machine = self.lock();
        match &result {
            Ok(_) => {
                machine.last_error = None;
                machine.transition(HandshakeState::Done, "navigation issued");
            }
            Err(err) => {
                tracing::warn!(%attempt_id, error = %err, "login attempt failed");
                machine.fail(err);
            }
        }
        result
    }

    fn begin_attempt(&self) -> Result<(&ChallengeContext, Uuid), HandshakeError> {
        let mut machine = self.lock();
        match machine.state {
            HandshakeState::Failed(HandshakeFailure::NoProvider) => {
                return Err(HandshakeError::NoProvider);
            }
            HandshakeState::Failed(HandshakeFailure::MissingNonce) => {
                return Err(HandshakeError::MissingNonce);
            }
            HandshakeState::Failed(_) => {}
            HandshakeState::WalletDetecting if machine.provider_detected => {}
            HandshakeState::Done => return Err(HandshakeError::AlreadyCompleted),
            _ => return Err(HandshakeError::AttemptInFlight),
        }

        let context = match &self.context {
            Ok(context) => context,
            Err(err) => {
                let err = HandshakeError::from(err.clone());
                machine.fail(&err);
                return Err(err);
            }
        };

        let attempt_id = Uuid::new_v4();
        machine.last_error = None;
        machine.transition(HandshakeState::AccountRequesting, "requesting wallet accounts");
        tracing::debug!(%attempt_id, "login attempt started");
        Ok((context, attempt_id))
    }

    async fn run_attempt(
        &self,
        context: &ChallengeContext,
        attempt_id: Uuid,
    ) -> Result<String, HandshakeError> {
        let account = self.select_account(context).await?;

        let message = build_message(self.options.message_format, &account.address, &context.nonce);
        self.lock()
            .transition(HandshakeState::Signing, "waiting for wallet signature");
        tracing::debug!(%attempt_id, message = %message, "requesting signature");

        let signature = self
            .wallet
            .sign_message(&message, &account.address)
            .await
            .map_err(signing_failure)?;
        tracing::info!(
            %attempt_id,
            account = %account.address,
            chain_id = ?account.chain_id,
            signature = %redact_signature(&signature),
            "message signed"
        );

        let proof = SignedProof {
            account: account.address,
            chain_id: account.chain_id,
            signature,
        };
        let target = format!(
            "{}?{}",
            self.options.authorize_path,
            encode_proof(&context.query, &proof)
        );

        self.lock()
            .transition(HandshakeState::Redirecting, "opening authorization endpoint");
        self.navigator.navigate(&target)?;
        Ok(target)
    }

    async fn select_account(
        &self,
        context: &ChallengeContext,
    ) -> Result<WalletAccount, HandshakeError> {
        let accounts = self
            .wallet
            .request_accounts()
            .await
            .map_err(account_failure)?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or(HandshakeError::UserRejected)?;
        if !looks_like_evm_address(&address) {
            tracing::warn!(account = %address, "wallet returned a non-EVM-shaped account");
        }

        let chain_id = if self.options.include_chain_id {
            match self.wallet.current_chain_id().await {
                Ok(id) => Some(id),
                Err(err) => {
                    let fallback = context.numeric_chain_hint();
                    tracing::warn!(error = %err, ?fallback, "wallet did not report a chain id");
                    fallback
                }
            }
        } else {
            None
        };

        Ok(WalletAccount { address, chain_id })
    }

    fn abandon_attempt(&self) {
        let mut machine = self.lock();
        if machine.state.in_flight() {
            machine.transition(
                HandshakeState::WalletDetecting,
                "attempt abandoned before completion",
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, MachineState> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the machine to the ready state when an attempt future is dropped
/// mid-flight.
struct AttemptGuard<'a> {
    handshake: &'a LoginHandshake,
    armed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.handshake.abandon_attempt();
        }
    }
}

/// The provider was detected on page load, so a failure here is a fault of
/// the running wallet and never `NoProvider`.
fn account_failure(err: WalletError) -> HandshakeError {
    match err {
        WalletError::UserRejected => HandshakeError::UserRejected,
        other => HandshakeError::ProviderFault(other.to_string()),
    }
}

fn signing_failure(err: WalletError) -> HandshakeError {
    match err {
        WalletError::UserRejected => HandshakeError::UserRejected,
        other => HandshakeError::SigningFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    use crate::error::NavigationError;

    #[derive(Default)]
    struct Calls {
        available: AtomicUsize,
        accounts: AtomicUsize,
        chain: AtomicUsize,
        sign: AtomicUsize,
    }

    struct FakeWallet {
        available: bool,
        accounts: Result<Vec<String>, WalletError>,
        chain_id: Result<u64, WalletError>,
        signature: Result<String, WalletError>,
        signed_messages: Mutex<Vec<(String, String)>>,
        hold_signing: Option<Arc<Notify>>,
        calls: Calls,
    }

    impl FakeWallet {
        fn happy() -> Self {
            Self {
                available: true,
                accounts: Ok(vec!["0xDEAD".to_string(), "0xBEEF".to_string()]),
                chain_id: Ok(56),
                signature: Ok("0xsig".to_string()),
                signed_messages: Mutex::new(Vec::new()),
                hold_signing: None,
                calls: Calls::default(),
            }
        }

        fn wallet_calls(&self) -> usize {
            self.calls.available.load(Ordering::SeqCst)
                + self.calls.accounts.load(Ordering::SeqCst)
                + self.calls.chain.load(Ordering::SeqCst)
                + self.calls.sign.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WalletGateway for FakeWallet {
        async fn is_available(&self) -> bool {
            self.calls.available.fetch_add(1, Ordering::SeqCst);
            self.available
        }

        async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
            self.calls.accounts.fetch_add(1, Ordering::SeqCst);
            self.accounts.clone()
        }

        async fn current_chain_id(&self) -> Result<u64, WalletError> {
            self.calls.chain.fetch_add(1, Ordering::SeqCst);
            self.chain_id.clone()
        }

        async fn sign_message(&self, message: &str, account: &str) -> Result<String, WalletError> {
            self.calls.sign.fetch_add(1, Ordering::SeqCst);
            self.signed_messages
                .lock()
                .expect("messages lock")
                .push((message.to_string(), account.to_string()));
            if let Some(hold) = &self.hold_signing {
                hold.notified().await;
            }
            self.signature.clone()
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        targets: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, target: &str) -> Result<(), NavigationError> {
            if self.fail {
                return Err(NavigationError::Launch("no browser".to_string()));
            }
            self.targets
                .lock()
                .expect("targets lock")
                .push(target.to_string());
            Ok(())
        }
    }

    fn options() -> HandshakeOptions {
        HandshakeOptions {
            authorize_path: "authorize".to_string(),
            ..HandshakeOptions::default()
        }
    }

    fn machine(
        url: &str,
        wallet: &Arc<FakeWallet>,
        navigator: &Arc<RecordingNavigator>,
        options: HandshakeOptions,
    ) -> LoginHandshake {
        LoginHandshake::new(url, wallet.clone(), navigator.clone(), options)
    }

    #[tokio::test]
    async fn happy_path_navigates_with_proof() {
        let wallet = Arc::new(FakeWallet::happy());
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=abc123", &wallet, &navigator, options());

        assert_eq!(handshake.detect().await, HandshakeState::WalletDetecting);
        assert!(handshake.can_sign());

        let target = handshake.trigger().await.expect("login");
        assert_eq!(
            target,
            "authorize?nonce=abc123&account=0xDEAD&chain_id=56&signature=0xsig"
        );
        assert_eq!(*navigator.targets.lock().expect("targets"), vec![target]);
        assert_eq!(handshake.state(), HandshakeState::Done);
        assert_eq!(
            *wallet.signed_messages.lock().expect("messages"),
            vec![("0xDEAD;abc123".to_string(), "0xDEAD".to_string())]
        );

        let states: Vec<HandshakeState> =
            handshake.timeline().into_iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                HandshakeState::Idle,
                HandshakeState::WalletDetecting,
                HandshakeState::WalletDetecting,
                HandshakeState::AccountRequesting,
                HandshakeState::Signing,
                HandshakeState::Redirecting,
                HandshakeState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn missing_nonce_fails_without_wallet_calls() {
        let wallet = Arc::new(FakeWallet::happy());
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("https://login.example/?chain=56", &wallet, &navigator, options());

        assert_eq!(handshake.trigger().await, Err(HandshakeError::MissingNonce));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(HandshakeFailure::MissingNonce)
        );
        assert_eq!(wallet.wallet_calls(), 0);
        assert!(!handshake.can_sign());
        assert!(navigator.targets.lock().expect("targets").is_empty());
    }

    #[tokio::test]
    async fn unavailable_wallet_disables_sign_action() {
        let wallet = Arc::new(FakeWallet {
            available: false,
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=abc123", &wallet, &navigator, options());

        assert_eq!(
            handshake.detect().await,
            HandshakeState::Failed(HandshakeFailure::NoProvider)
        );
        assert!(!handshake.can_sign());
        let payload = handshake.failure_payload().expect("payload");
        assert_eq!(payload.code, HandshakeFailure::NoProvider);
        assert!(!payload.retryable);

        assert_eq!(handshake.trigger().await, Err(HandshakeError::NoProvider));
        assert_eq!(wallet.calls.accounts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_accounts_stop_before_signing() {
        let wallet = Arc::new(FakeWallet {
            accounts: Err(WalletError::UserRejected),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=abc123", &wallet, &navigator, options());

        assert_eq!(handshake.trigger().await, Err(HandshakeError::UserRejected));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(HandshakeFailure::UserRejected)
        );
        assert_eq!(wallet.calls.sign.load(Ordering::SeqCst), 0);
        assert!(navigator.targets.lock().expect("targets").is_empty());
        assert!(handshake.can_sign());
    }

    #[tokio::test]
    async fn empty_account_list_counts_as_rejection() {
        let wallet = Arc::new(FakeWallet {
            accounts: Ok(Vec::new()),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=abc123", &wallet, &navigator, options());

        assert_eq!(handshake.trigger().await, Err(HandshakeError::UserRejected));
        assert_eq!(wallet.calls.sign.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wallet_fault_after_detection_stays_retryable() {
        let wallet = Arc::new(FakeWallet {
            accounts: Err(WalletError::ProviderUnavailable("connection reset".to_string())),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=abc123", &wallet, &navigator, options());

        assert_eq!(handshake.detect().await, HandshakeState::WalletDetecting);
        let err = handshake.trigger().await.expect_err("accounts fail");
        assert!(matches!(err, HandshakeError::ProviderFault(_)));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(HandshakeFailure::ProviderFault)
        );
        assert!(handshake.can_sign());

        let _ = handshake.trigger().await;
        assert_eq!(wallet.calls.accounts.load(Ordering::SeqCst), 2);
        assert_eq!(wallet.calls.sign.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn signing_fault_is_retryable() {
        let wallet = Arc::new(FakeWallet {
            signature: Err(WalletError::SigningFailed("internal".to_string())),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=abc123", &wallet, &navigator, options());

        let err = handshake.trigger().await.expect_err("signing should fail");
        assert!(matches!(err, HandshakeError::SigningFailed(_)));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(HandshakeFailure::SigningFailed)
        );
        assert!(handshake.failure_payload().expect("payload").retryable);

        // Retry issues a fresh account request.
        let _ = handshake.trigger().await;
        assert_eq!(wallet.calls.accounts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chain_id_falls_back_to_numeric_hint() {
        let wallet = Arc::new(FakeWallet {
            chain_id: Err(WalletError::InvalidResponse("no chain".to_string())),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=n1&chain=128", &wallet, &navigator, options());

        let target = handshake.trigger().await.expect("login");
        assert_eq!(
            target,
            "authorize?nonce=n1&chain=128&account=0xDEAD&chain_id=128&signature=0xsig"
        );
    }

    #[tokio::test]
    async fn nonce_only_revision_omits_chain_id() {
        let wallet = Arc::new(FakeWallet::happy());
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine(
            "?nonce=n1",
            &wallet,
            &navigator,
            HandshakeOptions {
                include_chain_id: false,
                message_format: MessageFormat::Concatenated,
                ..options()
            },
        );

        let target = handshake.trigger().await.expect("login");
        assert_eq!(target, "authorize?nonce=n1&account=0xDEAD&signature=0xsig");
        assert_eq!(wallet.calls.chain.load(Ordering::SeqCst), 0);
        assert_eq!(
            wallet.signed_messages.lock().expect("messages")[0].0,
            "0xDEADn1"
        );
    }

    #[tokio::test]
    async fn navigation_failure_is_reported() {
        let wallet = Arc::new(FakeWallet::happy());
        let navigator = Arc::new(RecordingNavigator {
            fail: true,
            ..RecordingNavigator::default()
        });
        let handshake = machine("?nonce=n1", &wallet, &navigator, options());

        assert!(matches!(
            handshake.trigger().await,
            Err(HandshakeError::Navigation(_))
        ));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(HandshakeFailure::NavigationFailed)
        );
    }

    #[tokio::test]
    async fn completed_handshake_rejects_second_trigger() {
        let wallet = Arc::new(FakeWallet::happy());
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=n1", &wallet, &navigator, options());

        handshake.trigger().await.expect("login");
        assert_eq!(handshake.trigger().await, Err(HandshakeError::AlreadyCompleted));
        assert_eq!(wallet.calls.accounts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_trigger_is_rejected_while_signing() {
        let hold = Arc::new(Notify::new());
        let wallet = Arc::new(FakeWallet {
            hold_signing: Some(hold.clone()),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = Arc::new(machine("?nonce=n1", &wallet, &navigator, options()));
        handshake.detect().await;

        let first = {
            let handshake = Arc::clone(&handshake);
            tokio::spawn(async move { handshake.trigger().await })
        };
        while wallet.calls.sign.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(handshake.state(), HandshakeState::Signing);
        assert_eq!(handshake.trigger().await, Err(HandshakeError::AttemptInFlight));

        hold.notify_one();
        first.await.expect("join").expect("first attempt");
        assert_eq!(wallet.calls.accounts.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.targets.lock().expect("targets").len(), 1);
    }

    #[tokio::test]
    async fn dropped_attempt_returns_to_ready() {
        let hold = Arc::new(Notify::new());
        let wallet = Arc::new(FakeWallet {
            hold_signing: Some(hold),
            ..FakeWallet::happy()
        });
        let navigator = Arc::new(RecordingNavigator::default());
        let handshake = machine("?nonce=n1", &wallet, &navigator, options());
        handshake.detect().await;

        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            handshake.trigger(),
        )
        .await;
        assert!(attempt.is_err());
        assert_eq!(handshake.state(), HandshakeState::WalletDetecting);
        assert!(handshake.can_sign());
    }
}
