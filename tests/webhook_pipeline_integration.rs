//! Integration tests for the webhook reconciliation pipeline.
//!
//! These tests drive the full path - signature verification, payload
//! normalization, idempotency ledger, state transition engine, and
//! side-effect dispatch - against in-memory port implementations, and
//! assert the externally observable guarantees:
//!
//! 1. Duplicate deliveries apply exactly one transition and one set of
//!    side effects
//! 2. Out-of-order deliveries never regress payment state
//! 3. Concurrent deliveries credit the seller balance exactly once
//! 4. The incremental balance always equals the full recomputation

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::{json, Value};
use sha2::Sha256;

use vendaflow::application::handlers::webhooks::{IngestWebhookCommand, IngestWebhookHandler};
use vendaflow::application::handlers::withdrawals::{
    RequestWithdrawalCommand, RequestWithdrawalHandler,
};
use vendaflow::domain::foundation::{
    Currency, CustomerId, DomainError, ErrorCode, Money, PaymentId, ProductId, SellerId,
    Timestamp, WithdrawalId,
};
use vendaflow::domain::payments::{
    recompute_available, AccessStatus, AdjustmentKind, CardWebhookVerifier, NotificationKind,
    Payment, PaymentPatch, PaymentStatus, PixWebhookVerifier, ProcessOutcome, ProductAccess,
    Provider, SideEffectDispatcher, TransitionEngine, WebhookError, WebhookProcessor,
    Withdrawal, WithdrawalStatus,
};
use vendaflow::ports::{
    AdjustmentOutcome, AnalyticsForwarder, BalanceLedger, LogStatus, Notifier, PaymentStore,
    ProductAccessRepository, RecordOutcome, UpdateOutcome, WebhookEventRepository,
    WebhookLogEntry, WithdrawalRepository,
};

const CARD_SECRET: &str = "whsec_integration_secret";
const PIX_TOKEN: &str = "tok_integration_token";

// =============================================================================
// Test Infrastructure
// =============================================================================

/// In-memory payment store with guard-respecting conditional updates.
#[derive(Default)]
struct InMemoryPaymentStore {
    payments: Mutex<Vec<Payment>>,
}

impl InMemoryPaymentStore {
    fn seed(&self, payment: Payment) {
        self.payments.lock().unwrap().push(payment);
    }

    fn status_of(&self, provider_ref: &str) -> PaymentStatus {
        self.payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.provider_payment_ref == provider_ref)
            .expect("payment exists")
            .status
    }

    fn all(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        self.payments.lock().unwrap().push(payment.clone());
        Ok(())
    }

    async fn find_by_provider_ref(
        &self,
        provider: Provider,
        provider_ref: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.provider == provider && p.provider_payment_ref == provider_ref)
            .cloned())
    }

    async fn conditional_update(
        &self,
        id: &PaymentId,
        expected_status: PaymentStatus,
        patch: PaymentPatch,
    ) -> Result<UpdateOutcome, DomainError> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "missing payment"))?;
        if payment.status != expected_status {
            return Ok(UpdateOutcome::Conflict);
        }
        payment.status = patch.status;
        payment.updated_at = patch.updated_at;
        Ok(UpdateOutcome::Updated(payment.clone()))
    }

    async fn list_by_seller(&self, seller: &SellerId) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| &p.seller_ref == seller)
            .cloned()
            .collect())
    }
}

/// In-memory idempotency ledger with atomic first-insert semantics.
#[derive(Default)]
struct InMemoryLedger {
    entries: Mutex<HashMap<(Provider, String), WebhookLogEntry>>,
}

impl InMemoryLedger {
    fn status_of(&self, provider: Provider, event_id: &str) -> Option<LogStatus> {
        self.entries
            .lock()
            .unwrap()
            .get(&(provider, event_id.to_string()))
            .map(|e| e.status)
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryLedger {
    async fn record_if_new(
        &self,
        provider: Provider,
        event_id: &str,
        payload: &Value,
    ) -> Result<RecordOutcome, DomainError> {
        let mut entries = self.entries.lock().unwrap();
        let key = (provider, event_id.to_string());
        if let Some(existing) = entries.get(&key) {
            return Ok(RecordOutcome::AlreadySeen {
                status: existing.status,
            });
        }
        entries.insert(
            key,
            WebhookLogEntry {
                provider,
                event_id: event_id.to_string(),
                received_at: Timestamp::now(),
                status: LogStatus::Received,
                error_message: None,
                payload: payload.clone(),
            },
        );
        Ok(RecordOutcome::New)
    }

    async fn mark_processed(&self, provider: Provider, event_id: &str) -> Result<(), DomainError> {
        if let Some(entry) = self
            .entries
            .lock()
            .unwrap()
            .get_mut(&(provider, event_id.to_string()))
        {
            entry.status = LogStatus::Processed;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: Provider,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError> {
        if let Some(entry) = self
            .entries
            .lock()
            .unwrap()
            .get_mut(&(provider, event_id.to_string()))
        {
            entry.status = LogStatus::Failed;
            entry.error_message = Some(error.to_string());
        }
        Ok(())
    }

    async fn find(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<Option<WebhookLogEntry>, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(provider, event_id.to_string()))
            .cloned())
    }
}

/// In-memory bank: keyed balance adjustments plus withdrawal records, so
/// the availability calculation sees both sides.
#[derive(Default)]
struct InMemoryBank {
    adjustments: Mutex<HashMap<(String, AdjustmentKind), (SellerId, i64)>>,
    withdrawals: Mutex<Vec<Withdrawal>>,
}

impl InMemoryBank {
    fn adjustment_count(&self) -> usize {
        self.adjustments.lock().unwrap().len()
    }

    fn available(&self, seller: &SellerId) -> i64 {
        let adjustments: i64 = self
            .adjustments
            .lock()
            .unwrap()
            .iter()
            .filter(|((_, kind), (owner, _))| owner == seller && kind.counts_toward_available())
            .map(|(_, (_, amount))| amount)
            .sum();
        let withdrawn: i64 = self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| {
                &w.seller_ref == seller
                    && matches!(
                        w.status,
                        WithdrawalStatus::Pending | WithdrawalStatus::Completed
                    )
            })
            .map(|w| w.amount.amount_minor())
            .sum();
        adjustments - withdrawn
    }
}

#[async_trait]
impl BalanceLedger for InMemoryBank {
    async fn apply_adjustment(
        &self,
        seller_ref: &SellerId,
        payment_ref: &str,
        kind: AdjustmentKind,
        amount_minor: i64,
    ) -> Result<AdjustmentOutcome, DomainError> {
        let mut adjustments = self.adjustments.lock().unwrap();
        let key = (payment_ref.to_string(), kind);
        if adjustments.contains_key(&key) {
            return Ok(AdjustmentOutcome::AlreadyApplied);
        }
        adjustments.insert(key, (seller_ref.clone(), amount_minor));
        Ok(AdjustmentOutcome::Applied)
    }

    async fn available_balance(&self, seller_ref: &SellerId) -> Result<i64, DomainError> {
        Ok(self.available(seller_ref))
    }

    async fn withdrawn_total(&self, seller_ref: &SellerId) -> Result<i64, DomainError> {
        Ok(self
            .adjustments
            .lock()
            .unwrap()
            .iter()
            .filter(|((_, kind), (owner, _))| {
                owner == seller_ref && *kind == AdjustmentKind::PayoutPaid
            })
            .map(|(_, (_, amount))| amount)
            .sum())
    }
}

#[async_trait]
impl WithdrawalRepository for InMemoryBank {
    async fn insert(&self, withdrawal: &Withdrawal) -> Result<(), DomainError> {
        self.withdrawals.lock().unwrap().push(withdrawal.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &WithdrawalId) -> Result<Option<Withdrawal>, DomainError> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .find(|w| &w.id == id)
            .cloned())
    }

    async fn list_by_seller(&self, seller: &SellerId) -> Result<Vec<Withdrawal>, DomainError> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| &w.seller_ref == seller)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        target: WithdrawalStatus,
    ) -> Result<(), DomainError> {
        let mut withdrawals = self.withdrawals.lock().unwrap();
        let withdrawal = withdrawals
            .iter_mut()
            .find(|w| &w.id == id)
            .ok_or_else(|| DomainError::new(ErrorCode::WithdrawalNotFound, "missing"))?;
        if withdrawal.status != expected {
            return Err(DomainError::new(ErrorCode::WithdrawalTerminal, "terminal"));
        }
        withdrawal.status = target;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn count_of(&self, kind: NotificationKind) -> usize {
        self.sent.lock().unwrap().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        kind: NotificationKind,
        recipient: &str,
        _template: &HashMap<String, String>,
    ) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push((kind, recipient.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryAccess {
    access: Mutex<HashMap<PaymentId, ProductAccess>>,
}

impl InMemoryAccess {
    fn status_of(&self, payment_id: &PaymentId) -> Option<AccessStatus> {
        self.access.lock().unwrap().get(payment_id).map(|a| a.status)
    }
}

#[async_trait]
impl ProductAccessRepository for InMemoryAccess {
    async fn grant(&self, access: &ProductAccess) -> Result<(), DomainError> {
        let mut granted = self.access.lock().unwrap();
        let mut access = access.clone();
        access.status = AccessStatus::Active;
        granted.insert(access.payment_ref, access);
        Ok(())
    }

    async fn revoke_by_payment(&self, payment_id: &PaymentId) -> Result<(), DomainError> {
        if let Some(access) = self.access.lock().unwrap().get_mut(payment_id) {
            access.status = AccessStatus::Inactive;
        }
        Ok(())
    }

    async fn find_by_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<ProductAccess>, DomainError> {
        Ok(self.access.lock().unwrap().get(payment_id).cloned())
    }
}

#[derive(Default)]
struct CountingAnalytics {
    forwarded: Mutex<Vec<String>>,
}

#[async_trait]
impl AnalyticsForwarder for CountingAnalytics {
    async fn forward(&self, payment: &Payment) -> Result<(), DomainError> {
        self.forwarded
            .lock()
            .unwrap()
            .push(payment.provider_payment_ref.clone());
        Ok(())
    }
}

// =============================================================================
// Test Harness
// =============================================================================

struct Pipeline {
    ingest: Arc<IngestWebhookHandler>,
    store: Arc<InMemoryPaymentStore>,
    ledger: Arc<InMemoryLedger>,
    bank: Arc<InMemoryBank>,
    notifier: Arc<RecordingNotifier>,
    access: Arc<InMemoryAccess>,
    analytics: Arc<CountingAnalytics>,
}

fn pipeline() -> Pipeline {
    let store = Arc::new(InMemoryPaymentStore::default());
    let ledger = Arc::new(InMemoryLedger::default());
    let bank = Arc::new(InMemoryBank::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let access = Arc::new(InMemoryAccess::default());
    let analytics = Arc::new(CountingAnalytics::default());

    let engine = TransitionEngine::new(store.clone());
    let dispatcher = SideEffectDispatcher::new(
        notifier.clone(),
        bank.clone(),
        access.clone(),
        analytics.clone(),
    );
    let processor = WebhookProcessor::new(ledger.clone(), engine, dispatcher);

    let ingest = Arc::new(IngestWebhookHandler::new(
        CardWebhookVerifier::new(SecretString::new(CARD_SECRET.to_string())),
        PixWebhookVerifier::new(SecretString::new(PIX_TOKEN.to_string())),
        processor,
    ));

    Pipeline {
        ingest,
        store,
        ledger,
        bank,
        notifier,
        access,
        analytics,
    }
}

fn seller() -> SellerId {
    SellerId::new("seller_1").unwrap()
}

fn pending_payment(provider: Provider, provider_ref: &str, amount: i64) -> Payment {
    let mut metadata = HashMap::new();
    metadata.insert("customer_email".to_string(), "buyer@example.com".to_string());
    metadata.insert("seller_email".to_string(), "seller@example.com".to_string());
    metadata.insert("product_name".to_string(), "Rust Course".to_string());
    Payment::new_pending(
        provider,
        provider_ref,
        Money::new(amount, Currency::Brl).unwrap(),
        CustomerId::new("cus_1").unwrap(),
        ProductId::new("prod_1").unwrap(),
        seller(),
        metadata,
    )
}

fn sign_card(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(CARD_SECRET.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn card_command(event_id: &str, event_type: &str, object: Value) -> IngestWebhookCommand {
    let payload = json!({
        "id": event_id,
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "data": {"object": object}
    })
    .to_string();

    IngestWebhookCommand {
        provider: Provider::Card,
        auth_header: Some(sign_card(&payload)),
        payload: payload.into_bytes(),
    }
}

fn pix_command(event_id: &str, event_type: &str, data: Value) -> IngestWebhookCommand {
    let payload = json!({
        "id": event_id,
        "event": event_type,
        "created_at": chrono::Utc::now().timestamp(),
        "data": data
    })
    .to_string();

    IngestWebhookCommand {
        provider: Provider::Pix,
        auth_header: Some(PIX_TOKEN.to_string()),
        payload: payload.into_bytes(),
    }
}

// =============================================================================
// Scenario A: successful payment completes and fans out
// =============================================================================

#[tokio::test]
async fn completed_payment_grants_access_and_notifies_once() {
    let p = pipeline();
    let payment = pending_payment(Provider::Card, "pi_1", 10_000);
    let payment_id = payment.id;
    p.store.seed(payment);

    let outcome = p
        .ingest
        .handle(card_command("evt_1", "payment_intent.succeeded", json!({"id": "pi_1"})))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Processed);
    assert_eq!(p.store.status_of("pi_1"), PaymentStatus::Completed);
    assert_eq!(p.access.status_of(&payment_id), Some(AccessStatus::Active));
    assert_eq!(p.notifier.count_of(NotificationKind::Confirmation), 1);
    assert_eq!(p.bank.available(&seller()), 10_000);
    assert_eq!(p.analytics.forwarded.lock().unwrap().as_slice(), ["pi_1"]);
}

// =============================================================================
// Scenario B: duplicate delivery of the same event id
// =============================================================================

#[tokio::test]
async fn duplicate_event_id_changes_nothing() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_1", 10_000));

    let first = card_command("evt_dup", "payment_intent.succeeded", json!({"id": "pi_1"}));
    let second = card_command("evt_dup", "payment_intent.succeeded", json!({"id": "pi_1"}));

    p.ingest.handle(first).await.unwrap();
    let outcome = p.ingest.handle(second).await.unwrap();

    // Acknowledged as success so the provider stops retrying.
    assert_eq!(outcome, ProcessOutcome::Duplicate);
    assert_eq!(p.notifier.count(), 1);
    assert_eq!(p.bank.available(&seller()), 10_000);
}

#[tokio::test]
async fn many_identical_deliveries_apply_once() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Pix, "pix_1", 7_500));

    for _ in 0..5 {
        let cmd = pix_command(
            "whk_1",
            "payment.updated",
            json!({"payment_id": "pix_1", "status": "paid"}),
        );
        p.ingest.handle(cmd).await.unwrap();
    }

    assert_eq!(p.store.status_of("pix_1"), PaymentStatus::Completed);
    assert_eq!(p.notifier.count(), 1);
    assert_eq!(p.bank.available(&seller()), 7_500);
    assert_eq!(p.bank.adjustment_count(), 1);
}

// =============================================================================
// Scenario C: invalid-source transition is a logged no-op
// =============================================================================

#[tokio::test]
async fn dispute_against_pending_payment_is_acknowledged_noop() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_2", 5_000));

    let outcome = p
        .ingest
        .handle(card_command(
            "evt_c",
            "charge.dispute.created",
            json!({"id": "dp_1", "payment_intent": "pi_2"}),
        ))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Noop);
    assert_eq!(p.store.status_of("pi_2"), PaymentStatus::Pending);
    assert_eq!(p.bank.available(&seller()), 0);
    assert_eq!(p.notifier.count(), 0);
}

// =============================================================================
// Scenario D: dispute lifecycle with idempotent keyed debits
// =============================================================================

#[tokio::test]
async fn dispute_then_loss_debits_exactly_once() {
    let p = pipeline();
    let payment = pending_payment(Provider::Card, "pi_3", 20_000);
    let payment_id = payment.id;
    p.store.seed(payment);

    p.ingest
        .handle(card_command("evt_1", "payment_intent.succeeded", json!({"id": "pi_3"})))
        .await
        .unwrap();
    assert_eq!(p.bank.available(&seller()), 20_000);

    p.ingest
        .handle(card_command(
            "evt_2",
            "charge.dispute.created",
            json!({"id": "dp_1", "payment_intent": "pi_3"}),
        ))
        .await
        .unwrap();

    assert_eq!(p.store.status_of("pi_3"), PaymentStatus::Disputed);
    assert_eq!(p.bank.available(&seller()), 0);
    assert_eq!(p.notifier.count_of(NotificationKind::DisputeOpened), 1);

    p.ingest
        .handle(card_command(
            "evt_3",
            "charge.dispute.closed",
            json!({"id": "dp_1", "payment_intent": "pi_3", "status": "lost"}),
        ))
        .await
        .unwrap();

    assert_eq!(p.store.status_of("pi_3"), PaymentStatus::Refunded);
    assert_eq!(p.access.status_of(&payment_id), Some(AccessStatus::Inactive));
    // Already debited when the dispute opened; the keyed adjustment skips.
    assert_eq!(p.bank.available(&seller()), 0);
}

#[tokio::test]
async fn dispute_won_restores_balance_and_access_survives() {
    let p = pipeline();
    let payment = pending_payment(Provider::Pix, "pix_3", 12_000);
    let payment_id = payment.id;
    p.store.seed(payment);

    p.ingest
        .handle(pix_command(
            "whk_1",
            "payment.updated",
            json!({"payment_id": "pix_3", "status": "approved"}),
        ))
        .await
        .unwrap();
    p.ingest
        .handle(pix_command(
            "whk_2",
            "chargebacks.created",
            json!({"payment_id": "pix_3"}),
        ))
        .await
        .unwrap();
    assert_eq!(p.bank.available(&seller()), 0);

    p.ingest
        .handle(pix_command(
            "whk_3",
            "chargebacks.resolved",
            json!({"payment_id": "pix_3", "outcome": "won"}),
        ))
        .await
        .unwrap();

    assert_eq!(p.store.status_of("pix_3"), PaymentStatus::Completed);
    assert_eq!(p.bank.available(&seller()), 12_000);
    assert_eq!(p.access.status_of(&payment_id), Some(AccessStatus::Active));
    assert_eq!(p.notifier.count_of(NotificationKind::DisputeClosed), 1);
}

// =============================================================================
// Scenario E: malformed payload is rejected before any mutation
// =============================================================================

#[tokio::test]
async fn payload_without_payment_ref_is_client_error() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_4", 5_000));

    let result = p
        .ingest
        .handle(card_command("evt_bad", "payment_intent.succeeded", json!({})))
        .await;

    match result {
        Err(err @ WebhookError::MissingField(_)) => {
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
        other => panic!("expected MissingField, got {:?}", other),
    }
    // Nothing recorded as processed, nothing mutated.
    assert_eq!(p.ledger.status_of(Provider::Card, "evt_bad"), None);
    assert_eq!(p.store.status_of("pi_4"), PaymentStatus::Pending);
    assert_eq!(p.bank.available(&seller()), 0);
}

#[tokio::test]
async fn bad_signature_is_rejected_without_processing() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_5", 5_000));

    let mut cmd = card_command("evt_sig", "payment_intent.succeeded", json!({"id": "pi_5"}));
    cmd.auth_header = Some(format!(
        "t={},v1={}",
        chrono::Utc::now().timestamp(),
        "a".repeat(64)
    ));

    let result = p.ingest.handle(cmd).await;

    assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    assert_eq!(p.store.status_of("pi_5"), PaymentStatus::Pending);
    assert_eq!(p.ledger.status_of(Provider::Card, "evt_sig"), None);
}

#[tokio::test]
async fn wrong_pix_token_is_rejected() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Pix, "pix_5", 5_000));

    let mut cmd = pix_command(
        "whk_sig",
        "payment.updated",
        json!({"payment_id": "pix_5", "status": "paid"}),
    );
    cmd.auth_header = Some("tok_wrong".to_string());

    assert!(matches!(
        p.ingest.handle(cmd).await,
        Err(WebhookError::InvalidSignature)
    ));
    assert_eq!(p.store.status_of("pix_5"), PaymentStatus::Pending);
}

// =============================================================================
// Out-of-order tolerance
// =============================================================================

#[tokio::test]
async fn refund_before_success_never_regresses_terminal_state() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_6", 9_000));

    // Refund arrives first: invalid from pending, acknowledged as no-op.
    let early_refund = p
        .ingest
        .handle(card_command(
            "evt_r",
            "charge.refunded",
            json!({"id": "ch_1", "payment_intent": "pi_6"}),
        ))
        .await
        .unwrap();
    assert_eq!(early_refund, ProcessOutcome::Noop);
    assert_eq!(p.store.status_of("pi_6"), PaymentStatus::Pending);

    // The success then applies normally.
    p.ingest
        .handle(card_command("evt_s", "payment_intent.succeeded", json!({"id": "pi_6"})))
        .await
        .unwrap();
    assert_eq!(p.store.status_of("pi_6"), PaymentStatus::Completed);

    // Provider redelivers the refund under a fresh id; now it applies.
    p.ingest
        .handle(card_command(
            "evt_r2",
            "charge.refunded",
            json!({"id": "ch_1", "payment_intent": "pi_6"}),
        ))
        .await
        .unwrap();
    assert_eq!(p.store.status_of("pi_6"), PaymentStatus::Refunded);

    // A late duplicate success must not resurrect the payment.
    let late_success = p
        .ingest
        .handle(card_command("evt_s2", "payment_intent.succeeded", json!({"id": "pi_6"})))
        .await
        .unwrap();
    assert_eq!(late_success, ProcessOutcome::Noop);
    assert_eq!(p.store.status_of("pi_6"), PaymentStatus::Refunded);
}

// =============================================================================
// Concurrency: no double credit
// =============================================================================

#[tokio::test]
async fn concurrent_success_deliveries_credit_exactly_once() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_7", 30_000));

    // Two deliveries of the same success, distinct event instance ids,
    // racing each other.
    let a = p.ingest.clone();
    let b = p.ingest.clone();
    let task_a = tokio::spawn(async move {
        a.handle(card_command("evt_a", "payment_intent.succeeded", json!({"id": "pi_7"})))
            .await
    });
    let task_b = tokio::spawn(async move {
        b.handle(card_command("evt_b", "payment_intent.succeeded", json!({"id": "pi_7"})))
            .await
    });

    let (ra, rb) = tokio::join!(task_a, task_b);
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    assert_eq!(p.store.status_of("pi_7"), PaymentStatus::Completed);
    // One winner applied the transition; the keyed credit makes even a
    // racing loser unable to double-credit.
    assert_eq!(p.bank.available(&seller()), 30_000);
    assert_eq!(p.bank.adjustment_count(), 1);
}

// =============================================================================
// Balance invariant: incremental == recomputed
// =============================================================================

#[tokio::test]
async fn incremental_balance_matches_recomputation_after_mixed_sequence() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_a", 10_000));
    p.store.seed(pending_payment(Provider::Card, "pi_b", 4_000));
    p.store.seed(pending_payment(Provider::Pix, "pix_c", 6_000));
    p.store.seed(pending_payment(Provider::Pix, "pix_d", 2_500));

    // pi_a completes; pi_b completes then refunds; pix_c fails;
    // pix_d completes, disputes, and the dispute is lost.
    let commands = vec![
        card_command("e1", "payment_intent.succeeded", json!({"id": "pi_a"})),
        card_command("e2", "payment_intent.succeeded", json!({"id": "pi_b"})),
        card_command("e3", "charge.refunded", json!({"id": "ch_b", "payment_intent": "pi_b"})),
        pix_command("e4", "payment.updated", json!({"payment_id": "pix_c", "status": "failed"})),
        pix_command("e5", "payment.updated", json!({"payment_id": "pix_d", "status": "paid"})),
        pix_command("e6", "chargebacks.created", json!({"payment_id": "pix_d"})),
        pix_command("e7", "chargebacks.resolved", json!({"payment_id": "pix_d", "outcome": "lost"})),
    ];
    for cmd in commands {
        p.ingest.handle(cmd).await.unwrap();
    }

    let payments = p.store.all();
    let withdrawals: Vec<Withdrawal> = vec![];
    let recomputed = recompute_available(&payments, &withdrawals);

    assert_eq!(p.bank.available(&seller()), recomputed);
    assert_eq!(recomputed, 10_000);
}

// =============================================================================
// Payouts
// =============================================================================

#[tokio::test]
async fn payout_paid_feeds_withdrawn_total_not_availability() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_8", 50_000));

    p.ingest
        .handle(card_command("e1", "payment_intent.succeeded", json!({"id": "pi_8"})))
        .await
        .unwrap();

    let outcome = p
        .ingest
        .handle(card_command(
            "e2",
            "payout.paid",
            json!({"id": "po_1", "amount": 50_000, "metadata": {"seller_id": "seller_1"}}),
        ))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Processed);
    assert_eq!(p.bank.withdrawn_total(&seller()).await.unwrap(), 50_000);
    assert_eq!(p.bank.available(&seller()), 50_000);
}

// =============================================================================
// Unhandled kinds are logged and acknowledged
// =============================================================================

#[tokio::test]
async fn unknown_event_type_is_acknowledged_and_recorded() {
    let p = pipeline();

    let outcome = p
        .ingest
        .handle(card_command("evt_u", "payment_intent.created", json!({"id": "pi_x"})))
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Noop);
    assert_eq!(
        p.ledger.status_of(Provider::Card, "evt_u"),
        Some(LogStatus::Processed)
    );
}

// =============================================================================
// Withdrawals against the live balance
// =============================================================================

#[tokio::test]
async fn withdrawal_request_respects_available_balance() {
    let p = pipeline();
    p.store.seed(pending_payment(Provider::Card, "pi_9", 25_000));
    p.ingest
        .handle(card_command("e1", "payment_intent.succeeded", json!({"id": "pi_9"})))
        .await
        .unwrap();

    let handler = RequestWithdrawalHandler::new(p.bank.clone(), p.bank.clone());

    // First request consumes most of the balance.
    let withdrawal = handler
        .handle(RequestWithdrawalCommand {
            seller_ref: seller(),
            amount: Money::new(20_000, Currency::Brl).unwrap(),
            payout_info: json!({"pix_key": "seller@example.com"}),
        })
        .await
        .unwrap();
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
    assert_eq!(p.bank.available(&seller()), 5_000);

    // The second exceeds what remains.
    let err = handler
        .handle(RequestWithdrawalCommand {
            seller_ref: seller(),
            amount: Money::new(10_000, Currency::Brl).unwrap(),
            payout_info: json!({"pix_key": "seller@example.com"}),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientBalance);

    // Recomputation agrees with the incremental view.
    let recomputed = recompute_available(
        &p.store.all(),
        &p.bank.list_by_seller(&seller()).await.unwrap(),
    );
    assert_eq!(recomputed, 5_000);
}
