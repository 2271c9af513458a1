//! The settlement engine: split registry, distribution engine and
//! withdrawal ledger behind one handle.
//!
//! Every state-mutating call runs to completion as one unit relative to
//! other mutating calls on the same key: works are guarded by a per-work
//! mutex, pending balances by the balance-table mutex. Neither lock is
//! ever held across the external transfer await; the in-flight flag covers
//! that window instead.

pub mod distribution;
pub mod registry;

pub use distribution::{distribute, Distribution};
pub use registry::{SplitEntry, SplitSet, TOTAL_BPS};

use crate::error::EngineError;
use crate::events::{EventLog, EventSender};
use crate::transfer::{payout_request, PayoutGateway, TransferError};
use registry::WorkState;
use royset_sdk::events::EventPayload;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Pending balances and the custody total.
///
/// One table guards all identities: credits touch several recipients at
/// once and must land atomically, and claims must observe either all or
/// none of a deposit's effects.
#[derive(Debug, Default)]
struct BalanceTable {
    pending: HashMap<Uuid, u64>,
    /// Sum of all value deposited and not yet paid out.
    custodied: u64,
    /// Identities with an outstanding external transfer. A claim for a
    /// flagged identity is rejected as re-entrant instead of interleaved.
    in_flight: HashSet<Uuid>,
}

/// Breakdown returned from a successful deposit.
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub work_id: Uuid,
    pub total_amount: u64,
    /// (recipient, credited share) in split-set order, zero shares included.
    pub shares: Vec<(Uuid, u64)>,
    pub remainder: u64,
    pub remainder_recipient: Uuid,
    pub origin_tx_id: Uuid,
    pub log_position: i64,
}

/// The royalty split and settlement engine.
pub struct SettlementEngine {
    operator: Uuid,
    works: RwLock<HashMap<Uuid, Arc<Mutex<WorkState>>>>,
    balances: Mutex<BalanceTable>,
    log: EventLog,
    gateway: Arc<dyn PayoutGateway>,
    transfer_timeout: Duration,
}

impl SettlementEngine {
    /// Create an engine that emits events to `emit_tx` and settles claims
    /// through `gateway`, each transfer bounded by `transfer_timeout`.
    pub fn new(
        operator: Uuid,
        gateway: Arc<dyn PayoutGateway>,
        transfer_timeout: Duration,
        emit_tx: EventSender,
    ) -> Self {
        Self {
            operator,
            works: RwLock::new(HashMap::new()),
            balances: Mutex::new(BalanceTable::default()),
            log: EventLog::new(emit_tx),
            gateway,
            transfer_timeout,
        }
    }

    /// The authoritative event log.
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn operator(&self) -> Uuid {
        self.operator
    }

    // -- Split Registry -----------------------------------------------------

    /// Register a new work under `owner`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidOwner`] if `owner` is the nil identity
    /// - [`EngineError::AlreadyRegistered`] if `work_id` is already known
    pub async fn register_work(&self, work_id: Uuid, owner: Uuid) -> Result<(), EngineError> {
        if owner.is_nil() {
            return Err(EngineError::InvalidOwner);
        }

        let entry = Arc::new(Mutex::new(WorkState {
            owner,
            splits: None,
        }));
        // Hold the fresh work's mutex from before publication so that a
        // racing set_splits cannot emit ahead of the registration event.
        let guard = entry.lock().await;
        {
            let mut works = self.works.write().await;
            if works.contains_key(&work_id) {
                return Err(EngineError::AlreadyRegistered(work_id));
            }
            works.insert(work_id, entry.clone());
        }

        self.log
            .append(EventPayload::WorkRegistered { work_id, owner })
            .await;
        drop(guard);

        info!(%work_id, %owner, "Registered work");
        Ok(())
    }

    /// Atomically replace the split set of `work_id`.
    ///
    /// Validation happens before any state is touched, so a rejected call
    /// leaves the previous split set fully in place.
    pub async fn set_splits(
        &self,
        work_id: Uuid,
        caller: Uuid,
        recipients: Vec<Uuid>,
        shares_bps: Vec<u16>,
    ) -> Result<(), EngineError> {
        let splits = SplitSet::new(recipients, shares_bps)?;

        let entry = self.work_entry(work_id).await?;
        let mut state = entry.lock().await;
        if state.owner != caller {
            return Err(EngineError::Unauthorized { work_id, caller });
        }

        let event_recipients = splits.recipients();
        let event_shares = splits.shares_bps();
        state.splits = Some(splits);

        // Emitted under the work mutex, keeping per-work event order
        // aligned with application order.
        self.log
            .append(EventPayload::SplitsUpdated {
                work_id,
                recipients: event_recipients,
                shares_bps: event_shares,
            })
            .await;

        info!(%work_id, entries = state.splits.as_ref().map(SplitSet::len).unwrap_or(0), "Split set replaced");
        Ok(())
    }

    /// Current split entries of `work_id`, empty if none are installed.
    pub async fn recipients(&self, work_id: Uuid) -> Result<Vec<SplitEntry>, EngineError> {
        let entry = self.work_entry(work_id).await?;
        let state = entry.lock().await;
        Ok(state
            .splits
            .as_ref()
            .map(|s| s.entries().to_vec())
            .unwrap_or_default())
    }

    // -- Distribution Engine ------------------------------------------------

    /// Split a deposited amount across the work's current split set and
    /// credit every share to its recipient's pending balance. The rounding
    /// remainder goes wholly to the work owner, even when the owner is also
    /// a listed recipient.
    pub async fn deposit_revenue(
        &self,
        work_id: Uuid,
        amount: u64,
    ) -> Result<DepositOutcome, EngineError> {
        // Mirror and wire amounts are i64; bound deposits accordingly.
        if amount == 0 || amount > i64::MAX as u64 {
            return Err(EngineError::InvalidAmount);
        }

        let entry = self.work_entry(work_id).await?;
        let state = entry.lock().await;
        let Some(splits) = state.splits.as_ref() else {
            return Err(EngineError::NoRecipients(work_id));
        };

        let dist = distribute(amount, splits);
        let shares: Vec<(Uuid, u64)> = splits
            .recipients()
            .into_iter()
            .zip(dist.shares.iter().copied())
            .collect();

        self.credit_distribution(&shares, state.owner, dist.remainder, amount)
            .await?;

        let envelope = self
            .log
            .append(EventPayload::RevenueDistributed {
                work_id,
                total_amount: amount as i64,
                recipients: splits.recipients(),
                shares: dist.shares.iter().map(|s| *s as i64).collect(),
                remainder: dist.remainder as i64,
                remainder_recipient: state.owner,
            })
            .await;

        info!(
            %work_id,
            amount,
            recipients = shares.len(),
            remainder = dist.remainder,
            "Distributed deposit"
        );

        Ok(DepositOutcome {
            work_id,
            total_amount: amount,
            shares,
            remainder: dist.remainder,
            remainder_recipient: state.owner,
            origin_tx_id: envelope.origin_tx_id,
            log_position: envelope.log_position,
        })
    }

    /// Stage and commit the credits of one distribution atomically.
    async fn credit_distribution(
        &self,
        shares: &[(Uuid, u64)],
        owner: Uuid,
        remainder: u64,
        amount: u64,
    ) -> Result<(), EngineError> {
        let mut bal = self.balances.lock().await;

        // Custody must stay representable as i64 for the wire and mirror.
        let new_custodied = bal
            .custodied
            .checked_add(amount)
            .filter(|total| *total <= i64::MAX as u64)
            .ok_or(EngineError::Overflow)?;

        // Stage per-identity deltas first (the owner may also be a listed
        // recipient), then verify against current balances, then commit,
        // so an overflow rejects the deposit with no partial credit.
        let mut staged: HashMap<Uuid, u64> = HashMap::new();
        for (recipient, share) in shares.iter().filter(|(_, share)| *share > 0) {
            let slot = staged.entry(*recipient).or_insert(0);
            *slot = slot.checked_add(*share).ok_or(EngineError::Overflow)?;
        }
        if remainder > 0 {
            let slot = staged.entry(owner).or_insert(0);
            *slot = slot.checked_add(remainder).ok_or(EngineError::Overflow)?;
        }
        for (identity, delta) in &staged {
            bal.pending
                .get(identity)
                .copied()
                .unwrap_or(0)
                .checked_add(*delta)
                .ok_or(EngineError::Overflow)?;
        }

        for (identity, delta) in staged {
            *bal.pending.entry(identity).or_insert(0) += delta;
        }
        bal.custodied = new_custodied;
        Ok(())
    }

    // -- Withdrawal Ledger --------------------------------------------------

    /// Withdraw the caller's entire pending balance.
    ///
    /// The balance is debited to zero before the external transfer is
    /// attempted; a failing or timed-out transfer rolls the debit back so
    /// no value is lost, and the attempt is logged as a failed payout.
    /// While the transfer is outstanding the identity is
    /// flagged in-flight and any further claim for it is rejected as
    /// [`EngineError::Reentrant`].
    pub async fn claim(&self, identity: Uuid) -> Result<u64, EngineError> {
        let amount = {
            let mut bal = self.balances.lock().await;
            if bal.in_flight.contains(&identity) {
                return Err(EngineError::Reentrant(identity));
            }
            let amount = bal.pending.get(&identity).copied().unwrap_or(0);
            if amount == 0 {
                return Err(EngineError::NoPendingBalance(identity));
            }
            bal.pending.insert(identity, 0);
            bal.in_flight.insert(identity);
            amount
        };

        let request = payout_request(identity, amount, false);
        let transfer_result = match tokio::time::timeout(
            self.transfer_timeout,
            self.gateway.transfer(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout(self.transfer_timeout)),
        };

        let mut bal = self.balances.lock().await;
        bal.in_flight.remove(&identity);
        match transfer_result {
            Ok(()) => {
                bal.custodied = bal.custodied.saturating_sub(amount);
                drop(bal);
                self.log
                    .append(EventPayload::BalanceClaimed {
                        identity,
                        amount: amount as i64,
                    })
                    .await;
                info!(%identity, amount, "Claim settled");
                Ok(amount)
            }
            Err(e) => {
                // Deposits that landed mid-flight are additive, so the
                // rollback re-credits on top of them.
                let slot = bal.pending.entry(identity).or_insert(0);
                *slot = slot.saturating_add(amount);
                drop(bal);
                warn!(%identity, amount, error = %e, "Transfer failed, debit rolled back");
                self.log
                    .append(EventPayload::PayoutFailed {
                        identity,
                        amount: amount as i64,
                        out_of_band: false,
                    })
                    .await;
                Err(EngineError::TransferFailed(e))
            }
        }
    }

    /// Operator-only withdrawal of custodied funds, bypassing per-recipient
    /// pending balances. Flagged out-of-band in both the event log and the
    /// audit trail.
    pub async fn emergency_withdraw(&self, caller: Uuid, amount: u64) -> Result<(), EngineError> {
        if caller != self.operator {
            return Err(EngineError::NotOperator(caller));
        }
        if amount == 0 {
            return Err(EngineError::InvalidAmount);
        }

        {
            let mut bal = self.balances.lock().await;
            if amount > bal.custodied {
                return Err(EngineError::InsufficientFunds {
                    requested: amount,
                    available: bal.custodied,
                });
            }
            bal.custodied -= amount;
        }

        let request = payout_request(self.operator, amount, true);
        let transfer_result = match tokio::time::timeout(
            self.transfer_timeout,
            self.gateway.transfer(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout(self.transfer_timeout)),
        };

        match transfer_result {
            Ok(()) => {
                self.log
                    .append(EventPayload::EmergencyWithdrawn {
                        operator: self.operator,
                        amount: amount as i64,
                    })
                    .await;
                warn!(
                    operator = %self.operator,
                    amount,
                    "OUT-OF-BAND emergency withdrawal executed"
                );
                Ok(())
            }
            Err(e) => {
                self.balances.lock().await.custodied += amount;
                warn!(amount, error = %e, "Emergency withdrawal transfer failed, custody restored");
                self.log
                    .append(EventPayload::PayoutFailed {
                        identity: self.operator,
                        amount: amount as i64,
                        out_of_band: true,
                    })
                    .await;
                Err(EngineError::TransferFailed(e))
            }
        }
    }

    // -- Read surface -------------------------------------------------------

    /// Pending balance of `identity`, zero if unknown.
    pub async fn pending_balance(&self, identity: Uuid) -> u64 {
        self.balances
            .lock()
            .await
            .pending
            .get(&identity)
            .copied()
            .unwrap_or(0)
    }

    /// Total value currently custodied by the engine.
    pub async fn custodied_total(&self) -> u64 {
        self.balances.lock().await.custodied
    }

    async fn work_entry(&self, work_id: Uuid) -> Result<Arc<Mutex<WorkState>>, EngineError> {
        self.works
            .read()
            .await
            .get(&work_id)
            .cloned()
            .ok_or(EngineError::WorkNotFound(work_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::transfer::TransferError;
    use async_trait::async_trait;
    use royset_sdk::objects::PayoutRequest;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::OnceLock;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    /// Gateway that succeeds or fails on demand and counts calls.
    #[derive(Default)]
    struct StubGateway {
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PayoutGateway for StubGateway {
        async fn transfer(&self, _request: PayoutRequest) -> Result<(), TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(TransferError::Rejected { status: 503 })
            } else {
                Ok(())
            }
        }
    }

    /// Gateway that never completes, to exercise the claim timeout.
    struct HangingGateway;

    #[async_trait]
    impl PayoutGateway for HangingGateway {
        async fn transfer(&self, _request: PayoutRequest) -> Result<(), TransferError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    /// Gateway that calls back into the engine mid-transfer.
    #[derive(Default)]
    struct ReentrantGateway {
        engine: OnceLock<Arc<SettlementEngine>>,
        observed: std::sync::Mutex<Option<EngineError>>,
    }

    #[async_trait]
    impl PayoutGateway for ReentrantGateway {
        async fn transfer(&self, request: PayoutRequest) -> Result<(), TransferError> {
            let engine = self.engine.get().expect("engine installed").clone();
            let err = engine
                .claim(request.identity)
                .await
                .expect_err("nested claim must be rejected");
            *self.observed.lock().unwrap() = Some(err);
            Ok(())
        }
    }

    fn engine_with(gateway: Arc<dyn PayoutGateway>) -> SettlementEngine {
        let (tx, rx) = event_channel();
        // Tests that do not consume events keep the receiver alive so
        // appends never hit a closed channel.
        std::mem::forget(rx);
        SettlementEngine::new(id(999), gateway, Duration::from_millis(200), tx)
    }

    async fn registered_engine(gateway: Arc<dyn PayoutGateway>) -> SettlementEngine {
        let engine = engine_with(gateway);
        engine.register_work(id(1), id(10)).await.unwrap();
        engine
            .set_splits(id(1), id(10), vec![id(20), id(30)], vec![7000, 3000])
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let engine = engine_with(Arc::new(StubGateway::default()));
        engine.register_work(id(1), id(10)).await.unwrap();
        let err = engine.register_work(id(1), id(11)).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRegistered(w) if w == id(1)));
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn nil_owner_is_rejected() {
        let engine = engine_with(Arc::new(StubGateway::default()));
        assert!(matches!(
            engine.register_work(id(1), Uuid::nil()).await.unwrap_err(),
            EngineError::InvalidOwner
        ));
    }

    #[tokio::test]
    async fn only_the_owner_may_set_splits() {
        let engine = engine_with(Arc::new(StubGateway::default()));
        engine.register_work(id(1), id(10)).await.unwrap();
        let err = engine
            .set_splits(id(1), id(11), vec![id(20)], vec![10000])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn failed_validation_keeps_previous_splits() {
        let engine = registered_engine(Arc::new(StubGateway::default())).await;
        let err = engine
            .set_splits(id(1), id(10), vec![id(40)], vec![9000])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SplitSumMismatch { total: 9000 }));

        let entries = engine.recipients(id(1)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].recipient, id(20));
    }

    #[tokio::test]
    async fn deposit_credits_shares_and_remainder() {
        let engine = registered_engine(Arc::new(StubGateway::default())).await;

        let outcome = engine.deposit_revenue(id(1), 100).await.unwrap();
        assert_eq!(outcome.shares, vec![(id(20), 70), (id(30), 30)]);
        assert_eq!(outcome.remainder, 0);
        assert_eq!(engine.pending_balance(id(20)).await, 70);
        assert_eq!(engine.pending_balance(id(30)).await, 30);

        // A single unit floors to zero everywhere; the owner gets it all.
        let outcome = engine.deposit_revenue(id(1), 1).await.unwrap();
        assert_eq!(outcome.remainder, 1);
        assert_eq!(outcome.remainder_recipient, id(10));
        assert_eq!(engine.pending_balance(id(10)).await, 1);
        assert_eq!(engine.custodied_total().await, 101);
    }

    #[tokio::test]
    async fn deposit_requires_registration_splits_and_positive_amount() {
        let engine = engine_with(Arc::new(StubGateway::default()));
        assert!(matches!(
            engine.deposit_revenue(id(9), 100).await.unwrap_err(),
            EngineError::WorkNotFound(_)
        ));

        engine.register_work(id(1), id(10)).await.unwrap();
        assert!(matches!(
            engine.deposit_revenue(id(1), 100).await.unwrap_err(),
            EngineError::NoRecipients(_)
        ));

        engine
            .set_splits(id(1), id(10), vec![id(20)], vec![10000])
            .await
            .unwrap();
        assert!(matches!(
            engine.deposit_revenue(id(1), 0).await.unwrap_err(),
            EngineError::InvalidAmount
        ));
    }

    #[tokio::test]
    async fn owner_listed_as_recipient_is_credited_twice() {
        let engine = engine_with(Arc::new(StubGateway::default()));
        engine.register_work(id(1), id(10)).await.unwrap();
        engine
            .set_splits(id(1), id(10), vec![id(10), id(20)], vec![5000, 5000])
            .await
            .unwrap();

        // 101 → 50 + 50 with remainder 1; the owner takes share + remainder.
        engine.deposit_revenue(id(1), 101).await.unwrap();
        assert_eq!(engine.pending_balance(id(10)).await, 51);
        assert_eq!(engine.pending_balance(id(20)).await, 50);
    }

    #[tokio::test]
    async fn claim_pays_and_zeroes_the_balance() {
        let gateway = Arc::new(StubGateway::default());
        let engine = registered_engine(gateway.clone()).await;
        engine.deposit_revenue(id(1), 100).await.unwrap();

        let paid = engine.claim(id(20)).await.unwrap();
        assert_eq!(paid, 70);
        assert_eq!(engine.pending_balance(id(20)).await, 0);
        assert_eq!(engine.custodied_total().await, 30);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            engine.claim(id(20)).await.unwrap_err(),
            EngineError::NoPendingBalance(_)
        ));
    }

    #[tokio::test]
    async fn failed_transfer_rolls_the_debit_back() {
        let gateway = Arc::new(StubGateway::default());
        gateway.fail.store(true, Ordering::SeqCst);
        let engine = registered_engine(gateway.clone()).await;
        engine.deposit_revenue(id(1), 100).await.unwrap();

        let err = engine.claim(id(20)).await.unwrap_err();
        assert!(matches!(err, EngineError::TransferFailed(_)));
        assert!(err.is_retryable());
        assert_eq!(engine.pending_balance(id(20)).await, 70);
        assert_eq!(engine.custodied_total().await, 100);

        // The same claim succeeds once the rail recovers.
        gateway.fail.store(false, Ordering::SeqCst);
        assert_eq!(engine.claim(id(20)).await.unwrap(), 70);
    }

    #[tokio::test]
    async fn failed_transfer_is_logged_as_a_failed_payout() {
        let gateway = Arc::new(StubGateway::default());
        gateway.fail.store(true, Ordering::SeqCst);
        let (tx, mut rx) = event_channel();
        let engine = SettlementEngine::new(id(999), gateway, Duration::from_millis(200), tx);

        engine.register_work(id(1), id(10)).await.unwrap();
        engine
            .set_splits(id(1), id(10), vec![id(20)], vec![10000])
            .await
            .unwrap();
        engine.deposit_revenue(id(1), 10).await.unwrap();
        engine.claim(id(20)).await.unwrap_err();

        // Registration, splits and distribution come first.
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }
        let failure = rx.recv().await.unwrap();
        assert_eq!(
            failure.payload,
            EventPayload::PayoutFailed {
                identity: id(20),
                amount: 10,
                out_of_band: false,
            }
        );
        // The rolled-back balance is still claimable.
        assert_eq!(engine.pending_balance(id(20)).await, 10);
    }

    #[tokio::test]
    async fn timed_out_transfer_rolls_the_debit_back() {
        let engine = registered_engine(Arc::new(HangingGateway)).await;
        engine.deposit_revenue(id(1), 100).await.unwrap();

        let err = engine.claim(id(20)).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::TransferFailed(TransferError::Timeout(_))
        ));
        assert_eq!(engine.pending_balance(id(20)).await, 70);
    }

    #[tokio::test]
    async fn reentrant_claim_is_rejected_during_transfer() {
        let gateway = Arc::new(ReentrantGateway::default());
        let (tx, rx) = event_channel();
        std::mem::forget(rx);
        let engine = Arc::new(SettlementEngine::new(
            id(999),
            gateway.clone(),
            Duration::from_millis(500),
            tx,
        ));
        gateway.engine.set(engine.clone()).ok();

        engine.register_work(id(1), id(10)).await.unwrap();
        engine
            .set_splits(id(1), id(10), vec![id(20)], vec![10000])
            .await
            .unwrap();
        engine.deposit_revenue(id(1), 50).await.unwrap();

        // The outer claim succeeds; the nested one observes Reentrant.
        assert_eq!(engine.claim(id(20)).await.unwrap(), 50);
        let observed = gateway.observed.lock().unwrap().take().expect("nested error");
        assert!(matches!(observed, EngineError::Reentrant(i) if i == id(20)));
    }

    #[tokio::test]
    async fn concurrent_claims_pay_at_most_once() {
        let gateway = Arc::new(StubGateway::default());
        let engine = Arc::new(registered_engine(gateway.clone()).await);
        engine.deposit_revenue(id(1), 100).await.unwrap();

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.claim(id(20)).await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.claim(id(20)).await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let mut paid = 0u64;
        for result in [a, b] {
            match result {
                Ok(amount) => {
                    assert_eq!(amount, 70);
                    paid += amount;
                }
                Err(e) => assert!(matches!(
                    e,
                    EngineError::NoPendingBalance(_) | EngineError::Reentrant(_)
                )),
            }
        }
        assert_eq!(paid, 70, "exactly one claim pays");
        assert_eq!(engine.pending_balance(id(20)).await, 0);
        assert_eq!(engine.custodied_total().await, 30);
    }

    #[tokio::test]
    async fn emergency_withdraw_is_operator_only_and_bounded() {
        let engine = registered_engine(Arc::new(StubGateway::default())).await;
        engine.deposit_revenue(id(1), 100).await.unwrap();

        assert!(matches!(
            engine.emergency_withdraw(id(20), 10).await.unwrap_err(),
            EngineError::NotOperator(_)
        ));
        assert!(matches!(
            engine.emergency_withdraw(id(999), 101).await.unwrap_err(),
            EngineError::InsufficientFunds {
                requested: 101,
                available: 100
            }
        ));

        engine.emergency_withdraw(id(999), 40).await.unwrap();
        assert_eq!(engine.custodied_total().await, 60);
        // Per-recipient pending balances are untouched.
        assert_eq!(engine.pending_balance(id(20)).await, 70);
        assert_eq!(engine.pending_balance(id(30)).await, 30);
    }

    #[tokio::test]
    async fn every_mutation_emits_one_event() {
        let gateway = Arc::new(StubGateway::default());
        let (tx, mut rx) = event_channel();
        let engine = SettlementEngine::new(id(999), gateway, Duration::from_millis(200), tx);

        engine.register_work(id(1), id(10)).await.unwrap();
        engine
            .set_splits(id(1), id(10), vec![id(20)], vec![10000])
            .await
            .unwrap();
        engine.deposit_revenue(id(1), 10).await.unwrap();
        engine.claim(id(20)).await.unwrap();

        let mut types = Vec::new();
        for _ in 0..4 {
            types.push(rx.recv().await.unwrap().payload.event_type());
        }
        assert_eq!(
            types,
            vec![
                "work_registered",
                "splits_updated",
                "revenue_distributed",
                "balance_claimed"
            ]
        );
        assert_eq!(engine.event_log().head_position(), 3);
    }
}
