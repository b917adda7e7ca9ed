//! The registration engine: the single entry point collaborators use.
//!
//! Owns the store, the cache backend, the clock, the config and the event
//! bus, and lends them to the components as an `EngineContext`.
//!
//! HANDLER ORDER:
//!   1. accounting cache
//!   2. reg counts
//!   3. leaderboard
//!
//! RULES:
//!   - Writes made through the engine publish their domain event after
//!     the write commits.
//!   - Components never hold the store or cache beyond one call.
//!   - All "now" and "today" readings go through the clock.

use crate::{
    accounting_cache::{AccountingCache, AccountingInvalidator},
    cache::{CacheStore, MemoryCache},
    clock::Clock,
    config::EngineConfig,
    context::EngineContext,
    deadline::{DeadlineEvaluator, DeadlineReport},
    error::{RegError, RegResult},
    event::DomainEvent,
    features::FeatureSet,
    leaderboard::{self, LeaderboardEntry, LeaderboardInvalidator},
    notification::{self, NotificationQueue, StoreNotificationQueue},
    reg_counts::{self, RegCounts, RegCountsInvalidator},
    settings,
    snapshot::RunAccounting,
    status::{ProvisionalPolicy, RegistrationStatusEngine, StatusResult},
    store::{RegStore, RegistrationRow},
    subscriber::{DomainEventHandler, EventBus},
    transfer::{RegistrationTransferEngine, TransferOptions, TransferValidation},
    types::{AssocId, EventId, MemberId, RegistrationId, RunId},
};
use std::str::FromStr;
use std::sync::Arc;

pub struct RegistrationEngine {
    store: RegStore,
    cache: Box<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    bus: EventBus,
}

impl RegistrationEngine {
    /// Engine with no event handlers subscribed.
    pub fn new(
        store: RegStore,
        cache: Box<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            config,
            bus: EventBus::new(),
        }
    }

    /// Build a fully wired engine with the built-in handlers subscribed.
    /// Call this instead of new() + manual subscribe() calls.
    pub fn build(
        store: RegStore,
        cache: Box<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let mut engine = Self::new(store, cache, clock, config);
        engine.subscribe(Box::new(AccountingInvalidator));
        engine.subscribe(Box::new(RegCountsInvalidator));
        engine.subscribe(Box::new(LeaderboardInvalidator));
        engine
    }

    /// In-memory migrated store, in-memory cache, test config.
    pub fn build_test(clock: Arc<dyn Clock>) -> RegResult<Self> {
        let store = RegStore::in_memory()?;
        store.migrate()?;
        let cache = Box::new(MemoryCache::new(clock.clone()));
        Ok(Self::build(store, cache, clock, EngineConfig::default_test()))
    }

    pub fn subscribe(&mut self, handler: Box<dyn DomainEventHandler>) {
        self.bus.subscribe(handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.bus.handler_names()
    }

    pub fn context(&self) -> EngineContext<'_> {
        EngineContext {
            store: &self.store,
            cache: &*self.cache,
            clock: &*self.clock,
            config: &self.config,
        }
    }

    pub fn store(&self) -> &RegStore {
        &self.store
    }

    pub fn cache(&self) -> &dyn CacheStore {
        &*self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tell subscribers about a write. Returns how many handlers failed.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        self.bus.publish(event, &self.context())
    }

    // ── Accounting ─────────────────────────────────────────────────

    pub fn get_registration_accounting_cache(&self, run_id: RunId) -> RegResult<RunAccounting> {
        AccountingCache::new(self.context()).get(run_id)
    }

    pub fn refresh_member_accounting_cache(
        &self,
        run_id: RunId,
        member_id: MemberId,
    ) -> RegResult<()> {
        AccountingCache::new(self.context()).refresh_member(run_id, member_id)
    }

    pub fn clear_registration_accounting_cache(&self, run_id: RunId) -> RegResult<()> {
        AccountingCache::new(self.context()).clear(run_id)
    }

    // ── Status ─────────────────────────────────────────────────────

    pub fn registration_status(
        &self,
        run_id: RunId,
        member_id: MemberId,
    ) -> RegResult<StatusResult> {
        RegistrationStatusEngine::new(self.context()).status(run_id, member_id)
    }

    pub fn registration_status_with_policy(
        &self,
        run_id: RunId,
        member_id: MemberId,
        policy: &dyn ProvisionalPolicy,
    ) -> RegResult<StatusResult> {
        RegistrationStatusEngine::with_policy(self.context(), policy).status(run_id, member_id)
    }

    // ── Deadlines ──────────────────────────────────────────────────

    pub fn check_run_deadlines(&self, runs: &[RunId]) -> RegResult<Vec<DeadlineReport>> {
        DeadlineEvaluator::new(self.context()).check_runs(runs)
    }

    /// Queue organiser digests into the store's notification queue.
    pub fn queue_deadline_notifications(&self, reports: &[DeadlineReport]) -> RegResult<usize> {
        let queue = StoreNotificationQueue::new(&self.store, &*self.clock);
        self.queue_deadline_notifications_to(&queue, reports)
    }

    pub fn queue_deadline_notifications_to(
        &self,
        queue: &dyn NotificationQueue,
        reports: &[DeadlineReport],
    ) -> RegResult<usize> {
        notification::queue_deadline_notifications(&self.context(), queue, reports)
    }

    // ── Transfer ───────────────────────────────────────────────────

    pub fn validate_transfer_feasibility(
        &self,
        reg_id: RegistrationId,
        target_run: RunId,
        options: &TransferOptions,
    ) -> RegResult<TransferValidation> {
        RegistrationTransferEngine::new(self.context()).validate(reg_id, target_run, options)
    }

    pub fn transfer_registration_between_runs(
        &self,
        reg_id: RegistrationId,
        target_run: RunId,
        options: &TransferOptions,
    ) -> RegResult<RegistrationRow> {
        let source_run = self
            .store
            .get_registration(reg_id)?
            .map(|r| r.run_id)
            .ok_or_else(|| RegError::not_found("registration", reg_id))?;
        let created =
            RegistrationTransferEngine::new(self.context()).transfer(reg_id, target_run, options)?;
        self.publish(&DomainEvent::RegistrationTransferred {
            from_run: source_run,
            to_run: target_run,
            member_id: created.member_id,
        });
        Ok(created)
    }

    // ── Counts and rankings ────────────────────────────────────────

    pub fn get_reg_counts(&self, run_id: RunId) -> RegResult<RegCounts> {
        reg_counts::get_reg_counts(&self.context(), run_id)
    }

    pub fn get_leaderboard(&self, assoc_id: AssocId) -> RegResult<Vec<LeaderboardEntry>> {
        leaderboard::get_leaderboard(&self.context(), assoc_id)
    }

    // ── Collaborator lookups ───────────────────────────────────────

    pub fn get_event_features(&self, event_id: EventId) -> RegResult<FeatureSet> {
        self.store.event_features(event_id)
    }

    pub fn get_association_config<T: FromStr>(
        &self,
        assoc_id: AssocId,
        key: &str,
        default: T,
    ) -> RegResult<T> {
        settings::get_association_config(&self.store, assoc_id, key, default)
    }

    pub fn get_event_config<T: FromStr>(
        &self,
        event_id: EventId,
        key: &str,
        default: T,
    ) -> RegResult<T> {
        settings::get_event_config(&self.store, event_id, key, default)
    }
}
