//! Accounting cache: per-run snapshots of every active registration's
//! money state, stored under `registration_accounting_{run_id}`.
//!
//! States per run:
//!   MISSING → BUILT        on `get` (synchronous rebuild) or `rebuild`
//!   BUILT   → MISSING      on `clear`
//!   BUILT   → BUILT        on `refresh_member` (merge of one member's rows)
//!
//! Rules:
//!   - A backend read error or an unreadable payload counts as a miss.
//!   - A backend write error is logged and dropped; the next miss retries.
//!   - Every amount is normalised through the wire format before it is
//!     returned, so a cache hit and a rebuild compare equal.

use crate::{
    cache::registration_accounting_key,
    context::EngineContext,
    error::{RegError, RegResult},
    event::DomainEvent,
    features::FeatureSet,
    money::{normalize_amount, remaining_balance},
    payment_breakdown::{breakdown, build_payment_type_cache, PaymentTypeCache},
    snapshot::{AccountingSnapshot, RunAccounting},
    store::{RegistrationRow, RunRow},
    subscriber::DomainEventHandler,
    types::{MemberId, RunId, TicketId},
};
use std::collections::{HashMap, HashSet};

/// Everything a snapshot needs besides the registration itself.
struct RunPricing {
    features: FeatureSet,
    ticket_prices: HashMap<TicketId, f64>,
    payments: PaymentTypeCache,
}

pub struct AccountingCache<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> AccountingCache<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Snapshots of every active registration of the run.
    pub fn get(&self, run_id: RunId) -> RegResult<RunAccounting> {
        if let Some(cached) = self.read_cached(run_id) {
            return Ok(cached);
        }
        log::debug!("accounting cache miss for run {run_id}");
        self.rebuild(run_id)
    }

    /// Recompute the whole run and overwrite the cache entry.
    pub fn rebuild(&self, run_id: RunId) -> RegResult<RunAccounting> {
        let run = self.load_run(run_id)?;
        let pricing = self.load_pricing(&run, None)?;

        let accounting: RunAccounting = self
            .ctx
            .store
            .active_registrations_for_run(run_id)?
            .iter()
            .map(|reg| (reg.id, compute_snapshot(reg, &pricing)))
            .collect();

        log::info!(
            "rebuilt accounting for run {run_id}: {} registrations",
            accounting.len()
        );
        self.write_cached(run_id, &accounting);
        Ok(accounting)
    }

    /// Patch one member's snapshots into the cached run.
    ///
    /// Without a cache entry this is a full rebuild. Other members'
    /// entries are left as they are, stale or cancelled; only entries
    /// whose registration row no longer exists (moved away) are dropped.
    pub fn refresh_member(&self, run_id: RunId, member_id: MemberId) -> RegResult<()> {
        let Some(mut accounting) = self.read_cached(run_id) else {
            self.rebuild(run_id)?;
            return Ok(());
        };

        let store = self.ctx.store;
        for reg_id in store.registration_ids_for_member(run_id, member_id)? {
            accounting.remove(&reg_id);
        }
        let existing: HashSet<_> = store.registration_ids_for_run(run_id)?.into_iter().collect();
        accounting.retain(|reg_id, _| existing.contains(reg_id));

        let regs = store.active_registrations_for_member(run_id, member_id)?;
        if !regs.is_empty() {
            let run = self.load_run(run_id)?;
            let pricing = self.load_pricing(&run, Some(member_id))?;
            for reg in &regs {
                accounting.insert(reg.id, compute_snapshot(reg, &pricing));
            }
        }

        log::debug!(
            "refreshed accounting for member {member_id} in run {run_id} ({} registrations)",
            regs.len()
        );
        self.write_cached(run_id, &accounting);
        Ok(())
    }

    /// Drop the run's cache entry.
    pub fn clear(&self, run_id: RunId) -> RegResult<()> {
        self.ctx.cache.delete(&registration_accounting_key(run_id))
    }

    // ── Internals ──────────────────────────────────────────────────

    fn load_run(&self, run_id: RunId) -> RegResult<RunRow> {
        self.ctx
            .store
            .get_run(run_id)?
            .ok_or_else(|| RegError::not_found("run", run_id))
    }

    /// Features, live ticket prices and, when tokens or credits are on,
    /// the special payment sums (of one member, or of everyone).
    fn load_pricing(&self, run: &RunRow, member_id: Option<MemberId>) -> RegResult<RunPricing> {
        let store = self.ctx.store;
        let features = store.event_features(run.event_id)?;

        // Highest price first; a ticket id appears once, so order only
        // matters to readers of the raw query.
        let ticket_prices = store
            .tickets_for_event(run.event_id)?
            .into_iter()
            .map(|t| (t.id, t.price))
            .collect();

        let payments = if features.special_payments() {
            build_payment_type_cache(&store.special_payment_totals(run.id, member_id)?)
        } else {
            PaymentTypeCache::new()
        };

        Ok(RunPricing {
            features,
            ticket_prices,
            payments,
        })
    }

    fn read_cached(&self, run_id: RunId) -> Option<RunAccounting> {
        let key = registration_accounting_key(run_id);
        match self.ctx.cache.get(&key) {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(accounting) => Some(accounting),
                Err(e) => {
                    log::warn!("discarding unreadable {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("cache read of {key} failed, rebuilding: {e}");
                None
            }
        }
    }

    fn write_cached(&self, run_id: RunId, accounting: &RunAccounting) {
        let key = registration_accounting_key(run_id);
        let payload = match serde_json::to_string(accounting) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("cannot serialise {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.ctx.cache.set(&key, &payload, self.ctx.config.cache_ttl()) {
            log::warn!("cache write of {key} failed: {e}");
        }
    }
}

fn compute_snapshot(reg: &RegistrationRow, pricing: &RunPricing) -> AccountingSnapshot {
    let split = breakdown(&pricing.features, reg.member_id, reg.tot_payed, &pricing.payments);
    let pay_what = reg.pay_what.unwrap_or(0.0);

    let (ticket_price, options_price) = match reg
        .ticket_id
        .and_then(|id| pricing.ticket_prices.get(&id))
    {
        Some(price) => {
            let ticket_price = price + pay_what;
            (Some(ticket_price), Some(reg.tot_iscr - ticket_price))
        }
        None => (None, None),
    };

    AccountingSnapshot {
        tot_payed: normalize_amount(reg.tot_payed),
        tot_iscr: normalize_amount(reg.tot_iscr),
        quota: normalize_amount(reg.quota),
        deadline: reg.deadline,
        pay_what: normalize_amount(pay_what),
        surcharge: normalize_amount(reg.surcharge),
        pay_cash: normalize_amount(split.cash),
        pay_credit: split.credit.map(normalize_amount),
        pay_token: split.token.map(normalize_amount),
        remaining: normalize_amount(remaining_balance(reg.tot_iscr, reg.tot_payed)),
        ticket_price: ticket_price.map(normalize_amount),
        options_price: options_price.map(normalize_amount),
    }
}

/// Keeps `registration_accounting_*` in step with registration writes.
pub struct AccountingInvalidator;

impl DomainEventHandler for AccountingInvalidator {
    fn name(&self) -> &'static str {
        "accounting_cache"
    }

    fn handle(&self, event: &DomainEvent, ctx: &EngineContext<'_>) -> RegResult<()> {
        let cache = AccountingCache::new(*ctx);
        match event {
            DomainEvent::RegistrationSaved { run_id, member_id }
            | DomainEvent::PaymentSaved { run_id, member_id } => {
                cache.refresh_member(*run_id, *member_id)
            }
            DomainEvent::RegistrationTransferred {
                from_run,
                to_run,
                member_id,
            } => {
                cache.refresh_member(*from_run, *member_id)?;
                cache.refresh_member(*to_run, *member_id)
            }
            DomainEvent::RunSaved { run_id } => cache.clear(*run_id),
            DomainEvent::EventSaved { event_id } | DomainEvent::CharacterSaved { event_id, .. } => {
                for run in ctx.store.runs_for_event(*event_id)? {
                    cache.clear(run.id)?;
                }
                Ok(())
            }
            DomainEvent::MembershipSaved { .. } => Ok(()),
        }
    }
}
