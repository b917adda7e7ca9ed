//! Seat counts per ticket tier for a run, cached under `reg_counts{run_id}`.

use crate::{
    cache::reg_counts_key,
    context::EngineContext,
    error::RegResult,
    event::DomainEvent,
    store::TierCount,
    subscriber::DomainEventHandler,
    types::{RunId, TicketTier},
};
use serde::{Deserialize, Serialize};

/// Seats taken in a run. A registration fills `1 + additionals` seats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegCounts {
    pub count_player: i64,
    pub count_filler: i64,
    pub count_waiting: i64,
    pub count_staff: i64,
    pub count_other: i64,
    pub tot: i64,
}

impl RegCounts {
    /// Fold per-tier sums. Registrations without a live ticket count as players.
    pub fn from_tiers(tiers: &[TierCount]) -> Self {
        let mut counts = Self::default();
        for t in tiers {
            match t.tier {
                None => counts.count_player += t.count,
                Some(tier) if tier.is_player() => counts.count_player += t.count,
                Some(TicketTier::Filler) => counts.count_filler += t.count,
                Some(TicketTier::Waiting) => counts.count_waiting += t.count,
                Some(TicketTier::Staff) => counts.count_staff += t.count,
                Some(_) => counts.count_other += t.count,
            }
            counts.tot += t.count;
        }
        counts
    }
}

/// Cached counts, recomputed from the store on a miss.
pub fn get_reg_counts(ctx: &EngineContext<'_>, run_id: RunId) -> RegResult<RegCounts> {
    let key = reg_counts_key(run_id);
    match ctx.cache.get(&key) {
        Ok(Some(payload)) => match serde_json::from_str(&payload) {
            Ok(counts) => return Ok(counts),
            Err(e) => log::warn!("discarding unreadable {key}: {e}"),
        },
        Ok(None) => {}
        Err(e) => log::warn!("cache read of {key} failed, recounting: {e}"),
    }

    let counts = RegCounts::from_tiers(&ctx.store.registration_tier_counts(run_id)?);
    match serde_json::to_string(&counts) {
        Ok(payload) => {
            if let Err(e) = ctx.cache.set(&key, &payload, ctx.config.cache_ttl()) {
                log::warn!("cache write of {key} failed: {e}");
            }
        }
        Err(e) => log::warn!("cannot serialise {key}: {e}"),
    }
    Ok(counts)
}

pub struct RegCountsInvalidator;

impl DomainEventHandler for RegCountsInvalidator {
    fn name(&self) -> &'static str {
        "reg_counts"
    }

    fn handle(&self, event: &DomainEvent, ctx: &EngineContext<'_>) -> RegResult<()> {
        match event {
            DomainEvent::RegistrationSaved { run_id, .. } | DomainEvent::RunSaved { run_id } => {
                ctx.cache.delete(&reg_counts_key(*run_id))
            }
            DomainEvent::RegistrationTransferred { from_run, to_run, .. } => {
                ctx.cache.delete(&reg_counts_key(*from_run))?;
                ctx.cache.delete(&reg_counts_key(*to_run))
            }
            DomainEvent::EventSaved { event_id } => {
                for run in ctx.store.runs_for_event(*event_id)? {
                    ctx.cache.delete(&reg_counts_key(run.id))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
