//! Association leaderboard: members ranked by runs attended.
//!
//! A run counts once it has ended; cancelled registrations never count.
//! Cached under `leaderboard_{assoc_id}`.

use crate::{
    cache::leaderboard_key,
    context::EngineContext,
    error::RegResult,
    event::DomainEvent,
    subscriber::DomainEventHandler,
    types::{AssocId, MemberId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub member_id: MemberId,
    pub name: String,
    pub runs: i64,
}

pub fn get_leaderboard(
    ctx: &EngineContext<'_>,
    assoc_id: AssocId,
) -> RegResult<Vec<LeaderboardEntry>> {
    let key = leaderboard_key(assoc_id);
    match ctx.cache.get(&key) {
        Ok(Some(payload)) => match serde_json::from_str(&payload) {
            Ok(entries) => return Ok(entries),
            Err(e) => log::warn!("discarding unreadable {key}: {e}"),
        },
        Ok(None) => {}
        Err(e) => log::warn!("cache read of {key} failed, recomputing: {e}"),
    }

    let entries: Vec<LeaderboardEntry> = ctx
        .store
        .attendance_ranking(assoc_id, ctx.clock.today(), ctx.config.leaderboard_size)?
        .into_iter()
        .map(|row| LeaderboardEntry {
            member_id: row.member_id,
            name: if row.surname.is_empty() {
                row.name
            } else {
                format!("{} {}", row.name, row.surname)
            },
            runs: row.runs,
        })
        .collect();

    match serde_json::to_string(&entries) {
        Ok(payload) => {
            if let Err(e) = ctx.cache.set(&key, &payload, ctx.config.cache_ttl()) {
                log::warn!("cache write of {key} failed: {e}");
            }
        }
        Err(e) => log::warn!("cannot serialise {key}: {e}"),
    }
    Ok(entries)
}

pub struct LeaderboardInvalidator;

impl DomainEventHandler for LeaderboardInvalidator {
    fn name(&self) -> &'static str {
        "leaderboard"
    }

    fn handle(&self, event: &DomainEvent, ctx: &EngineContext<'_>) -> RegResult<()> {
        let run_id = match event {
            DomainEvent::MembershipSaved { assoc_id, .. } => {
                return ctx.cache.delete(&leaderboard_key(*assoc_id));
            }
            DomainEvent::RegistrationSaved { run_id, .. } => *run_id,
            DomainEvent::RegistrationTransferred { to_run, .. } => *to_run,
            _ => return Ok(()),
        };

        // Transfers never cross associations, so the target run is enough.
        let Some(run) = ctx.store.get_run(run_id)? else {
            return Ok(());
        };
        let Some(event) = ctx.store.get_event(run.event_id)? else {
            return Ok(());
        };
        ctx.cache.delete(&leaderboard_key(event.assoc_id))
    }
}
