//! Integration tests for the event bus and the smaller derived caches
//! (registration counts, leaderboard).

mod common;

use chrono::Duration;
use common::*;
use larpreg_core::{
    cache::{leaderboard_key, reg_counts_key, CacheStore},
    context::EngineContext,
    error::{RegError, RegResult},
    event::DomainEvent,
    subscriber::DomainEventHandler,
    types::TicketTier,
};
use std::sync::{Arc, Mutex};

// ─────────────────────────────────────────────────────────────────────────────
// Event bus
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn built_in_handlers_run_in_fixed_order() {
    let fx = fixture();
    assert_eq!(
        fx.engine.handler_names(),
        vec!["accounting_cache", "reg_counts", "leaderboard"]
    );
}

struct Failing;

impl DomainEventHandler for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn handle(&self, _event: &DomainEvent, _ctx: &EngineContext<'_>) -> RegResult<()> {
        Err(RegError::Cache("down".into()))
    }
}

struct Recording(Arc<Mutex<Vec<&'static str>>>);

impl DomainEventHandler for Recording {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn handle(&self, event: &DomainEvent, _ctx: &EngineContext<'_>) -> RegResult<()> {
        self.0.lock().unwrap().push(event.kind());
        Ok(())
    }
}

#[test]
fn failing_handler_does_not_stop_later_handlers() {
    let mut fx = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    fx.engine.subscribe(Box::new(Failing));
    fx.engine.subscribe(Box::new(Recording(seen.clone())));

    let failures = fx.engine.publish(&DomainEvent::RunSaved { run_id: RUN });
    assert_eq!(failures, 1);
    assert_eq!(*seen.lock().unwrap(), vec!["run_saved"]);
}

#[test]
fn transfer_publishes_one_event() {
    let mut fx = fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    fx.engine.subscribe(Box::new(Recording(seen.clone())));
    let store = fx.store();
    seed_run(store, 101, EVENT, 2, Some(days_from_today(120)));
    seed_member(store, 1, "Anna");
    let reg_id = seed_registration(store, &registration(1, RUN, None));

    fx.engine
        .transfer_registration_between_runs(reg_id, 101, &Default::default())
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["registration_transferred"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration counts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn counts_group_seats_by_tier() {
    let fx = fixture();
    let store = fx.store();
    seed_ticket(store, 500, EVENT, TicketTier::Standard, "Standard", 50.0);
    seed_ticket(store, 501, EVENT, TicketTier::Filler, "Filler", 20.0);
    seed_ticket(store, 502, EVENT, TicketTier::Staff, "Staff", 0.0);
    for id in 1..=4 {
        seed_member(store, id, &format!("M{id}"));
    }
    let mut group = registration(1, RUN, Some(500));
    group.additionals = 2;
    seed_registration(store, &group);
    seed_registration(store, &registration(2, RUN, Some(501)));
    seed_registration(store, &registration(3, RUN, Some(502)));
    let cancelled = seed_registration(store, &registration(4, RUN, None));
    store.cancel_registration(cancelled, now()).unwrap();

    let counts = fx.engine.get_reg_counts(RUN).unwrap();
    assert_eq!(counts.count_player, 3);
    assert_eq!(counts.count_filler, 1);
    assert_eq!(counts.count_staff, 1);
    assert_eq!(counts.tot, 5);
}

#[test]
fn registration_event_invalidates_counts() {
    let fx = fixture();
    let store = fx.store();
    seed_member(store, 1, "Anna");
    seed_member(store, 2, "Bruno");
    seed_registration(store, &registration(1, RUN, None));
    assert_eq!(fx.engine.get_reg_counts(RUN).unwrap().tot, 1);

    seed_registration(store, &registration(2, RUN, None));
    assert_eq!(fx.engine.get_reg_counts(RUN).unwrap().tot, 1, "served from cache");

    fx.engine.publish(&DomainEvent::RegistrationSaved { run_id: RUN, member_id: 2 });
    assert!(fx.engine.cache().get(&reg_counts_key(RUN)).unwrap().is_none());
    assert_eq!(fx.engine.get_reg_counts(RUN).unwrap().tot, 2);
}

#[test]
fn event_save_invalidates_counts_of_every_run() {
    let fx = fixture();
    seed_run(fx.store(), 101, EVENT, 2, Some(days_from_today(120)));
    fx.engine.get_reg_counts(RUN).unwrap();
    fx.engine.get_reg_counts(101).unwrap();

    fx.engine.publish(&DomainEvent::EventSaved { event_id: EVENT });
    assert!(fx.engine.cache().get(&reg_counts_key(RUN)).unwrap().is_none());
    assert!(fx.engine.cache().get(&reg_counts_key(101)).unwrap().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Leaderboard
// ─────────────────────────────────────────────────────────────────────────────

/// Three past runs and one future run of the fixture event.
fn seed_history(fx: &Fixture) {
    let store = fx.store();
    for (id, number, start) in [(90, 90, -300), (91, 91, -200), (92, 92, -100)] {
        seed_run(store, id, EVENT, number, Some(days_from_today(start)));
    }
    seed_member(store, 1, "Anna");
    seed_member(store, 2, "Bruno");
    seed_member(store, 3, "Carla");
    for run in [90, 91, 92, RUN] {
        seed_registration(store, &registration(1, run, None));
    }
    for run in [90, 91] {
        seed_registration(store, &registration(2, run, None));
    }
    let cancelled = seed_registration(store, &registration(3, 90, None));
    store.cancel_registration(cancelled, now() - Duration::days(400)).unwrap();
}

#[test]
fn leaderboard_counts_ended_runs_only() {
    let fx = fixture();
    seed_history(&fx);

    let board = fx.engine.get_leaderboard(ASSOC).unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!((board[0].member_id, board[0].runs), (1, 3));
    assert_eq!(board[0].name, "Anna Rossi");
    assert_eq!((board[1].member_id, board[1].runs), (2, 2));
}

#[test]
fn leaderboard_is_dropped_on_registration_and_membership_events() {
    let fx = fixture();
    seed_history(&fx);
    let key = leaderboard_key(ASSOC);

    fx.engine.get_leaderboard(ASSOC).unwrap();
    assert!(fx.engine.cache().get(&key).unwrap().is_some());
    fx.engine.publish(&DomainEvent::RegistrationSaved { run_id: 92, member_id: 2 });
    assert!(fx.engine.cache().get(&key).unwrap().is_none());

    fx.engine.get_leaderboard(ASSOC).unwrap();
    fx.engine.publish(&DomainEvent::MembershipSaved { assoc_id: ASSOC, member_id: 2 });
    assert!(fx.engine.cache().get(&key).unwrap().is_none());
}
