//! Seeding helpers shared by the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use larpreg_core::{
    clock::FixedClock,
    engine::RegistrationEngine,
    store::{
        AssociationRow, EventRow, InvoiceRow, MemberRow, PaymentRow, RegStore, RegistrationRow,
        RunRow, TicketRow,
    },
    types::{
        AssocId, EventId, InvoiceStatus, MemberId, PaymentKind, RegistrationId, RegistrationState,
        RunId, TicketId, TicketTier,
    },
};
use std::sync::Arc;

pub const ASSOC: AssocId = 1;
pub const EVENT: EventId = 10;
pub const RUN: RunId = 100;

pub struct Fixture {
    pub engine: RegistrationEngine,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub fn store(&self) -> &RegStore {
        self.engine.store()
    }

    pub fn now(&self) -> DateTime<Utc> {
        use larpreg_core::clock::Clock;
        self.clock.now()
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

/// Engine at 2026-03-01 12:00 UTC with one association, one event and
/// one run starting in 90 days.
pub fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(FixedClock::new(now()));
    let engine = RegistrationEngine::build_test(clock.clone()).expect("build_test failed");
    seed_association(engine.store(), ASSOC, Some("orga@example.org"));
    seed_event(engine.store(), EVENT, ASSOC);
    seed_run(engine.store(), RUN, EVENT, 1, Some(days_from_today(90)));
    Fixture { engine, clock }
}

pub fn seed_association(store: &RegStore, id: AssocId, mail: Option<&str>) {
    store
        .insert_association(&AssociationRow {
            id,
            name: format!("Association {id}"),
            slug: format!("assoc-{id}"),
            main_mail: mail.map(str::to_string),
        })
        .unwrap();
}

/// Uncapped event without a parent or external link.
pub fn event_row(id: EventId, assoc_id: AssocId) -> EventRow {
    EventRow {
        id,
        assoc_id,
        parent_id: None,
        name: format!("Event {id}"),
        slug: format!("event-{id}"),
        max_pg: 0,
        max_filler: 0,
        max_waiting: 0,
        register_link: None,
    }
}

pub fn seed_event(store: &RegStore, id: EventId, assoc_id: AssocId) -> EventRow {
    let event = event_row(id, assoc_id);
    store.insert_event(&event).unwrap();
    event
}

pub fn seed_run(
    store: &RegStore,
    id: RunId,
    event_id: EventId,
    number: i64,
    start: Option<NaiveDate>,
) -> RunRow {
    let run = RunRow {
        id,
        event_id,
        number,
        start,
        end: start.map(|s| s + Duration::days(2)),
        registration_open: None,
        registration_closed: false,
    };
    store.insert_run(&run).unwrap();
    run
}

pub fn seed_member(store: &RegStore, id: MemberId, name: &str) {
    store
        .insert_member(&MemberRow {
            id,
            name: name.into(),
            surname: "Rossi".into(),
            email: format!("{}@example.org", name.to_lowercase()),
            profile_compiled: true,
        })
        .unwrap();
}

pub fn seed_ticket(
    store: &RegStore,
    id: TicketId,
    event_id: EventId,
    tier: TicketTier,
    name: &str,
    price: f64,
) {
    store
        .insert_ticket(&TicketRow {
            id,
            event_id,
            tier,
            name: name.into(),
            price,
        })
        .unwrap();
}

/// Active, unpaid registration with nothing due yet.
pub fn registration(
    member_id: MemberId,
    run_id: RunId,
    ticket_id: Option<TicketId>,
) -> RegistrationRow {
    RegistrationRow {
        id: 0,
        member_id,
        run_id,
        ticket_id,
        additionals: 0,
        pay_what: None,
        surcharge: 0.0,
        tot_iscr: 0.0,
        tot_payed: 0.0,
        quota: 0.0,
        deadline: 0,
        alert: false,
        redeem_code: None,
        created: now(),
        state: RegistrationState::Active,
    }
}

pub fn seed_registration(store: &RegStore, reg: &RegistrationRow) -> RegistrationId {
    store.insert_registration(reg).unwrap()
}

pub fn seed_payment(
    store: &RegStore,
    member_id: MemberId,
    reg_id: RegistrationId,
    pay: PaymentKind,
    value: f64,
) -> i64 {
    store
        .insert_payment(&PaymentRow {
            id: 0,
            member_id,
            reg_id,
            assoc_id: ASSOC,
            pay,
            value,
            hide: false,
            inv_id: None,
            created: now(),
        })
        .unwrap()
}

pub fn seed_invoice(
    store: &RegStore,
    member_id: MemberId,
    reg_id: RegistrationId,
    method: &str,
    status: InvoiceStatus,
    gross: f64,
) -> i64 {
    store
        .insert_invoice(&InvoiceRow {
            id: 0,
            member_id,
            assoc_id: ASSOC,
            method: method.into(),
            typ: "registration".into(),
            status,
            gross,
            trans: 0.0,
            cod: format!("inv-{reg_id}-{method}-{gross}"),
            idx: Some(reg_id),
            causal: format!("Registration {reg_id}"),
            created: now(),
        })
        .unwrap()
}
