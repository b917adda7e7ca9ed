//! Integration tests for the registration status engine.
//!
//! Covers:
//! 1. Registered members: next-step priority, provisional, payability
//! 2. Character lines and character links
//! 3. Unregistered members: phases and ticket pool availability

mod common;

use chrono::Duration;
use common::*;
use larpreg_core::{
    error::{RegError, RegResult},
    features::FeatureSet,
    status::{Availability, NextStep, ProvisionalPolicy, RegistrationPhase},
    store::{CharacterRow, EventRow, RegStore, RegistrationRow, RunRow},
    types::{CharacterStatus, InvoiceStatus, MembershipStatus, TicketTier, PAYMENT_METHOD_WIRE},
};

const VISITOR: i64 = 99;

fn registered(fx: &Fixture, reg: RegistrationRow) -> i64 {
    seed_member(fx.store(), reg.member_id, "Anna");
    seed_registration(fx.store(), &reg)
}

fn owing(tot_iscr: f64, tot_payed: f64) -> RegistrationRow {
    let mut reg = registration(1, RUN, None);
    reg.tot_iscr = tot_iscr;
    reg.tot_payed = tot_payed;
    reg
}

fn character(
    id: i64,
    number: i64,
    name: &str,
    player: i64,
    status: CharacterStatus,
) -> CharacterRow {
    CharacterRow {
        id,
        event_id: EVENT,
        number,
        name: name.into(),
        player_id: Some(player),
        status,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registered: next steps
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn confirmed_registration_has_no_next_step() {
    let fx = fixture();
    registered(&fx, registration(1, RUN, None));

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert!(status.open);
    assert_eq!(status.text, "Registration confirmed");
    assert_eq!(status.next_step, None);
    assert!(status.details.is_empty());
    assert!(!status.can_pay);
}

#[test]
fn revoked_membership_is_an_error() {
    let fx = fixture();
    registered(&fx, registration(1, RUN, None));
    fx.store().set_membership_status(1, ASSOC, MembershipStatus::Revoked).unwrap();

    let err = fx.engine.registration_status(RUN, 1).unwrap_err();
    assert!(matches!(err, RegError::MembershipRevoked { member_id: 1, assoc_id: ASSOC }));
}

#[test]
fn incomplete_application_blocks_payment() {
    let fx = fixture();
    fx.store().add_association_feature(ASSOC, "membership").unwrap();
    fx.store().add_event_feature(EVENT, "payment").unwrap();
    registered(&fx, owing(100.0, 10.0));

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::CompleteApplication));
    assert!(!status.can_pay);
    // The first lookup creates the membership row.
    let membership = fx.store().get_membership(1, ASSOC).unwrap().unwrap();
    assert_eq!(membership.status, MembershipStatus::Empty);
}

#[test]
fn submitted_application_awaits_approval() {
    let fx = fixture();
    fx.store().add_association_feature(ASSOC, "membership").unwrap();
    registered(&fx, registration(1, RUN, None));
    fx.store().set_membership_status(1, ASSOC, MembershipStatus::Submitted).unwrap();

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::AwaitingApproval));
    assert_eq!(status.details, vec![NextStep::AwaitingApproval.message()]);
}

#[test]
fn membership_gates_ignored_without_feature() {
    let fx = fixture();
    registered(&fx, registration(1, RUN, None));
    assert_eq!(fx.engine.registration_status(RUN, 1).unwrap().next_step, None);
}

#[test]
fn submitted_invoice_means_payment_pending() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "payment").unwrap();
    let mut reg = owing(100.0, 20.0);
    reg.alert = true;
    let reg_id = registered(&fx, reg);
    seed_invoice(fx.store(), 1, reg_id, "paypal", InvoiceStatus::Submitted, 80.0);

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::PaymentPending));
    assert!(status.can_pay);
}

#[test]
fn open_wire_invoice_asks_for_receipt() {
    let fx = fixture();
    let mut reg = owing(100.0, 20.0);
    reg.alert = true;
    let reg_id = registered(&fx, reg);
    seed_invoice(fx.store(), 1, reg_id, PAYMENT_METHOD_WIRE, InvoiceStatus::Created, 80.0);

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::ConfirmWireTransfer));
}

#[test]
fn alert_asks_for_payment_and_warns_when_overdue() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "payment").unwrap();
    let mut reg = owing(100.0, 20.0);
    reg.alert = true;
    reg.deadline = 5;
    registered(&fx, reg);
    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::Pay { overdue: false }));
    assert!(!status.details[0].contains("cancelled"));
    assert!(status.can_pay);

    let fx = fixture();
    let mut reg = owing(100.0, 20.0);
    reg.alert = true;
    reg.deadline = -3;
    registered(&fx, reg);
    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::Pay { overdue: true }));
    assert!(status.details[0].contains("cancelled"));
}

#[test]
fn unpaid_fee_for_this_year() {
    let fx = fixture();
    fx.store().add_association_feature(ASSOC, "membership").unwrap();
    registered(&fx, registration(1, RUN, None));
    fx.store().set_membership_status(1, ASSOC, MembershipStatus::Accepted).unwrap();
    assert_eq!(
        fx.engine.registration_status(RUN, 1).unwrap().next_step,
        Some(NextStep::PayMembershipFee)
    );

    fx.store().insert_membership_fee(1, ASSOC, 2026, 15.0).unwrap();
    assert_eq!(fx.engine.registration_status(RUN, 1).unwrap().next_step, None);
}

#[test]
fn incomplete_profile_comes_last() {
    let fx = fixture();
    registered(&fx, registration(1, RUN, None));
    fx.store().set_profile_compiled(1, false).unwrap();

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.next_step, Some(NextStep::CompleteProfile));
    assert_eq!(status.details, vec!["Please fill in your profile.".to_string()]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Registered: base text
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unpaid_registration_is_provisional() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "payment").unwrap();
    registered(&fx, owing(100.0, 0.0));

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.text, "Provisional registration");
    assert!(status.can_pay);
}

#[test]
fn event_can_opt_out_of_provisional() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "payment").unwrap();
    fx.store().set_event_config(EVENT, "payment_no_provisional", "true").unwrap();
    registered(&fx, owing(100.0, 0.0));

    assert_eq!(fx.engine.registration_status(RUN, 1).unwrap().text, "Registration confirmed");
}

#[test]
fn settled_registration_cannot_pay() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "payment").unwrap();
    registered(&fx, owing(100.0, 99.98));

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.text, "Registration confirmed");
    assert!(!status.can_pay);
}

#[test]
fn patron_is_thanked() {
    let fx = fixture();
    seed_ticket(fx.store(), 500, EVENT, TicketTier::Patron, "Patron", 200.0);
    registered(&fx, registration(1, RUN, Some(500)));

    assert_eq!(
        fx.engine.registration_status(RUN, 1).unwrap().text,
        "Registration confirmed. Thank you for supporting the event!"
    );
}

#[test]
fn waiting_ticket_reads_as_waiting_list() {
    let fx = fixture();
    seed_ticket(fx.store(), 500, EVENT, TicketTier::Waiting, "Waiting", 0.0);
    registered(&fx, registration(1, RUN, Some(500)));

    assert_eq!(
        fx.engine.registration_status(RUN, 1).unwrap().text,
        "Registration on waiting list"
    );
}

struct AlwaysProvisional;

impl ProvisionalPolicy for AlwaysProvisional {
    fn is_provisional(
        &self,
        _store: &RegStore,
        _event: &EventRow,
        _features: &FeatureSet,
        _reg: &RegistrationRow,
    ) -> RegResult<bool> {
        Ok(true)
    }
}

#[test]
fn custom_provisional_policy_is_used() {
    let fx = fixture();
    registered(&fx, registration(1, RUN, None));

    let status = fx
        .engine
        .registration_status_with_policy(RUN, 1, &AlwaysProvisional)
        .unwrap();
    assert_eq!(status.text, "Provisional registration");
}

// ─────────────────────────────────────────────────────────────────────────────
// Characters
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn character_line_lists_assigned_characters() {
    let fx = fixture();
    let reg_id = registered(&fx, registration(1, RUN, None));
    let store = fx.store();
    store.insert_character(&character(900, 1, "The Duke", 1, CharacterStatus::Approved)).unwrap();
    store.insert_character(&character(901, 2, "The Spy", 1, CharacterStatus::Approved)).unwrap();
    store.insert_character_rel(reg_id, 900, None).unwrap();
    store.insert_character_rel(reg_id, 901, None).unwrap();

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.details, vec!["Your characters are The Duke, The Spy".to_string()]);
}

#[test]
fn unapproved_character_shows_status_when_approval_required() {
    let fx = fixture();
    let reg_id = registered(&fx, registration(1, RUN, None));
    let store = fx.store();
    store.set_event_config(EVENT, "user_character_approval", "1").unwrap();
    store.insert_character(&character(900, 1, "The Duke", 1, CharacterStatus::Proposed)).unwrap();
    store.insert_character_rel(reg_id, 900, None).unwrap();

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.details, vec!["Your character is The Duke (Proposed)".to_string()]);
}

#[test]
fn character_links_offer_create_or_select() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "user_character").unwrap();
    registered(&fx, registration(1, RUN, None));

    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.links.len(), 1);
    assert_eq!(status.links[0].href, "/event-10/1/character/create");

    fx.store()
        .insert_character(&character(900, 1, "Draft", 1, CharacterStatus::Creation))
        .unwrap();
    let status = fx.engine.registration_status(RUN, 1).unwrap();
    assert_eq!(status.links[0].href, "/event-10/1/character/select");
}

#[test]
fn no_character_links_at_limit_or_with_pending_step() {
    let fx = fixture();
    fx.store().add_event_feature(EVENT, "user_character").unwrap();
    let reg_id = registered(&fx, registration(1, RUN, None));
    fx.store()
        .insert_character(&character(900, 1, "The Duke", 1, CharacterStatus::Approved))
        .unwrap();
    fx.store().insert_character_rel(reg_id, 900, None).unwrap();
    assert!(fx.engine.registration_status(RUN, 1).unwrap().links.is_empty());

    let fx = fixture();
    fx.store().add_event_feature(EVENT, "user_character").unwrap();
    registered(&fx, registration(1, RUN, None));
    fx.store().set_profile_compiled(1, false).unwrap();
    assert!(fx.engine.registration_status(RUN, 1).unwrap().links.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Not registered: phases
// ─────────────────────────────────────────────────────────────────────────────

fn visitor(fx: &Fixture) {
    seed_member(fx.store(), VISITOR, "Vera");
}

#[test]
fn closed_run() {
    let fx = fixture();
    visitor(&fx);
    fx.store().set_run_registration_closed(RUN, true).unwrap();

    let status = fx.engine.registration_status(RUN, VISITOR).unwrap();
    assert!(!status.open);
    assert_eq!(status.text, "Registration closed");
    assert_eq!(status.phase, Some(RegistrationPhase::Closed));
}

#[test]
fn external_registration_link() {
    let fx = fixture();
    visitor(&fx);
    let store = fx.store();
    store
        .insert_event(&EventRow {
            register_link: Some("https://forms.example.org/larp".into()),
            ..event_row(20, ASSOC)
        })
        .unwrap();
    seed_run(store, 200, 20, 1, Some(days_from_today(60)));
    store.add_event_feature(20, "register_link").unwrap();

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.phase, Some(RegistrationPhase::External));
    assert_eq!(status.links[0].href, "https://forms.example.org/larp");
}

#[test]
fn pre_registration_phase() {
    let fx = fixture();
    visitor(&fx);
    let store = fx.store();
    store.add_event_feature(EVENT, "registration_open").unwrap();
    store.add_event_feature(EVENT, "pre_register").unwrap();
    store.set_event_config(EVENT, "pre_register_active", "true").unwrap();

    let status = fx.engine.registration_status(RUN, VISITOR).unwrap();
    assert_eq!(status.phase, Some(RegistrationPhase::Pre));
    assert_eq!(status.text, "Pre-register now");
    assert_eq!(status.links[0].href, "/event-10/pre-register");

    store.insert_pre_registration(VISITOR, EVENT, 1).unwrap();
    let status = fx.engine.registration_status(RUN, VISITOR).unwrap();
    assert_eq!(status.text, "You are pre-registered");
    assert!(status.links.is_empty());
}

#[test]
fn future_opening_is_announced() {
    let fx = fixture();
    visitor(&fx);
    let store = fx.store();
    store.add_event_feature(EVENT, "registration_open").unwrap();
    store
        .insert_run(&RunRow {
            registration_open: Some(now() + Duration::days(5)),
            ..seed_run_row(200)
        })
        .unwrap();

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert!(!status.open);
    assert_eq!(status.phase, Some(RegistrationPhase::Future));
    assert_eq!(status.additional.as_deref(), Some("Registration opens on 2026-03-06 12:00"));
}

#[test]
fn past_opening_means_open() {
    let fx = fixture();
    visitor(&fx);
    let store = fx.store();
    store.add_event_feature(EVENT, "registration_open").unwrap();
    store
        .insert_run(&RunRow {
            registration_open: Some(now() - Duration::days(1)),
            ..seed_run_row(200)
        })
        .unwrap();

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.phase, Some(RegistrationPhase::Open));
    assert_eq!(status.links[0].href, "/event-10/2/register");
}

fn seed_run_row(id: i64) -> RunRow {
    RunRow {
        id,
        event_id: EVENT,
        number: 2,
        start: Some(days_from_today(120)),
        end: Some(days_from_today(122)),
        registration_open: None,
        registration_closed: false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Not registered: ticket pools
// ─────────────────────────────────────────────────────────────────────────────

/// Capped event 20 with run 200, `players` seats taken by member 1.
fn capped(fx: &Fixture, event: EventRow, players: i64) {
    let store = fx.store();
    store.insert_event(&event).unwrap();
    seed_run(store, 200, event.id, 1, Some(days_from_today(60)));
    visitor(fx);
    if players > 0 {
        seed_member(store, 1, "Anna");
        let mut reg = registration(1, 200, None);
        reg.additionals = players - 1;
        seed_registration(store, &reg);
    }
}

#[test]
fn uncapped_event_is_open() {
    let fx = fixture();
    visitor(&fx);
    let status = fx.engine.registration_status(RUN, VISITOR).unwrap();
    assert_eq!(status.text, "Registration open");
    assert_eq!(status.availability, Some(Availability::Primary));
    assert_eq!(status.additional, None);
    assert!(!status.text.is_empty());
}

#[test]
fn plenty_of_room_has_no_banner() {
    let fx = fixture();
    capped(&fx, EventRow { max_pg: 100, ..event_row(20, ASSOC) }, 10);

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.availability, Some(Availability::Primary));
    assert_eq!(status.additional, None);
}

#[test]
fn few_tickets_left_shows_banner() {
    let fx = fixture();
    capped(&fx, EventRow { max_pg: 100, ..event_row(20, ASSOC) }, 95);

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.availability, Some(Availability::Primary));
    assert_eq!(status.additional.as_deref(), Some("Hurry: only 5 tickets left!"));
}

#[test]
fn low_ratio_shows_banner() {
    let fx = fixture();
    capped(&fx, EventRow { max_pg: 200, ..event_row(20, ASSOC) }, 150);

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.additional.as_deref(), Some("Hurry: only 50 tickets left!"));
}

#[test]
fn full_event_falls_back_to_filler_then_waiting() {
    let fx = fixture();
    capped(&fx, EventRow { max_pg: 10, ..event_row(20, ASSOC) }, 10);
    fx.store().add_event_feature(20, "filler").unwrap();
    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.availability, Some(Availability::Filler));
    assert_eq!(status.text, "Registration open as filler");

    let fx = fixture();
    capped(
        &fx,
        EventRow { max_pg: 10, max_filler: 1, ..event_row(20, ASSOC) },
        10,
    );
    let store = fx.store();
    store.add_event_feature(20, "filler").unwrap();
    store.add_event_feature(20, "waiting").unwrap();
    seed_ticket(store, 600, 20, TicketTier::Filler, "Filler", 30.0);
    seed_member(store, 2, "Bruno");
    seed_registration(store, &registration(2, 200, Some(600)));

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert_eq!(status.availability, Some(Availability::Waiting));
    assert_eq!(status.text, "Registration open on the waiting list");
}

#[test]
fn full_event_without_pools_is_sold_out() {
    let fx = fixture();
    capped(&fx, EventRow { max_pg: 10, ..event_row(20, ASSOC) }, 12);

    let status = fx.engine.registration_status(200, VISITOR).unwrap();
    assert!(!status.open);
    assert_eq!(status.text, "Sold out");
    assert_eq!(status.availability, Some(Availability::SoldOut));
    assert!(status.links.is_empty());
}

#[test]
fn unknown_member_or_run_is_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.engine.registration_status(RUN, 404),
        Err(RegError::NotFound { entity: "member", .. })
    ));
    assert!(matches!(
        fx.engine.registration_status(404, 1),
        Err(RegError::NotFound { entity: "run", .. })
    ));
}
