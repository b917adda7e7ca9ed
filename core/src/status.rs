//! Registration status: the one message a player sees on a run page.
//!
//! With a registration, the first matching step wins:
//!   1. membership revoked          → `RegError::MembershipRevoked`
//!   2. application incomplete      → complete the application (no payment)
//!   3. application submitted       → awaiting approval (no payment)
//!   4. submitted invoice           → payment pending confirmation
//!   5. alert + open wire invoice   → finish the wire transfer, upload receipt
//!   6. alert                       → pay (cancellation warning when overdue)
//!   7. membership fee unpaid       → pay the fee
//!   8. profile incomplete          → fill in the profile
//!   9. provisional                 → base text only
//!  10. confirmed                   → base text, Patron thanks
//!
//! Without one, the run's registration phase decides, and an open run
//! reports which ticket pool still has room.

use crate::{
    accounting_cache::AccountingCache,
    context::EngineContext,
    error::{RegError, RegResult},
    features::FeatureSet,
    money::remaining_balance,
    reg_counts::{get_reg_counts, RegCounts},
    settings::{event_flag, get_event_config},
    store::{EventRow, MemberRow, RegStore, RegistrationRow, RunRow},
    types::{
        CharacterStatus, InvoiceStatus, MemberId, MembershipStatus, RunId, TicketTier,
        PAYMENT_METHOD_WIRE,
    },
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// What the player should do next, when anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum NextStep {
    CompleteApplication,
    AwaitingApproval,
    PaymentPending,
    ConfirmWireTransfer,
    Pay { overdue: bool },
    PayMembershipFee,
    CompleteProfile,
}

impl NextStep {
    pub fn message(&self) -> String {
        match self {
            Self::CompleteApplication => {
                "Please complete your membership application to confirm your registration.".into()
            }
            Self::AwaitingApproval => "Your membership application is awaiting approval.".into(),
            Self::PaymentPending => "Your payment is awaiting confirmation.".into(),
            Self::ConfirmWireTransfer => {
                "Please complete the wire transfer, then upload the receipt to confirm your payment."
                    .into()
            }
            Self::Pay { overdue: false } => "Please proceed with payment.".into(),
            Self::Pay { overdue: true } => "Please proceed with payment. \
                 If payment is not received your registration may be cancelled."
                .into(),
            Self::PayMembershipFee => "Please pay the annual membership fee.".into(),
            Self::CompleteProfile => "Please fill in your profile.".into(),
        }
    }

    /// Membership gates close the payment page.
    fn blocks_payment(&self) -> bool {
        matches!(self, Self::CompleteApplication | Self::AwaitingApproval)
    }
}

/// Registration phase of a run nobody is registered to yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPhase {
    Closed,
    External,
    Pre,
    Future,
    Open,
}

/// Which ticket pool an open run still sells from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Primary,
    Filler,
    Waiting,
    SoldOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLink {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    pub open: bool,
    pub text: String,
    pub details: Vec<String>,
    pub additional: Option<String>,
    pub can_pay: bool,
    pub links: Vec<StatusLink>,
    pub next_step: Option<NextStep>,
    pub phase: Option<RegistrationPhase>,
    pub availability: Option<Availability>,
}

impl StatusResult {
    fn text(open: bool, text: impl Into<String>) -> Self {
        Self {
            open,
            text: text.into(),
            details: Vec::new(),
            additional: None,
            can_pay: false,
            links: Vec::new(),
            next_step: None,
            phase: None,
            availability: None,
        }
    }
}

/// Decides whether a registration is only provisionally accepted.
pub trait ProvisionalPolicy {
    fn is_provisional(
        &self,
        store: &RegStore,
        event: &EventRow,
        features: &FeatureSet,
        reg: &RegistrationRow,
    ) -> RegResult<bool>;
}

/// Provisional until the first payment, where payments are tracked and the
/// event has not opted out with `payment_no_provisional`.
pub struct UnpaidIsProvisional;

impl ProvisionalPolicy for UnpaidIsProvisional {
    fn is_provisional(
        &self,
        store: &RegStore,
        event: &EventRow,
        features: &FeatureSet,
        reg: &RegistrationRow,
    ) -> RegResult<bool> {
        if !features.payment() || reg.tot_iscr <= 0.0 || reg.tot_payed != 0.0 {
            return Ok(false);
        }
        Ok(!event_flag(store, event.id, "payment_no_provisional")?)
    }
}

pub struct RegistrationStatusEngine<'a> {
    ctx: EngineContext<'a>,
    policy: &'a dyn ProvisionalPolicy,
}

impl<'a> RegistrationStatusEngine<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self {
            ctx,
            policy: &UnpaidIsProvisional,
        }
    }

    pub fn with_policy(ctx: EngineContext<'a>, policy: &'a dyn ProvisionalPolicy) -> Self {
        Self { ctx, policy }
    }

    pub fn status(&self, run_id: RunId, member_id: MemberId) -> RegResult<StatusResult> {
        let store = self.ctx.store;
        let run = store
            .get_run(run_id)?
            .ok_or_else(|| RegError::not_found("run", run_id))?;
        let event = store
            .get_event(run.event_id)?
            .ok_or_else(|| RegError::not_found("event", run.event_id))?;
        let member = store
            .get_member(member_id)?
            .ok_or_else(|| RegError::not_found("member", member_id))?;
        let features = store.event_features(event.id)?;

        let registration = store
            .active_registrations_for_member(run_id, member_id)?
            .into_iter()
            .next();

        match registration {
            Some(reg) => self.registered(&run, &event, &member, &features, &reg),
            None => self.unregistered(&run, &event, &member, &features),
        }
    }

    // ── Registered ─────────────────────────────────────────────────

    fn registered(
        &self,
        run: &RunRow,
        event: &EventRow,
        member: &MemberRow,
        features: &FeatureSet,
        reg: &RegistrationRow,
    ) -> RegResult<StatusResult> {
        let store = self.ctx.store;
        let membership = store.get_or_create_membership(member.id, event.assoc_id)?;
        if membership.status == MembershipStatus::Revoked {
            return Err(RegError::MembershipRevoked {
                member_id: member.id,
                assoc_id: event.assoc_id,
            });
        }

        let tier = match reg.ticket_id {
            Some(id) => store.get_ticket(id)?.map(|t| t.tier),
            None => None,
        };
        let provisional = self.policy.is_provisional(store, event, features, reg)?;
        let base = if tier == Some(TicketTier::Waiting) {
            "Registration on waiting list"
        } else if provisional {
            "Provisional registration"
        } else {
            "Registration confirmed"
        };

        let next_step = self.next_step(run, event, member, features, reg, membership.status)?;

        let mut result = StatusResult::text(true, base);
        if next_step.is_none() && !provisional && tier == Some(TicketTier::Patron) {
            result.text.push_str(". Thank you for supporting the event!");
        }
        result.next_step = next_step;
        if let Some(step) = next_step {
            result.details.push(step.message());
        }
        result.can_pay = match next_step {
            Some(step) if step.blocks_payment() => false,
            _ => features.payment() && self.remaining(run.id, reg)? > 0.0,
        };

        let offer_links = next_step.is_none() && !provisional;
        self.character_details(run, event, member, features, reg, offer_links, &mut result)?;
        Ok(result)
    }

    fn next_step(
        &self,
        run: &RunRow,
        event: &EventRow,
        member: &MemberRow,
        features: &FeatureSet,
        reg: &RegistrationRow,
        status: MembershipStatus,
    ) -> RegResult<Option<NextStep>> {
        if features.membership() {
            if status.is_incomplete() {
                return Ok(Some(NextStep::CompleteApplication));
            }
            if status == MembershipStatus::Submitted {
                return Ok(Some(NextStep::AwaitingApproval));
            }
        }

        let invoices = self.ctx.store.invoices_for_registration(reg.id)?;
        if invoices.iter().any(|i| i.status == InvoiceStatus::Submitted) {
            return Ok(Some(NextStep::PaymentPending));
        }
        if reg.alert {
            let open_wire = invoices
                .iter()
                .any(|i| i.method == PAYMENT_METHOD_WIRE && i.status == InvoiceStatus::Created);
            return Ok(Some(if open_wire {
                NextStep::ConfirmWireTransfer
            } else {
                NextStep::Pay {
                    overdue: reg.deadline < 0,
                }
            }));
        }

        if features.membership()
            && status == MembershipStatus::Accepted
            && !features.laog()
            && run
                .start
                .is_some_and(|s| s.year() == self.ctx.clock.today().year())
            && !self.ctx.store.has_paid_membership_fee(
                member.id,
                event.assoc_id,
                self.ctx.clock.today().year(),
            )?
        {
            return Ok(Some(NextStep::PayMembershipFee));
        }

        if !member.profile_compiled {
            return Ok(Some(NextStep::CompleteProfile));
        }
        Ok(None)
    }

    /// Remaining balance from the accounting cache, or straight from the
    /// registration when the cache has no entry for it.
    fn remaining(&self, run_id: RunId, reg: &RegistrationRow) -> RegResult<f64> {
        let accounting = AccountingCache::new(self.ctx).get(run_id)?;
        Ok(match accounting.get(&reg.id) {
            Some(snapshot) => snapshot.remaining,
            None => remaining_balance(reg.tot_iscr, reg.tot_payed),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn character_details(
        &self,
        run: &RunRow,
        event: &EventRow,
        member: &MemberRow,
        features: &FeatureSet,
        reg: &RegistrationRow,
        offer_links: bool,
        result: &mut StatusResult,
    ) -> RegResult<()> {
        let store = self.ctx.store;
        let assigned = store.characters_for_registration(reg.id)?;

        if !assigned.is_empty() {
            let approval = event_flag(store, event.id, "user_character_approval")?;
            let names: Vec<String> = assigned
                .iter()
                .map(|c| {
                    if approval && c.status != CharacterStatus::Approved {
                        format!("{} ({})", c.name, c.status.label())
                    } else {
                        c.name.clone()
                    }
                })
                .collect();
            let line = if names.len() == 1 {
                format!("Your character is {}", names[0])
            } else {
                format!("Your characters are {}", names.join(", "))
            };
            result.details.push(line);
        }

        if !offer_links || !features.user_character() {
            return Ok(());
        }
        let max_characters = get_event_config(
            store,
            event.id,
            "user_character_max",
            self.ctx.config.default_max_characters,
        )?;
        if assigned.len() as i64 >= max_characters {
            return Ok(());
        }

        let base = format!("/{}/{}/character", event.slug, run.number);
        let unassigned =
            store.unassigned_characters_of_player(event.character_event_id(), member.id)?;
        result.links.push(if unassigned.is_empty() {
            StatusLink {
                label: "Create your character".into(),
                href: format!("{base}/create"),
            }
        } else {
            StatusLink {
                label: "Select your character".into(),
                href: format!("{base}/select"),
            }
        });
        Ok(())
    }

    // ── Not registered ─────────────────────────────────────────────

    /// Phase of the run, read before capacity.
    pub fn phase(
        &self,
        run: &RunRow,
        event: &EventRow,
        features: &FeatureSet,
    ) -> RegResult<RegistrationPhase> {
        if run.registration_closed {
            return Ok(RegistrationPhase::Closed);
        }
        let has_link = event.register_link.as_deref().is_some_and(|l| !l.is_empty());
        if features.register_link() && has_link {
            return Ok(RegistrationPhase::External);
        }
        if features.registration_open()
            && run
                .registration_open
                .map_or(true, |opens| opens > self.ctx.clock.now())
        {
            let pre = features.pre_register()
                && event_flag(self.ctx.store, event.id, "pre_register_active")?;
            return Ok(if pre {
                RegistrationPhase::Pre
            } else {
                RegistrationPhase::Future
            });
        }
        Ok(RegistrationPhase::Open)
    }

    fn unregistered(
        &self,
        run: &RunRow,
        event: &EventRow,
        member: &MemberRow,
        features: &FeatureSet,
    ) -> RegResult<StatusResult> {
        let phase = self.phase(run, event, features)?;
        let register_href = format!("/{}/{}/register", event.slug, run.number);

        let mut result = match phase {
            RegistrationPhase::Closed => StatusResult::text(false, "Registration closed"),
            RegistrationPhase::External => {
                let mut r = StatusResult::text(true, "Registration open");
                r.links.push(StatusLink {
                    label: "Register".into(),
                    href: event.register_link.clone().unwrap_or_default(),
                });
                r
            }
            RegistrationPhase::Pre => {
                if self.ctx.store.has_pre_registration(member.id, event.id)? {
                    StatusResult::text(true, "You are pre-registered")
                } else {
                    let mut r = StatusResult::text(true, "Pre-register now");
                    r.links.push(StatusLink {
                        label: "Pre-register".into(),
                        href: format!("/{}/pre-register", event.slug),
                    });
                    r
                }
            }
            RegistrationPhase::Future => {
                let mut r = StatusResult::text(false, "Registration not open yet");
                r.additional = run
                    .registration_open
                    .map(|at| format!("Registration opens on {}", at.format("%Y-%m-%d %H:%M")));
                r
            }
            RegistrationPhase::Open => {
                let counts = get_reg_counts(&self.ctx, run.id)?;
                let (availability, additional) = self.availability(event, features, &counts);
                let (open, text) = match availability {
                    Availability::Primary => (true, "Registration open"),
                    Availability::Filler => (true, "Registration open as filler"),
                    Availability::Waiting => (true, "Registration open on the waiting list"),
                    Availability::SoldOut => (false, "Sold out"),
                };
                let mut r = StatusResult::text(open, text);
                if open {
                    r.links.push(StatusLink {
                        label: "Register".into(),
                        href: register_href,
                    });
                }
                r.additional = additional;
                r.availability = Some(availability);
                r
            }
        };
        result.phase = Some(phase);
        Ok(result)
    }

    /// Pool with room, plus the urgency banner for the primary pool.
    pub fn availability(
        &self,
        event: &EventRow,
        features: &FeatureSet,
        counts: &RegCounts,
    ) -> (Availability, Option<String>) {
        if event.max_pg == 0 {
            return (Availability::Primary, None);
        }
        let remaining = event.max_pg - counts.count_player;
        if remaining > 0 {
            let urgency = &self.ctx.config.urgency;
            let ratio = remaining as f64 / event.max_pg as f64;
            let banner = (remaining < urgency.remaining_below || ratio < urgency.ratio_below)
                .then(|| format!("Hurry: only {remaining} tickets left!"));
            return (Availability::Primary, banner);
        }
        if features.filler() && (event.max_filler == 0 || counts.count_filler < event.max_filler) {
            return (Availability::Filler, None);
        }
        let waiting_left = event.max_waiting == 0 || counts.count_waiting < event.max_waiting;
        if features.waiting() && waiting_left {
            return (Availability::Waiting, None);
        }
        (Availability::SoldOut, None)
    }
}
