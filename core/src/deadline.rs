//! Deadline evaluator: sorts the active registrations of a run into the
//! buckets organisers chase: payment, membership, fee, profile, casting.
//!
//! Per concern a member lands in at most one bucket. The `_del` buckets
//! are the escalated variant: the tolerance window has run out.
//!
//! Inputs read once per run:
//!   - association config `deadline_tolerance` (days)
//!   - event config `casting_characters` (characters needed to be cast)

use crate::{
    context::EngineContext,
    error::{RegError, RegResult},
    features::FeatureSet,
    settings::{get_association_config, get_event_config},
    store::{EventRow, MemberRow, RegistrationRow, RunRow},
    types::{MembershipStatus, MemberId, RegistrationId, RunId, TicketId, TicketTier},
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Who to remind: display name and email.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

impl From<&MemberRow> for Recipient {
    fn from(m: &MemberRow) -> Self {
        Self {
            name: m.display_name(),
            email: m.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadlineReport {
    pub run: RunId,
    pub pay: BTreeSet<Recipient>,
    pub pay_del: BTreeSet<Recipient>,
    pub memb: BTreeSet<Recipient>,
    pub memb_del: BTreeSet<Recipient>,
    pub fee: BTreeSet<Recipient>,
    pub fee_del: BTreeSet<Recipient>,
    pub profile: BTreeSet<Recipient>,
    pub profile_del: BTreeSet<Recipient>,
    pub cast: BTreeSet<Recipient>,
}

impl DeadlineReport {
    pub fn new(run: RunId) -> Self {
        Self {
            run,
            ..Self::default()
        }
    }

    /// Buckets in a fixed order, with their names.
    pub fn buckets(&self) -> [(&'static str, &BTreeSet<Recipient>); 9] {
        [
            ("pay", &self.pay),
            ("pay_del", &self.pay_del),
            ("memb", &self.memb),
            ("memb_del", &self.memb_del),
            ("fee", &self.fee),
            ("fee_del", &self.fee_del),
            ("profile", &self.profile),
            ("profile_del", &self.profile_del),
            ("cast", &self.cast),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.buckets().iter().all(|(_, set)| set.is_empty())
    }
}

/// Where a member stands on one concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Due,
    Overdue,
}

/// Payment bucket from the signed day count. `None` while not yet due.
pub fn payment_urgency(deadline: i64, tolerance_days: i64) -> Option<Urgency> {
    if deadline < tolerance_days.saturating_neg() {
        Some(Urgency::Overdue)
    } else if deadline < 0 {
        Some(Urgency::Due)
    } else {
        None
    }
}

/// Overdue once the tolerance window reaches past the run start.
///
/// A window beyond the calendar range reaches past any start when it
/// points forward.
fn start_urgency(today: NaiveDate, tolerance_days: i64, start: Option<NaiveDate>) -> Urgency {
    let Some(start) = start else {
        return Urgency::Due;
    };
    let horizon = Duration::try_days(tolerance_days).and_then(|d| today.checked_add_signed(d));
    match horizon {
        Some(horizon) if horizon > start => Urgency::Overdue,
        Some(_) => Urgency::Due,
        None if tolerance_days > 0 => Urgency::Overdue,
        None => Urgency::Due,
    }
}

/// Per-run values shared by every registration of the run.
struct RunScope {
    run: RunRow,
    event: EventRow,
    features: FeatureSet,
    tolerance_days: i64,
    casting_required: i64,
    ticket_tiers: HashMap<TicketId, TicketTier>,
    character_counts: HashMap<RegistrationId, i64>,
    casting_submitted: HashSet<MemberId>,
}

pub struct DeadlineEvaluator<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> DeadlineEvaluator<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// One report per run, in input order.
    pub fn check_runs(&self, runs: &[RunId]) -> RegResult<Vec<DeadlineReport>> {
        runs.iter().map(|&run_id| self.check_run(run_id)).collect()
    }

    pub fn check_run(&self, run_id: RunId) -> RegResult<DeadlineReport> {
        let scope = self.load_scope(run_id)?;
        let today = self.ctx.clock.today();
        let mut report = DeadlineReport::new(run_id);

        for reg in self.ctx.store.active_registrations_for_run(run_id)? {
            let tier = reg.ticket_id.and_then(|t| scope.ticket_tiers.get(&t).copied());
            if tier == Some(TicketTier::Waiting) {
                continue;
            }
            let Some(member) = self.ctx.store.get_member(reg.member_id)? else {
                log::warn!("registration {} points at missing member {}", reg.id, reg.member_id);
                continue;
            };
            let who = Recipient::from(&member);

            if scope.features.membership() {
                self.classify_membership(&scope, &reg, today, &who, &mut report)?;
            } else if !member.profile_compiled {
                match start_urgency(today, scope.tolerance_days, scope.run.start) {
                    Urgency::Overdue => report.profile_del.insert(who.clone()),
                    Urgency::Due => report.profile.insert(who.clone()),
                };
            }

            if scope.features.payment() {
                match payment_urgency(reg.deadline, scope.tolerance_days) {
                    Some(Urgency::Overdue) => {
                        report.pay_del.insert(who.clone());
                    }
                    Some(Urgency::Due) => {
                        report.pay.insert(who.clone());
                    }
                    None => {}
                }
            }

            if scope.features.casting() && tier.map_or(true, |t| t.is_player()) {
                let assigned = scope.character_counts.get(&reg.id).copied().unwrap_or(0);
                let cast = assigned >= scope.casting_required
                    || scope.casting_submitted.contains(&reg.member_id);
                if !cast {
                    report.cast.insert(who);
                }
            }
        }

        log::debug!(
            "deadlines for run {run_id}: pay={} pay_del={} memb={} memb_del={} cast={}",
            report.pay.len(),
            report.pay_del.len(),
            report.memb.len(),
            report.memb_del.len(),
            report.cast.len()
        );
        Ok(report)
    }

    fn classify_membership(
        &self,
        scope: &RunScope,
        reg: &RegistrationRow,
        today: NaiveDate,
        who: &Recipient,
        report: &mut DeadlineReport,
    ) -> RegResult<()> {
        let assoc_id = scope.event.assoc_id;
        let status = self
            .ctx
            .store
            .get_membership(reg.member_id, assoc_id)?
            .map_or(MembershipStatus::Empty, |m| m.status);

        if status.is_incomplete() {
            let waited = (today - reg.created.date_naive()).num_days();
            if waited > scope.tolerance_days {
                report.memb_del.insert(who.clone());
            } else {
                report.memb.insert(who.clone());
            }
            return Ok(());
        }
        if status != MembershipStatus::Accepted || scope.features.laog() {
            return Ok(());
        }

        let Some(start) = scope.run.start else {
            return Ok(());
        };
        if start.year() != today.year() {
            return Ok(());
        }
        if self
            .ctx
            .store
            .has_paid_membership_fee(reg.member_id, assoc_id, today.year())?
        {
            return Ok(());
        }
        match start_urgency(today, scope.tolerance_days, Some(start)) {
            Urgency::Overdue => report.fee_del.insert(who.clone()),
            Urgency::Due => report.fee.insert(who.clone()),
        };
        Ok(())
    }

    fn load_scope(&self, run_id: RunId) -> RegResult<RunScope> {
        let store = self.ctx.store;
        let run = store
            .get_run(run_id)?
            .ok_or_else(|| RegError::not_found("run", run_id))?;
        let event = store
            .get_event(run.event_id)?
            .ok_or_else(|| RegError::not_found("event", run.event_id))?;
        let features = store.event_features(event.id)?;

        let tolerance_days = get_association_config(
            store,
            event.assoc_id,
            "deadline_tolerance",
            self.ctx.config.default_tolerance_days,
        )?;
        let casting_required = get_event_config(
            store,
            event.id,
            "casting_characters",
            self.ctx.config.default_casting_characters,
        )?;

        let ticket_tiers = store
            .tickets_for_event(event.id)?
            .into_iter()
            .map(|t| (t.id, t.tier))
            .collect();

        let (character_counts, casting_submitted) = if features.casting() {
            (
                store.character_counts_for_run(run_id)?,
                store.casting_members_for_run(run_id)?,
            )
        } else {
            (HashMap::new(), HashSet::new())
        };

        Ok(RunScope {
            run,
            event,
            features,
            tolerance_days,
            casting_required,
            ticket_tiers,
            character_counts,
            casting_submitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_buckets_follow_tolerance() {
        assert_eq!(payment_urgency(-40, 30), Some(Urgency::Overdue));
        assert_eq!(payment_urgency(-30, 30), Some(Urgency::Due));
        assert_eq!(payment_urgency(-1, 30), Some(Urgency::Due));
        assert_eq!(payment_urgency(0, 30), None);
        assert_eq!(payment_urgency(12, 30), None);
    }

    #[test]
    fn start_window_escalates_inside_tolerance() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let near = NaiveDate::from_ymd_opt(2026, 5, 20);
        let far = NaiveDate::from_ymd_opt(2026, 9, 1);
        assert_eq!(start_urgency(today, 30, near), Urgency::Overdue);
        assert_eq!(start_urgency(today, 30, far), Urgency::Due);
        assert_eq!(start_urgency(today, 30, None), Urgency::Due);
    }

    #[test]
    fn out_of_range_tolerance_does_not_overflow() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let far = NaiveDate::from_ymd_opt(2026, 9, 1);
        assert_eq!(start_urgency(today, 100_000_000_000, far), Urgency::Overdue);
        assert_eq!(start_urgency(today, i64::MAX, far), Urgency::Overdue);
        assert_eq!(start_urgency(today, i64::MIN, far), Urgency::Due);
        assert_eq!(payment_urgency(-1, i64::MIN), Some(Urgency::Overdue));
        assert_eq!(payment_urgency(-1, i64::MAX), Some(Urgency::Due));
    }
}
