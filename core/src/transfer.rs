//! Registration transfer: copy (or move) a registration into another run.
//!
//! Matching, first hit wins:
//!   ticket    explicit mapping → same tier and name → same tier → none
//!   question  same type and name → same type (special types only) → same name
//!   option    same name within the matched question
//! Anything without a match is dropped. Characters follow only when both
//! runs share the character-owning event.
//!
//! Money never moves twice: copied payments and invoices are zeroed, the
//! new registration starts unpaid. Tokens and credits handed out for the
//! run (other items) keep their value; cancellation refunds stay behind.
//!
//! The copy and, with `move_registration`, the removal of the source
//! happen inside one store transaction.

use crate::{
    context::EngineContext,
    error::{RegError, RegResult},
    store::{
        CharacterRow, EventRow, InvoiceRow, OptionRow, OtherItemRow, PaymentRow, QuestionRow,
        RegistrationRow, RunRow, TicketRow,
    },
    types::{OtherKind, QuestionId, RegistrationId, RegistrationState, RunId, TicketId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Question types that stand for a registration field rather than free
/// form content; one of each per event, so the type alone identifies them.
pub const SPECIAL_QUESTION_TYPES: [&str; 5] =
    ["ticket", "additionals", "pay_what", "quota", "surcharge"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOptions {
    pub preserve_choices: bool,
    pub preserve_answers: bool,
    pub preserve_accounting: bool,
    /// Remove the source registration and its records after copying.
    pub move_registration: bool,
    /// Source ticket id → target ticket id, consulted before any matching.
    pub ticket_mapping: HashMap<TicketId, TicketId>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            preserve_choices: true,
            preserve_answers: true,
            preserve_accounting: true,
            move_registration: false,
            ticket_mapping: HashMap::new(),
        }
    }
}

/// What a transfer would carry over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferInfo {
    pub ticket_id: Option<TicketId>,
    pub ticket_name: Option<String>,
    pub choices: usize,
    pub answers: usize,
    pub characters: usize,
    pub payments: usize,
    pub invoices: usize,
    pub other_items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferValidation {
    /// Blocking problems; a transfer with any of these is refused.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: TransferInfo,
}

impl TransferValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

struct ChoiceCopy {
    question_id: QuestionId,
    option: OptionRow,
}

struct AnswerCopy {
    question_id: QuestionId,
    text: String,
}

/// Everything resolved up front; execution only writes.
struct TransferPlan {
    source: RegistrationRow,
    target_run: RunRow,
    ticket: Option<TicketRow>,
    choices: Vec<ChoiceCopy>,
    answers: Vec<AnswerCopy>,
    characters: Vec<(CharacterRow, Option<String>)>,
    payments: Vec<PaymentRow>,
    invoices: Vec<InvoiceRow>,
    other_items: Vec<OtherItemRow>,
}

impl TransferPlan {
    fn info(&self) -> TransferInfo {
        TransferInfo {
            ticket_id: self.ticket.as_ref().map(|t| t.id),
            ticket_name: self.ticket.as_ref().map(|t| t.name.clone()),
            choices: self.choices.len(),
            answers: self.answers.len(),
            characters: self.characters.len(),
            payments: self.payments.len(),
            invoices: self.invoices.len(),
            other_items: self.other_items.len(),
        }
    }

    /// Charge of the new registration. Without a ticket there is nothing
    /// to price the seat against, so it starts at zero.
    fn total_due(&self) -> f64 {
        let Some(ticket) = &self.ticket else {
            return 0.0;
        };
        let src = &self.source;
        let options: f64 = self.choices.iter().map(|c| c.option.price).sum();
        ticket.price * (1 + src.additionals) as f64
            + src.pay_what.unwrap_or(0.0)
            + src.surcharge
            + options
    }
}

pub struct RegistrationTransferEngine<'a> {
    ctx: EngineContext<'a>,
}

impl<'a> RegistrationTransferEngine<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Pre-flight check. Never writes.
    pub fn validate(
        &self,
        reg_id: RegistrationId,
        target_run_id: RunId,
        options: &TransferOptions,
    ) -> RegResult<TransferValidation> {
        let store = self.ctx.store;
        let source = self.load_registration(reg_id)?;
        let target_run = self.load_run(target_run_id)?;
        let source_run = self.load_run(source.run_id)?;
        let source_event = self.load_event(source_run.event_id)?;
        let target_event = self.load_event(target_run.event_id)?;

        let mut v = TransferValidation::default();

        if !source.is_active() {
            v.errors.push(format!("Registration {reg_id} is cancelled"));
        }
        if target_run.id == source.run_id {
            v.errors
                .push("Target run is the registration's current run".to_string());
        }
        if source_event.assoc_id != target_event.assoc_id {
            v.errors
                .push("Target run belongs to a different association".to_string());
        }
        if store.has_other_active_registration(source.member_id, target_run.id, None)? {
            v.errors.push(format!(
                "Member {} already has an active registration in the target run",
                source.member_id
            ));
        }

        let plan = match self.plan(source, target_run, &target_event, options) {
            Ok(plan) => plan,
            Err(RegError::InvalidTicketMapping { ticket_id }) => {
                v.errors.push(format!(
                    "Ticket mapping points at ticket {ticket_id}, which is not a ticket of the target event"
                ));
                return Ok(v);
            }
            Err(e) => return Err(e),
        };

        if plan.source.ticket_id.is_some() && plan.ticket.is_none() {
            v.warnings.push(
                "No matching ticket in the target run; the total due will reset to 0".to_string(),
            );
        }
        if options.preserve_choices {
            let dropped = store.choices_for_registration(reg_id)?.len() - plan.choices.len();
            if dropped > 0 {
                v.warnings
                    .push(format!("{dropped} choices have no match and will be dropped"));
            }
        }
        if options.preserve_answers {
            let dropped = store.answers_for_registration(reg_id)?.len() - plan.answers.len();
            if dropped > 0 {
                v.warnings
                    .push(format!("{dropped} answers have no match and will be dropped"));
            }
        }
        for c in store.characters_for_registration(reg_id)? {
            if c.event_id != target_event.character_event_id() {
                v.warnings.push(format!(
                    "Character {} belongs to another event and will not be transferred",
                    c.name
                ));
            }
        }

        v.info = plan.info();
        Ok(v)
    }

    /// Copy, or move, the registration into the target run.
    /// Returns the new registration.
    pub fn transfer(
        &self,
        reg_id: RegistrationId,
        target_run_id: RunId,
        options: &TransferOptions,
    ) -> RegResult<RegistrationRow> {
        let source = self.load_registration(reg_id)?;
        let target_run = self.load_run(target_run_id)?;
        let target_event = self.load_event(target_run.event_id)?;
        // Raises `InvalidTicketMapping` before any other check.
        let plan = self.plan(source, target_run, &target_event, options)?;

        let validation = self.validate(reg_id, target_run_id, options)?;
        if !validation.is_ok() {
            return Err(RegError::TransferRejected {
                errors: validation.errors,
            });
        }
        for w in &validation.warnings {
            log::warn!("transfer of registration {reg_id}: {w}");
        }

        let tx = self.ctx.store.begin()?;
        let created = self.execute(&plan, options)?;
        tx.commit()?;

        log::info!(
            "{} registration {} of member {} from run {} to run {} as {}",
            if options.move_registration { "moved" } else { "copied" },
            plan.source.id,
            plan.source.member_id,
            plan.source.run_id,
            plan.target_run.id,
            created.id
        );
        Ok(created)
    }

    // ── Planning ───────────────────────────────────────────────────

    fn plan(
        &self,
        source: RegistrationRow,
        target_run: RunRow,
        target_event: &EventRow,
        options: &TransferOptions,
    ) -> RegResult<TransferPlan> {
        let store = self.ctx.store;
        let ticket = self.resolve_ticket(&source, target_event, options)?;
        let target_questions = store.questions_for_event(target_event.id)?;

        let mut choices = Vec::new();
        if options.preserve_choices {
            for choice in store.choices_for_registration(source.id)? {
                let (Some(question), Some(option)) = (
                    store.get_question(choice.question_id)?,
                    store.get_option(choice.option_id)?,
                ) else {
                    continue;
                };
                let Some(target_q) = match_question(&question, &target_questions) else {
                    continue;
                };
                if let Some(target_opt) = store
                    .options_for_question(target_q.id)?
                    .into_iter()
                    .find(|o| o.name == option.name)
                {
                    choices.push(ChoiceCopy {
                        question_id: target_q.id,
                        option: target_opt,
                    });
                }
            }
        }

        let mut answers = Vec::new();
        if options.preserve_answers {
            for answer in store.answers_for_registration(source.id)? {
                let Some(question) = store.get_question(answer.question_id)? else {
                    continue;
                };
                if let Some(target_q) = match_question(&question, &target_questions) {
                    answers.push(AnswerCopy {
                        question_id: target_q.id,
                        text: answer.text,
                    });
                }
            }
        }

        let owning_event = target_event.character_event_id();
        let mut characters = Vec::new();
        for rel in store.character_rels_for_registration(source.id)? {
            if let Some(c) = store.get_character(rel.character_id)? {
                if c.event_id == owning_event {
                    characters.push((c, rel.custom_name));
                }
            }
        }

        let (payments, invoices, other_items) = if options.preserve_accounting {
            let other_items = store
                .other_items_for_member(source.run_id, source.member_id)?
                .into_iter()
                .filter(|o| !(o.oth == OtherKind::Refund && o.cancellation))
                .collect();
            (
                store.payments_for_registration(source.id)?,
                store.invoices_for_registration(source.id)?,
                other_items,
            )
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        Ok(TransferPlan {
            source,
            target_run,
            ticket,
            choices,
            answers,
            characters,
            payments,
            invoices,
            other_items,
        })
    }

    fn resolve_ticket(
        &self,
        source: &RegistrationRow,
        target_event: &EventRow,
        options: &TransferOptions,
    ) -> RegResult<Option<TicketRow>> {
        let store = self.ctx.store;
        let Some(source_ticket_id) = source.ticket_id else {
            return Ok(None);
        };

        if let Some(&mapped) = options.ticket_mapping.get(&source_ticket_id) {
            return match store.get_ticket(mapped)? {
                Some(t) if t.event_id == target_event.id => Ok(Some(t)),
                _ => Err(RegError::InvalidTicketMapping { ticket_id: mapped }),
            };
        }

        // A soft-deleted source ticket reads as no ticket.
        let Some(source_ticket) = store.get_ticket(source_ticket_id)? else {
            return Ok(None);
        };
        let candidates = store.tickets_for_event(target_event.id)?;
        if let Some(exact) = candidates
            .iter()
            .find(|t| t.tier == source_ticket.tier && t.name == source_ticket.name)
        {
            return Ok(Some(exact.clone()));
        }
        Ok(candidates.into_iter().find(|t| t.tier == source_ticket.tier))
    }

    // ── Execution (inside the transaction) ─────────────────────────

    fn execute(
        &self,
        plan: &TransferPlan,
        options: &TransferOptions,
    ) -> RegResult<RegistrationRow> {
        let store = self.ctx.store;
        let src = &plan.source;
        let now = self.ctx.clock.now();

        let mut created = RegistrationRow {
            id: 0,
            member_id: src.member_id,
            run_id: plan.target_run.id,
            ticket_id: plan.ticket.as_ref().map(|t| t.id),
            additionals: src.additionals,
            pay_what: src.pay_what,
            surcharge: src.surcharge,
            tot_iscr: plan.total_due(),
            tot_payed: 0.0,
            quota: 0.0,
            deadline: 0,
            alert: false,
            redeem_code: None,
            created: now,
            state: RegistrationState::Active,
        };
        created.id = store.insert_registration(&created)?;

        for c in &plan.choices {
            store.insert_choice(created.id, c.question_id, c.option.id)?;
        }
        for a in &plan.answers {
            store.insert_answer(created.id, a.question_id, &a.text)?;
        }
        for (character, custom_name) in &plan.characters {
            store.insert_character_rel(created.id, character.id, custom_name.as_deref())?;
        }

        let mut invoice_ids = HashMap::new();
        for inv in &plan.invoices {
            let copy = InvoiceRow {
                gross: 0.0,
                trans: 0.0,
                cod: uuid::Uuid::new_v4().simple().to_string(),
                idx: Some(created.id),
                created: now,
                ..inv.clone()
            };
            invoice_ids.insert(inv.id, store.insert_invoice(&copy)?);
        }
        for p in &plan.payments {
            store.insert_payment(&PaymentRow {
                reg_id: created.id,
                value: 0.0,
                inv_id: p.inv_id.and_then(|old| invoice_ids.get(&old).copied()),
                created: now,
                ..p.clone()
            })?;
        }
        for o in &plan.other_items {
            store.insert_other_item(&OtherItemRow {
                run_id: Some(plan.target_run.id),
                ..o.clone()
            })?;
        }

        if options.move_registration {
            store.delete_choices_for_registration(src.id)?;
            store.delete_answers_for_registration(src.id)?;
            store.delete_character_rels_for_registration(src.id)?;
            store.delete_payments_for_registration(src.id)?;
            for inv in store.invoices_for_registration(src.id)? {
                store.delete_invoice(inv.id)?;
            }
            for o in &plan.other_items {
                store.delete_other_item(o.id)?;
            }
            store.delete_registration(src.id)?;
        }
        Ok(created)
    }

    // ── Lookups ────────────────────────────────────────────────────

    fn load_registration(&self, reg_id: RegistrationId) -> RegResult<RegistrationRow> {
        self.ctx
            .store
            .get_registration(reg_id)?
            .ok_or_else(|| RegError::not_found("registration", reg_id))
    }

    fn load_run(&self, run_id: RunId) -> RegResult<RunRow> {
        self.ctx
            .store
            .get_run(run_id)?
            .ok_or_else(|| RegError::not_found("run", run_id))
    }

    fn load_event(&self, event_id: i64) -> RegResult<EventRow> {
        self.ctx
            .store
            .get_event(event_id)?
            .ok_or_else(|| RegError::not_found("event", event_id))
    }
}

/// Target question for a source question, or `None` to drop it.
fn match_question<'q>(source: &QuestionRow, targets: &'q [QuestionRow]) -> Option<&'q QuestionRow> {
    targets
        .iter()
        .find(|q| q.typ == source.typ && q.name == source.name)
        .or_else(|| {
            if SPECIAL_QUESTION_TYPES.contains(&source.typ.as_str()) {
                targets.iter().find(|q| q.typ == source.typ)
            } else {
                None
            }
        })
        .or_else(|| targets.iter().find(|q| q.name == source.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: QuestionId, typ: &str, name: &str) -> QuestionRow {
        QuestionRow {
            id,
            event_id: 1,
            typ: typ.into(),
            name: name.into(),
        }
    }

    #[test]
    fn exact_match_beats_type_and_name_fallbacks() {
        let targets = vec![
            question(1, "text", "Diet"),
            question(2, "single", "Diet"),
            question(3, "single", "Room"),
        ];
        let src = question(10, "single", "Diet");
        assert_eq!(match_question(&src, &targets).map(|q| q.id), Some(2));
    }

    #[test]
    fn special_types_match_on_type_alone() {
        let targets = vec![question(1, "pay_what", "Support us"), question(2, "text", "Notes")];
        let src = question(10, "pay_what", "Donation");
        assert_eq!(match_question(&src, &targets).map(|q| q.id), Some(1));
    }

    #[test]
    fn ordinary_types_fall_back_to_name_only() {
        let targets = vec![question(1, "multiple", "Diet"), question(2, "single", "Room")];
        assert_eq!(
            match_question(&question(10, "single", "Diet"), &targets).map(|q| q.id),
            Some(1)
        );
        assert!(match_question(&question(11, "single", "Transport"), &targets).is_none());
    }
}
