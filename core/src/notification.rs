//! Organiser digests of deadline reports.
//!
//! Mail rendering and delivery happen elsewhere; this module only builds
//! the plain-text message and hands it to a `NotificationQueue`.

use crate::{
    clock::Clock,
    context::EngineContext,
    deadline::DeadlineReport,
    error::{RegError, RegResult},
    settings::association_flag,
    store::{NotificationRow, RegStore},
    types::AssocId,
};
use std::fmt::Write as _;

/// A message waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub assoc_id: AssocId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Bundle into the association's periodic digest instead of sending now.
    pub digest: bool,
}

pub trait NotificationQueue {
    fn enqueue(&self, mail: &OutgoingMail) -> RegResult<()>;
}

/// Writes to the `notification_queue` table.
pub struct StoreNotificationQueue<'a> {
    store: &'a RegStore,
    clock: &'a dyn Clock,
}

impl<'a> StoreNotificationQueue<'a> {
    pub fn new(store: &'a RegStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }
}

impl NotificationQueue for StoreNotificationQueue<'_> {
    fn enqueue(&self, mail: &OutgoingMail) -> RegResult<()> {
        self.store.insert_notification(&NotificationRow {
            id: 0,
            assoc_id: mail.assoc_id,
            recipient: mail.recipient.clone(),
            subject: mail.subject.clone(),
            body: mail.body.clone(),
            digest: mail.digest,
            created: self.clock.now(),
        })?;
        Ok(())
    }
}

fn bucket_title(bucket: &str) -> &'static str {
    match bucket {
        "pay" => "Payment overdue",
        "pay_del" => "Payment overdue beyond tolerance",
        "memb" => "Membership application missing",
        "memb_del" => "Membership application missing beyond tolerance",
        "fee" => "Membership fee unpaid",
        "fee_del" => "Membership fee unpaid close to the event",
        "profile" => "Profile incomplete",
        "profile_del" => "Profile incomplete close to the event",
        "cast" => "Casting preferences missing",
        _ => "Other",
    }
}

/// Queue one organiser message per run with something to report.
/// Returns how many messages were queued.
pub fn queue_deadline_notifications(
    ctx: &EngineContext<'_>,
    queue: &dyn NotificationQueue,
    reports: &[DeadlineReport],
) -> RegResult<usize> {
    let mut queued = 0;
    for report in reports.iter().filter(|r| !r.is_empty()) {
        let run = ctx
            .store
            .get_run(report.run)?
            .ok_or_else(|| RegError::not_found("run", report.run))?;
        let event = ctx
            .store
            .get_event(run.event_id)?
            .ok_or_else(|| RegError::not_found("event", run.event_id))?;
        let assoc = ctx
            .store
            .get_association(event.assoc_id)?
            .ok_or_else(|| RegError::not_found("association", event.assoc_id))?;

        let Some(recipient) = assoc.main_mail.filter(|m| !m.trim().is_empty()) else {
            log::warn!(
                "association {} has no main mail, skipping deadline digest for run {}",
                assoc.id,
                run.id
            );
            continue;
        };

        let mut body = String::new();
        for (bucket, people) in report.buckets() {
            if people.is_empty() {
                continue;
            }
            let _ = writeln!(body, "{} ({}):", bucket_title(bucket), people.len());
            for p in people {
                let _ = writeln!(body, "  - {} <{}>", p.name, p.email);
            }
            body.push('\n');
        }

        queue.enqueue(&OutgoingMail {
            assoc_id: assoc.id,
            recipient,
            subject: format!("Deadlines - {} #{}", event.name, run.number),
            body,
            digest: association_flag(ctx.store, assoc.id, "mail_digest")?,
        })?;
        queued += 1;
    }
    log::info!("queued {queued} deadline notifications for {} runs", reports.len());
    Ok(queued)
}
