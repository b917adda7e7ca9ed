//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Engines call store methods and never execute SQL directly.

use crate::{
    error::RegResult,
    types::{
        AssocId, CharacterId, CharacterStatus, EventId, InvoiceId, InvoiceStatus, MemberId,
        MembershipStatus, OptionId, OtherKind, PaymentKind, QuestionId, RegistrationId,
        RegistrationState, RunId, TicketId, TicketTier,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};

mod accounting;
mod association;
mod cache;
mod character;
mod form;
mod member;
mod notification;
mod registration;

pub use registration::{AttendanceRow, TierCount};

pub struct RegStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl RegStore {
    pub fn open(path: &str) -> RegResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RegResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> RegResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RegResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_registration.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_accounting.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_cache_and_notifications.sql"))?;
        Ok(())
    }

    /// Start a transaction on the store's connection.
    ///
    /// Every store call made before the returned guard is committed runs
    /// inside it; dropping the guard rolls everything back.
    pub fn begin(&self) -> RegResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Raw connection for tooling and fault-injection in tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ── Row types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationRow {
    pub id: AssocId,
    pub name: String,
    pub slug: String,
    pub main_mail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: EventId,
    pub assoc_id: AssocId,
    /// Campaign parent; characters of a campaign live on the parent event.
    pub parent_id: Option<EventId>,
    pub name: String,
    pub slug: String,
    pub max_pg: i64,
    pub max_filler: i64,
    pub max_waiting: i64,
    pub register_link: Option<String>,
}

impl EventRow {
    /// Event that owns the characters played in this event's runs.
    pub fn character_event_id(&self) -> EventId {
        self.parent_id.unwrap_or(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRow {
    pub id: RunId,
    pub event_id: EventId,
    pub number: i64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub registration_open: Option<DateTime<Utc>>,
    pub registration_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRow {
    pub id: MemberId,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub profile_compiled: bool,
}

impl MemberRow {
    pub fn display_name(&self) -> String {
        if self.surname.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.surname)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipRow {
    pub member_id: MemberId,
    pub assoc_id: AssocId,
    pub status: MembershipStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: TicketId,
    pub event_id: EventId,
    pub tier: TicketTier,
    pub name: String,
    pub price: f64,
}

/// A registration as persisted. `id` is ignored on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub id: RegistrationId,
    pub member_id: MemberId,
    pub run_id: RunId,
    pub ticket_id: Option<TicketId>,
    pub additionals: i64,
    pub pay_what: Option<f64>,
    pub surcharge: f64,
    pub tot_iscr: f64,
    pub tot_payed: f64,
    pub quota: f64,
    /// Days until (positive) or since (negative) the next installment is due.
    pub deadline: i64,
    pub alert: bool,
    pub redeem_code: Option<String>,
    pub created: DateTime<Utc>,
    pub state: RegistrationState,
}

impl RegistrationRow {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRow {
    pub id: QuestionId,
    pub event_id: EventId,
    pub typ: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRow {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceRow {
    pub id: i64,
    pub reg_id: RegistrationId,
    pub question_id: QuestionId,
    pub option_id: OptionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    pub id: i64,
    pub reg_id: RegistrationId,
    pub question_id: QuestionId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRow {
    pub id: CharacterId,
    pub event_id: EventId,
    pub number: i64,
    pub name: String,
    pub player_id: Option<MemberId>,
    pub status: CharacterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRelRow {
    pub id: i64,
    pub reg_id: RegistrationId,
    pub character_id: CharacterId,
    pub custom_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: i64,
    pub member_id: MemberId,
    pub reg_id: RegistrationId,
    pub assoc_id: AssocId,
    pub pay: PaymentKind,
    pub value: f64,
    pub hide: bool,
    pub inv_id: Option<InvoiceId>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherItemRow {
    pub id: i64,
    pub member_id: MemberId,
    pub run_id: Option<RunId>,
    pub assoc_id: AssocId,
    pub oth: OtherKind,
    pub value: f64,
    /// Set on refunds issued when a registration was cancelled.
    pub cancellation: bool,
    pub descr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRow {
    pub id: InvoiceId,
    pub member_id: MemberId,
    pub assoc_id: AssocId,
    pub method: String,
    pub typ: String,
    pub status: InvoiceStatus,
    pub gross: f64,
    pub trans: f64,
    pub cod: String,
    pub idx: Option<i64>,
    pub causal: String,
    pub created: DateTime<Utc>,
}

/// Sum of non-hidden special payments of one member in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentKindTotal {
    pub member_id: MemberId,
    pub pay: PaymentKind,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: i64,
    pub assoc_id: AssocId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub digest: bool,
    pub created: DateTime<Utc>,
}
