//! Shared primitive types used across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AssocId = i64;
pub type EventId = i64;
pub type RunId = i64;
pub type MemberId = i64;
pub type RegistrationId = i64;
pub type TicketId = i64;
pub type QuestionId = i64;
pub type OptionId = i64;
pub type CharacterId = i64;
pub type InvoiceId = i64;

/// Soft-delete state of a registration.
///
/// The store maps the nullable `cancellation_date` column onto this enum;
/// nothing above the store checks the raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RegistrationState {
    Active,
    Cancelled { at: DateTime<Utc> },
}

impl RegistrationState {
    pub fn from_cancellation(at: Option<DateTime<Utc>>) -> Self {
        match at {
            Some(at) => Self::Cancelled { at },
            None => Self::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Cancelled { at } => Some(*at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Empty,
    Joined,
    Uploaded,
    Submitted,
    Accepted,
    Revoked,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty     => "empty",
            Self::Joined    => "joined",
            Self::Uploaded  => "uploaded",
            Self::Submitted => "submitted",
            Self::Accepted  => "accepted",
            Self::Revoked   => "revoked",
        }
    }

    /// Unknown values read back as `Empty` so a bad row never blocks a member.
    pub fn parse(s: &str) -> Self {
        match s {
            "joined"    => Self::Joined,
            "uploaded"  => Self::Uploaded,
            "submitted" => Self::Submitted,
            "accepted"  => Self::Accepted,
            "revoked"   => Self::Revoked,
            _           => Self::Empty,
        }
    }

    /// Application not yet handed in.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Empty | Self::Joined | Self::Uploaded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketTier {
    Standard,
    NewPlayer,
    Lottery,
    Reduced,
    Patron,
    Filler,
    Waiting,
    Staff,
    Npc,
    Collaborator,
    Seller,
}

impl TicketTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard     => "standard",
            Self::NewPlayer    => "new_player",
            Self::Lottery      => "lottery",
            Self::Reduced      => "reduced",
            Self::Patron       => "patron",
            Self::Filler       => "filler",
            Self::Waiting      => "waiting",
            Self::Staff        => "staff",
            Self::Npc          => "npc",
            Self::Collaborator => "collaborator",
            Self::Seller       => "seller",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "standard"     => Self::Standard,
            "new_player"   => Self::NewPlayer,
            "lottery"      => Self::Lottery,
            "reduced"      => Self::Reduced,
            "patron"       => Self::Patron,
            "filler"       => Self::Filler,
            "waiting"      => Self::Waiting,
            "staff"        => Self::Staff,
            "npc"          => Self::Npc,
            "collaborator" => Self::Collaborator,
            "seller"       => Self::Seller,
            _              => return None,
        })
    }

    /// Tiers that count against the event's player capacity.
    pub fn is_player(&self) -> bool {
        matches!(
            self,
            Self::Standard | Self::NewPlayer | Self::Lottery | Self::Reduced | Self::Patron
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterStatus {
    Creation,
    Proposed,
    Review,
    Approved,
}

impl CharacterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Proposed => "proposed",
            Self::Review   => "review",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "proposed" => Self::Proposed,
            "review"   => Self::Review,
            "approved" => Self::Approved,
            _          => Self::Creation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Creation => "Creation",
            Self::Proposed => "Proposed",
            Self::Review   => "Revision",
            Self::Approved => "Approved",
        }
    }
}

/// Kind of a payment item. Cash covers every real-money method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Money,
    Credit,
    Token,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Money  => "money",
            Self::Credit => "credit",
            Self::Token  => "token",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "credit" => Self::Credit,
            "token"  => Self::Token,
            _        => Self::Money,
        }
    }
}

/// Kind of a non-payment accounting item (credits and tokens handed out,
/// refunds issued on cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherKind {
    Credit,
    Token,
    Refund,
}

impl OtherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Token  => "token",
            Self::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "token"  => Self::Token,
            "refund" => Self::Refund,
            _        => Self::Credit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Created,
    Submitted,
    Confirmed,
    Checked,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created   => "created",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Checked   => "checked",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "submitted" => Self::Submitted,
            "confirmed" => Self::Confirmed,
            "checked"   => Self::Checked,
            _           => Self::Created,
        }
    }
}

/// Invoice `typ` for registration payments; `idx` then holds the registration id.
pub const INVOICE_TYPE_REGISTRATION: &str = "registration";

/// Payment method code of bank wire transfers.
pub const PAYMENT_METHOD_WIRE: &str = "wire";
