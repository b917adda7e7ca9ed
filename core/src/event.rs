//! Domain events: how writes tell derived data to go stale.
//!
//! RULE: Code that mutates registrations, payments, characters, runs or
//! events publishes the matching event after the write commits.
//! Caches subscribe; nothing relies on a framework-global signal registry.

use crate::types::{AssocId, CharacterId, EventId, MemberId, RunId};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    RegistrationSaved {
        run_id: RunId,
        member_id: MemberId,
    },
    PaymentSaved {
        run_id: RunId,
        member_id: MemberId,
    },
    CharacterSaved {
        event_id: EventId,
        character_id: CharacterId,
    },
    RunSaved {
        run_id: RunId,
    },
    EventSaved {
        event_id: EventId,
    },
    MembershipSaved {
        assoc_id: AssocId,
        member_id: MemberId,
    },
    RegistrationTransferred {
        from_run: RunId,
        to_run: RunId,
        member_id: MemberId,
    },
}

impl DomainEvent {
    /// Stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegistrationSaved { .. }       => "registration_saved",
            Self::PaymentSaved { .. }            => "payment_saved",
            Self::CharacterSaved { .. }          => "character_saved",
            Self::RunSaved { .. }                => "run_saved",
            Self::EventSaved { .. }              => "event_saved",
            Self::MembershipSaved { .. }         => "membership_saved",
            Self::RegistrationTransferred { .. } => "registration_transferred",
        }
    }
}
