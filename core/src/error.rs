use crate::types::{AssocId, MemberId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache backend unavailable: {0}")]
    Cache(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Transfer rejected: {}", errors.join("; "))]
    TransferRejected { errors: Vec<String> },

    #[error("Ticket mapping points at ticket {ticket_id}, which does not belong to the target event")]
    InvalidTicketMapping { ticket_id: i64 },

    #[error("Membership of member {member_id} in association {assoc_id} is revoked")]
    MembershipRevoked { member_id: MemberId, assoc_id: AssocId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RegError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type RegResult<T> = Result<T, RegError>;
