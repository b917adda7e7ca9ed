//! Accounting snapshot: the cached financial view of one registration.
//!
//! Snapshots are derived data: rebuilt from registrations and payments,
//! never edited in place. On the wire (cache payload) every amount is a
//! compact `%g` string and the payment split uses the historical
//! `pay_a`/`pay_b`/`pay_c` names for cash/credit/token.

use crate::types::RegistrationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingSnapshot {
    #[serde(with = "crate::money::compact")]
    pub tot_payed: f64,
    #[serde(with = "crate::money::compact")]
    pub tot_iscr: f64,
    #[serde(with = "crate::money::compact")]
    pub quota: f64,
    pub deadline: i64,
    #[serde(with = "crate::money::compact")]
    pub pay_what: f64,
    #[serde(with = "crate::money::compact")]
    pub surcharge: f64,
    #[serde(rename = "pay_a", with = "crate::money::compact")]
    pub pay_cash: f64,
    #[serde(
        rename = "pay_b",
        with = "crate::money::compact::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pay_credit: Option<f64>,
    #[serde(
        rename = "pay_c",
        with = "crate::money::compact::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pay_token: Option<f64>,
    #[serde(with = "crate::money::compact")]
    pub remaining: f64,
    /// Absent when the registration has no live ticket.
    #[serde(
        with = "crate::money::compact::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ticket_price: Option<f64>,
    #[serde(
        with = "crate::money::compact::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub options_price: Option<f64>,
}

impl AccountingSnapshot {
    /// Cash + credit + token, missing parts counting as zero.
    pub fn paid_total(&self) -> f64 {
        self.pay_cash + self.pay_credit.unwrap_or(0.0) + self.pay_token.unwrap_or(0.0)
    }
}

/// All snapshots of one run keyed by registration id.
pub type RunAccounting = BTreeMap<RegistrationId, AccountingSnapshot>;
