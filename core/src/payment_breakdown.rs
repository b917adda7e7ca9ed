//! Split of a registration's paid amount into cash, credit and token.
//!
//! Cash is whatever is left after subtracting every known non-cash
//! payment from the total. Nothing is clamped: inconsistent inputs can
//! produce negative cash, and callers are expected to notice.

use crate::{
    features::FeatureSet,
    store::PaymentKindTotal,
    types::{MemberId, PaymentKind},
};
use std::collections::HashMap;

/// Non-cash payment sums of one member in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberSpecialPayments {
    pub token_total: Option<f64>,
    pub credit_total: Option<f64>,
}

impl MemberSpecialPayments {
    pub fn total(&self) -> f64 {
        self.token_total.unwrap_or(0.0) + self.credit_total.unwrap_or(0.0)
    }
}

/// Per-member special payment sums for one run.
pub type PaymentTypeCache = HashMap<MemberId, MemberSpecialPayments>;

/// Fold store totals into the per-member cache.
pub fn build_payment_type_cache(totals: &[PaymentKindTotal]) -> PaymentTypeCache {
    let mut cache = PaymentTypeCache::new();
    for t in totals {
        let entry = cache.entry(t.member_id).or_default();
        match t.pay {
            PaymentKind::Token => *entry.token_total.get_or_insert(0.0) += t.total,
            PaymentKind::Credit => *entry.credit_total.get_or_insert(0.0) += t.total,
            PaymentKind::Money => {}
        }
    }
    cache
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentBreakdown {
    pub cash: f64,
    pub credit: Option<f64>,
    pub token: Option<f64>,
}

pub fn breakdown(
    features: &FeatureSet,
    member_id: MemberId,
    total_paid: f64,
    cache: &PaymentTypeCache,
) -> PaymentBreakdown {
    let mut out = PaymentBreakdown {
        cash: total_paid,
        credit: None,
        token: None,
    };
    if !features.special_payments() {
        return out;
    }
    let Some(member) = cache.get(&member_id) else {
        return out;
    };

    if features.tokens() {
        if let Some(token) = member.token_total {
            out.token = Some(token);
            out.cash -= token;
        }
    }
    if features.credits() {
        if let Some(credit) = member.credit_total {
            out.credit = Some(credit);
            out.cash -= credit;
        }
    }
    out
}
