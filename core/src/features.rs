//! Feature flags of an event, merged with those of its association.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TOKENS: &str = "tokens";
pub const CREDITS: &str = "credits";
pub const MEMBERSHIP: &str = "membership";
pub const LAOG: &str = "laog";
pub const PAYMENT: &str = "payment";
pub const CASTING: &str = "casting";
pub const USER_CHARACTER: &str = "user_character";
pub const REGISTER_LINK: &str = "register_link";
pub const REGISTRATION_OPEN: &str = "registration_open";
pub const PRE_REGISTER: &str = "pre_register";
pub const FILLER: &str = "filler";
pub const WAITING: &str = "waiting";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<String>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, slug: &str) -> bool {
        self.0.contains(slug)
    }

    pub fn insert(&mut self, slug: impl Into<String>) {
        self.0.insert(slug.into());
    }

    pub fn extend<I, S>(&mut self, slugs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(slugs.into_iter().map(Into::into));
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn tokens(&self) -> bool { self.has(TOKENS) }
    pub fn credits(&self) -> bool { self.has(CREDITS) }
    pub fn membership(&self) -> bool { self.has(MEMBERSHIP) }
    pub fn laog(&self) -> bool { self.has(LAOG) }
    pub fn payment(&self) -> bool { self.has(PAYMENT) }
    pub fn casting(&self) -> bool { self.has(CASTING) }
    pub fn user_character(&self) -> bool { self.has(USER_CHARACTER) }
    pub fn register_link(&self) -> bool { self.has(REGISTER_LINK) }
    pub fn registration_open(&self) -> bool { self.has(REGISTRATION_OPEN) }
    pub fn pre_register(&self) -> bool { self.has(PRE_REGISTER) }
    pub fn filler(&self) -> bool { self.has(FILLER) }
    pub fn waiting(&self) -> bool { self.has(WAITING) }

    /// Tokens or credits on: payments must be split by kind.
    pub fn special_payments(&self) -> bool {
        self.tokens() || self.credits()
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
