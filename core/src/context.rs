//! Borrowed view of the collaborators every component works against.

use crate::{cache::CacheStore, clock::Clock, config::EngineConfig, store::RegStore};

#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub store: &'a RegStore,
    pub cache: &'a dyn CacheStore,
    pub clock: &'a dyn Clock,
    pub config: &'a EngineConfig,
}
