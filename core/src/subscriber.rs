//! Event handler trait and the bus that dispatches to handlers.
//!
//! Handlers run in registration order, synchronously, inside the
//! publishing call. A failing handler is logged and skipped; later
//! handlers still see the event.

use crate::{context::EngineContext, error::RegResult, event::DomainEvent};

/// The contract every domain event subscriber fulfills.
pub trait DomainEventHandler: Send + Sync {
    /// Unique stable name for this handler.
    fn name(&self) -> &'static str;

    fn handle(&self, event: &DomainEvent, ctx: &EngineContext<'_>) -> RegResult<()>;
}

#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Box<dyn DomainEventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Box<dyn DomainEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Dispatch to every handler. Returns how many handlers failed.
    pub fn publish(&self, event: &DomainEvent, ctx: &EngineContext<'_>) -> usize {
        let mut failures = 0;
        for handler in &self.handlers {
            if let Err(e) = handler.handle(event, ctx) {
                failures += 1;
                log::warn!(
                    "handler {} failed on {}: {e}",
                    handler.name(),
                    event.kind()
                );
            }
        }
        log::debug!(
            "published {} to {} handlers ({failures} failed)",
            event.kind(),
            self.handlers.len()
        );
        failures
    }
}
