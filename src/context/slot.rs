use tracing::debug;

use super::ActionContext;
use crate::error::NoContextError;

/// Holder for the request context of one execution unit.
///
/// Each execution unit (one connection coroutine in the shipped transport)
/// owns exactly one slot, so a bound context is never visible to another
/// concurrent request.
#[derive(Debug, Default)]
pub struct ContextSlot {
    current: Option<ActionContext>,
    teardowns: u64,
}

impl ContextSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `ctx` as the current context, replacing any stale one.
    pub fn begin_request(&mut self, ctx: ActionContext) -> &mut ActionContext {
        if let Some(stale) = self.current.take() {
            debug!(
                stale_request_id = %stale.request_id(),
                request_id = %ctx.request_id(),
                "Replacing stale request context"
            );
        }
        self.current.insert(ctx)
    }

    /// The bound context.
    ///
    /// # Errors
    ///
    /// [`NoContextError`] outside an active dispatch.
    pub fn current(&self) -> Result<&ActionContext, NoContextError> {
        self.current.as_ref().ok_or(NoContextError)
    }

    /// # Errors
    ///
    /// [`NoContextError`] outside an active dispatch.
    pub fn current_mut(&mut self) -> Result<&mut ActionContext, NoContextError> {
        self.current.as_mut().ok_or(NoContextError)
    }

    /// Detach and return the bound context. Safe to call when nothing is bound.
    pub fn end_request(&mut self) -> Option<ActionContext> {
        let ctx = self.current.take()?;
        self.teardowns += 1;
        debug!(
            request_id = %ctx.request_id(),
            elapsed_us = ctx.elapsed().as_micros(),
            "Request context released"
        );
        Some(ctx)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Number of contexts released by [`end_request`](Self::end_request).
    #[must_use]
    pub fn teardown_count(&self) -> u64 {
        self.teardowns
    }

    /// Scoped acquisition: the context is released when the guard drops.
    pub fn guard(&mut self) -> ContextGuard<'_> {
        ContextGuard {
            slot: self,
            release: true,
        }
    }
}

/// Releases the bound context on drop unless told to keep it.
#[derive(Debug)]
pub struct ContextGuard<'a> {
    slot: &'a mut ContextSlot,
    release: bool,
}

impl ContextGuard<'_> {
    /// # Errors
    ///
    /// [`NoContextError`] if the context was already released.
    pub fn current(&self) -> Result<&ActionContext, NoContextError> {
        self.slot.current()
    }

    /// # Errors
    ///
    /// [`NoContextError`] if the context was already released.
    pub fn current_mut(&mut self) -> Result<&mut ActionContext, NoContextError> {
        self.slot.current_mut()
    }

    /// Leave the context bound after the guard drops.
    pub fn keep_bound(&mut self) {
        self.release = false;
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if self.release {
            self.slot.end_request();
        }
    }
}
