//! Callback registry - arena of retained callbacks addressed by token
//!
//! State per token: unregistered → registered → resolved or cancelled → freed.
//! Resolution removes the value before handing it out, so a token can be
//! resolved at most once; a slot is only reused after it has been freed.

use parking_lot::Mutex;

use super::token::Token;
use crate::error::{BindingError, Result, REGISTRY_CLOSED};
use crate::logging;

enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<usize> },
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    pending: usize,
    closed: bool,
}

impl<T> Slots<T> {
    fn insert(&mut self, value: T) -> usize {
        self.pending += 1;
        match self.free_head {
            Some(index) => {
                let next = match self.slots[index] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at occupied slot"),
                };
                self.slots[index] = Slot::Occupied(value);
                self.free_head = next;
                index
            }
            None => {
                self.slots.push(Slot::Occupied(value));
                self.slots.len() - 1
            }
        }
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }
        let vacant = Slot::Vacant { next_free: self.free_head };
        match std::mem::replace(slot, vacant) {
            Slot::Occupied(value) => {
                self.free_head = Some(index);
                self.pending -= 1;
                Some(value)
            }
            Slot::Vacant { .. } => unreachable!(),
        }
    }

    fn drain(&mut self) -> Vec<T> {
        let values = std::mem::take(&mut self.slots)
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Occupied(value) => Some(value),
                Slot::Vacant { .. } => None,
            })
            .collect();
        self.free_head = None;
        self.pending = 0;
        values
    }
}

/// Token table shared between the registering call and the host's
/// delivery context. All mutations are serialized by one lock; values are
/// never invoked or dropped while it is held.
pub struct CallbackRegistry<T> {
    inner: Mutex<Slots<T>>,
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slots {
                slots: Vec::new(),
                free_head: None,
                pending: 0,
                closed: false,
            }),
        }
    }

    /// Retain `value` under a fresh token
    pub fn register(&self, value: T) -> Result<Token> {
        let mut inner = self.inner.lock();
        if inner.closed {
            drop(inner);
            let err = BindingError::HostFailure(REGISTRY_CLOSED);
            logging::log_host_failure("register_callback", &err);
            return Err(err);
        }
        let token = Token::from_slot(inner.insert(value));
        logging::log_token_registered(token, inner.pending);
        Ok(token)
    }

    /// Take the value for `token`, invalidating the token. Unknown, already
    /// resolved, and post-shutdown tokens yield `None`.
    pub fn resolve(&self, token: Token) -> Option<T> {
        let value = self.inner.lock().remove(token.slot());
        match value {
            Some(_) => logging::log_token_resolved(token),
            None => logging::log_stale_token(token),
        }
        value
    }

    /// Drop the value for `token` without handing it out
    pub fn cancel(&self, token: Token) -> bool {
        let value = self.inner.lock().remove(token.slot());
        let cancelled = value.is_some();
        drop(value);
        if cancelled {
            logging::log_token_cancelled(token);
        }
        cancelled
    }

    /// Invalidate every outstanding token and refuse new registrations.
    /// Returns how many retained values were dropped.
    pub fn shutdown(&self) -> usize {
        let values = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.drain()
        };
        let count = values.len();
        drop(values);
        logging::log_registry_shutdown(count);
        count
    }

    /// Registered tokens not yet resolved or cancelled
    pub fn pending(&self) -> usize {
        self.inner.lock().pending
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
