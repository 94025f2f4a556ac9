//! Tab set
//!
//! Ordered sessions with one active. New tabs open right after the active
//! one; closing a tab hands focus to its right-hand neighbour, or the left
//! one at the end of the list.

use crate::error::TabError;
use crate::session::Session;
use crate::Result;

#[derive(Debug, Clone)]
pub struct TabSet {
    sessions: Vec<Session>,
    active: usize,
}

impl TabSet {
    /// A set holding one empty session.
    pub fn new() -> Self {
        Self {
            sessions: vec![Session::new()],
            active: 0,
        }
    }

    /// Open an empty session after the active one and switch to it.
    pub fn add_session(&mut self) -> &mut Session {
        let index = self.active + 1;
        self.sessions.insert(index, Session::new());
        self.active = index;

        tracing::info!(
            session_id = %self.sessions[index].id,
            index,
            total = self.sessions.len(),
            "Opened tab"
        );

        &mut self.sessions[index]
    }

    /// Close the session at `index`, dropping its history.
    pub fn close_session(&mut self, index: usize) -> Result<()> {
        if index >= self.sessions.len() {
            return Err(TabError::NotFound(index));
        }
        if self.sessions.len() == 1 {
            return Err(TabError::LastSession);
        }

        let closed = self.sessions.remove(index);

        if index < self.active || self.active >= self.sessions.len() {
            self.active -= 1;
        }

        tracing::info!(
            session_id = %closed.id,
            active = self.active,
            total = self.sessions.len(),
            "Closed tab"
        );

        Ok(())
    }

    /// Move the active index by `delta`, stopping at either end.
    pub fn switch(&mut self, delta: isize) -> usize {
        let last = self.sessions.len() - 1;
        let target = self.active.saturating_add_signed(delta).min(last);

        if target != self.active {
            tracing::debug!(from = self.active, to = target, "Switched tab");
            self.active = target;
        }
        self.active
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.sessions.len() {
            return Err(TabError::NotFound(index));
        }
        self.active = index;
        Ok(())
    }

    pub fn active(&self) -> &Session {
        &self.sessions[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Session {
        &mut self.sessions[self.active]
    }

    pub fn get(&self, index: usize) -> Option<&Session> {
        self.sessions.get(index)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }
}

impl Default for TabSet {
    fn default() -> Self {
        Self::new()
    }
}
