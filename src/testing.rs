//! Helpers for the unit tests.

use std::{cell::Cell, rc::Rc};

pub(crate) use crate::block::tracking::live_blocks;

/// A value counting its drops.
///
/// Also owns a `String`, so that Miri reports a missed drop as a leak.
#[derive(Debug)]
pub(crate) struct Canary {
    drops: Rc<Cell<usize>>,
    _payload: String,
}

impl Canary {
    /// Returns a new canary, and its drop counter.
    pub(crate) fn new() -> (Self, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));

        let canary = Self {
            drops: drops.clone(),
            _payload: String::from("Hello, World!"),
        };

        (canary, drops)
    }

    /// Returns the number of drops so far.
    pub(crate) fn drops(&self) -> usize {
        self.drops.get()
    }
}

impl Drop for Canary {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}
