/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Data shared by every container laid out in one reflow.

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use blockflow_config::opts::{DebugOptions, Opts, ReflowQuirks};

/// Asked by the driver before each dirty line whether to stop. A reflow that stops leaves
/// the remaining lines dirty; running it again continues where it left off.
pub trait InterruptSignal {
    fn should_interrupt(&self) -> bool;
}

/// Never interrupts.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverInterrupt;

impl InterruptSignal for NeverInterrupt {
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Interrupts after a fixed number of dirty lines have been started.
#[derive(Debug)]
pub struct LineBudget {
    remaining: Cell<usize>,
}

impl LineBudget {
    pub fn new(lines: usize) -> Self {
        LineBudget {
            remaining: Cell::new(lines),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }

    pub fn reset(&self, lines: usize) {
        self.remaining.set(lines);
    }
}

impl InterruptSignal for LineBudget {
    fn should_interrupt(&self) -> bool {
        match self.remaining.get() {
            0 => true,
            remaining => {
                self.remaining.set(remaining - 1);
                false
            },
        }
    }
}

/// Interrupts once a point in time has passed.
#[derive(Clone, Copy, Debug)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Deadline(Instant::now() + budget)
    }
}

impl InterruptSignal for Deadline {
    fn should_interrupt(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Layout information shared by all containers of one reflow.
pub struct LayoutContext<'a> {
    pub opts: &'a Opts,
    pub interrupt: &'a dyn InterruptSignal,
}

impl<'a> LayoutContext<'a> {
    pub fn new(opts: &'a Opts, interrupt: &'a dyn InterruptSignal) -> Self {
        LayoutContext { opts, interrupt }
    }

    #[inline]
    pub fn debug(&self) -> &DebugOptions {
        &self.opts.debug
    }

    #[inline]
    pub fn quirks(&self) -> ReflowQuirks {
        self.opts.quirks
    }

    #[inline]
    pub fn nonincremental(&self) -> bool {
        self.opts.nonincremental_layout
    }

    pub(crate) fn should_interrupt(&self) -> bool {
        self.interrupt.should_interrupt()
    }
}

impl fmt::Debug for LayoutContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutContext")
            .field("opts", self.opts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_budget_counts_down() {
        let budget = LineBudget::new(2);
        assert!(!budget.should_interrupt());
        assert!(!budget.should_interrupt());
        assert!(budget.should_interrupt());
        assert!(budget.should_interrupt());
        budget.reset(1);
        assert!(!budget.should_interrupt());
    }

    #[test]
    fn test_past_deadline_interrupts() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.should_interrupt());
        assert!(!NeverInterrupt.should_interrupt());
    }
}
