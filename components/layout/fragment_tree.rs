/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Results of layout that outlive a reflow pass and are read by painting: box rectangles,
//! overflow areas and collapsed margins.

use app_units::Au;
use num_traits::Zero;
use serde::Serialize;

use crate::geom::{LogicalRect, LogicalSides, LogicalVec2, PhysicalRect, WritingMode};

/// Adjoining margins, collapsed according to CSS 2.1 § 8.3.1: the result is the largest
/// positive margin plus the most negative one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollapsedMargin {
    max_positive: Au,
    min_negative: Au,
}

impl CollapsedMargin {
    pub fn zero() -> Self {
        Self {
            max_positive: Au::zero(),
            min_negative: Au::zero(),
        }
    }

    pub fn new(margin: Au) -> Self {
        Self {
            max_positive: margin.max(Au::zero()),
            min_negative: margin.min(Au::zero()),
        }
    }

    pub fn adjoin(&self, other: &Self) -> Self {
        Self {
            max_positive: self.max_positive.max(other.max_positive),
            min_negative: self.min_negative.min(other.min_negative),
        }
    }

    pub fn adjoin_assign(&mut self, other: &Self) {
        *self = self.adjoin(other);
    }

    pub fn solve(&self) -> Au {
        self.max_positive + self.min_negative
    }
}

/// The margins of a block box after collapsing with its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollapsedBlockMargins {
    /// The box's block-start and block-end margins are adjoining (the box has no in-flow
    /// content, no block size and nothing separating the two margins).
    pub collapsed_through: bool,
    pub start: CollapsedMargin,
    pub end: CollapsedMargin,
}

impl CollapsedBlockMargins {
    pub fn from_margin(margin: &LogicalSides<Au>) -> Self {
        Self {
            collapsed_through: false,
            start: CollapsedMargin::new(margin.block_start),
            end: CollapsedMargin::new(margin.block_end),
        }
    }

    pub fn zero() -> Self {
        Self {
            collapsed_through: false,
            start: CollapsedMargin::zero(),
            end: CollapsedMargin::zero(),
        }
    }
}

/// Ink and scrollable overflow, in the coordinate space of the box or line that owns them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OverflowAreas {
    pub ink: LogicalRect<Au>,
    pub scrollable: LogicalRect<Au>,
}

impl OverflowAreas {
    pub fn from_rect(rect: LogicalRect<Au>) -> Self {
        OverflowAreas {
            ink: rect,
            scrollable: rect,
        }
    }

    pub fn union(&mut self, other: &OverflowAreas) {
        self.ink = self.ink.union(&other.ink);
        self.scrollable = self.scrollable.union(&other.scrollable);
    }

    pub fn translate(&self, offset: LogicalVec2<Au>) -> OverflowAreas {
        OverflowAreas {
            ink: self.ink.translate(offset),
            scrollable: self.scrollable.translate(offset),
        }
    }
}

/// The geometry of a laid out box. `border_rect` is relative to the border box of the
/// parent: the containing block for block-level boxes and floats, the enclosing span for
/// inline-level boxes inside a span.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoxGeometry {
    pub border_rect: LogicalRect<Au>,
    pub padding: LogicalSides<Au>,
    pub border: LogicalSides<Au>,
    pub margin: LogicalSides<Au>,
    /// Overflow relative to this box's own border-box origin.
    pub overflow: OverflowAreas,
    /// Distance from the block-start border edge to the first and last baselines.
    pub first_baseline: Option<Au>,
    pub last_baseline: Option<Au>,
    /// Clearance applied to this box, if any.
    pub clearance: Option<Au>,
}

impl BoxGeometry {
    pub fn margin_rect(&self) -> LogicalRect<Au> {
        self.border_rect.inflate(&self.margin)
    }

    pub fn content_rect(&self) -> LogicalRect<Au> {
        self.border_rect.deflate(&(self.padding + self.border))
    }

    /// Moves this box, and so everything positioned relative to it, in the block axis.
    pub fn slide(&mut self, block_delta: Au) {
        self.border_rect.start_corner.block += block_delta;
    }

    /// The border box in physical coordinates, given the parent's writing mode and the
    /// logical size of the parent's border box.
    pub fn to_physical(&self, mode: WritingMode, container_size: LogicalVec2<Au>) -> PhysicalRect<Au> {
        self.border_rect.to_physical(mode, container_size)
    }
}
