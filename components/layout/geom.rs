/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Logical geometry. Layout works entirely in the inline/block axes of the containing
//! block's writing mode; physical rectangles are only produced at the paint boundary.

use std::ops::{Add, AddAssign, Neg, Sub};

use app_units::Au;
use euclid::{Point2D, Size2D};
use num_traits::Zero;
use serde::Serialize;

/// The unit of physical rectangles handed to painting.
#[derive(Clone, Copy, Debug)]
pub enum CSSPixel {}

pub type PhysicalPoint<U> = Point2D<U, CSSPixel>;
pub type PhysicalSize<U> = Size2D<U, CSSPixel>;
pub type PhysicalRect<U> = euclid::Rect<U, CSSPixel>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum WritingModeKind {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

/// A writing mode together with the inline base direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WritingMode {
    pub kind: WritingModeKind,
    pub direction: Direction,
}

impl WritingMode {
    pub const fn horizontal_tb() -> Self {
        WritingMode {
            kind: WritingModeKind::HorizontalTb,
            direction: Direction::Ltr,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.kind == WritingModeKind::HorizontalTb
    }

    pub fn is_bidi_ltr(&self) -> bool {
        self.direction == Direction::Ltr
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogicalVec2<T> {
    pub inline: T,
    pub block: T,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogicalRect<T> {
    pub start_corner: LogicalVec2<T>,
    pub size: LogicalVec2<T>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogicalSides<T> {
    pub inline_start: T,
    pub inline_end: T,
    pub block_start: T,
    pub block_end: T,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhysicalSides<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Clone> PhysicalSides<T> {
    pub fn new(top: T, right: T, bottom: T, left: T) -> Self {
        PhysicalSides {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn all(value: T) -> Self {
        PhysicalSides {
            top: value.clone(),
            right: value.clone(),
            bottom: value.clone(),
            left: value,
        }
    }

    pub fn to_logical(&self, mode: WritingMode) -> LogicalSides<T> {
        let (block_start, block_end, inline_start, inline_end) = match mode.kind {
            WritingModeKind::HorizontalTb => (&self.top, &self.bottom, &self.left, &self.right),
            WritingModeKind::VerticalRl => (&self.right, &self.left, &self.top, &self.bottom),
            WritingModeKind::VerticalLr => (&self.left, &self.right, &self.top, &self.bottom),
        };
        let (inline_start, inline_end) = if mode.is_bidi_ltr() {
            (inline_start, inline_end)
        } else {
            (inline_end, inline_start)
        };
        LogicalSides {
            inline_start: inline_start.clone(),
            inline_end: inline_end.clone(),
            block_start: block_start.clone(),
            block_end: block_end.clone(),
        }
    }
}

impl<T: Zero> LogicalVec2<T> {
    pub fn zero() -> Self {
        LogicalVec2 {
            inline: T::zero(),
            block: T::zero(),
        }
    }
}

impl<T: Clone> LogicalVec2<T> {
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> LogicalVec2<U> {
        LogicalVec2 {
            inline: f(&self.inline),
            block: f(&self.block),
        }
    }
}

impl<T: Add<Output = T>> Add for LogicalVec2<T> {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        LogicalVec2 {
            inline: self.inline + other.inline,
            block: self.block + other.block,
        }
    }
}

impl<T: Sub<Output = T>> Sub for LogicalVec2<T> {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        LogicalVec2 {
            inline: self.inline - other.inline,
            block: self.block - other.block,
        }
    }
}

impl<T: AddAssign> AddAssign for LogicalVec2<T> {
    fn add_assign(&mut self, other: Self) {
        self.inline += other.inline;
        self.block += other.block;
    }
}

impl<T: Neg<Output = T>> Neg for LogicalVec2<T> {
    type Output = Self;
    fn neg(self) -> Self {
        LogicalVec2 {
            inline: -self.inline,
            block: -self.block,
        }
    }
}

impl<T: Zero + Copy> LogicalSides<T> {
    pub fn zero() -> Self {
        LogicalSides {
            inline_start: T::zero(),
            inline_end: T::zero(),
            block_start: T::zero(),
            block_end: T::zero(),
        }
    }
}

impl<T: Copy> LogicalSides<T> {
    pub fn map_sides<U>(&self, f: impl Fn(T) -> U) -> LogicalSides<U> {
        LogicalSides {
            inline_start: f(self.inline_start),
            inline_end: f(self.inline_end),
            block_start: f(self.block_start),
            block_end: f(self.block_end),
        }
    }
}

impl<T: Add<Output = T> + Copy> LogicalSides<T> {
    pub fn inline_sum(&self) -> T {
        self.inline_start + self.inline_end
    }

    pub fn block_sum(&self) -> T {
        self.block_start + self.block_end
    }

    pub fn sum(&self) -> LogicalVec2<T> {
        LogicalVec2 {
            inline: self.inline_sum(),
            block: self.block_sum(),
        }
    }

    pub fn start_offset(&self) -> LogicalVec2<T> {
        LogicalVec2 {
            inline: self.inline_start,
            block: self.block_start,
        }
    }
}

impl<T: Add<Output = T> + Copy> Add for LogicalSides<T> {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        LogicalSides {
            inline_start: self.inline_start + other.inline_start,
            inline_end: self.inline_end + other.inline_end,
            block_start: self.block_start + other.block_start,
            block_end: self.block_end + other.block_end,
        }
    }
}

impl LogicalRect<Au> {
    pub fn zero() -> Self {
        LogicalRect {
            start_corner: LogicalVec2::zero(),
            size: LogicalVec2::zero(),
        }
    }

    pub fn max_inline_position(&self) -> Au {
        self.start_corner.inline + self.size.inline
    }

    pub fn max_block_position(&self) -> Au {
        self.start_corner.block + self.size.block
    }

    pub fn is_empty(&self) -> bool {
        self.size.inline <= Au::zero() || self.size.block <= Au::zero()
    }

    pub fn translate(&self, offset: LogicalVec2<Au>) -> Self {
        LogicalRect {
            start_corner: self.start_corner + offset,
            size: self.size,
        }
    }

    pub fn inflate(&self, sides: &LogicalSides<Au>) -> Self {
        LogicalRect {
            start_corner: LogicalVec2 {
                inline: self.start_corner.inline - sides.inline_start,
                block: self.start_corner.block - sides.block_start,
            },
            size: LogicalVec2 {
                inline: self.size.inline + sides.inline_sum(),
                block: self.size.block + sides.block_sum(),
            },
        }
    }

    pub fn deflate(&self, sides: &LogicalSides<Au>) -> Self {
        LogicalRect {
            start_corner: LogicalVec2 {
                inline: self.start_corner.inline + sides.inline_start,
                block: self.start_corner.block + sides.block_start,
            },
            size: LogicalVec2 {
                inline: (self.size.inline - sides.inline_sum()).max(Au::zero()),
                block: (self.size.block - sides.block_sum()).max(Au::zero()),
            },
        }
    }

    /// The smallest rectangle containing both rectangles. Empty rectangles still
    /// contribute their position, which keeps zero-height lines inside overflow areas.
    pub fn union(&self, other: &Self) -> Self {
        let inline_start = self.start_corner.inline.min(other.start_corner.inline);
        let block_start = self.start_corner.block.min(other.start_corner.block);
        let inline_end = self.max_inline_position().max(other.max_inline_position());
        let block_end = self.max_block_position().max(other.max_block_position());
        LogicalRect {
            start_corner: LogicalVec2 {
                inline: inline_start,
                block: block_start,
            },
            size: LogicalVec2 {
                inline: inline_end - inline_start,
                block: block_end - block_start,
            },
        }
    }

    pub fn block_range(&self) -> std::ops::Range<Au> {
        self.start_corner.block..self.max_block_position()
    }

    /// Converts this rectangle to physical coordinates inside a container of the given
    /// logical size.
    pub fn to_physical(&self, mode: WritingMode, container_size: LogicalVec2<Au>) -> PhysicalRect<Au> {
        let inline_position = if mode.is_bidi_ltr() {
            self.start_corner.inline
        } else {
            container_size.inline - self.max_inline_position()
        };
        let (origin, size) = match mode.kind {
            WritingModeKind::HorizontalTb => (
                PhysicalPoint::new(inline_position, self.start_corner.block),
                PhysicalSize::new(self.size.inline, self.size.block),
            ),
            WritingModeKind::VerticalRl => (
                PhysicalPoint::new(
                    container_size.block - self.max_block_position(),
                    inline_position,
                ),
                PhysicalSize::new(self.size.block, self.size.inline),
            ),
            WritingModeKind::VerticalLr => (
                PhysicalPoint::new(self.start_corner.block, inline_position),
                PhysicalSize::new(self.size.block, self.size.inline),
            ),
        };
        PhysicalRect::new(origin, size)
    }
}
