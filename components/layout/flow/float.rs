/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Float layout.
//!
//! See CSS 2.1 § 9.5.1: <https://www.w3.org/TR/CSS2/visuren.html#float-position>
//!
//! A [`FloatContext`] belongs to one block formatting context. Its state is made of
//! shared structures, so cloning it is cheap and a clone taken before a speculative
//! layout attempt can be restored exactly afterwards.

use std::collections::VecDeque;
use std::ops::Range;

use app_units::{Au, MAX_AU, MIN_AU};
use log::trace;
use num_traits::Zero;
use serde::Serialize;
use servo_arc::Arc;

use crate::box_tree::BoxId;
use crate::geom::{LogicalRect, LogicalVec2, WritingMode};
use crate::style::{ClearProperty, ComputedValues, FloatProperty, PaddingBorderMargin};

/// The inline content edges of the block container whose floats are being placed, in
/// the coordinates of the block formatting context. Floats stay between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Walls {
    pub inline_start: Au,
    pub inline_end: Au,
}

/// Finds room for a non-float (an atomic inline or a box that establishes its own
/// formatting context) next to the floats of a [`FloatContext`].
///
/// The search slides a window of consecutive bands downwards, starting at the ceiling,
/// until the bands in the window are together tall and wide enough for the object.
pub(crate) struct PlacementAmongFloats<'a> {
    floats: &'a FloatContext,
    /// The bands being tried, in block order.
    window: VecDeque<FloatBand>,
    /// The band right after the window. Its top is where the window ends.
    following: FloatBand,
    object_size: LogicalVec2<Au>,
    ceiling: Au,
    /// Where the object would start if there were no floats. Floats only move it toward
    /// the inline end.
    inline_start_limit: Au,
    inline_end_limit: Au,
}

impl<'a> PlacementAmongFloats<'a> {
    /// `ceiling` is relative to the current origin of `floats`, and so is every
    /// rectangle this returns.
    pub(crate) fn new(
        floats: &'a FloatContext,
        ceiling: Au,
        object_size: LogicalVec2<Au>,
        pbm: &PaddingBorderMargin,
    ) -> Self {
        let ceiling = floats.to_bfc_block(ceiling);
        let mut window = VecDeque::new();
        let following = if ceiling == MAX_AU {
            floats.bands.band_at(ceiling)
        } else {
            window.push_back(FloatBand {
                top: ceiling,
                ..floats.bands.band_at(ceiling)
            });
            floats.bands.band_after(ceiling)
        };
        let inline_start_limit = floats.walls.inline_start + pbm.margin.inline_start.auto_is(Au::zero);
        let inline_end_limit = (floats.walls.inline_end - pbm.margin.inline_end.auto_is(Au::zero))
            .max(inline_start_limit + object_size.inline);
        PlacementAmongFloats {
            floats,
            window,
            following,
            object_size,
            ceiling,
            inline_start_limit,
            inline_end_limit,
        }
    }

    fn at_last_band(&self) -> bool {
        self.following.top == MAX_AU
    }

    /// `MAX_AU` stands for an unbounded window.
    fn window_block_size(&self) -> Au {
        match self.window.front() {
            Some(first) if !self.at_last_band() => self.following.top - first.top,
            _ => MAX_AU,
        }
    }

    fn extend_window(&mut self) {
        debug_assert!(!self.at_last_band());
        self.window.push_back(self.following);
        self.following = self.floats.bands.band_after(self.following.top);
    }

    /// Drops the top band of the window. The window is only left empty once every band
    /// has been tried.
    fn drop_first_band(&mut self) {
        self.window.pop_front();
        if self.window.is_empty() && !self.at_last_band() {
            self.extend_window();
        }
    }

    /// The inline range left free by every band in the window.
    fn free_inline_range(&self) -> (Au, Au) {
        self.window.iter().fold(
            (self.inline_start_limit, self.inline_end_limit),
            |(start, end), band| {
                (
                    band.inline_start.map_or(start, |edge| start.max(edge)),
                    band.inline_end.map_or(end, |edge| end.min(edge)),
                )
            },
        )
    }

    fn try_window(&mut self) -> Option<LogicalRect<Au>> {
        while self.window_block_size() < self.object_size.block && !self.at_last_band() {
            self.extend_window();
        }
        let (start, end) = self.free_inline_range();
        if end - start < self.object_size.inline {
            return None;
        }
        let top = self.window.front()?.top;
        Some(self.floats.to_local_rect(LogicalRect {
            start_corner: LogicalVec2 {
                inline: start,
                block: top,
            },
            size: LogicalVec2 {
                inline: end - start,
                block: self.window_block_size(),
            },
        }))
    }

    /// The first area, from the top, where the object fits beside the floats. Its block
    /// size is the height over which that inline space stays available.
    pub(crate) fn place(&mut self) -> LogicalRect<Au> {
        while !self.window.is_empty() {
            if let Some(rect) = self.try_window() {
                return rect;
            }
            self.drop_first_band();
        }

        // Nothing fits beside the floats, so go below all of them.
        let block = self
            .ceiling
            .max(self.floats.clear_inline_start_position)
            .max(self.floats.clear_inline_end_position);
        self.floats.to_local_rect(LogicalRect {
            start_corner: LogicalVec2 {
                inline: self.inline_start_limit,
                block,
            },
            size: LogicalVec2 {
                inline: self.inline_end_limit - self.inline_start_limit,
                block: MAX_AU,
            },
        })
    }

    /// Called after an object with an automatic block size was laid out in the area
    /// returned by [`Self::place`]. Returns true when its laid out block size still fits
    /// there. Returns false when the area turned out too short and the bands below are
    /// narrower, in which case the object has to be laid out again in the area a new
    /// call to [`Self::place`] returns.
    pub(crate) fn try_to_expand_for_auto_block_size(
        &mut self,
        block_size_after_layout: Au,
        size_from_placement: &LogicalVec2<Au>,
    ) -> bool {
        if block_size_after_layout <= size_from_placement.block || self.window.is_empty() {
            return true;
        }

        let tried = self.window.len();
        while self.window_block_size() < block_size_after_layout && !self.at_last_band() {
            self.extend_window();
            let (start, end) = self.free_inline_range();
            if end - start >= size_from_placement.inline {
                continue;
            }
            // Too narrow even for the minimum size: no window starting at this band
            // can hold the object.
            if end - start < self.object_size.inline {
                self.following = self.window[tried];
                self.window.truncate(tried);
                self.drop_first_band();
            }
            return false;
        }
        true
    }
}

/// A float registered with a [`FloatContext`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FloatRegion {
    /// The margin box of the float, relative to the origin of the block formatting context.
    pub rect: LogicalRect<Au>,
    pub side: FloatSide,
    /// Whether the float is a continuation of a float from a previous fragment.
    pub is_continuation: bool,
    pub box_id: BoxId,
}

/// A persistent list of the floats of a [`FloatContext`], newest first.
#[derive(Clone, Debug, Default)]
pub struct FloatList {
    head: Option<Arc<FloatListNode>>,
    len: usize,
}

#[derive(Debug)]
struct FloatListNode {
    region: FloatRegion,
    previous: Option<Arc<FloatListNode>>,
}

impl FloatList {
    #[must_use]
    fn push(&self, region: FloatRegion) -> FloatList {
        FloatList {
            head: Some(Arc::new(FloatListNode {
                region,
                previous: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the registered floats, most recently registered first.
    pub fn iter(&self) -> impl Iterator<Item = &FloatRegion> {
        let mut next = self.head.as_deref();
        std::iter::from_fn(move || {
            let node = next?;
            next = node.previous.as_deref();
            Some(&node.region)
        })
    }
}

/// Block-axis ranges whose float geometry changed since the previous layout. Lines that
/// intersect a damaged range can't be reused as they are.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FloatDamage {
    /// Disjoint ranges, sorted by start.
    ranges: Vec<Range<Au>>,
}

impl FloatDamage {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn include(&mut self, range: Range<Au>) {
        let mut merged = range;
        if merged.end < merged.start {
            merged = merged.end..merged.start;
        }
        self.ranges.retain(|existing| {
            let overlaps = existing.start <= merged.end && merged.start <= existing.end;
            if overlaps {
                merged.start = merged.start.min(existing.start);
                merged.end = merged.end.max(existing.end);
            }
            !overlaps
        });
        let index = self
            .ranges
            .iter()
            .position(|existing| existing.start > merged.start)
            .unwrap_or(self.ranges.len());
        self.ranges.insert(index, merged);
    }

    /// Whether `range` touches any damaged range. Empty ranges count when they lie inside
    /// or on the edge of a damaged range, since empty lines still depend on floats.
    pub fn intersects(&self, range: &Range<Au>) -> bool {
        self.ranges
            .iter()
            .any(|damaged| damaged.start <= range.end && range.start <= damaged.end)
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

/// The result of an available space query: the rectangle, relative to the current origin,
/// in which in-flow content may go, and whether floats narrow it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowArea {
    pub rect: LogicalRect<Au>,
    pub has_floats: bool,
}

/// How [`FloatContext::available_space`] measures the space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlowAreaQuery {
    /// The band containing the queried position. The returned rectangle extends to the
    /// start of the next band, which is where the available space changes next.
    BandFromPoint,
    /// The space available across the given block size, starting at the queried position.
    WidthWithinHeight(Au),
}

/// The outcome of trying to place a float.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FloatPlacement {
    /// The float was placed; this is the start corner of its margin box.
    Placed(LogicalVec2<Au>),
    /// The float did not fit before the end of the fragmentainer and must move to the
    /// next fragment. The float context is unchanged.
    Pushed,
}

/// The floats of one block formatting context, and what they leave free.
///
/// Methods take and return positions relative to the current origin, which block layout
/// moves with [`FloatContext::translate`] as it descends into children.
#[derive(Clone, Debug)]
pub struct FloatContext {
    bands: FloatBands,
    floats: FloatList,
    /// No float may start above an earlier one (CSS 2.1 § 9.5.1 rule 6).
    ceiling_from_floats: Au,
    /// Nor above the in-flow content that precedes it (rule 4). This one can move back up
    /// when content overflows its container.
    ceiling_from_non_floats: Au,
    walls: Walls,
    /// The lowest block-end margin edge of the inline-start floats.
    clear_inline_start_position: Au,
    /// The lowest block-end margin edge of the inline-end floats.
    clear_inline_end_position: Au,
    /// The border box origin of the block container being laid out, relative to the
    /// block formatting context.
    origin: LogicalVec2<Au>,
    damage: FloatDamage,
    /// Set once a float has been pushed to the next fragment. Later floats may not be
    /// placed above it, so they are pushed too.
    has_pushed_floats: bool,
    trace: bool,
}

/// A saved [`FloatContext`], restored with [`FloatContext::restore`].
#[derive(Clone, Debug)]
pub struct FloatContextSnapshot(FloatContext);

impl FloatContext {
    /// A float context with no floats, whose walls are `0` and `max_inline_size`.
    pub fn new(max_inline_size: Au) -> Self {
        FloatContext {
            bands: FloatBands::new(),
            floats: FloatList::default(),
            ceiling_from_floats: Au::zero(),
            ceiling_from_non_floats: Au::zero(),
            walls: Walls {
                inline_start: Au::zero(),
                inline_end: max_inline_size,
            },
            clear_inline_start_position: Au::zero(),
            clear_inline_end_position: Au::zero(),
            origin: LogicalVec2::zero(),
            damage: FloatDamage::default(),
            has_pushed_floats: false,
            trace: false,
        }
    }

    /// Logs every mutation of this context at `trace` level.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn snapshot(&self) -> FloatContextSnapshot {
        FloatContextSnapshot(self.clone())
    }

    pub fn restore(&mut self, snapshot: &FloatContextSnapshot) {
        *self = snapshot.0.clone();
        if self.trace {
            trace!("FloatContext: restored snapshot with {} floats", self.floats.len());
        }
    }

    /// The current origin, relative to the block formatting context.
    pub fn origin(&self) -> LogicalVec2<Au> {
        self.origin
    }

    /// Moves the origin of the coordinate space used by every other method. Callers
    /// translate by the position of a child before laying it out and by the negated
    /// position afterwards.
    pub fn translate(&mut self, delta: LogicalVec2<Au>) {
        self.origin += delta;
    }

    /// Replaces the inline walls with the given content edges, relative to the current
    /// origin. Returns the previous walls.
    pub fn replace_walls(&mut self, inline_start: Au, inline_end: Au) -> Walls {
        let walls = Walls {
            inline_start: inline_start + self.origin.inline,
            inline_end: inline_end + self.origin.inline,
        };
        std::mem::replace(&mut self.walls, walls)
    }

    pub fn restore_walls(&mut self, walls: Walls) {
        self.walls = walls;
    }

    fn to_bfc_block(&self, block_position: Au) -> Au {
        if block_position == MAX_AU {
            return MAX_AU;
        }
        block_position + self.origin.block
    }

    fn to_local_rect(&self, rect: LogicalRect<Au>) -> LogicalRect<Au> {
        let mut local = rect;
        local.start_corner.inline -= self.origin.inline;
        if local.start_corner.block != MAX_AU {
            local.start_corner.block -= self.origin.block;
        }
        local
    }

    /// Sets the ceiling defined by in-flow content, relative to the current origin.
    pub fn set_ceiling_from_non_floats(&mut self, new_ceiling: Au) {
        self.ceiling_from_non_floats = new_ceiling + self.origin.block;
    }

    fn ceiling(&self) -> Au {
        self.ceiling_from_floats.max(self.ceiling_from_non_floats)
    }

    /// Whether any float has been registered.
    pub fn has_floats(&self) -> bool {
        !self.floats.is_empty()
    }

    pub fn contains_float(&self, box_id: BoxId) -> bool {
        self.floats.iter().any(|region| region.box_id == box_id)
    }

    /// The inline space not taken up by floats at `block_position`, between the current
    /// walls. All values are relative to the current origin.
    pub fn available_space(&self, block_position: Au, query: FlowAreaQuery) -> FlowArea {
        let top = self.to_bfc_block(block_position);
        let (band, block_size) = match query {
            FlowAreaQuery::BandFromPoint => {
                let next_top = self.bands.band_after(top).top;
                let block_size = if next_top == MAX_AU {
                    MAX_AU - top.max(Au::zero())
                } else {
                    next_top - top
                };
                (self.bands.band_at(top), block_size)
            },
            FlowAreaQuery::WidthWithinHeight(block_size) => {
                let bottom = top + block_size.max(Au::zero());
                (self.bands.intersect(top..bottom), block_size)
            },
        };

        let start = band.start_edge(&self.walls);
        let end = band.end_edge(&self.walls);
        let has_floats = start > self.walls.inline_start || end < self.walls.inline_end;
        FlowArea {
            rect: LogicalRect {
                start_corner: LogicalVec2 {
                    inline: start - self.origin.inline,
                    block: block_position,
                },
                size: LogicalVec2 {
                    inline: (end - start).max(Au::zero()),
                    block: block_size,
                },
            },
            has_floats,
        }
    }

    fn clear_position_in_bfc(&self, clear: Clear) -> Option<Au> {
        match clear {
            Clear::None => None,
            Clear::InlineStart => Some(self.clear_inline_start_position),
            Clear::InlineEnd => Some(self.clear_inline_end_position),
            Clear::Both => Some(
                self.clear_inline_start_position
                    .max(self.clear_inline_end_position),
            ),
        }
    }

    /// The block-end margin edge of the lowest float to clear for the given `clear`
    /// value, relative to the current origin. `None` for `Clear::None`.
    pub fn clear_position(&self, clear: Clear) -> Option<Au> {
        self.clear_position_in_bfc(clear)
            .map(|position| position - self.origin.block)
    }

    /// The smallest block position at or after `block_position` that is past all floats
    /// on the sides named by `clear`.
    pub fn clear_floats(&self, block_position: Au, clear: Clear) -> Au {
        match self.clear_position(clear) {
            Some(position) => block_position.max(position),
            None => block_position,
        }
    }

    /// Where `object` would go as a float placed no higher than `ceiling`, in the
    /// coordinates of the block formatting context. Nothing is registered.
    pub(crate) fn place_object(&self, object: &PlacementInfo, ceiling: Au) -> LogicalVec2<Au> {
        let ceiling = match self.clear_position_in_bfc(object.clear) {
            Some(position) => ceiling.max(position),
            None => ceiling,
        };

        // The band after the last float is empty, so the search stops there at the latest.
        let mut band = self.bands.band_at(ceiling);
        while !band.object_fits(object, &self.walls) {
            let next = self.bands.band_after(band.top);
            if next.top == MAX_AU {
                break;
            }
            band = next;
        }

        LogicalVec2 {
            inline: match object.side {
                FloatSide::InlineStart => band.start_edge(&self.walls),
                FloatSide::InlineEnd => band.end_edge(&self.walls) - object.size.inline,
            },
            block: band.top.max(ceiling),
        }
    }

    /// Places a new float and registers it. `fragmentainer_block_end` is the end of the
    /// available space in the current fragment, relative to the current origin; a float
    /// that would cross it is pushed unless `at_top_of_fragment` is set, in which case it
    /// could not fit in any later fragment either.
    pub fn place_float(
        &mut self,
        new_float: &PlacementInfo,
        fragmentainer_block_end: Option<Au>,
        at_top_of_fragment: bool,
    ) -> FloatPlacement {
        if self.has_pushed_floats && fragmentainer_block_end.is_some() && !at_top_of_fragment {
            return FloatPlacement::Pushed;
        }
        let ceiling = self.ceiling();
        let origin = self.place_object(new_float, ceiling);
        if let Some(limit) = fragmentainer_block_end {
            let block_end = origin.block + new_float.size.block.max(Au::zero());
            if block_end > self.to_bfc_block(limit) && !at_top_of_fragment {
                if self.trace {
                    trace!("FloatContext: pushing {:?}, it ends at {:?}", new_float.box_id, block_end);
                }
                self.has_pushed_floats = true;
                return FloatPlacement::Pushed;
            }
        }
        let local_origin = LogicalVec2 {
            inline: origin.inline - self.origin.inline,
            block: origin.block - self.origin.block,
        };
        self.add_float_at(
            LogicalRect {
                start_corner: origin,
                size: new_float.size,
            },
            new_float.side,
            new_float.box_id,
            new_float.is_continuation,
        );
        FloatPlacement::Placed(local_origin)
    }

    /// Registers a float whose margin box is already known, relative to the current origin.
    /// This never fails; overlapping other floats is the caller's responsibility.
    pub fn register_float(&mut self, rect: LogicalRect<Au>, side: FloatSide, box_id: BoxId, is_continuation: bool) {
        self.add_float_at(rect.translate(self.origin), side, box_id, is_continuation);
    }

    fn add_float_at(&mut self, margin_rect: LogicalRect<Au>, side: FloatSide, box_id: BoxId, is_continuation: bool) {
        // Negative margins can shrink the space a float takes up to nothing, not less.
        let rect = LogicalRect {
            start_corner: margin_rect.start_corner,
            size: LogicalVec2 {
                inline: margin_rect.size.inline.max(Au::zero()),
                block: margin_rect.size.block.max(Au::zero()),
            },
        };
        let (clear_position, edge) = match side {
            FloatSide::InlineStart => (
                &mut self.clear_inline_start_position,
                margin_rect.max_inline_position(),
            ),
            FloatSide::InlineEnd => (
                &mut self.clear_inline_end_position,
                margin_rect.start_corner.inline,
            ),
        };
        clear_position.max_assign(rect.max_block_position());

        if !rect.size.block.is_zero() {
            self.bands.split_at(rect.start_corner.block);
            self.bands.split_at(rect.max_block_position());
            self.bands.narrow(&rect.block_range(), side, edge);
        }
        self.ceiling_from_floats.max_assign(rect.start_corner.block);

        let region = FloatRegion {
            rect,
            side,
            is_continuation,
            box_id,
        };
        if self.trace {
            trace!("FloatContext: registered {region:?}");
        }
        self.floats = self.floats.push(region);
    }

    /// Records that floats changed between `range` (relative to the current origin) in
    /// this layout compared to the previous one.
    pub fn include_in_damage(&mut self, range: Range<Au>) {
        let range = self.to_bfc_block(range.start)..self.to_bfc_block(range.end);
        if self.trace {
            trace!("FloatContext: damage {range:?}");
        }
        self.damage.include(range);
    }

    /// Whether `range`, relative to the current origin, intersects float damage.
    pub fn intersects_damage(&self, range: Range<Au>) -> bool {
        !self.damage.is_empty() &&
            self.damage
                .intersects(&(self.to_bfc_block(range.start)..self.to_bfc_block(range.end)))
    }

    /// Whether a float has been pushed to the next fragment during this layout.
    pub fn has_pushed_floats(&self) -> bool {
        self.has_pushed_floats
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    pub fn clear_damage(&mut self) {
        self.damage.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Clear {
    None,
    InlineStart,
    InlineEnd,
    Both,
}

impl Clear {
    pub(crate) fn from_style_and_container_writing_mode(
        style: &ComputedValues,
        container_writing_mode: WritingMode,
    ) -> Self {
        match style.clear {
            ClearProperty::None => Self::None,
            ClearProperty::Both => Self::Both,
            ClearProperty::InlineStart => Self::InlineStart,
            ClearProperty::InlineEnd => Self::InlineEnd,
            ClearProperty::Left if container_writing_mode.is_bidi_ltr() => Self::InlineStart,
            ClearProperty::Left => Self::InlineEnd,
            ClearProperty::Right if container_writing_mode.is_bidi_ltr() => Self::InlineEnd,
            ClearProperty::Right => Self::InlineStart,
        }
    }

    /// Combines two clear values, clearing the sides either of them clears.
    pub fn union(self, other: Clear) -> Clear {
        match (self, other) {
            (Clear::None, other) | (other, Clear::None) => other,
            (a, b) if a == b => a,
            _ => Clear::Both,
        }
    }
}

/// What [`FloatContext::place_float`] needs to know about a float.
#[derive(Clone, Debug)]
pub struct PlacementInfo {
    /// Margin box size.
    pub size: LogicalVec2<Au>,
    pub side: FloatSide,
    pub clear: Clear,
    pub box_id: BoxId,
    pub is_continuation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FloatSide {
    InlineStart,
    InlineEnd,
}

impl FloatSide {
    pub(crate) fn from_style_and_container_writing_mode(
        style: &ComputedValues,
        container_writing_mode: WritingMode,
    ) -> Option<FloatSide> {
        Some(match style.float {
            FloatProperty::None => return None,
            FloatProperty::InlineStart => Self::InlineStart,
            FloatProperty::InlineEnd => Self::InlineEnd,
            FloatProperty::Left if container_writing_mode.is_bidi_ltr() => Self::InlineStart,
            FloatProperty::Left => Self::InlineEnd,
            FloatProperty::Right if container_writing_mode.is_bidi_ltr() => Self::InlineEnd,
            FloatProperty::Right => Self::InlineStart,
        })
    }
}

/// A block-axis slice of the block formatting context over which the floats on each side
/// don't change. It runs from `top` to the top of the next band.
///
/// The edges are positions in the block formatting context: `inline_start` is where the
/// inline-start floats end and `inline_end` where the inline-end floats begin. `None`
/// means there is no float on that side, which differs from a zero-width float when it
/// comes to clearing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatBand {
    pub top: Au,
    pub inline_start: Option<Au>,
    pub inline_end: Option<Au>,
}

const EMPTY_BAND: FloatBand = FloatBand {
    top: MIN_AU,
    inline_start: None,
    inline_end: None,
};

impl FloatBand {
    /// The inline-start edge of the free space in this band.
    fn start_edge(&self, walls: &Walls) -> Au {
        self.inline_start
            .map_or(walls.inline_start, |edge| edge.max(walls.inline_start))
    }

    /// The inline-end edge of the free space in this band.
    fn end_edge(&self, walls: &Walls) -> Au {
        self.inline_end
            .map_or(walls.inline_end, |edge| edge.min(walls.inline_end))
    }

    /// Whether a float can go in this band without overlapping the floats already in it
    /// (CSS 2.1 § 9.5.1 rules 3 and 7).
    fn object_fits(&self, object: &PlacementInfo, walls: &Walls) -> bool {
        // Inline-end floats are checked in a mirrored coordinate space, where they
        // become inline-start floats.
        let (own_side, other_side, own_wall, other_wall) = match object.side {
            FloatSide::InlineStart => (
                self.inline_start,
                self.inline_end,
                walls.inline_start,
                walls.inline_end,
            ),
            FloatSide::InlineEnd => (
                self.inline_end.map(|edge| -edge),
                self.inline_start.map(|edge| -edge),
                -walls.inline_end,
                -walls.inline_start,
            ),
        };
        let position = own_side.map_or(own_wall, |edge| edge.max(own_wall));
        // Only the first float on a side may stick out past the opposite wall.
        if own_side.is_some() && position + object.size.inline > other_wall {
            return false;
        }
        other_side.is_none_or(|edge| object.size.inline <= edge - position)
    }
}

/// The bands of a [`FloatContext`], sorted by `top`. There is always a band at `MIN_AU`
/// and another at `MAX_AU`.
///
/// Clones share their storage until one of them changes, which keeps snapshots cheap.
/// Band counts stay small (two per float at most), so edits copy the whole list.
#[derive(Clone, Debug)]
pub struct FloatBands {
    list: Arc<Vec<FloatBand>>,
}

impl Default for FloatBands {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatBands {
    pub fn new() -> Self {
        FloatBands {
            list: Arc::new(vec![
                EMPTY_BAND,
                FloatBand {
                    top: MAX_AU,
                    ..EMPTY_BAND
                },
            ]),
        }
    }

    /// The number of bands starting at or above `block_position`.
    fn count_through(&self, block_position: Au) -> usize {
        self.list.partition_point(|band| band.top <= block_position)
    }

    /// The band containing `block_position`.
    pub fn band_at(&self, block_position: Au) -> FloatBand {
        self.count_through(block_position)
            .checked_sub(1)
            .and_then(|index| self.list.get(index))
            .copied()
            .unwrap_or(EMPTY_BAND)
    }

    /// The first band starting below `block_position`, or the band at `MAX_AU` when there
    /// is none.
    pub fn band_after(&self, block_position: Au) -> FloatBand {
        self.list
            .get(self.count_through(block_position))
            .copied()
            .unwrap_or(FloatBand {
                top: MAX_AU,
                ..EMPTY_BAND
            })
    }

    /// The edges of the space left free across `range`, as one band starting at
    /// `range.start`.
    pub fn intersect(&self, range: Range<Au>) -> FloatBand {
        let first = self.count_through(range.start).saturating_sub(1);
        self.list
            .iter()
            .skip(first)
            .enumerate()
            .take_while(|(index, band)| *index == 0 || band.top < range.end)
            .fold(
                FloatBand {
                    top: range.start,
                    ..EMPTY_BAND
                },
                |free, (_, band)| FloatBand {
                    top: free.top,
                    inline_start: max_edge(free.inline_start, band.inline_start),
                    inline_end: min_edge(free.inline_end, band.inline_end),
                },
            )
    }

    /// Makes sure a band starts at `block_position`, splitting the band containing it.
    pub fn split_at(&mut self, block_position: Au) {
        let count = self.count_through(block_position);
        let containing = self.band_at(block_position);
        if count > 0 && containing.top == block_position {
            return;
        }
        Arc::make_mut(&mut self.list).insert(
            count,
            FloatBand {
                top: block_position,
                ..containing
            },
        );
    }

    /// Moves the `side` edge of every band starting in `range` to at least `edge`.
    pub fn narrow(&mut self, range: &Range<Au>, side: FloatSide, edge: Au) {
        let start = self.list.partition_point(|band| band.top < range.start);
        let end = self.list.partition_point(|band| band.top < range.end);
        for band in Arc::make_mut(&mut self.list)[start..end].iter_mut() {
            match side {
                FloatSide::InlineStart => band.inline_start = max_edge(band.inline_start, Some(edge)),
                FloatSide::InlineEnd => band.inline_end = min_edge(band.inline_end, Some(edge)),
            }
        }
    }
}

fn max_edge(a: Option<Au>, b: Option<Au>) -> Option<Au> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn min_edge(a: Option<Au>, b: Option<Au>) -> Option<Au> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_tree::BoxTree;
    use crate::style::ComputedValues;

    fn px(px: i32) -> Au {
        Au::from_px(px)
    }

    fn float_info(box_id: BoxId, inline_size: i32, block_size: i32, side: FloatSide) -> PlacementInfo {
        PlacementInfo {
            size: LogicalVec2 {
                inline: px(inline_size),
                block: px(block_size),
            },
            side,
            clear: Clear::None,
            box_id,
            is_continuation: false,
        }
    }

    fn box_ids(count: usize) -> Vec<BoxId> {
        let mut tree = BoxTree::new();
        (0..count)
            .map(|_| tree.new_block_container(servo_arc::Arc::new(ComputedValues::default())))
            .collect()
    }

    #[test]
    fn test_band_beside_start_float() {
        let ids = box_ids(1);
        let mut floats = FloatContext::new(px(300));
        let placement = floats.place_float(&float_info(ids[0], 100, 50, FloatSide::InlineStart), None, true);
        assert_eq!(placement, FloatPlacement::Placed(LogicalVec2::zero()));

        let area = floats.available_space(Au::zero(), FlowAreaQuery::BandFromPoint);
        assert!(area.has_floats);
        assert_eq!(area.rect.start_corner.inline, px(100));
        assert_eq!(area.rect.size.inline, px(200));
        assert_eq!(area.rect.size.block, px(50));

        let below = floats.available_space(px(50), FlowAreaQuery::BandFromPoint);
        assert!(!below.has_floats);
        assert_eq!(below.rect.size.inline, px(300));
    }

    #[test]
    fn test_width_within_height_intersects_bands() {
        let ids = box_ids(2);
        let mut floats = FloatContext::new(px(300));
        floats.place_float(&float_info(ids[0], 50, 20, FloatSide::InlineStart), None, true);
        floats.set_ceiling_from_non_floats(px(20));
        floats.place_float(&float_info(ids[1], 80, 20, FloatSide::InlineEnd), None, true);

        let area = floats.available_space(px(10), FlowAreaQuery::WidthWithinHeight(px(20)));
        assert_eq!(area.rect.start_corner.inline, px(50));
        assert_eq!(area.rect.size.inline, px(170));
    }

    #[test]
    fn test_floats_stack_and_wrap() {
        let ids = box_ids(3);
        let mut floats = FloatContext::new(px(300));
        floats.place_float(&float_info(ids[0], 200, 30, FloatSide::InlineStart), None, true);
        let second = floats.place_float(&float_info(ids[1], 150, 30, FloatSide::InlineStart), None, true);
        // Doesn't fit beside the first one, so it goes below it.
        assert_eq!(
            second,
            FloatPlacement::Placed(LogicalVec2 {
                inline: Au::zero(),
                block: px(30)
            })
        );
        let third = floats.place_float(&float_info(ids[2], 100, 10, FloatSide::InlineEnd), None, true);
        // Rule 6: never above an earlier float.
        assert_eq!(
            third,
            FloatPlacement::Placed(LogicalVec2 {
                inline: px(200),
                block: px(30)
            })
        );
    }

    #[test]
    fn test_clear_floats() {
        let ids = box_ids(2);
        let mut floats = FloatContext::new(px(300));
        floats.place_float(&float_info(ids[0], 100, 50, FloatSide::InlineStart), None, true);
        floats.place_float(&float_info(ids[1], 100, 70, FloatSide::InlineEnd), None, true);
        assert_eq!(floats.clear_floats(px(10), Clear::InlineStart), px(50));
        assert_eq!(floats.clear_floats(px(10), Clear::Both), px(70));
        assert_eq!(floats.clear_floats(px(90), Clear::Both), px(90));
        assert_eq!(floats.clear_floats(px(10), Clear::None), px(10));
    }

    #[test]
    fn test_translation_and_walls() {
        let ids = box_ids(1);
        let mut floats = FloatContext::new(px(300));
        floats.place_float(&float_info(ids[0], 100, 50, FloatSide::InlineStart), None, true);

        let delta = LogicalVec2 {
            inline: px(20),
            block: px(30),
        };
        floats.translate(delta);
        let walls = floats.replace_walls(Au::zero(), px(260));
        let area = floats.available_space(Au::zero(), FlowAreaQuery::BandFromPoint);
        assert_eq!(area.rect.start_corner.inline, px(80));
        assert_eq!(area.rect.size.inline, px(180));
        assert_eq!(area.rect.size.block, px(20));

        floats.restore_walls(walls);
        floats.translate(-delta);
        assert_eq!(floats.origin(), LogicalVec2::zero());
    }

    #[test]
    fn test_snapshot_restore() {
        let ids = box_ids(1);
        let mut floats = FloatContext::new(px(300));
        let snapshot = floats.snapshot();
        floats.place_float(&float_info(ids[0], 100, 50, FloatSide::InlineStart), None, true);
        floats.include_in_damage(Au::zero()..px(50));
        assert!(floats.has_floats());

        floats.restore(&snapshot);
        assert!(!floats.has_floats());
        assert!(!floats.has_damage());
        let area = floats.available_space(Au::zero(), FlowAreaQuery::BandFromPoint);
        assert!(!area.has_floats);
    }

    #[test]
    fn test_float_pushed_past_fragmentainer_end() {
        let ids = box_ids(3);
        let mut floats = FloatContext::new(px(300));
        floats.set_ceiling_from_non_floats(px(80));
        let placement = floats.place_float(&float_info(ids[0], 100, 50, FloatSide::InlineStart), Some(px(100)), false);
        assert_eq!(placement, FloatPlacement::Pushed);
        assert!(!floats.has_floats());
        assert!(floats.has_pushed_floats());

        // A later float that would fit is pushed too, to keep floats in order.
        let placement = floats.place_float(&float_info(ids[2], 10, 5, FloatSide::InlineEnd), Some(px(100)), false);
        assert_eq!(placement, FloatPlacement::Pushed);

        let placement = floats.place_float(&float_info(ids[1], 100, 50, FloatSide::InlineStart), Some(px(100)), true);
        assert!(matches!(placement, FloatPlacement::Placed(_)));
    }

    #[test]
    fn test_damage_ranges_merge() {
        let mut damage = FloatDamage::default();
        damage.include(px(0)..px(10));
        damage.include(px(30)..px(40));
        damage.include(px(5)..px(20));
        assert!(damage.intersects(&(px(15)..px(16))));
        assert!(!damage.intersects(&(px(21)..px(29))));
        assert!(damage.intersects(&(px(35)..px(35))));
        damage.clear();
        assert!(damage.is_empty());
    }

    #[test]
    fn test_placement_among_floats() {
        let ids = box_ids(1);
        let mut floats = FloatContext::new(px(300));
        floats.place_float(&float_info(ids[0], 100, 50, FloatSide::InlineStart), None, true);

        let pbm = PaddingBorderMargin::zero();
        let narrow = LogicalVec2 {
            inline: px(150),
            block: px(10),
        };
        let rect = PlacementAmongFloats::new(&floats, Au::zero(), narrow, &pbm).place();
        assert_eq!(rect.start_corner.inline, px(100));
        assert_eq!(rect.start_corner.block, Au::zero());

        let wide = LogicalVec2 {
            inline: px(250),
            block: px(10),
        };
        let rect = PlacementAmongFloats::new(&floats, Au::zero(), wide, &pbm).place();
        assert_eq!(rect.start_corner.block, px(50));
        assert_eq!(rect.start_corner.inline, Au::zero());
    }

    #[test]
    fn test_bands_split_and_narrow() {
        let mut bands = FloatBands::new();
        bands.split_at(px(10));
        bands.split_at(px(30));
        bands.split_at(px(10));
        bands.narrow(&(px(10)..px(30)), FloatSide::InlineStart, px(40));
        bands.split_at(px(20));
        bands.narrow(&(px(20)..px(50)), FloatSide::InlineEnd, px(200));

        assert_eq!(bands.band_at(px(5)).inline_start, None);
        assert_eq!(bands.band_at(px(15)).top, px(10));
        assert_eq!(bands.band_at(px(15)).inline_start, Some(px(40)));
        assert_eq!(bands.band_at(px(25)).inline_end, Some(px(200)));
        assert_eq!(bands.band_after(px(10)).top, px(20));
        assert_eq!(bands.band_after(px(30)).top, MAX_AU);

        let free = bands.intersect(px(15)..px(25));
        assert_eq!(free.top, px(15));
        assert_eq!(free.inline_start, Some(px(40)));
        assert_eq!(free.inline_end, Some(px(200)));
    }
}
