/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-container, per-pass reflow state: the block cursor, the margin collapsing
//! accumulator and fragmentation bookkeeping.

use app_units::Au;
use bitflags::bitflags;
use log::trace;
use num_traits::Zero;

use crate::box_tree::BoxId;
use crate::flow::float::{
    Clear, FloatContext, FloatContextSnapshot, FloatRegion, FloatSide, PlacementAmongFloats,
};
use crate::flow::lines::MarginState;
use crate::flow::Completeness;
use crate::fragment_tree::CollapsedMargin;
use crate::geom::{LogicalRect, LogicalSides, LogicalVec2, WritingMode};
use crate::style::PaddingBorderMargin;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct BlockReflowFlags: u8 {
        /// The block-start margin of the container does not collapse with its children.
        const IS_BSTART_MARGIN_ROOT = 1 << 0;
        /// The block-end margin of the container does not collapse with its children.
        const IS_BEND_MARGIN_ROOT = 1 << 1;
        /// Block-start margins of children turn into space instead of collapsing through
        /// the container's own block-start margin.
        const SHOULD_APPLY_BSTART_MARGIN = 1 << 2;
        /// The container established the float context it lays out with.
        const IS_FLOAT_CONTEXT_OWNER = 1 << 3;
        /// Nothing that takes up space has been placed in the current fragment yet.
        const HAS_LINE_ADJACENT_TO_TOP = 1 << 4;
    }
}

/// Everything [`BlockReflowState::restore`] needs to undo a speculative line or child.
pub(crate) struct SavedReflowState {
    floats: FloatContextSnapshot,
    margin: MarginState,
    collapsed_start_margin: CollapsedMargin,
    flags: BlockReflowFlags,
    float_break_type: Clear,
    float_regions: usize,
    pushed_floats: usize,
    impacted_by_floats: bool,
}

pub(crate) struct BlockReflowState<'f> {
    pub container: BoxId,
    pub floats: &'f mut FloatContext,
    pub flags: BlockReflowFlags,
    pub writing_mode: WritingMode,
    /// Border and padding of this fragment. The block-start side is zero for
    /// continuations.
    pub border_padding: LogicalSides<Au>,
    /// The content box inline extent, and the block position where content starts,
    /// relative to the container's border box.
    pub content_inline_start: Au,
    pub content_inline_size: Au,
    pub content_block_start: Au,
    /// The computed content block size, when definite. Children resolve percentages
    /// against it.
    pub containing_block_block_size: Option<Au>,
    /// The block position below the last content that does not collapse.
    pub b_coord: Au,
    /// Margins seen since `b_coord`, not yet resolved into space.
    pub prev_margin: CollapsedMargin,
    /// The container's own block-start margin collapsed with the margins of children
    /// it adjoins.
    pub collapsed_start_margin: CollapsedMargin,
    /// The end of the space available in this fragment, relative to the border box.
    /// `None` when not fragmenting.
    pub fragmentainer_limit: Option<Au>,
    pub completeness: Completeness,
    pub next_in_flow: Option<BoxId>,
    /// Floats to clear before the next line, set by a line break with `clear`.
    pub float_break_type: Clear,
    /// Floats met on the current line that go below it once it is placed.
    pub below_current_line_floats: Vec<BoxId>,
    /// Floats that did not fit in this fragment.
    pub pushed_floats: Vec<BoxId>,
    /// Floats placed or recovered directly in this container during this pass, relative
    /// to the formatting context.
    pub float_regions: Vec<FloatRegion>,
    pub float_regions_last_pass: Vec<FloatRegion>,
    pub impacted_by_floats: bool,
    pub depth: usize,
    pub trace: bool,
}

impl<'f> BlockReflowState<'f> {
    pub(crate) fn margin_state(&self) -> MarginState {
        MarginState {
            b_coord: self.b_coord,
            prev_margin: self.prev_margin,
            apply_start_margin: self.should_apply_start_margin(),
        }
    }

    pub(crate) fn set_margin_state(&mut self, margin_state: MarginState) {
        self.b_coord = margin_state.b_coord;
        self.prev_margin = margin_state.prev_margin;
        self.flags.set(
            BlockReflowFlags::SHOULD_APPLY_BSTART_MARGIN,
            margin_state.apply_start_margin,
        );
    }

    pub(crate) fn should_apply_start_margin(&self) -> bool {
        self.flags
            .contains(BlockReflowFlags::SHOULD_APPLY_BSTART_MARGIN)
    }

    /// Content was found, so margins seen so far belong to the container's block-start
    /// margin and later margins turn into space.
    pub(crate) fn apply_start_margin(&mut self) {
        if self.should_apply_start_margin() {
            return;
        }
        self.collapsed_start_margin
            .adjoin_assign(&self.prev_margin);
        self.prev_margin = CollapsedMargin::zero();
        self.flags
            .insert(BlockReflowFlags::SHOULD_APPLY_BSTART_MARGIN);
    }

    pub(crate) fn is_at_top_of_fragment(&self) -> bool {
        self.flags
            .contains(BlockReflowFlags::HAS_LINE_ADJACENT_TO_TOP)
    }

    pub(crate) fn note_content_placed(&mut self) {
        self.flags
            .remove(BlockReflowFlags::HAS_LINE_ADJACENT_TO_TOP);
    }

    /// The block position of the top of the next non-empty line.
    pub(crate) fn line_top(&self) -> Au {
        if self.should_apply_start_margin() {
            self.b_coord + self.prev_margin.solve()
        } else {
            self.b_coord
        }
    }

    /// Moves the cursor below a placed line.
    pub(crate) fn advance_past_line(&mut self, line_top: Au, line_block_size: Au) {
        self.apply_start_margin();
        self.b_coord = line_top + line_block_size;
        self.prev_margin = CollapsedMargin::zero();
        self.floats.set_ceiling_from_non_floats(line_top);
    }

    /// Moves the cursor below a block child that does not collapse through.
    pub(crate) fn advance_past_block(&mut self, border_top: Au, block_size: Au, end_margin: CollapsedMargin) {
        self.b_coord = border_top + block_size;
        self.prev_margin = end_margin;
        self.floats.set_ceiling_from_non_floats(border_top);
    }

    /// The block position of the block-start border edge of a child with the given
    /// block-start margin, were it not to clear anything.
    pub(crate) fn position_without_clearance(&self, block_start_margin: &CollapsedMargin) -> Au {
        if self.should_apply_start_margin() {
            self.b_coord + self.prev_margin.adjoin(block_start_margin).solve()
        } else {
            self.b_coord
        }
    }

    /// Computes the position of the block-start border edge of an element
    /// with the provided `block_start_margin`, assuming a clearance of 0px.
    pub(crate) fn position_with_zero_clearance(&self, block_start_margin: &CollapsedMargin) -> Au {
        // Clearance prevents `prev_margin` and `block_start_margin` from being
        // adjoining, so we need to solve them separately and then sum.
        self.b_coord + self.prev_margin.solve() + block_start_margin.solve()
    }

    /// Returns the block-end outer edge of the lowest float that is to be cleared (if any)
    /// by an element with the provided `clear` and `block_start_margin`.
    pub(crate) fn calculate_clear_position(&self, clear: Clear, block_start_margin: &CollapsedMargin) -> Option<Au> {
        let clear_position = self.floats.clear_position(clear)?;

        // Calculate the hypothetical position where the element's top border edge
        // would have been if the element's `clear` property had been `none`.
        let hypothetical_block_position = self.position_without_clearance(block_start_margin);
        if hypothetical_block_position >= clear_position {
            None
        } else {
            Some(clear_position)
        }
    }

    /// Returns the amount of clearance (if any) that a block with the given `clear` value
    /// needs to have. <https://www.w3.org/TR/2011/REC-CSS2-20110607/visuren.html#flow-control>
    pub(crate) fn calculate_clearance(&self, clear: Clear, block_start_margin: &CollapsedMargin) -> Option<Au> {
        self.calculate_clear_position(clear, block_start_margin)
            .map(|offset| offset - self.position_with_zero_clearance(block_start_margin))
    }

    /// A block that establishes an independent formatting context can't overlap floats,
    /// it has to be placed next to them, and may get some clearance if there isn't enough
    /// space. Returns the clearance (which includes both the effect of `clear` and the
    /// extra space to avoid floats) and the placement among floats.
    pub(crate) fn calculate_clearance_and_inline_adjustment<'a>(
        &'a self,
        clear: Clear,
        block_start_margin: &CollapsedMargin,
        pbm: &PaddingBorderMargin,
        object_size: LogicalVec2<Au>,
    ) -> (Option<Au>, Au, PlacementAmongFloats<'a>) {
        let clear_position = self.calculate_clear_position(clear, block_start_margin);
        let ceiling = clear_position.unwrap_or_else(|| self.position_without_clearance(block_start_margin));
        let placement = PlacementAmongFloats::new(self.floats, ceiling, object_size, pbm);
        (clear_position, ceiling, placement)
    }

    /// The clearance of a block placed at `position` by [`PlacementAmongFloats`].
    pub(crate) fn clearance_for_placement(
        &self,
        clear_position: Option<Au>,
        ceiling: Au,
        position: Au,
        block_start_margin: &CollapsedMargin,
    ) -> Option<Au> {
        let has_clearance = clear_position.is_some() || position > ceiling;
        has_clearance.then(|| position - self.position_with_zero_clearance(block_start_margin))
    }

    /// The space left in this fragment below `block_position`.
    pub(crate) fn available_block_size_at(&self, block_position: Au) -> Option<Au> {
        self.fragmentainer_limit
            .map(|limit| (limit - block_position).max(Au::zero()))
    }

    /// Whether a line or child ending at `block_end` must move to the next fragment.
    pub(crate) fn crosses_fragmentainer_end(&self, block_end: Au) -> bool {
        self.fragmentainer_limit
            .is_some_and(|limit| block_end > limit) &&
            !self.is_at_top_of_fragment()
    }

    /// Records a float placed or recovered in this container and compares it with the
    /// previous pass, damaging the ranges it moved between.
    pub(crate) fn note_float_region(&mut self, margin_rect: LogicalRect<Au>, side: FloatSide, box_id: BoxId) {
        let origin = self.floats.origin();
        let region = FloatRegion {
            rect: margin_rect.translate(origin),
            side,
            is_continuation: false,
            box_id,
        };
        let previous = self
            .float_regions_last_pass
            .iter()
            .find(|previous| previous.box_id == box_id);
        match previous {
            Some(previous) if previous.rect == region.rect => {},
            Some(previous) => {
                let old_range = previous.rect.block_range();
                self.floats
                    .include_in_damage(old_range.start - origin.block..old_range.end - origin.block);
                self.floats
                    .include_in_damage(margin_rect.block_range());
            },
            None => self
                .floats
                .include_in_damage(margin_rect.block_range()),
        }
        self.float_regions.push(region);
        self.impacted_by_floats = true;
    }

    /// Damages the ranges of floats placed by the previous pass that this pass did not
    /// place again.
    pub(crate) fn damage_vanished_floats(&mut self) {
        let origin = self.floats.origin();
        for previous in self.float_regions_last_pass.iter() {
            if self
                .float_regions
                .iter()
                .any(|region| region.box_id == previous.box_id)
            {
                continue;
            }
            if self.trace {
                trace!("Float {:?} vanished from {:?}", previous.box_id, self.container);
            }
            let range = previous.rect.block_range();
            self.floats
                .include_in_damage(range.start - origin.block..range.end - origin.block);
        }
    }

    pub(crate) fn save(&self) -> SavedReflowState {
        SavedReflowState {
            floats: self.floats.snapshot(),
            margin: self.margin_state(),
            collapsed_start_margin: self.collapsed_start_margin,
            flags: self.flags,
            float_break_type: self.float_break_type,
            float_regions: self.float_regions.len(),
            pushed_floats: self.pushed_floats.len(),
            impacted_by_floats: self.impacted_by_floats,
        }
    }

    pub(crate) fn restore(&mut self, saved: &SavedReflowState) {
        self.floats.restore(&saved.floats);
        self.flags = saved.flags;
        self.set_margin_state(saved.margin);
        self.collapsed_start_margin = saved.collapsed_start_margin;
        self.float_break_type = saved.float_break_type;
        self.float_regions.truncate(saved.float_regions);
        self.pushed_floats.truncate(saved.pushed_floats);
        self.impacted_by_floats = saved.impacted_by_floats;
        self.below_current_line_floats.clear();
    }
}
