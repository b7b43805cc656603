/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Block container layout.
//!
//! A block container is laid out one line at a time. Block lines hold a single
//! block-level child, which is laid out recursively; inline lines hold a run of
//! inline-level children, laid out by [`inline`]. Lines that nothing invalidated are
//! slid into place instead of being laid out again.

use std::mem;
use std::ops::Range;

use app_units::Au;
use log::{debug, trace};
use num_traits::Zero;
use serde::Serialize;

use crate::box_tree::{BoxFlags, BoxId, BoxKind, BoxTree};
use crate::context::LayoutContext;
use crate::flow::float::{
    Clear, FloatContext, FloatPlacement, FloatRegion, FloatSide, FlowAreaQuery, PlacementInfo,
};
use crate::flow::lines::{BreakType, LineBox, LineFlags, LineIndex, LineList, MarginState};
use crate::flow::reflow_state::{BlockReflowFlags, BlockReflowState};
use crate::fragment_tree::{CollapsedBlockMargins, CollapsedMargin, OverflowAreas};
use crate::geom::{LogicalRect, LogicalVec2};
use crate::sizing::{outer_inline_content_sizes, ContentSizes};
use crate::style::{AuOrAuto, ComputedValues, PaddingBorderMargin};

pub mod float;
pub mod fragmentation;
pub mod inline;
pub mod lines;
pub(crate) mod reflow_state;
pub mod verify;

/// Nesting depth past which start margins are no longer collapsed speculatively through
/// descendants, and past which intrinsic sizes are not computed.
pub(crate) const MAX_DEPTH_FOR_SPECULATIVE_MARGINS: usize = 32;

/// Lines pushed to the next fragment, with the children they cover.
#[derive(Debug, Default, Serialize)]
pub struct OverflowContent {
    pub lines: LineList,
    pub children: Vec<BoxId>,
}

/// The layout state a block container keeps between reflows.
#[derive(Debug, Default, Serialize)]
pub struct BlockContainerData {
    pub(crate) lines: LineList,
    /// Floats placed from the inline lines of this fragment.
    pub(crate) floats: Vec<BoxId>,
    /// Floats that did not fit in this fragment. The next fragment places them first.
    pub(crate) pushed_floats: Vec<BoxId>,
    /// Lines that did not fit in this fragment, waiting for the next-in-flow to take them.
    pub(crate) overflow: Option<OverflowContent>,
    #[serde(skip)]
    pub(crate) content_sizes: Option<ContentSizes>,
    pub(crate) last_available_inline_size: Option<Au>,
    pub(crate) last_bfc_origin: Option<LogicalVec2<Au>>,
    pub(crate) float_regions_last_pass: Vec<FloatRegion>,
    /// Block ranges covered by floats removed from the tree since the last reflow.
    pub(crate) removed_float_damage: Vec<Range<Au>>,
    /// Set on the placeholder left in the tree while the real data is out for reflow.
    pub(crate) in_reflow: bool,
    /// The part of the computed content block size taken up by this fragment.
    pub(crate) fragment_content_block_size: Au,
}

impl BlockContainerData {
    pub fn lines(&self) -> &LineList {
        &self.lines
    }

    pub fn floats(&self) -> &[BoxId] {
        &self.floats
    }

    pub fn pushed_floats(&self) -> &[BoxId] {
        &self.pushed_floats
    }

    pub fn overflow(&self) -> Option<&OverflowContent> {
        self.overflow.as_ref()
    }
}

/// The constraints a block container is laid out with.
#[derive(Clone, Debug)]
pub struct ReflowInput {
    pub containing_block_inline_size: Au,
    /// The definite block size of the containing block, for percentages.
    pub containing_block_block_size: Option<Au>,
    /// The inline size of the border box.
    pub inline_size: Au,
    /// Space left in the fragmentainer below the block-start border edge, or `None` when
    /// not fragmenting.
    pub available_block_size: Option<Au>,
    /// Whether nothing has been placed in the current fragment above this box.
    pub is_top_of_fragment: bool,
    pub depth: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Completeness {
    #[default]
    Complete,
    /// Some in-flow content continues in the next fragment.
    NotComplete,
    /// The box itself is complete, but floats it placed continue in the next fragment.
    OverflowIncomplete,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        *self == Completeness::Complete
    }
}

/// Where layout continues in the next fragment.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResumePoint {
    /// The first child pushed to the next-in-flow.
    pub first_child: Option<BoxId>,
    pub pushed_floats: Vec<BoxId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReflowStatus {
    pub completeness: Completeness,
    pub next_in_flow: Option<BoxId>,
    pub resume: Option<ResumePoint>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReflowOutput {
    /// The block size of the border box of this fragment.
    pub block_size: Au,
    pub margins: CollapsedBlockMargins,
    pub status: ReflowStatus,
    /// Relative to the block-start border edge.
    pub first_baseline: Option<Au>,
    pub last_baseline: Option<Au>,
    pub overflow: OverflowAreas,
    pub impacted_by_floats: bool,
    /// Floats that did not fit in this fragment and must be placed by an ancestor's
    /// next fragment.
    pub pushed_floats: Vec<BoxId>,
    /// The reflow stopped early and left dirty lines behind.
    pub interrupted: bool,
}

/// What the driver does after a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineOutcome {
    Continue,
    /// The line at this index and everything after it go to the next fragment.
    PushFrom(LineIndex),
    /// The reflow was interrupted inside the line.
    Interrupted,
}

/// Lays out the root of a box tree. The root establishes the block formatting context
/// that contains every float not inside a nested one.
///
/// With `available_block_size`, the root is fragmented into pages of that size: an
/// incomplete root gets a continuation, which the caller lays out as the next page.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "reflow_root", skip_all, fields(servo_profiling = true), level = "trace")
)]
pub fn reflow_root(
    tree: &mut BoxTree,
    context: &LayoutContext,
    root: BoxId,
    containing_block_inline_size: Au,
    available_block_size: Option<Au>,
) -> ReflowOutput {
    let style = tree.style(root).clone();
    let mode = style.writing_mode;
    let pbm = style.padding_border_margin(containing_block_inline_size, mode);
    let (inline_size, (margin_inline_start, margin_inline_end)) =
        block_level_inline_size(&style, &pbm, containing_block_inline_size);
    let is_continuation = tree.get(root).prev_in_flow().is_some();
    let margin_block_start = match is_continuation {
        true => Au::zero(),
        false => pbm.margin.block_start.auto_is(Au::zero),
    };

    let mut floats = FloatContext::new(containing_block_inline_size);
    floats.set_trace(context.debug().trace_float_manager);
    let offset = LogicalVec2 {
        inline: margin_inline_start,
        block: margin_block_start,
    };
    floats.translate(offset);

    let input = ReflowInput {
        containing_block_inline_size,
        containing_block_block_size: None,
        inline_size,
        available_block_size: available_block_size.map(|size| (size - margin_block_start).max(Au::zero())),
        is_top_of_fragment: true,
        depth: 0,
    };
    let mut output = reflow_block_container(tree, context, &mut floats, root, &input);

    let geometry = tree.geometry_mut(root);
    geometry.border_rect.start_corner = offset;
    geometry.margin.inline_start = margin_inline_start;
    geometry.margin.inline_end = margin_inline_end;

    if !output.status.completeness.is_complete() && !output.interrupted {
        let next = match tree.get(root).next_in_flow() {
            Some(next) => next,
            None => tree.create_block_continuation(root),
        };
        output.status.next_in_flow = Some(next);
    }

    if context.debug().verify_line_invariants {
        verify::verify_line_invariants(tree, root);
    }
    if context.debug().dump_line_lists {
        verify::dump_line_lists(tree, root);
    }
    output
}

/// Whether the block-end margin of a container with this style never collapses with the
/// margins of its last children.
fn is_block_end_margin_root(style: &ComputedValues, pbm: &PaddingBorderMargin, containing_block_block_size: Option<Au>) -> bool {
    let mode = style.writing_mode;
    style.establishes_block_formatting_context() ||
        pbm.padding_border().block_end != Au::zero() ||
        style
            .box_size(mode)
            .block
            .maybe_resolve(containing_block_block_size)
            .is_some() ||
        style
            .min_box_size(mode)
            .block
            .maybe_resolve(containing_block_block_size)
            .is_some_and(|size| size > Au::zero())
}

/// Lays out a block container and its descendants in the current fragment.
///
/// `floats` is the float context the container places floats in, with its origin at the
/// container's border box.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "reflow_block_container", skip_all, fields(servo_profiling = true), level = "trace")
)]
pub(crate) fn reflow_block_container(
    tree: &mut BoxTree,
    context: &LayoutContext,
    floats: &mut FloatContext,
    container: BoxId,
    input: &ReflowInput,
) -> ReflowOutput {
    let style = tree.style(container).clone();
    let mode = style.writing_mode;
    let is_root = tree.parent(container).is_none();
    let is_bfc_root = is_root || style.establishes_block_formatting_context();
    let is_first_fragment = tree.get(container).prev_in_flow().is_none();
    let container_is_dirty = tree.get(container).flags().contains(BoxFlags::IS_DIRTY);
    let trace = context.debug().trace_reflow;
    if trace {
        trace!("Reflowing {container:?} at depth {} with {input:?}", input.depth);
    }

    let pbm = style.padding_border_margin(input.containing_block_inline_size, mode);
    let mut border_padding = pbm.padding_border();
    if !is_first_fragment {
        border_padding.block_start = Au::zero();
    }
    let own_margin = pbm.margin_or_zero();

    let mut data = tree.take_block_container_data(container);
    data.in_reflow = false;
    let floats_from_previous_fragment = fragmentation::take_pushed_content(tree, container, &mut data);

    let content_inline_start = border_padding.inline_start;
    let content_inline_size = (input.inline_size - pbm.padding_border_sums.inline).max(Au::zero());
    let walls = floats.replace_walls(content_inline_start, content_inline_start + content_inline_size);

    let computed_block_size = style
        .box_size(mode)
        .block
        .maybe_resolve(input.containing_block_block_size);
    let min_block_size = style
        .min_box_size(mode)
        .block
        .maybe_resolve(input.containing_block_block_size)
        .unwrap_or(Au::zero());
    let max_block_size = style
        .max_box_size(mode)
        .block
        .maybe_resolve(input.containing_block_block_size);
    let clamp = |size: Au| {
        let size = match max_block_size {
            Some(max) => size.min(max),
            None => size,
        };
        size.max(min_block_size)
    };

    mark_dirty_lines(
        tree,
        context,
        &style,
        &mut data,
        floats,
        container_is_dirty,
        content_inline_start..content_inline_start + content_inline_size,
    );

    let is_bstart_margin_root = is_bfc_root || !is_first_fragment || border_padding.block_start != Au::zero();
    let mut flags = BlockReflowFlags::empty();
    flags.set(BlockReflowFlags::IS_BSTART_MARGIN_ROOT, is_bstart_margin_root);
    flags.set(BlockReflowFlags::SHOULD_APPLY_BSTART_MARGIN, is_bstart_margin_root);
    flags.set(BlockReflowFlags::IS_FLOAT_CONTEXT_OWNER, is_bfc_root);
    flags.set(
        BlockReflowFlags::IS_BEND_MARGIN_ROOT,
        is_root || is_block_end_margin_root(&style, &pbm, input.containing_block_block_size),
    );
    flags.set(BlockReflowFlags::HAS_LINE_ADJACENT_TO_TOP, input.is_top_of_fragment);

    floats.set_ceiling_from_non_floats(border_padding.block_start);
    let next_in_flow = tree.get(container).next_in_flow();
    let mut state = BlockReflowState {
        container,
        floats,
        flags,
        writing_mode: mode,
        border_padding,
        content_inline_start,
        content_inline_size,
        content_block_start: border_padding.block_start,
        containing_block_block_size: computed_block_size.map(clamp),
        b_coord: border_padding.block_start,
        prev_margin: CollapsedMargin::zero(),
        collapsed_start_margin: match is_first_fragment {
            true => CollapsedMargin::new(own_margin.block_start),
            false => CollapsedMargin::zero(),
        },
        fragmentainer_limit: input.available_block_size,
        completeness: Completeness::Complete,
        next_in_flow,
        float_break_type: Clear::None,
        below_current_line_floats: Vec::new(),
        pushed_floats: Vec::new(),
        float_regions: Vec::new(),
        float_regions_last_pass: mem::take(&mut data.float_regions_last_pass),
        impacted_by_floats: false,
        depth: input.depth,
        trace,
    };

    // Floats pushed from the previous fragment go first.
    for float in floats_from_previous_fragment {
        place_float(tree, &mut state, float);
    }

    let mut interrupted = false;
    let mut push_from = None;
    let mut index = 0;
    loop {
        let Some(line) = data.lines.get(index) else {
            if fragmentation::pull_line(tree, &mut data, container, next_in_flow) {
                continue;
            }
            break;
        };

        let first_child = line.first_child;
        if tree.parent(first_child) != Some(container) ||
            tree.get(first_child).flags().contains(BoxFlags::DETACHED)
        {
            data.lines.remove(index);
            if let Some(previous) = index.checked_sub(1).and_then(|index| data.lines.get_mut(index)) {
                if previous.is_inline() {
                    previous.mark_dirty();
                }
            }
            continue;
        }

        let entry = state.margin_state();
        if let Some(delta) = clean_line_delta(&state, line, entry) {
            skip_clean_line(tree, &mut state, &mut data.lines, index, delta);
            index += 1;
            continue;
        }

        if context.should_interrupt() {
            if trace {
                trace!("Interrupted {container:?} before line {index}");
            }
            interrupted = true;
            break;
        }

        let outcome = match line.is_block() {
            true => reflow_block_line(tree, context, &mut state, &mut data, index),
            false => {
                let is_first_formatted_line = index == 0 && is_first_fragment;
                inline::reflow_inline_line(tree, context, &mut state, &mut data.lines, index, is_first_formatted_line)
            },
        };
        match outcome {
            LineOutcome::Continue => index += 1,
            LineOutcome::PushFrom(first_pushed) => {
                push_from = Some(first_pushed);
                break;
            },
            LineOutcome::Interrupted => {
                interrupted = true;
                index += 1;
                break;
            },
        }
    }

    if interrupted {
        slide_unvisited_lines(tree, &mut state, &mut data.lines, index);
    }
    let mut first_pushed_child = None;
    if let Some(first_pushed) = push_from {
        first_pushed_child = fragmentation::push_lines(tree, &mut data, container, first_pushed);
        if first_pushed_child.is_some() {
            state.completeness = Completeness::NotComplete;
        }
    }
    state.damage_vanished_floats();

    // Size the container.
    let is_bend_margin_root = state.flags.contains(BlockReflowFlags::IS_BEND_MARGIN_ROOT) ||
        state.completeness == Completeness::NotComplete;
    let applies_start_margin = state.should_apply_start_margin();
    let mut content_block_end = state.b_coord;
    if is_bend_margin_root && applies_start_margin {
        content_block_end += state.prev_margin.solve();
    }
    if is_bfc_root {
        if let Some(clear_position) = state.floats.clear_position(Clear::Both) {
            content_block_end.max_assign(clear_position);
        }
    }
    let auto_content_block_size = (content_block_end - state.content_block_start).max(Au::zero());
    let consumed = fragmentation::consumed_content_block_size(tree, container);
    let mut fragment_content_block_size = match computed_block_size {
        Some(size) => (clamp(size) - consumed).max(Au::zero()),
        None => {
            let mut size = auto_content_block_size;
            if let Some(max) = max_block_size {
                size.min_assign((max - consumed).max(Au::zero()));
            }
            if state.completeness != Completeness::NotComplete {
                size.max_assign(min_block_size - consumed);
            }
            size
        },
    };
    if let Some(limit) = input.available_block_size {
        let available = (limit - state.content_block_start).max(Au::zero());
        let has_progress = !input.is_top_of_fragment || available > Au::zero();
        if fragment_content_block_size > available && computed_block_size.is_some() && has_progress {
            fragment_content_block_size = available;
            state.completeness = Completeness::NotComplete;
        }
    }
    let in_flow_complete = state.completeness != Completeness::NotComplete;
    if !in_flow_complete {
        border_padding.block_end = Au::zero();
    }
    let block_size = state.content_block_start + fragment_content_block_size + border_padding.block_end;

    // Margins.
    let own_block_end_margin = match in_flow_complete {
        true => own_margin.block_end,
        false => Au::zero(),
    };
    let mut start_margin = state.collapsed_start_margin;
    let mut end_margin = CollapsedMargin::new(own_block_end_margin);
    if !applies_start_margin {
        start_margin.adjoin_assign(&state.prev_margin);
    }
    if !is_bend_margin_root {
        end_margin.adjoin_assign(&state.prev_margin);
    }
    let collapsed_through = !applies_start_margin &&
        !is_bend_margin_root &&
        fragment_content_block_size == Au::zero() &&
        block_size == Au::zero();
    if is_bstart_margin_root {
        start_margin = CollapsedMargin::new(match is_first_fragment {
            true => own_margin.block_start,
            false => Au::zero(),
        });
    }
    let margins = CollapsedBlockMargins {
        collapsed_through,
        start: start_margin,
        end: end_margin,
    };

    // Floats that did not fit.
    let mut pushed_floats = mem::take(&mut state.pushed_floats);
    if !pushed_floats.is_empty() {
        if !in_flow_complete {
            data.pushed_floats = mem::take(&mut pushed_floats);
        } else if is_bfc_root {
            state.completeness = Completeness::OverflowIncomplete;
            data.pushed_floats = mem::take(&mut pushed_floats);
        }
    }

    let first_baseline = data
        .lines
        .iter()
        .find_map(|line| line.baseline);
    let last_baseline = data
        .lines
        .iter()
        .filter_map(|line| line.baseline)
        .last();
    let border_rect = LogicalRect {
        start_corner: LogicalVec2::zero(),
        size: LogicalVec2 {
            inline: input.inline_size,
            block: block_size,
        },
    };
    let mut overflow = OverflowAreas::from_rect(border_rect);
    for line in data.lines.iter() {
        overflow.union(&line.overflow);
    }

    data.floats = data
        .lines
        .iter()
        .filter(|line| line.is_inline())
        .flat_map(|line| line.floats.iter().copied())
        .collect();
    data.last_available_inline_size = Some(content_inline_size);
    data.last_bfc_origin = Some(state.floats.origin());
    data.float_regions_last_pass = mem::take(&mut state.float_regions);
    data.fragment_content_block_size = fragment_content_block_size;
    let impacted_by_floats = state.impacted_by_floats;
    let completeness = state.completeness;
    state.floats.restore_walls(walls);

    let mut padding = pbm.padding;
    let mut border = pbm.border;
    if !is_first_fragment {
        padding.block_start = Au::zero();
        border.block_start = Au::zero();
    }
    if !in_flow_complete {
        padding.block_end = Au::zero();
        border.block_end = Au::zero();
    }
    let geometry = tree.geometry_mut(container);
    geometry.border_rect.size = border_rect.size;
    geometry.padding = padding;
    geometry.border = border;
    geometry.margin.block_start = match is_first_fragment {
        true => own_margin.block_start,
        false => Au::zero(),
    };
    geometry.margin.block_end = own_block_end_margin;
    geometry.overflow = overflow.clone();
    geometry.first_baseline = first_baseline;
    geometry.last_baseline = last_baseline;

    tree.restore_block_container_data(container, data);
    if interrupted {
        // Only the lines left dirty need work when the reflow resumes.
        tree.get_mut(container)
            .flags
            .insert(BoxFlags::HAS_DIRTY_CHILDREN);
        tree.mark_ancestors_dirty(container);
    } else {
        tree.clear_dirty_bits(container);
        if completeness.is_complete() {
            fragmentation::drop_empty_next_in_flow(tree, container);
        }
    }

    let next_in_flow = tree.get(container).next_in_flow();
    let resume = (!completeness.is_complete()).then(|| ResumePoint {
        first_child: first_pushed_child,
        pushed_floats: tree
            .block_container(container)
            .map(|data| data.pushed_floats.clone())
            .unwrap_or_default(),
    });
    if trace {
        trace!("Reflowed {container:?}: block size {block_size:?}, {completeness:?}");
    }
    ReflowOutput {
        block_size,
        margins,
        status: ReflowStatus {
            completeness,
            next_in_flow,
            resume,
        },
        first_baseline,
        last_baseline,
        overflow,
        impacted_by_floats,
        pushed_floats,
        interrupted,
    }
}

/// Marks the lines that cannot be reused before the main loop runs.
fn mark_dirty_lines(
    tree: &BoxTree,
    context: &LayoutContext,
    style: &ComputedValues,
    data: &mut BlockContainerData,
    floats: &mut FloatContext,
    container_is_dirty: bool,
    content_inline_range: Range<Au>,
) {
    for range in data.removed_float_damage.drain(..) {
        floats.include_in_damage(range);
    }
    let origin_moved = data
        .last_bfc_origin
        .is_some_and(|origin| origin != floats.origin()) &&
        (floats.has_floats() || !data.float_regions_last_pass.is_empty());
    if context.nonincremental() || container_is_dirty || origin_moved || data.last_bfc_origin.is_none() {
        data.lines.mark_all_dirty();
        return;
    }

    let content_inline_size = content_inline_range.end - content_inline_range.start;
    let resized = data.last_available_inline_size != Some(content_inline_size);
    let start_aligned = inline::is_start_aligned(style);
    for index in 0..data.lines.len() {
        let Some(line) = data.lines.get(index) else {
            break;
        };
        let dirty_children = match line.is_block() {
            true => tree.get(line.first_child).needs_reflow(),
            false => line
                .children(tree)
                .any(|child| tree.get(child).needs_reflow()),
        };
        let affected_by_resize = resized &&
            (line.is_block() ||
                line.is_impacted_by_floats() ||
                !start_aligned ||
                line.flags.contains(LineFlags::LINE_WRAPPED) ||
                line.bounds.max_inline_position() > content_inline_range.end);
        if !dirty_children && !affected_by_resize {
            continue;
        }
        let is_inline = line.is_inline();
        if let Some(line) = data.lines.get_mut(index) {
            line.mark_dirty();
        }
        // Content from this line may now fit at the end of the previous one.
        if is_inline && index > 0 {
            if let Some(previous) = data.lines.get_mut(index - 1) {
                if previous.is_inline() {
                    previous.mark_dirty();
                }
            }
        }
    }
}

/// Whether a line laid out in an earlier reflow can be kept, and if so how far it moves.
fn clean_line_delta(state: &BlockReflowState, line: &LineBox, entry: MarginState) -> Option<Au> {
    if line.is_dirty() || line.flags.contains(LineFlags::PREVIOUS_MARGIN_DIRTY) {
        return None;
    }
    let (Some(old_entry), Some(_)) = (line.entry, line.exit) else {
        return None;
    };
    if old_entry.prev_margin != entry.prev_margin ||
        old_entry.apply_start_margin != entry.apply_start_margin ||
        state.float_break_type != Clear::None
    {
        return None;
    }
    let delta = entry.b_coord - old_entry.b_coord;
    if delta != Au::zero() &&
        (line.is_impacted_by_floats() || line.flags.contains(LineFlags::HAS_CLEARANCE))
    {
        return None;
    }

    let old_range = line.bounds.block_range();
    let new_range = old_range.start + delta..old_range.end + delta;
    if state.floats.intersects_damage(old_range.clone()) || state.floats.intersects_damage(new_range.clone()) {
        return None;
    }
    if delta != Au::zero() && state.floats.has_floats() {
        let area = state.floats.available_space(
            new_range.start,
            FlowAreaQuery::WidthWithinHeight(line.bounds.size.block),
        );
        if area.has_floats {
            return None;
        }
    }
    if state.fragmentainer_limit.is_some() {
        if line.break_before == BreakType::Page || line.break_after == BreakType::Page {
            return None;
        }
        if state.crosses_fragmentainer_end(line.block_end() + delta) {
            return None;
        }
    }
    Some(delta)
}

/// Moves the boxes of a line, and the line itself, in the block axis.
fn slide_line(tree: &mut BoxTree, line: &mut LineBox, delta: Au) {
    if delta == Au::zero() {
        return;
    }
    line.slide(delta);
    let children: Vec<BoxId> = line.children(tree).collect();
    for child in children {
        tree.geometry_mut(child).slide(delta);
    }
    for float in line.floats.iter() {
        // Floats directly in the container were moved with the line's children.
        if tree.parent(*float) != tree.parent(line.first_child) {
            tree.geometry_mut(*float).slide(delta);
        }
    }
}

/// Keeps a line from an earlier reflow: slides it into place and replays its effect on
/// the float context and the margin state.
fn skip_clean_line(
    tree: &mut BoxTree,
    state: &mut BlockReflowState,
    lines: &mut LineList,
    index: LineIndex,
    delta: Au,
) {
    let Some(line) = lines.get_mut(index) else {
        return;
    };
    slide_line(tree, line, delta);
    if state.trace {
        trace!("Skipping clean line {index} of {:?}, moved by {delta:?}", state.container);
    }
    recover_line_floats(tree, state, line);
    state
        .collapsed_start_margin
        .adjoin_assign(&line.start_margin_contribution);
    if let Some(exit) = line.exit {
        state.set_margin_state(exit);
    }
    if line.cached_is_empty() != Some(true) {
        state
            .floats
            .set_ceiling_from_non_floats(line.block_start());
        state.note_content_placed();
    }
    if line.is_impacted_by_floats() {
        state.impacted_by_floats = true;
    }
    if let BreakType::Clear(clear) = line.break_after {
        state.float_break_type = clear;
    }
}

/// Registers the floats of a kept line with the float context again.
fn recover_line_floats(tree: &BoxTree, state: &mut BlockReflowState, line: &LineBox) {
    for float in line.floats.iter() {
        let rect = tree.geometry(*float).margin_rect();
        let side = tree
            .style(*float)
            .float_side(state.writing_mode)
            .unwrap_or(FloatSide::InlineStart);
        let is_continuation = tree.get(*float).prev_in_flow().is_some();
        state
            .floats
            .register_float(rect, side, *float, is_continuation);
        state.note_float_region(rect, side, *float);
    }
    if line.is_block() && !tree.style(line.first_child).establishes_block_formatting_context() {
        let offset = tree.geometry(line.first_child).border_rect.start_corner;
        state.floats.translate(offset);
        recover_descendant_floats(tree, state.floats, line.first_child);
        state.floats.translate(-offset);
    }
}

/// Registers the floats placed inside a kept child that shares its parent's float
/// context. The float context's origin is at the child's border box.
fn recover_descendant_floats(tree: &BoxTree, floats: &mut FloatContext, container: BoxId) {
    let Some(data) = tree.block_container(container) else {
        return;
    };
    for line in data.lines.iter() {
        for float in line.floats.iter() {
            let side = tree
                .style(*float)
                .float_side(tree.style(container).writing_mode)
                .unwrap_or(FloatSide::InlineStart);
            let is_continuation = tree.get(*float).prev_in_flow().is_some();
            floats.register_float(tree.geometry(*float).margin_rect(), side, *float, is_continuation);
        }
        if line.is_block() && !tree.style(line.first_child).establishes_block_formatting_context() {
            let offset = tree.geometry(line.first_child).border_rect.start_corner;
            floats.translate(offset);
            recover_descendant_floats(tree, floats, line.first_child);
            floats.translate(-offset);
        }
    }
}

/// After an interruption, moves the lines that were not reached by how much the content
/// above them moved, and leaves them dirty for the next reflow.
fn slide_unvisited_lines(tree: &mut BoxTree, state: &mut BlockReflowState, lines: &mut LineList, from: LineIndex) {
    for index in from..lines.len() {
        let Some(line) = lines.get_mut(index) else {
            break;
        };
        if let Some(entry) = line.entry {
            let delta = state.b_coord - entry.b_coord;
            slide_line(tree, line, delta);
            recover_line_floats(tree, state, line);
            if let Some(exit) = line.exit {
                state.set_margin_state(exit);
            }
        }
        line.mark_dirty();
    }
}

/// Lays out the block-level child of a block line.
fn reflow_block_line(
    tree: &mut BoxTree,
    context: &LayoutContext,
    state: &mut BlockReflowState,
    data: &mut BlockContainerData,
    index: LineIndex,
) -> LineOutcome {
    let Some(child) = data.lines.get(index).map(|line| line.first_child) else {
        return LineOutcome::Continue;
    };
    let child_style = tree.style(child).clone();
    let mode = state.writing_mode;
    let containing_block_inline_size = state.content_inline_size;
    let pbm = child_style.padding_border_margin(containing_block_inline_size, mode);
    let child_is_continuation = tree.get(child).prev_in_flow().is_some();
    let paginated = state.fragmentainer_limit.is_some();
    let was_at_top = state.is_at_top_of_fragment();

    if paginated && child_style.break_before.is_forced() && !was_at_top && !child_is_continuation {
        if let Some(line) = data.lines.get_mut(index) {
            line.break_before = BreakType::Page;
        }
        return LineOutcome::PushFrom(index);
    }

    let clear = child_style
        .clear_value(mode)
        .union(mem::replace(&mut state.float_break_type, Clear::None));
    let entry = state.margin_state();
    let saved = state.save();
    let establishes_bfc = child_style.establishes_block_formatting_context();
    let (mut start_margin, _) = collapsed_start_margin(tree, child, containing_block_inline_size, state.depth + 1);

    let mut retried = false;
    let placed = loop {
        let placed = match establishes_bfc {
            true => place_independent_block(tree, context, state, child, &pbm, clear, &start_margin),
            false => place_block(tree, context, state, child, &pbm, clear, &start_margin),
        };
        // The guess made for the child's start margin decided its position. When it was
        // wrong, do it again with the margin the child actually has.
        let position_used_margin = state.should_apply_start_margin() || placed.clearance.is_some();
        if !retried &&
            !placed.output.interrupted &&
            position_used_margin &&
            placed.output.margins.start != start_margin
        {
            if state.trace {
                trace!(
                    "Start margin of {child:?} was {:?}, guessed {:?}",
                    placed.output.margins.start,
                    start_margin
                );
            }
            state.restore(&saved);
            start_margin = placed.output.margins.start;
            retried = true;
            continue;
        }
        break placed;
    };

    let PlacedBlock {
        output,
        border_top,
        inline_start,
        inline_size,
        clearance,
    } = placed;
    let geometry = tree.geometry_mut(child);
    geometry.border_rect.start_corner = LogicalVec2 {
        inline: inline_start,
        block: border_top,
    };
    geometry.clearance = clearance;

    let start_margin_contribution;
    if output.margins.collapsed_through && clearance.is_none() {
        start_margin_contribution = CollapsedMargin::zero();
        state.prev_margin.adjoin_assign(&output.margins.start);
        state.prev_margin.adjoin_assign(&output.margins.end);
    } else {
        start_margin_contribution = match state.should_apply_start_margin() {
            true => CollapsedMargin::zero(),
            false => state.prev_margin.adjoin(&output.margins.start),
        };
        state.apply_start_margin();
        state
            .collapsed_start_margin
            .adjoin_assign(&start_margin_contribution);
        let end_margin = match output.margins.collapsed_through {
            true => output.margins.start.adjoin(&output.margins.end),
            false => output.margins.end,
        };
        state.advance_past_block(border_top, output.block_size, end_margin);
        state.note_content_placed();
    }
    state.pushed_floats.extend(output.pushed_floats.iter().copied());
    let impacted_by_floats = output.impacted_by_floats || (establishes_bfc && state.floats.has_floats());
    state.impacted_by_floats |= impacted_by_floats;

    let bounds = LogicalRect {
        start_corner: LogicalVec2 {
            inline: inline_start,
            block: border_top,
        },
        size: LogicalVec2 {
            inline: inline_size,
            block: output.block_size,
        },
    };
    let exit = state.margin_state();
    if let Some(line) = data.lines.get_mut(index) {
        line.child_count = 1;
        line.bounds = bounds;
        line.baseline = output.last_baseline.map(|baseline| border_top + baseline);
        line.carried_out_block_end_margin = output.margins.end;
        line.start_margin_contribution = start_margin_contribution;
        line.flags
            .remove(LineFlags::DIRTY | LineFlags::PREVIOUS_MARGIN_DIRTY);
        line.flags
            .set(LineFlags::IMPACTED_BY_FLOATS, impacted_by_floats);
        line.flags
            .set(LineFlags::HAS_CLEARANCE, clearance.is_some());
        line.set_empty(output.margins.collapsed_through);
        line.floats.clear();
        line.break_before = match clear {
            Clear::None => BreakType::None,
            clear => BreakType::Clear(clear),
        };
        line.break_after = BreakType::None;
        line.overflow = output.overflow.translate(bounds.start_corner);
        line.entry = Some(entry);
        line.exit = Some(exit);
        if output.interrupted {
            line.mark_dirty();
        }
    }
    if output.interrupted {
        return LineOutcome::Interrupted;
    }

    match output.status.completeness {
        Completeness::Complete => {
            if paginated && !was_at_top && state.fragmentainer_limit.is_some_and(|limit| bounds.max_block_position() > limit) {
                state.restore(&saved);
                return LineOutcome::PushFrom(index);
            }
            if paginated && child_style.break_after.is_forced() && index + 1 < data.lines.len() {
                if let Some(line) = data.lines.get_mut(index) {
                    line.break_after = BreakType::Page;
                }
                return LineOutcome::PushFrom(index + 1);
            }
            LineOutcome::Continue
        },
        Completeness::NotComplete | Completeness::OverflowIncomplete => {
            let made_no_progress = output.status.completeness == Completeness::NotComplete &&
                tree.block_container(child)
                    .is_some_and(|child_data| child_data.lines.is_empty());
            if made_no_progress && !was_at_top {
                state.restore(&saved);
                return LineOutcome::PushFrom(index);
            }
            fragmentation::claim_next_in_flow(tree, data, state.container, child, index);
            LineOutcome::PushFrom(index + 1)
        },
    }
}

/// A block child laid out at its position.
struct PlacedBlock {
    output: ReflowOutput,
    border_top: Au,
    inline_start: Au,
    inline_size: Au,
    clearance: Option<Au>,
}

/// Lays out a block child that shares the float context of its parent.
fn place_block(
    tree: &mut BoxTree,
    context: &LayoutContext,
    state: &mut BlockReflowState,
    child: BoxId,
    pbm: &PaddingBorderMargin,
    clear: Clear,
    start_margin: &CollapsedMargin,
) -> PlacedBlock {
    let child_style = tree.style(child).clone();
    let (inline_size, (margin_inline_start, _)) =
        block_level_inline_size(&child_style, pbm, state.content_inline_size);

    let mut clearance = None;
    if clear != Clear::None {
        // Clearance separates the child from the content above, which is only possible
        // once the container's own start margin is settled.
        state.apply_start_margin();
        clearance = state.calculate_clearance(clear, start_margin);
    }
    let border_top = match clearance {
        Some(clearance) => state.position_with_zero_clearance(start_margin) + clearance,
        None => state.position_without_clearance(start_margin),
    };
    let inline_start = state.content_inline_start + margin_inline_start;

    let offset = LogicalVec2 {
        inline: inline_start,
        block: border_top,
    };
    state.floats.set_ceiling_from_non_floats(border_top);
    state.floats.translate(offset);
    let input = ReflowInput {
        containing_block_inline_size: state.content_inline_size,
        containing_block_block_size: state.containing_block_block_size,
        inline_size,
        available_block_size: state
            .fragmentainer_limit
            .map(|limit| limit - border_top),
        is_top_of_fragment: state.is_at_top_of_fragment(),
        depth: state.depth + 1,
    };
    let output = reflow_block_container(tree, context, state.floats, child, &input);
    state.floats.translate(-offset);
    tree.geometry_mut(child).margin.inline_start = margin_inline_start;
    tree.geometry_mut(child).margin.inline_end =
        state.content_inline_size - inline_size - margin_inline_start;

    PlacedBlock {
        output,
        border_top,
        inline_start,
        inline_size,
        clearance,
    }
}

/// Lays out a block child that establishes its own block formatting context. It may not
/// overlap floats, so it goes beside them, or below them when there is no room.
fn place_independent_block(
    tree: &mut BoxTree,
    context: &LayoutContext,
    state: &mut BlockReflowState,
    child: BoxId,
    pbm: &PaddingBorderMargin,
    clear: Clear,
    start_margin: &CollapsedMargin,
) -> PlacedBlock {
    let child_style = tree.style(child).clone();
    let mode = child_style.writing_mode;
    let containing_block_inline_size = state.content_inline_size;
    let pb = pbm.padding_border_sums;
    let box_size = child_style.box_size(mode);
    let min_box_size = child_style.min_box_size(mode);
    let max_box_size = child_style.max_box_size(mode);
    let min_inline_size = min_box_size
        .inline
        .maybe_resolve(Some(containing_block_inline_size))
        .unwrap_or(Au::zero());
    let max_inline_size = max_box_size
        .inline
        .maybe_resolve(Some(containing_block_inline_size));
    let clamp_inline = |size: Au| {
        let size = match max_inline_size {
            Some(max) => size.min(max),
            None => size,
        };
        size.max(min_inline_size)
    };
    let specified_inline_size = box_size
        .inline
        .maybe_resolve(Some(containing_block_inline_size))
        .map(|size| clamp_inline(size) + pb.inline);
    let specified_block_size = box_size
        .block
        .maybe_resolve(state.containing_block_block_size);
    let min_block_size = min_box_size
        .block
        .maybe_resolve(state.containing_block_block_size)
        .unwrap_or(Au::zero());
    let object_size = LogicalVec2 {
        inline: specified_inline_size.unwrap_or(min_inline_size + pb.inline),
        block: specified_block_size.unwrap_or(min_block_size).max(min_block_size) + pb.block,
    };

    if clear != Clear::None {
        state.apply_start_margin();
    }
    let is_top_of_fragment = state.is_at_top_of_fragment();
    let fragmentainer_limit = state.fragmentainer_limit;
    let trace_float_manager = context.debug().trace_float_manager;

    let (clear_position, ceiling, mut placement) =
        state.calculate_clearance_and_inline_adjustment(clear, start_margin, pbm, object_size);
    let (rect, inline_size, output) = loop {
        let rect = placement.place();
        let inline_size = specified_inline_size
            .unwrap_or_else(|| clamp_inline((rect.size.inline - pb.inline).max(Au::zero())) + pb.inline);
        let mut child_floats = FloatContext::new(inline_size);
        child_floats.set_trace(trace_float_manager);
        let input = ReflowInput {
            containing_block_inline_size,
            containing_block_block_size: state.containing_block_block_size,
            inline_size,
            available_block_size: fragmentainer_limit.map(|limit| limit - rect.start_corner.block),
            is_top_of_fragment,
            depth: state.depth + 1,
        };
        let output = reflow_block_container(tree, context, &mut child_floats, child, &input);
        if output.interrupted || placement.try_to_expand_for_auto_block_size(output.block_size, &rect.size) {
            break (rect, inline_size, output);
        }
    };
    let clearance = state.clearance_for_placement(clear_position, ceiling, rect.start_corner.block, start_margin);
    drop(placement);
    if clearance.is_some() {
        state.apply_start_margin();
    }

    let free_space = (rect.size.inline - inline_size).max(Au::zero());
    let auto_margin_offset = match (pbm.margin.inline_start, pbm.margin.inline_end) {
        (AuOrAuto::Auto, AuOrAuto::Auto) => free_space / 2,
        (AuOrAuto::Auto, _) => free_space,
        _ => Au::zero(),
    };
    let inline_start = rect.start_corner.inline + auto_margin_offset;
    let margin_inline_start = inline_start - state.content_inline_start;
    let geometry = tree.geometry_mut(child);
    geometry.margin.inline_start = margin_inline_start;
    geometry.margin.inline_end = containing_block_inline_size - margin_inline_start - inline_size;

    PlacedBlock {
        output,
        border_top: rect.start_corner.block,
        inline_start,
        inline_size,
        clearance,
    }
}

/// The border-box inline size and the inline margins of a block-level box that shares
/// the float context of its parent.
/// <https://drafts.csswg.org/css2/#blockwidth>
pub(crate) fn block_level_inline_size(
    style: &ComputedValues,
    pbm: &PaddingBorderMargin,
    containing_block_inline_size: Au,
) -> (Au, (Au, Au)) {
    let mode = style.writing_mode;
    let pb = pbm.padding_border_sums.inline;
    let margin = pbm.margin_or_zero();
    let min = style
        .min_box_size(mode)
        .inline
        .maybe_resolve(Some(containing_block_inline_size))
        .unwrap_or(Au::zero());
    let max = style
        .max_box_size(mode)
        .inline
        .maybe_resolve(Some(containing_block_inline_size));
    let mut content_inline_size = match style
        .box_size(mode)
        .inline
        .maybe_resolve(Some(containing_block_inline_size))
    {
        Some(size) => size,
        None => containing_block_inline_size - pb - margin.inline_sum(),
    };
    if let Some(max) = max {
        content_inline_size.min_assign(max);
    }
    content_inline_size.max_assign(min);
    content_inline_size.max_assign(Au::zero());

    let border_inline_size = content_inline_size + pb;
    let available = containing_block_inline_size - border_inline_size;
    let margins = match (pbm.margin.inline_start, pbm.margin.inline_end) {
        (AuOrAuto::Auto, AuOrAuto::Auto) => {
            let start = (available / 2).max(Au::zero());
            (start, available - start)
        },
        (AuOrAuto::Auto, AuOrAuto::LengthPercentage(end)) => (available - end, end),
        (AuOrAuto::LengthPercentage(start), _) => (start, available - start),
    };
    (border_inline_size, margins)
}

/// Places a float whose geometry has already been laid out, at the current ceiling of the
/// float context. Returns whether it was placed; a float that does not fit in the
/// fragment is pushed.
pub(crate) fn place_float(tree: &mut BoxTree, state: &mut BlockReflowState, float: BoxId) -> bool {
    let style = tree.style(float).clone();
    let geometry = tree.geometry(float);
    let margin_box_size = geometry.margin_rect().size;
    let margin_offset = geometry.margin.start_offset();
    let side = style
        .float_side(state.writing_mode)
        .unwrap_or(FloatSide::InlineStart);
    let info = PlacementInfo {
        size: margin_box_size,
        side,
        clear: style.clear_value(state.writing_mode),
        box_id: float,
        is_continuation: tree.get(float).prev_in_flow().is_some(),
    };
    let placement = state
        .floats
        .place_float(&info, state.fragmentainer_limit, state.is_at_top_of_fragment());
    match placement {
        FloatPlacement::Placed(margin_corner) => {
            tree.geometry_mut(float).border_rect.start_corner = margin_corner + margin_offset;
            let margin_rect = LogicalRect {
                start_corner: margin_corner,
                size: margin_box_size,
            };
            state.note_float_region(margin_rect, side, float);
            if state.trace {
                trace!("Placed float {float:?} at {margin_rect:?}");
            }
            true
        },
        FloatPlacement::Pushed => {
            if state.trace {
                trace!("Pushed float {float:?} to the next fragment");
            }
            state.pushed_floats.push(float);
            false
        },
    }
}

/// Lays out a float or an inline-block, which size themselves to fit their content and
/// establish their own block formatting context. Sets the size and margins of the box;
/// the caller positions it.
pub(crate) fn layout_independent_box(
    tree: &mut BoxTree,
    context: &LayoutContext,
    id: BoxId,
    containing_block_inline_size: Au,
    depth: usize,
) -> ReflowOutput {
    let style = tree.style(id).clone();
    let mode = style.writing_mode;
    let pbm = style.padding_border_margin(containing_block_inline_size, mode);
    let margin = pbm.margin_or_zero();
    let pb = pbm.padding_border_sums.inline;
    let min = style
        .min_box_size(mode)
        .inline
        .maybe_resolve(Some(containing_block_inline_size))
        .unwrap_or(Au::zero());
    let max = style
        .max_box_size(mode)
        .inline
        .maybe_resolve(Some(containing_block_inline_size));
    let mut content_inline_size = match style
        .box_size(mode)
        .inline
        .maybe_resolve(Some(containing_block_inline_size))
    {
        Some(size) => size,
        None => {
            let available = containing_block_inline_size - pb - margin.inline_sum();
            inline_content_sizes(tree, id, depth).shrink_to_fit(available.max(Au::zero()))
        },
    };
    if let Some(max) = max {
        content_inline_size.min_assign(max);
    }
    content_inline_size.max_assign(min);

    let inline_size = content_inline_size.max(Au::zero()) + pb;
    let mut floats = FloatContext::new(inline_size);
    floats.set_trace(context.debug().trace_float_manager);
    let input = ReflowInput {
        containing_block_inline_size,
        containing_block_block_size: None,
        inline_size,
        available_block_size: None,
        is_top_of_fragment: true,
        depth,
    };
    let output = reflow_block_container(tree, context, &mut floats, id, &input);
    let geometry = tree.geometry_mut(id);
    geometry.margin = margin;
    output
}

/// The min-content and max-content inline sizes of the content of a block container,
/// cached until something inside it changes.
/// <https://drafts.csswg.org/css-sizing/#intrinsic-sizes>
pub fn inline_content_sizes(tree: &mut BoxTree, id: BoxId, depth: usize) -> ContentSizes {
    if let Some(sizes) = tree.block_container(id).and_then(|data| data.content_sizes) {
        return sizes;
    }
    if depth > MAX_DEPTH_FOR_SPECULATIVE_MARGINS {
        debug!("Not computing intrinsic sizes of {id:?}, nested too deeply");
        return ContentSizes::zero();
    }
    let mode = tree.style(id).writing_mode;
    let mut sizes = ContentSizes::zero();
    let mut line_max_content = Au::zero();
    let children: Vec<BoxId> = tree.children(id).collect();
    for child in children {
        if tree.get(child).is_block_level() {
            sizes.max_content.max_assign(line_max_content);
            line_max_content = Au::zero();
            let style = tree.style(child).clone();
            let outer = outer_inline_content_sizes(&style, mode, || inline_content_sizes(tree, child, depth + 1));
            sizes.max_assign(outer);
        } else {
            add_inline_content_sizes(tree, child, depth, &mut sizes, &mut line_max_content);
        }
    }
    sizes.max_content.max_assign(line_max_content);
    if let Some(data) = tree.get_mut(id).block_container_mut() {
        data.content_sizes = Some(sizes);
    }
    sizes
}

enum InlineContribution {
    Text(crate::text::TextRun),
    Span,
    Fixed(Au),
    LineBreak,
    Independent,
}

fn add_inline_content_sizes(
    tree: &mut BoxTree,
    id: BoxId,
    depth: usize,
    sizes: &mut ContentSizes,
    line_max_content: &mut Au,
) {
    let style = tree.style(id).clone();
    let mode = style.writing_mode;
    let contribution = match &tree.get(id).kind {
        BoxKind::Text(run) => InlineContribution::Text(run.clone()),
        BoxKind::InlineBox => InlineContribution::Span,
        BoxKind::Atomic(content) => InlineContribution::Fixed(content.content_size.inline),
        BoxKind::LineBreak => InlineContribution::LineBreak,
        BoxKind::BlockContainer(_) => InlineContribution::Independent,
    };
    let outer = match contribution {
        InlineContribution::Text(run) => {
            let text_sizes = run
                .text
                .content_sizes(run.range.clone(), style.white_space);
            sizes.min_content.max_assign(text_sizes.min_content);
            *line_max_content += text_sizes.max_content;
            return;
        },
        InlineContribution::LineBreak => {
            sizes.max_content.max_assign(*line_max_content);
            *line_max_content = Au::zero();
            return;
        },
        InlineContribution::Span => {
            let pbm = style.padding_border_margin(Au::zero(), mode);
            let margin = pbm.margin_or_zero();
            *line_max_content += pbm.padding_border_sums.inline + margin.inline_sum();
            let children: Vec<BoxId> = tree.children(id).collect();
            for child in children {
                add_inline_content_sizes(tree, child, depth, sizes, line_max_content);
            }
            return;
        },
        InlineContribution::Fixed(size) => outer_inline_content_sizes(&style, mode, || ContentSizes::from(size)),
        InlineContribution::Independent => {
            outer_inline_content_sizes(&style, mode, || inline_content_sizes(tree, id, depth + 1))
        },
    };
    sizes.min_content.max_assign(outer.min_content);
    *line_max_content += outer.max_content;
}

/// Guesses the block-start margin of a block child, collapsed with the start margins of
/// its first descendants, before laying it out. Also returns whether the child's content
/// is empty, so that its margins collapse through it.
pub(crate) fn collapsed_start_margin(
    tree: &BoxTree,
    id: BoxId,
    containing_block_inline_size: Au,
    depth: usize,
) -> (CollapsedMargin, bool) {
    let style = tree.style(id);
    let mode = style.writing_mode;
    let pbm = style.padding_border_margin(containing_block_inline_size, mode);
    if tree.get(id).prev_in_flow().is_some() {
        return (CollapsedMargin::zero(), false);
    }
    let mut margin = CollapsedMargin::new(pbm.margin.block_start.auto_is(Au::zero));
    if depth > MAX_DEPTH_FOR_SPECULATIVE_MARGINS ||
        pbm.padding_border().block_start != Au::zero() ||
        style.establishes_block_formatting_context()
    {
        return (margin, false);
    }
    let content_inline_size = block_level_inline_size(style, &pbm, containing_block_inline_size).0 -
        pbm.padding_border_sums.inline;
    let through_children = start_margin_through_children(tree, id, content_inline_size, depth, &mut margin);
    let collapses_through = through_children && !is_block_end_margin_root(style, &pbm, None);
    (margin, collapses_through)
}

/// Adds the start margins of the leading children of `parent` that collapse with it.
/// Returns whether every child was passed through.
fn start_margin_through_children(
    tree: &BoxTree,
    parent: BoxId,
    containing_block_inline_size: Au,
    depth: usize,
    margin: &mut CollapsedMargin,
) -> bool {
    for child in tree.children(parent) {
        let child_box = tree.get(child);
        if child_box.is_float() {
            continue;
        }
        let style = &child_box.style;
        let mode = style.writing_mode;
        match &child_box.kind {
            BoxKind::BlockContainer(_) if child_box.is_block_level() => {
                if style.clear_value(mode) != Clear::None {
                    return false;
                }
                let (child_margin, collapses_through) =
                    collapsed_start_margin(tree, child, containing_block_inline_size, depth + 1);
                margin.adjoin_assign(&child_margin);
                if !collapses_through {
                    return false;
                }
                let pbm = style.padding_border_margin(containing_block_inline_size, mode);
                margin.adjoin_assign(&CollapsedMargin::new(pbm.margin.block_end.auto_is(Au::zero)));
            },
            BoxKind::Text(run) => {
                if !run.is_collapsible_whitespace(style.white_space) {
                    return false;
                }
            },
            BoxKind::InlineBox => {
                let pbm = style.padding_border_margin(containing_block_inline_size, mode);
                if pbm.padding_border_sums.inline != Au::zero() || pbm.margin_or_zero().inline_sum() != Au::zero() {
                    return false;
                }
                if !start_margin_through_children(tree, child, containing_block_inline_size, depth + 1, margin) {
                    return false;
                }
            },
            _ => return false,
        }
    }
    true
}
