/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Inline formatting: lays out one line of a block container.
//!
//! A line is built by [`LineLayout`] from the children it covers, walking into inline
//! boxes. Floats met along the way are placed beside the line when they fit, or below
//! it. When the line cannot be placed as built (it has to break earlier, it is narrowed
//! by floats below its top, or nothing fits beside the floats) it is laid out again from
//! a saved state. Once the line is final, the boxes it ends inside are split and the
//! lines after it are brought in line with where it ended.

mod align;
pub(crate) mod line_layout;
mod vertical_align;

use std::mem;

use app_units::Au;
use log::trace;
use num_traits::Zero;
use servo_arc::Arc as ServoArc;
use smallvec::SmallVec;

use self::align::align_inline;
pub(crate) use self::align::is_start_aligned;
use self::line_layout::{
    BoxPlacement, BreakAt, InlineInput, LineEnd, LineEntry, LineItemKind, LineLayout,
    LineReflowStatus,
};
use crate::box_tree::{AtomicContent, BoxId, BoxKind, BoxTree};
use crate::context::LayoutContext;
use crate::flow::float::{Clear, FlowAreaQuery};
use crate::flow::lines::{BreakType, LineBox, LineFlags, LineIndex, LineList};
use crate::flow::reflow_state::BlockReflowState;
use crate::flow::{layout_independent_box, place_float, LineOutcome};
use crate::fragment_tree::{CollapsedMargin, OverflowAreas};
use crate::geom::{LogicalRect, LogicalSides, LogicalVec2};
use crate::style::ComputedValues;
use crate::text::TextRun;

/// Where the finished line ends in the box tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineEndPoint {
    /// Every inline-level child up to the given block-level child, or to the end of the
    /// container, is on the line.
    EndOfRun(Option<BoxId>),
    BeforeBox(BoxId),
    AfterBox(BoxId),
    InText(BoxId, usize),
}

enum Walk {
    Continue,
    End(LineEndPoint),
    Redo(LineReflowStatus),
}

/// What the next layout of the line does differently.
struct LineAttempt {
    break_at: Option<BreakAt>,
    query: FlowAreaQuery,
    must_place: bool,
    /// The line was laid out again to end at an earlier break opportunity.
    backed_up: bool,
    /// Backing up already happened in the current available space. Laying out again in
    /// the same space ends at the chosen break point, so it never backs up a second time.
    backed_up_in_area: bool,
    /// Floats placed or pushed by earlier layouts of the line, which stay where they are
    /// when the line moves down to the next band.
    settled_floats: Vec<BoxId>,
    kept_placed_floats: Vec<BoxId>,
}

#[derive(Clone, Copy)]
enum ChildKind {
    Float,
    InlineBlock,
    Span,
    Text,
    Atomic,
    LineBreak,
}

struct LineWalker<'w, 'f> {
    tree: &'w mut BoxTree,
    context: &'w LayoutContext<'w>,
    state: &'w mut BlockReflowState<'f>,
    attempt: &'w LineAttempt,
    layout: LineLayout,
}

impl LineWalker<'_, '_> {
    /// Places the children of the container starting at `first`, up to the next
    /// block-level child.
    fn place_run(&mut self, first: BoxId) -> Walk {
        let mut next = Some(first);
        while let Some(id) = next {
            if self.tree.get(id).is_block_level() {
                return Walk::End(LineEndPoint::EndOfRun(Some(id)));
            }
            next = self.tree.next_sibling(id);
            match self.place_child(id) {
                Walk::Continue => {},
                other => return other,
            }
        }
        Walk::End(LineEndPoint::EndOfRun(None))
    }

    fn place_child(&mut self, id: BoxId) -> Walk {
        if self.attempt.break_at == Some(BreakAt::BeforeBox(id)) {
            return Walk::End(LineEndPoint::BeforeBox(id));
        }
        let layout_box = self.tree.get(id);
        let style = layout_box.style.clone();
        let kind = match &layout_box.kind {
            BoxKind::BlockContainer(_) if layout_box.is_float() => ChildKind::Float,
            BoxKind::BlockContainer(_) => ChildKind::InlineBlock,
            BoxKind::InlineBox => ChildKind::Span,
            BoxKind::Text(_) => ChildKind::Text,
            BoxKind::Atomic(_) => ChildKind::Atomic,
            BoxKind::LineBreak => ChildKind::LineBreak,
        };

        let result = match kind {
            ChildKind::Float => {
                self.place_float(id);
                return Walk::Continue;
            },
            ChildKind::Span => return self.place_span(id, &style),
            ChildKind::Text => {
                let BoxKind::Text(run) = &self.tree.get(id).kind else {
                    return Walk::Continue;
                };
                let run: TextRun = run.clone();
                let break_at = match self.attempt.break_at {
                    Some(BreakAt::InText(break_box, at)) if break_box == id => Some(at),
                    _ => None,
                };
                self.layout.reflow_box(InlineInput::Text {
                    id,
                    run,
                    style: &style,
                    break_at,
                })
            },
            ChildKind::Atomic => {
                let BoxKind::Atomic(content) = &self.tree.get(id).kind else {
                    return Walk::Continue;
                };
                let content = content.clone();
                let (margin_box_size, ascent) = self.size_atomic(id, &style, &content);
                self.layout.reflow_box(InlineInput::Atomic {
                    id,
                    style: &style,
                    margin_box_size,
                    ascent,
                })
            },
            ChildKind::InlineBlock => {
                let output = layout_independent_box(
                    self.tree,
                    self.context,
                    id,
                    self.state.content_inline_size,
                    self.state.depth + 1,
                );
                let geometry = self.tree.geometry(id);
                let margin_box_size = geometry.margin_rect().size;
                // Without a baseline of its own, an inline-block sits on its block-end
                // margin edge.
                let ascent = match output.last_baseline {
                    Some(baseline) => geometry.margin.block_start + baseline,
                    None => margin_box_size.block,
                };
                self.layout.reflow_box(InlineInput::Atomic {
                    id,
                    style: &style,
                    margin_box_size,
                    ascent,
                })
            },
            ChildKind::LineBreak => {
                let clear = style.clear_value(self.state.writing_mode);
                self.layout.reflow_box(InlineInput::LineBreak {
                    id,
                    style: &style,
                    clear,
                })
            },
        };

        match result {
            (BoxPlacement::Placed, _) => Walk::Continue,
            (BoxPlacement::EndsLine, _) => Walk::End(LineEndPoint::AfterBox(id)),
            (BoxPlacement::Split(at), _) => Walk::End(LineEndPoint::InText(id, at)),
            (BoxPlacement::BreakBefore, _) => Walk::End(LineEndPoint::BeforeBox(id)),
            (BoxPlacement::NotPlaced, status) => Walk::Redo(status),
        }
    }

    /// Writes the box model of an atomic inline and returns its margin box size and the
    /// distance from its block-start margin edge to its baseline.
    fn size_atomic(
        &mut self,
        id: BoxId,
        style: &ComputedValues,
        content: &AtomicContent,
    ) -> (LogicalVec2<Au>, Au) {
        let pbm = style.padding_border_margin(self.state.content_inline_size, self.state.writing_mode);
        let margin = pbm.margin_or_zero();
        let border_box_size = content.content_size + pbm.padding_border_sums;
        let margin_box_size = border_box_size + margin.sum();
        let ascent = match content.baseline {
            Some(baseline) => margin.block_start + pbm.padding.block_start + pbm.border.block_start + baseline,
            None => margin_box_size.block,
        };

        let geometry = self.tree.geometry_mut(id);
        geometry.border_rect.size = border_box_size;
        geometry.padding = pbm.padding;
        geometry.border = pbm.border;
        geometry.margin = margin;
        geometry.overflow = OverflowAreas::from_rect(LogicalRect {
            start_corner: LogicalVec2::zero(),
            size: border_box_size,
        });
        geometry.first_baseline = content
            .baseline
            .map(|baseline| baseline + pbm.padding.block_start + pbm.border.block_start);
        geometry.last_baseline = geometry.first_baseline;
        (margin_box_size, ascent)
    }

    fn place_span(&mut self, id: BoxId, style: &ServoArc<ComputedValues>) -> Walk {
        let pbm = style.padding_border_margin(self.state.content_inline_size, self.state.writing_mode);
        let margin = pbm.margin_or_zero();
        let layout_box = self.tree.get(id);
        let is_first_fragment = layout_box.prev_in_flow().is_none();
        let is_last_fragment = layout_box.next_in_flow().is_none();

        let (margin_start, start_extra) = match is_first_fragment {
            true => (
                margin.inline_start,
                margin.inline_start + pbm.padding.inline_start + pbm.border.inline_start,
            ),
            false => (Au::zero(), Au::zero()),
        };
        let (margin_end, end_extra) = match is_last_fragment {
            true => (
                margin.inline_end,
                margin.inline_end + pbm.padding.inline_end + pbm.border.inline_end,
            ),
            false => (Au::zero(), Au::zero()),
        };

        self.layout
            .begin_span(id, style.clone(), margin_start, start_extra);
        let mut next = self.tree.first_child(id);
        while let Some(child) = next {
            next = self.tree.next_sibling(child);
            match self.place_child(child) {
                Walk::Continue => {},
                // A line break that is the last thing in the span ends the span as well.
                Walk::End(LineEndPoint::AfterBox(ended)) if ended == child && next.is_none() => {
                    self.layout.end_span(margin_end, end_extra);
                    return Walk::End(LineEndPoint::AfterBox(id));
                },
                other => return other,
            }
        }
        self.layout.end_span(margin_end, end_extra);
        Walk::Continue
    }

    /// Places a float met on the line beside it, or leaves it for below the line.
    fn place_float(&mut self, id: BoxId) {
        if self.attempt.settled_floats.contains(&id) {
            return;
        }
        layout_independent_box(
            self.tree,
            self.context,
            id,
            self.state.content_inline_size,
            self.state.depth + 1,
        );
        let margin_box_size = self.tree.geometry(id).margin_rect().size;

        // Floats keep their order, so once one goes below the line so do the rest.
        let defer = !self.state.below_current_line_floats.is_empty() ||
            (self.context.quirks().float_below_line_after_backup && self.attempt.backed_up);
        let fits = margin_box_size.inline <= self.layout.remaining_inline_size() || !self.layout.has_items();
        if defer || !fits {
            if self.state.trace {
                trace!("Float {id:?} goes below the current line");
            }
            self.state.below_current_line_floats.push(id);
            return;
        }

        let line_top = self.layout.line_top();
        self.state
            .floats
            .set_ceiling_from_non_floats(line_top);
        if place_float(self.tree, self.state, id) {
            self.layout.placed_floats.push(id);
            let area = self
                .state
                .floats
                .available_space(line_top, self.attempt.query);
            self.layout
                .update_band(area.rect, area.has_floats);
        }
    }
}

/// Lays out the inline line at `index`, placing it at the current position of `state`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "InlineLine::reflow",
        skip_all,
        fields(servo_profiling = true, line = index),
        level = "trace",
    )
)]
pub(crate) fn reflow_inline_line(
    tree: &mut BoxTree,
    context: &LayoutContext,
    state: &mut BlockReflowState,
    lines: &mut LineList,
    index: LineIndex,
    is_first_formatted_line: bool,
) -> LineOutcome {
    let Some(first) = lines.get(index).map(|line| line.first_child) else {
        return LineOutcome::Continue;
    };
    let container = state.container;
    let container_style = tree.style(container).clone();
    let entry = state.margin_state();
    let line_start = state.save();

    // A line break with `clear` on the line before moves this one below the floats.
    let clear = mem::replace(&mut state.float_break_type, Clear::None);
    let mut top = state.line_top();
    let mut has_clearance = false;
    if let Some(clear_position) = state.floats.clear_position(clear) {
        if clear_position > top {
            top = clear_position;
            has_clearance = true;
        }
    }

    let text_indent = match is_first_formatted_line {
        true => container_style
            .text_indent
            .resolve(state.content_inline_size),
        false => Au::zero(),
    };

    let mut attempt = LineAttempt {
        break_at: None,
        query: FlowAreaQuery::BandFromPoint,
        must_place: false,
        backed_up: false,
        backed_up_in_area: false,
        settled_floats: Vec::new(),
        kept_placed_floats: Vec::new(),
    };
    let mut attempt_start = state.save();
    let mut checked_narrower_floats = false;

    let (mut layout, metrics, mut end, status) = loop {
        let area = state.floats.available_space(top, attempt.query);
        let pushed_before = state.pushed_floats.len();
        state.below_current_line_floats.clear();

        let mut layout = LineLayout::new(container_style.clone());
        layout.begin_line(area.rect, area.has_floats, text_indent);
        layout.must_place = attempt.must_place;
        let mut walker = LineWalker {
            tree: &mut *tree,
            context,
            state: &mut *state,
            attempt: &attempt,
            layout,
        };
        let walk = walker.place_run(first);
        let mut layout = walker.layout;

        let end = match walk {
            Walk::Continue => LineEndPoint::EndOfRun(None),
            Walk::End(end) => end,
            Walk::Redo(LineReflowStatus::RedoNoPull(break_at)) => {
                if state.trace {
                    trace!("Line {index} of {container:?} backs up to {break_at:?}");
                }
                debug_assert!(
                    !attempt.backed_up_in_area,
                    "Line {index} backed up twice in the same space"
                );
                state.restore(&attempt_start);
                attempt.break_at = Some(break_at);
                attempt.backed_up = true;
                attempt.backed_up_in_area = true;
                continue;
            },
            Walk::Redo(_) => {
                // Floats placed earlier on this line narrow it too, not only those in `area`.
                if !layout.impacted_by_floats {
                    state.restore(&attempt_start);
                    attempt.must_place = true;
                    continue;
                }
                // Nothing fits beside the floats here. Floats already placed stay, and the
                // line moves down to where the space changes.
                attempt
                    .kept_placed_floats
                    .extend(layout.placed_floats.iter().copied());
                attempt
                    .settled_floats
                    .extend(layout.placed_floats.iter().copied());
                attempt
                    .settled_floats
                    .extend(state.pushed_floats[pushed_before..].iter().copied());
                let band = state
                    .floats
                    .available_space(top, FlowAreaQuery::BandFromPoint);
                top = band.rect.max_block_position();
                if state.trace {
                    trace!("Line {index} of {container:?} moves down to {top:?}");
                }
                attempt.query = FlowAreaQuery::BandFromPoint;
                attempt.break_at = None;
                attempt.backed_up_in_area = false;
                attempt_start = state.save();
                continue;
            },
        };

        let metrics = layout.end_line_reflow();
        let status = if !checked_narrower_floats && metrics.block_size > layout.band.size.block {
            checked_narrower_floats = true;
            let narrower = state
                .floats
                .available_space(top, FlowAreaQuery::WidthWithinHeight(metrics.block_size));
            match narrower.rect.size.inline < layout.band.size.inline {
                true => LineReflowStatus::RedoMoreFloats,
                false => LineReflowStatus::Ok,
            }
        } else {
            LineReflowStatus::Ok
        };
        let status = match status {
            LineReflowStatus::Ok if layout.has_content && state.crosses_fragmentainer_end(top + metrics.block_size) => {
                LineReflowStatus::Truncated
            },
            status => status,
        };
        if status == LineReflowStatus::RedoMoreFloats {
            if state.trace {
                trace!("Line {index} of {container:?} is narrowed by floats below its top");
            }
            state.restore(&attempt_start);
            attempt.query = FlowAreaQuery::WidthWithinHeight(metrics.block_size);
            attempt.backed_up_in_area = false;
            continue;
        }
        break (layout, metrics, end, status);
    };

    if status == LineReflowStatus::Truncated {
        if state.trace {
            trace!("Line {index} of {container:?} does not fit in the fragment");
        }
        state.restore(&line_start);
        return LineOutcome::PushFrom(index);
    }

    merge_text_continuations(tree, &mut layout, &mut end);
    let is_last_line = !matches!(layout.line_end, LineEnd::Wrapped);
    let (offset, content_inline_size) = align_inline(&mut layout, &container_style, is_last_line);
    let overflow = commit_line_geometry(tree, &layout, state.content_inline_size);

    let next_box = split_at_line_end(tree, container, end);
    let child_count = tree
        .siblings_from(Some(first))
        .take_while(|child| Some(*child) != next_box)
        .count()
        .max(1);
    let children: Vec<BoxId> = tree
        .siblings_from(Some(first))
        .take(child_count)
        .collect();
    for child in children {
        clear_inline_dirty_bits(tree, child);
    }

    let is_empty = !layout.has_content;
    let takes_space = !is_empty || has_clearance;
    let start_margin_contribution = match takes_space && !state.should_apply_start_margin() {
        true => state.prev_margin,
        false => CollapsedMargin::zero(),
    };
    if takes_space {
        state.advance_past_line(top, metrics.block_size);
        state.note_content_placed();
    }
    let impacted_by_floats = layout.impacted_by_floats || !layout.placed_floats.is_empty();
    state.impacted_by_floats |= impacted_by_floats;

    // Floats that did not fit beside the line go below it.
    let mut placed_floats: SmallVec<[BoxId; 2]> = attempt.kept_placed_floats.iter().copied().collect();
    placed_floats.extend(layout.placed_floats.iter().copied());
    let deferred = mem::take(&mut state.below_current_line_floats);
    if !deferred.is_empty() {
        state
            .floats
            .set_ceiling_from_non_floats(top + metrics.block_size);
        for float in deferred {
            if place_float(tree, state, float) {
                placed_floats.push(float);
            }
        }
    }

    let break_after = match layout.line_end {
        LineEnd::Forced(Clear::None) => BreakType::Line,
        LineEnd::Forced(clear) => {
            state.float_break_type = clear;
            BreakType::Clear(clear)
        },
        LineEnd::Wrapped | LineEnd::EndOfContent => BreakType::None,
    };

    if state.trace {
        trace!(
            "Line {index} of {container:?}: {child_count} children at {top:?}, block size {:?}, ends {end:?}",
            metrics.block_size
        );
    }

    let exit = state.margin_state();
    if let Some(line) = lines.get_mut(index) {
        line.child_count = child_count;
        line.bounds = LogicalRect {
            start_corner: LogicalVec2 {
                inline: layout.band.start_corner.inline + offset,
                block: top,
            },
            size: LogicalVec2 {
                inline: content_inline_size,
                block: metrics.block_size,
            },
        };
        line.baseline = layout
            .has_content
            .then_some(top + metrics.baseline);
        line.carried_out_block_end_margin = CollapsedMargin::zero();
        line.start_margin_contribution = start_margin_contribution;
        line.flags
            .remove(LineFlags::DIRTY | LineFlags::PREVIOUS_MARGIN_DIRTY);
        line.flags
            .set(LineFlags::LINE_WRAPPED, layout.line_end == LineEnd::Wrapped);
        line.flags
            .set(LineFlags::IMPACTED_BY_FLOATS, impacted_by_floats);
        line.flags
            .set(LineFlags::HAS_CLEARANCE, has_clearance);
        line.set_empty(is_empty);
        line.floats = placed_floats;
        line.break_before = match clear {
            Clear::None => BreakType::None,
            clear => BreakType::Clear(clear),
        };
        line.break_after = break_after;
        line.overflow = overflow;
        line.entry = Some(entry);
        line.exit = Some(exit);
    }

    fix_following_lines(tree, lines, index, next_box);
    LineOutcome::Continue
}

/// Merges text boxes on the line that continue each other, undoing an earlier break
/// that this layout of the line no longer makes.
fn merge_text_continuations(tree: &mut BoxTree, layout: &mut LineLayout, end: &mut LineEndPoint) {
    let mut index = 1;
    while index < layout.entries.len() {
        let pair = match (&layout.entries[index - 1], &layout.entries[index]) {
            (LineEntry::Item(previous), LineEntry::Item(item)) if previous.frame == item.frame => {
                match (&previous.kind, &item.kind) {
                    (
                        LineItemKind::Text {
                            id: previous_id,
                            run: previous_run,
                            ..
                        },
                        LineItemKind::Text { id, run, .. },
                    ) => {
                        let continues = tree.get(*previous_id).next_in_flow() == Some(*id) &&
                            tree.next_sibling(*previous_id) == Some(*id) &&
                            matches!(&tree.get(*previous_id).kind,
                                BoxKind::Text(box_run) if box_run.range.end == previous_run.range.end);
                        continues.then_some((*previous_id, *id, run.range.end, item.inline_size))
                    },
                    _ => None,
                }
            },
            _ => None,
        };
        let Some((previous_id, id, range_end, inline_size)) = pair else {
            index += 1;
            continue;
        };

        tree.rejoin_next_in_flow(previous_id);
        layout.entries.remove(index);
        if let LineEntry::Item(previous) = &mut layout.entries[index - 1] {
            previous.inline_size += inline_size;
            if let LineItemKind::Text { run, .. } = &mut previous.kind {
                run.range.end = range_end;
            }
        }
        *end = match *end {
            LineEndPoint::InText(split, at) if split == id => LineEndPoint::InText(previous_id, at),
            LineEndPoint::AfterBox(after) if after == id => LineEndPoint::AfterBox(previous_id),
            other => other,
        };
    }
}

/// The block-axis extent of the content area of an inline box, from its font.
fn content_area_block_size(style: &ComputedValues) -> Au {
    style.font.ascent + style.font.descent
}

/// Writes the geometry of every box on the line. Boxes directly in the container are
/// positioned relative to it, boxes inside a span relative to the span's border box.
/// Returns the overflow of the line relative to the container.
fn commit_line_geometry(tree: &mut BoxTree, layout: &LineLayout, containing_block_inline_size: Au) -> OverflowAreas {
    let band_start = layout.band.start_corner.inline;
    let top = layout.line_top();
    let line_rect = LogicalRect {
        start_corner: LogicalVec2 {
            inline: band_start,
            block: top,
        },
        size: LogicalVec2 {
            inline: layout.inline_position,
            block: Au::zero(),
        },
    };
    let mut overflow = OverflowAreas::from_rect(line_rect);

    // Border boxes of the spans, relative to the container.
    let mut span_rects: Vec<LogicalRect<Au>> = Vec::with_capacity(layout.frames.len());
    for frame in layout.frames.iter() {
        let Some(id) = frame.id else {
            span_rects.push(LogicalRect::zero());
            continue;
        };
        let mode = frame.style.writing_mode;
        let pbm = frame
            .style
            .padding_border_margin(containing_block_inline_size, mode);
        let layout_box = tree.get(id);
        let has_start = layout_box.prev_in_flow().is_none();
        let has_end = frame.closed && layout_box.next_in_flow().is_none();
        let mut padding = pbm.padding;
        let mut border = pbm.border;
        if !has_start {
            padding.inline_start = Au::zero();
            border.inline_start = Au::zero();
        }
        if !has_end {
            padding.inline_end = Au::zero();
            border.inline_end = Au::zero();
        }

        let inline_start = band_start + frame.inline_start + frame.margin_inline_start;
        let inline_end = band_start + frame.inline_end - frame.margin_inline_end;
        let block_start = top + frame.baseline - frame.style.font.ascent - padding.block_start - border.block_start;
        let rect = LogicalRect {
            start_corner: LogicalVec2 {
                inline: inline_start,
                block: block_start,
            },
            size: LogicalVec2 {
                inline: (inline_end - inline_start).max(Au::zero()),
                block: content_area_block_size(&frame.style) +
                    padding.block_sum() +
                    border.block_sum(),
            },
        };
        span_rects.push(rect);

        let parent_origin = frame
            .parent
            .map_or(LogicalVec2::zero(), |parent| span_rects[parent].start_corner);
        let margin = pbm.margin_or_zero();
        let geometry = tree.geometry_mut(id);
        geometry.border_rect = rect.translate(-parent_origin);
        geometry.padding = padding;
        geometry.border = border;
        geometry.margin = LogicalSides {
            inline_start: frame.margin_inline_start,
            inline_end: frame.margin_inline_end,
            block_start: margin.block_start,
            block_end: margin.block_end,
        };
        geometry.overflow = OverflowAreas::from_rect(LogicalRect {
            start_corner: LogicalVec2::zero(),
            size: rect.size,
        });
        geometry.first_baseline = Some(top + frame.baseline - block_start);
        geometry.last_baseline = geometry.first_baseline;
        overflow.union(&OverflowAreas::from_rect(rect));
    }

    for item in layout.items() {
        let origin = span_rects[item.frame].start_corner;
        let inline_start = band_start + item.inline_start;
        match &item.kind {
            LineItemKind::Text { id, .. } => {
                let font = item.style.font;
                let rect = LogicalRect {
                    start_corner: LogicalVec2 {
                        inline: inline_start,
                        block: top + item.baseline - font.ascent,
                    },
                    size: LogicalVec2 {
                        inline: item.inline_size + item.justification,
                        block: content_area_block_size(&item.style),
                    },
                };
                let geometry = tree.geometry_mut(*id);
                geometry.border_rect = rect.translate(-origin);
                geometry.padding = LogicalSides::zero();
                geometry.border = LogicalSides::zero();
                geometry.margin = LogicalSides::zero();
                geometry.overflow = OverflowAreas::from_rect(LogicalRect {
                    start_corner: LogicalVec2::zero(),
                    size: rect.size,
                });
                geometry.first_baseline = Some(font.ascent);
                geometry.last_baseline = Some(font.ascent);
                overflow.union(&OverflowAreas::from_rect(rect));
            },
            LineItemKind::Atomic { id } => {
                let margin_corner = LogicalVec2 {
                    inline: inline_start,
                    block: top + item.baseline - item.ascent,
                };
                let geometry = tree.geometry_mut(*id);
                let border_corner = margin_corner + geometry.margin.start_offset();
                geometry.border_rect.start_corner = border_corner - origin;
                overflow.union(&geometry.overflow.translate(border_corner));
            },
            LineItemKind::LineBreak { id } => {
                let geometry = tree.geometry_mut(*id);
                geometry.border_rect = LogicalRect {
                    start_corner: LogicalVec2 {
                        inline: inline_start,
                        block: top + item.baseline,
                    } - origin,
                    size: LogicalVec2::zero(),
                };
            },
        }
    }
    overflow
}

/// Splits the boxes the line ends inside, so that everything after the end of the line
/// is in boxes of its own. Returns the child of the container that starts the next line.
fn split_at_line_end(tree: &mut BoxTree, container: BoxId, end: LineEndPoint) -> Option<BoxId> {
    let mut first_moved = match end {
        LineEndPoint::EndOfRun(next) => return next,
        LineEndPoint::BeforeBox(id) => id,
        LineEndPoint::AfterBox(id) => {
            let mut current = id;
            loop {
                if let Some(next) = tree.next_sibling(current) {
                    break next;
                }
                match tree.parent(current) {
                    Some(parent) if parent != container => current = parent,
                    _ => return None,
                }
            }
        },
        LineEndPoint::InText(id, at) => {
            let range = match &tree.get(id).kind {
                BoxKind::Text(run) => run.range.clone(),
                _ => return tree.next_sibling(id),
            };
            if at <= range.start {
                id
            } else if at >= range.end {
                return split_at_line_end(tree, container, LineEndPoint::AfterBox(id));
            } else {
                tree.split_text(id, at)
            }
        },
    };

    loop {
        let parent = tree.parent(first_moved)?;
        if parent == container {
            return Some(first_moved);
        }
        first_moved = match tree.first_child(parent) == Some(first_moved) {
            true => parent,
            false => tree.split_inline_box(parent, Some(first_moved)),
        };
    }
}

/// Clears the dirty bits of a box on the line and of the inline content inside it.
/// Floats and inline-blocks clear their own when they are laid out.
fn clear_inline_dirty_bits(tree: &mut BoxTree, id: BoxId) {
    if matches!(tree.get(id).kind, BoxKind::BlockContainer(_)) {
        return;
    }
    tree.clear_dirty_bits(id);
    let children: Vec<BoxId> = tree.children(id).collect();
    for child in children {
        clear_inline_dirty_bits(tree, child);
    }
}

/// Makes the line after `index` start at `next_box`. When the line ended where it did
/// before, the following lines are kept. Otherwise the inline lines up to the next
/// block-level child are replaced by one dirty line covering the rest of the run.
fn fix_following_lines(tree: &BoxTree, lines: &mut LineList, index: LineIndex, next_box: Option<BoxId>) {
    let unchanged = match (lines.get(index + 1), next_box) {
        (Some(next_line), Some(next_box)) => next_line.first_child == next_box,
        (None, None) => true,
        _ => false,
    };
    if unchanged {
        return;
    }

    while lines
        .get(index + 1)
        .is_some_and(|line| line.is_inline())
    {
        lines.remove(index + 1);
    }
    let Some(next_box) = next_box else {
        return;
    };
    if tree.get(next_box).is_block_level() {
        return;
    }
    let child_count = tree
        .siblings_from(Some(next_box))
        .take_while(|child| !tree.get(*child).is_block_level())
        .count();
    lines.insert(index + 1, LineBox::new_inline(next_box, child_count));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::NeverInterrupt;
    use crate::flow::float::FloatContext;
    use crate::flow::reflow_state::tests::test_state;
    use crate::style::{Display, FloatProperty};
    use crate::text::FixedAdvanceText;

    fn px(px: i32) -> Au {
        Au::from_px(px)
    }

    fn style() -> ServoArc<ComputedValues> {
        ServoArc::new(ComputedValues::default())
    }

    fn text(tree: &mut BoxTree, parent: BoxId, content: &str) -> BoxId {
        let id = tree.new_text(style(), Arc::new(FixedAdvanceText::new(content, px(10))));
        tree.append_child(parent, id);
        id
    }

    fn lay_out_all(tree: &mut BoxTree, container: BoxId, floats: &mut FloatContext) -> LineList {
        let opts = blockflow_config::opts::Opts::default();
        let context = LayoutContext::new(&opts, &NeverInterrupt);
        let mut lines = LineList::new();
        lines.push(LineBox::new_inline(
            tree.first_child(container).expect("container has children"),
            tree.children(container).count(),
        ));
        let mut state = test_state(container, floats, px(100));
        let mut index = 0;
        while index < lines.len() {
            assert_eq!(
                reflow_inline_line(tree, &context, &mut state, &mut lines, index, index == 0),
                LineOutcome::Continue
            );
            index += 1;
        }
        lines
    }

    #[test]
    fn test_paragraph_wraps_into_lines() {
        let mut tree = BoxTree::new();
        let container = tree.new_block_container(style());
        let run = text(&mut tree, container, "aaaa bbbb cccc");
        let mut floats = FloatContext::new(px(100));
        let lines = lay_out_all(&mut tree, container, &mut floats);

        assert_eq!(lines.len(), 2);
        let first = lines.get(0).expect("first line");
        let second = lines.get(1).expect("second line");
        assert_eq!(first.first_child, run);
        assert!(first.flags.contains(LineFlags::LINE_WRAPPED));
        assert_eq!(first.bounds.size.inline, px(90));
        assert_eq!(second.bounds.start_corner.block, first.bounds.max_block_position());
        assert_eq!(tree.children(container).count(), 2);
        assert_eq!(tree.get(run).next_in_flow(), Some(second.first_child));
    }

    #[test]
    fn test_relayout_at_same_width_keeps_following_lines() {
        let mut tree = BoxTree::new();
        let container = tree.new_block_container(style());
        text(&mut tree, container, "aaaa bbbb cccc");
        let mut floats = FloatContext::new(px(100));
        let mut lines = lay_out_all(&mut tree, container, &mut floats);
        let second = lines.get(1).map(|line| line.first_child);

        let opts = blockflow_config::opts::Opts::default();
        let context = LayoutContext::new(&opts, &NeverInterrupt);
        let mut floats = FloatContext::new(px(100));
        let mut state = test_state(container, &mut floats, px(100));
        reflow_inline_line(&mut tree, &context, &mut state, &mut lines, 0, true);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.get(1).map(|line| line.first_child), second);
    }

    #[test]
    fn test_wider_line_pulls_continuation_back() {
        let mut tree = BoxTree::new();
        let container = tree.new_block_container(style());
        let run = text(&mut tree, container, "aaaa bbbb cccc");
        let mut floats = FloatContext::new(px(100));
        let mut lines = lay_out_all(&mut tree, container, &mut floats);
        assert_eq!(lines.len(), 2);

        let opts = blockflow_config::opts::Opts::default();
        let context = LayoutContext::new(&opts, &NeverInterrupt);
        let mut floats = FloatContext::new(px(200));
        let mut state = test_state(container, &mut floats, px(200));
        reflow_inline_line(&mut tree, &context, &mut state, &mut lines, 0, true);
        assert_eq!(lines.len(), 1);
        assert_eq!(tree.children(container).collect::<Vec<_>>(), vec![run]);
        match &tree.get(run).kind {
            BoxKind::Text(text_run) => assert_eq!(text_run.range, 0..14),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_float_on_line_narrows_it() {
        let mut tree = BoxTree::new();
        let container = tree.new_block_container(style());
        let float = tree.new_block_container(ServoArc::new(ComputedValues {
            display: Display::Block,
            float: FloatProperty::Left,
            width: crate::style::LengthPercentageOrAuto::px(40),
            height: crate::style::LengthPercentageOrAuto::px(10),
            ..ComputedValues::default()
        }));
        tree.append_child(container, float);
        let run = text(&mut tree, container, "aaa bbb ccc");
        let mut floats = FloatContext::new(px(100));
        let lines = lay_out_all(&mut tree, container, &mut floats);

        let first = lines.get(0).expect("first line");
        assert_eq!(first.floats.as_slice(), &[float]);
        assert!(first.is_impacted_by_floats());
        assert_eq!(first.bounds.start_corner.inline, px(40));
        assert_eq!(tree.geometry(run).border_rect.start_corner.inline, px(40));
        assert_eq!(tree.geometry(float).border_rect.start_corner.inline, Au::zero());
    }

    #[test]
    fn test_line_break_with_clear_sets_break_type() {
        let mut tree = BoxTree::new();
        let container = tree.new_block_container(style());
        text(&mut tree, container, "ab");
        let br = tree.new_line_break(ServoArc::new(ComputedValues {
            clear: crate::style::ClearProperty::Both,
            ..ComputedValues::default()
        }));
        tree.append_child(container, br);
        text(&mut tree, container, "cd");
        let mut floats = FloatContext::new(px(100));
        let lines = lay_out_all(&mut tree, container, &mut floats);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines.get(0).map(|line| line.break_after), Some(BreakType::Clear(Clear::Both)));
        assert_eq!(lines.get(1).map(|line| line.break_before), Some(BreakType::Clear(Clear::Both)));
    }

    #[test]
    fn test_span_split_across_lines() {
        let mut tree = BoxTree::new();
        let container = tree.new_block_container(style());
        let span = tree.new_inline_box(style());
        tree.append_child(container, span);
        text(&mut tree, span, "aaaa bbbb cccc");
        let mut floats = FloatContext::new(px(100));
        let lines = lay_out_all(&mut tree, container, &mut floats);

        assert_eq!(lines.len(), 2);
        let continuation = tree.get(span).next_in_flow();
        assert!(continuation.is_some());
        assert_eq!(lines.get(1).map(|line| line.first_child), continuation);
        assert_eq!(tree.children(span).count(), 1);
    }
}
