/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Builds one line: places inline-level boxes along the inline axis until the line is
//! full, and decides where it breaks.

use app_units::Au;
use num_traits::Zero;
use servo_arc::Arc as ServoArc;

use crate::box_tree::BoxId;
use crate::flow::float::Clear;
use crate::geom::{LogicalRect, LogicalVec2};
use crate::style::{ComputedValues, VerticalAlign};
use crate::text::TextRun;

/// A position at which a line may end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BreakAt {
    /// Before the given box, which then starts the next line.
    BeforeBox(BoxId),
    /// Inside a text box, before the given cluster.
    InText(BoxId, usize),
}

/// What the line builder asks of the driver after placing a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineReflowStatus {
    /// Keep going.
    Ok,
    /// Something did not fit and there is no break opportunity at that point. Lay the line
    /// out again, ending it at the given earlier opportunity.
    RedoNoPull(BreakAt),
    /// Floats are narrower somewhere within the height of the finished line. Lay it out
    /// again within the narrower width.
    RedoMoreFloats,
    /// Nothing fits beside the floats in this band. Lay the line out again in the next one.
    RedoNextBand,
    /// The line does not fit in the current fragment.
    Truncated,
}

/// The effect of [`LineLayout::reflow_box`] on the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BoxPlacement {
    /// The whole box is on the line.
    Placed,
    /// The whole box is on the line, and the line ends after it.
    EndsLine,
    /// A text box is on the line up to the given cluster, and the line ends there.
    Split(usize),
    /// The box starts the next line.
    BreakBefore,
    /// Nothing was placed. The status says how to lay out the line again.
    NotPlaced,
}

/// Why the line ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum LineEnd {
    #[default]
    EndOfContent,
    /// Content did not fit and the line ended at a soft wrap opportunity.
    Wrapped,
    /// A line break or preserved newline.
    Forced(Clear),
}

/// A box handed to [`LineLayout::reflow_box`].
pub(crate) enum InlineInput<'a> {
    Text {
        id: BoxId,
        run: TextRun,
        style: &'a ServoArc<ComputedValues>,
        /// When set, place exactly up to this cluster and end the line there.
        break_at: Option<usize>,
    },
    /// A box laid out as a unit: replaced content or an inline-block.
    Atomic {
        id: BoxId,
        style: &'a ServoArc<ComputedValues>,
        margin_box_size: LogicalVec2<Au>,
        /// Distance from the block-start margin edge to the baseline.
        ascent: Au,
    },
    LineBreak {
        id: BoxId,
        style: &'a ServoArc<ComputedValues>,
        clear: Clear,
    },
}

#[derive(Clone, Debug)]
pub(crate) enum LineItemKind {
    Text {
        id: BoxId,
        run: TextRun,
        /// Clusters at the end of `run` removed as trailing white space.
        trimmed: usize,
    },
    Atomic {
        id: BoxId,
    },
    LineBreak {
        id: BoxId,
    },
}

impl LineItemKind {
    pub(crate) fn box_id(&self) -> BoxId {
        match self {
            LineItemKind::Text { id, .. } | LineItemKind::Atomic { id } | LineItemKind::LineBreak { id } => *id,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct LineItem {
    pub kind: LineItemKind,
    /// The span frame the item is in.
    pub frame: usize,
    pub style: ServoArc<ComputedValues>,
    pub inline_size: Au,
    /// Extra inline space given to the item by justification.
    pub justification: Au,
    /// The margin edge of the item, relative to the start of the line.
    pub inline_start: Au,
    /// Extent above and below the item's baseline: the layout bounds for text, the margin
    /// box for atomics.
    pub ascent: Au,
    pub descent: Au,
    /// The baseline of the item, relative to the top of the line.
    pub baseline: Au,
}

/// An inline box on the current line, or the root of the line.
#[derive(Clone, Debug)]
pub(crate) struct SpanFrame {
    pub id: Option<BoxId>,
    pub parent: Option<usize>,
    pub style: ServoArc<ComputedValues>,
    /// Inline-start margin, border and padding placed on this line.
    pub start_extra: Au,
    pub end_extra: Au,
    pub margin_inline_start: Au,
    pub margin_inline_end: Au,
    /// Whether the box ended on this line.
    pub closed: bool,
    /// Extent of the frame's content above and below its baseline.
    pub ascent: Au,
    pub descent: Au,
    /// Relative to the top of the line.
    pub baseline: Au,
    /// Margin edges, relative to the start of the line.
    pub inline_start: Au,
    pub inline_end: Au,
}

impl SpanFrame {
    fn new(id: Option<BoxId>, parent: Option<usize>, style: ServoArc<ComputedValues>) -> Self {
        SpanFrame {
            id,
            parent,
            style,
            start_extra: Au::zero(),
            end_extra: Au::zero(),
            margin_inline_start: Au::zero(),
            margin_inline_end: Au::zero(),
            closed: false,
            ascent: Au::zero(),
            descent: Au::zero(),
            baseline: Au::zero(),
            inline_start: Au::zero(),
            inline_end: Au::zero(),
        }
    }

    pub(crate) fn vertical_align(&self) -> VerticalAlign {
        match self.parent {
            Some(_) => self.style.vertical_align,
            None => VerticalAlign::Baseline,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum LineEntry {
    Item(LineItem),
    SpanStart(usize),
    SpanEnd(usize),
}

/// The vertical result of laying out a line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct LineBlockMetrics {
    pub block_size: Au,
    /// Relative to the top of the line.
    pub baseline: Au,
}

#[derive(Debug)]
pub(crate) struct LineLayout {
    pub entries: Vec<LineEntry>,
    pub frames: Vec<SpanFrame>,
    open_frames: Vec<usize>,
    /// The band the line is placed in, relative to the container.
    pub band: LogicalRect<Au>,
    pub impacted_by_floats: bool,
    pub text_indent: Au,
    /// Inline space used so far, from the start of the band.
    pub inline_position: Au,
    /// Whether anything that makes the line take up space is on it.
    pub has_content: bool,
    /// Whether there is a soft wrap opportunity after the last item.
    break_opportunity_here: bool,
    /// The last point before the current position where the line could end.
    pub last_opportunity: Option<BreakAt>,
    /// Place something even if it does not fit, because there is nowhere better.
    pub must_place: bool,
    pub line_end: LineEnd,
    /// Floats placed while building this line.
    pub placed_floats: Vec<BoxId>,
}

impl LineLayout {
    pub(crate) fn new(root_style: ServoArc<ComputedValues>) -> Self {
        LineLayout {
            entries: Vec::new(),
            frames: vec![SpanFrame::new(None, None, root_style)],
            open_frames: vec![0],
            band: LogicalRect::zero(),
            impacted_by_floats: false,
            text_indent: Au::zero(),
            inline_position: Au::zero(),
            has_content: false,
            break_opportunity_here: false,
            last_opportunity: None,
            must_place: false,
            line_end: LineEnd::default(),
            placed_floats: Vec::new(),
        }
    }

    /// Starts the line in `band`, relative to the container.
    pub(crate) fn begin_line(&mut self, band: LogicalRect<Au>, impacted_by_floats: bool, text_indent: Au) {
        self.band = band;
        self.impacted_by_floats = impacted_by_floats;
        self.text_indent = text_indent;
        self.inline_position = text_indent;
    }

    /// Floats placed on the line changed the band it is in.
    pub(crate) fn update_band(&mut self, band: LogicalRect<Au>, impacted_by_floats: bool) {
        self.band.start_corner.inline = band.start_corner.inline;
        self.band.size.inline = band.size.inline;
        self.impacted_by_floats |= impacted_by_floats;
    }

    pub(crate) fn line_top(&self) -> Au {
        self.band.start_corner.block
    }

    pub(crate) fn remaining_inline_size(&self) -> Au {
        (self.band.size.inline - self.inline_position).max(Au::zero())
    }

    /// Whether any box other than a float has been placed.
    pub(crate) fn has_items(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, LineEntry::Item(_)))
    }

    fn current_frame(&self) -> usize {
        self.open_frames.last().copied().unwrap_or(0)
    }

    pub(crate) fn begin_span(
        &mut self,
        id: BoxId,
        style: ServoArc<ComputedValues>,
        margin_inline_start: Au,
        start_extra: Au,
    ) {
        let parent = self.current_frame();
        let mut frame = SpanFrame::new(Some(id), Some(parent), style);
        frame.margin_inline_start = margin_inline_start;
        frame.start_extra = start_extra;
        let index = self.frames.len();
        self.frames.push(frame);
        self.open_frames.push(index);
        self.entries.push(LineEntry::SpanStart(index));
        self.inline_position += start_extra;
        if start_extra != Au::zero() {
            self.has_content = true;
        }
    }

    pub(crate) fn end_span(&mut self, margin_inline_end: Au, end_extra: Au) {
        let Some(index) = self.open_frames.pop() else {
            return;
        };
        debug_assert!(index != 0, "Closed the root of the line");
        let frame = &mut self.frames[index];
        frame.closed = true;
        frame.margin_inline_end = margin_inline_end;
        frame.end_extra = end_extra;
        self.entries.push(LineEntry::SpanEnd(index));
        self.inline_position += end_extra;
        if end_extra != Au::zero() {
            self.has_content = true;
        }
    }

    fn push_item(&mut self, kind: LineItemKind, style: &ServoArc<ComputedValues>, inline_size: Au, ascent: Au) {
        self.entries.push(LineEntry::Item(LineItem {
            kind,
            frame: self.current_frame(),
            style: style.clone(),
            inline_size,
            justification: Au::zero(),
            inline_start: Au::zero(),
            ascent,
            descent: Au::zero(),
            baseline: Au::zero(),
        }));
        self.inline_position += inline_size;
    }

    /// What to do with a box that is not placed because it does not fit.
    fn cannot_fit(&self, id: BoxId, opportunity_before: bool) -> Option<(BoxPlacement, LineReflowStatus)> {
        if !self.has_items() {
            return (self.impacted_by_floats && !self.must_place)
                .then_some((BoxPlacement::NotPlaced, LineReflowStatus::RedoNextBand));
        }
        if opportunity_before {
            return Some((BoxPlacement::BreakBefore, LineReflowStatus::Ok));
        }
        match self.last_opportunity {
            Some(opportunity) if opportunity != BreakAt::BeforeBox(id) => Some((
                BoxPlacement::NotPlaced,
                LineReflowStatus::RedoNoPull(opportunity),
            )),
            _ => None,
        }
    }

    /// Places a box on the line, or decides that the line ends before or inside it.
    pub(crate) fn reflow_box(&mut self, input: InlineInput) -> (BoxPlacement, LineReflowStatus) {
        match input {
            InlineInput::Text {
                id,
                run,
                style,
                break_at,
            } => self.reflow_text(id, run, style, break_at),
            InlineInput::Atomic {
                id,
                style,
                margin_box_size,
                ascent,
            } => {
                let allow_wrap = self.frames[self.current_frame()]
                    .style
                    .white_space
                    .allow_wrap();
                let opportunity_before = self.has_items() && allow_wrap;
                if margin_box_size.inline > self.remaining_inline_size() {
                    if let Some(result) = self.cannot_fit(id, opportunity_before) {
                        if result.0 == BoxPlacement::BreakBefore {
                            self.line_end = LineEnd::Wrapped;
                        }
                        return result;
                    }
                }
                if opportunity_before {
                    self.last_opportunity = Some(BreakAt::BeforeBox(id));
                }
                self.push_item(LineItemKind::Atomic { id }, style, margin_box_size.inline, ascent);
                if let Some(LineEntry::Item(item)) = self.entries.last_mut() {
                    item.descent = margin_box_size.block - ascent;
                }
                self.has_content = true;
                self.break_opportunity_here = allow_wrap;
                (BoxPlacement::Placed, LineReflowStatus::Ok)
            },
            InlineInput::LineBreak { id, style, clear } => {
                self.push_item(LineItemKind::LineBreak { id }, style, Au::zero(), Au::zero());
                self.has_content = true;
                self.line_end = LineEnd::Forced(clear);
                (BoxPlacement::EndsLine, LineReflowStatus::Ok)
            },
        }
    }

    fn reflow_text(
        &mut self,
        id: BoxId,
        run: TextRun,
        style: &ServoArc<ComputedValues>,
        break_at: Option<usize>,
    ) -> (BoxPlacement, LineReflowStatus) {
        let white_space = style.white_space;
        let range = run.range.clone();

        if let Some(end) = break_at {
            let placed = TextRun {
                text: run.text.clone(),
                range: range.start..end,
            };
            let advance = placed.advance();
            self.has_content |= !placed.is_collapsible_whitespace(white_space);
            self.push_item(LineItemKind::Text { id, run: placed, trimmed: 0 }, style, advance, Au::zero());
            self.line_end = LineEnd::Wrapped;
            return match end == range.end {
                true => (BoxPlacement::EndsLine, LineReflowStatus::Ok),
                false => (BoxPlacement::Split(end), LineReflowStatus::Ok),
            };
        }

        // White space at the start of the run breaks after itself, inside the run.
        let opportunity_before = self.has_items() && white_space.allow_wrap() && self.break_opportunity_here;
        let must_place_something = !self.has_items() && (!self.impacted_by_floats || self.must_place);
        let mut fit = run.text.reflow_to_width(
            range.clone(),
            self.remaining_inline_size(),
            white_space,
            must_place_something,
        );
        if fit.end == range.start && !range.is_empty() {
            if let Some(result) = self.cannot_fit(id, opportunity_before) {
                if result.0 == BoxPlacement::BreakBefore {
                    self.line_end = LineEnd::Wrapped;
                }
                return result;
            }
            fit = run
                .text
                .reflow_to_width(range.clone(), self.remaining_inline_size(), white_space, true);
        }

        if opportunity_before {
            self.last_opportunity = Some(BreakAt::BeforeBox(id));
        }
        if let Some(opportunity) = fit
            .last_opportunity
            .filter(|opportunity| *opportunity > range.start && *opportunity < fit.end)
        {
            self.last_opportunity = Some(BreakAt::InText(id, opportunity));
        }

        let placed = TextRun {
            text: run.text.clone(),
            range: range.start..fit.end,
        };
        self.has_content |= !placed.is_collapsible_whitespace(white_space);
        self.break_opportunity_here = white_space.allow_wrap() && placed.ends_with_wrap_opportunity();
        self.push_item(LineItemKind::Text { id, run: placed, trimmed: 0 }, style, fit.inline_size, Au::zero());

        if fit.forced_break {
            self.line_end = LineEnd::Forced(Clear::None);
            return match fit.end == range.end {
                true => (BoxPlacement::EndsLine, LineReflowStatus::Ok),
                false => (BoxPlacement::Split(fit.end), LineReflowStatus::Ok),
            };
        }
        if !fit.complete && fit.end < range.end {
            self.line_end = LineEnd::Wrapped;
            return (BoxPlacement::Split(fit.end), LineReflowStatus::Ok);
        }
        (BoxPlacement::Placed, LineReflowStatus::Ok)
    }

    /// Computes the block size and baseline of the line once all of its boxes are placed.
    pub(crate) fn end_line_reflow(&mut self) -> LineBlockMetrics {
        super::vertical_align::align_block(self)
    }

    /// The items of the line, in order.
    pub(crate) fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.entries.iter().filter_map(|entry| match entry {
            LineEntry::Item(item) => Some(item),
            _ => None,
        })
    }
}
