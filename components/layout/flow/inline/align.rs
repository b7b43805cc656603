/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Inline-axis alignment: trailing white space, `text-align` and justification.

use app_units::Au;
use num_traits::Zero;

use super::line_layout::{LineEntry, LineItemKind, LineLayout};
use crate::style::{ComputedValues, TextAlign, TextAlignLast};

/// `text-align` with `left`, `right` and `justify` resolved for one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResolvedAlign {
    Start,
    End,
    Center,
    Justify,
}

fn resolve_text_align(style: &ComputedValues, is_last_line: bool) -> ResolvedAlign {
    let ltr = style.writing_mode.is_bidi_ltr();
    let text_align = match (is_last_line, style.text_align_last) {
        (false, _) | (true, TextAlignLast::Auto) => match style.text_align {
            TextAlign::Justify if is_last_line => TextAlign::Start,
            text_align => text_align,
        },
        (true, TextAlignLast::Start) => TextAlign::Start,
        (true, TextAlignLast::End) => TextAlign::End,
        (true, TextAlignLast::Left) => TextAlign::Left,
        (true, TextAlignLast::Right) => TextAlign::Right,
        (true, TextAlignLast::Center) => TextAlign::Center,
        (true, TextAlignLast::Justify) => TextAlign::Justify,
    };
    match text_align {
        TextAlign::Start => ResolvedAlign::Start,
        TextAlign::End => ResolvedAlign::End,
        TextAlign::Left if ltr => ResolvedAlign::Start,
        TextAlign::Left => ResolvedAlign::End,
        TextAlign::Right if ltr => ResolvedAlign::End,
        TextAlign::Right => ResolvedAlign::Start,
        TextAlign::Center => ResolvedAlign::Center,
        TextAlign::Justify => ResolvedAlign::Justify,
    }
}

/// Whether the lines of a container with this style are aligned to the start edge, so
/// that a wider container leaves them where they are.
pub(crate) fn is_start_aligned(style: &ComputedValues) -> bool {
    resolve_text_align(style, false) == ResolvedAlign::Start &&
        resolve_text_align(style, true) == ResolvedAlign::Start
}

/// Removes trailing collapsible white space from the end of the line.
fn trim_trailing_whitespace(layout: &mut LineLayout) {
    for entry in layout.entries.iter_mut().rev() {
        let LineEntry::Item(item) = entry else {
            continue;
        };
        match item.kind {
            LineItemKind::LineBreak { .. } => continue,
            LineItemKind::Atomic { .. } => return,
            LineItemKind::Text { .. } => {},
        }
        if !item.style.white_space.trims_trailing_whitespace() {
            return;
        }
        let LineItemKind::Text { run, trimmed, .. } = &mut item.kind else {
            return;
        };
        let trailing = run.text.trailing_whitespace(run.range.clone());
        let trimmed_advance = run.text.advance(run.range.end - trailing..run.range.end);
        *trimmed = trailing;
        item.inline_size -= trimmed_advance;
        layout.inline_position -= trimmed_advance;
        if trailing < run.range.len() {
            return;
        }
    }
}

/// Distributes `slack` over the justification opportunities of the line.
fn justify(layout: &mut LineLayout, slack: Au) {
    let opportunities: Vec<usize> = layout
        .entries
        .iter()
        .map(|entry| match entry {
            LineEntry::Item(item) => match &item.kind {
                LineItemKind::Text { run, trimmed, .. } => run
                    .text
                    .justification_opportunities(run.range.start..run.range.end - trimmed),
                _ => 0,
            },
            _ => 0,
        })
        .collect();
    let total: usize = opportunities.iter().sum();
    if total == 0 || slack <= Au::zero() {
        return;
    }
    let per_opportunity = slack / total as i32;
    let mut remainder = slack - per_opportunity * total as i32;
    let last = opportunities.iter().rposition(|count| *count > 0);
    for (index, entry) in layout.entries.iter_mut().enumerate() {
        let LineEntry::Item(item) = entry else {
            continue;
        };
        item.justification = per_opportunity * opportunities[index] as i32;
        if Some(index) == last {
            item.justification += remainder;
            remainder = Au::zero();
        }
    }
}

/// Aligns the line within its band and assigns inline positions to every item and span,
/// relative to the start of the band. Returns the offset of the content from the band
/// start and the inline size of the content, including `text-indent`.
pub(crate) fn align_inline(layout: &mut LineLayout, container_style: &ComputedValues, is_last_line: bool) -> (Au, Au) {
    trim_trailing_whitespace(layout);

    let content_size = layout.inline_position;
    let slack = layout.band.size.inline - content_size;
    let offset = match resolve_text_align(container_style, is_last_line) {
        ResolvedAlign::Start => Au::zero(),
        ResolvedAlign::End => slack.max(Au::zero()),
        ResolvedAlign::Center => (slack / 2).max(Au::zero()),
        ResolvedAlign::Justify => {
            justify(layout, slack);
            Au::zero()
        },
    };

    let mut position = offset + layout.text_indent;
    for entry in layout.entries.iter_mut() {
        match entry {
            LineEntry::SpanStart(index) => {
                layout.frames[*index].inline_start = position;
                position += layout.frames[*index].start_extra;
            },
            LineEntry::Item(item) => {
                item.inline_start = position;
                position += item.inline_size + item.justification;
            },
            LineEntry::SpanEnd(index) => {
                position += layout.frames[*index].end_extra;
                layout.frames[*index].inline_end = position;
            },
        }
    }
    // Spans that continue on the next line end where the line does.
    for frame in layout.frames.iter_mut() {
        if !frame.closed {
            frame.inline_end = position;
        }
    }
    layout.frames[0].inline_start = offset;

    (offset, position - offset)
}
