/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The interface to shaped text. Shaping and break-opportunity discovery belong to the
//! text collaborator; line layout only asks it to measure ranges, to find the soft wrap
//! opportunities within them and to report trailing white space.

use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

use app_units::Au;
use num_traits::Zero;

use crate::sizing::ContentSizes;
use crate::style::WhiteSpace;

/// Shaped text, indexed by cluster.
pub trait ShapedText: Debug {
    /// The number of clusters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The advance of the clusters in `range`.
    fn advance(&self, range: Range<usize>) -> Au;

    /// Whether a soft wrap opportunity lies before cluster `index` (so a line may end with
    /// cluster `index - 1`). Only queried for `0 < index < len()`.
    fn is_soft_wrap_opportunity(&self, index: usize) -> bool;

    /// Whether the cluster is collapsible white space.
    fn is_whitespace(&self, index: usize) -> bool;

    /// Whether the cluster is a preserved segment break.
    fn is_segment_break(&self, index: usize) -> bool;

    /// The number of clusters that stretch when justifying.
    fn justification_opportunities(&self, range: Range<usize>) -> usize {
        range.filter(|index| self.is_whitespace(*index)).count()
    }

    /// Lays out `range` into `available` inline space, reporting where the line should
    /// break. This is the reflow entry point for text runs.
    fn reflow_to_width(
        &self,
        range: Range<usize>,
        available: Au,
        white_space: WhiteSpace,
        must_place_something: bool,
    ) -> TextFit {
        let mut end = range.end;
        let mut forced_break = false;
        if white_space.preserves_newlines() {
            if let Some(index) = range.clone().find(|index| self.is_segment_break(*index)) {
                end = index + 1;
                forced_break = true;
            }
        }

        let mut last_opportunity = None;
        if white_space.allow_wrap() {
            last_opportunity = (range.start + 1..end)
                .rev()
                .find(|index| self.is_soft_wrap_opportunity(*index));
        }

        let visible = |end: usize| {
            let trailing = if white_space.trims_trailing_whitespace() {
                self.trailing_whitespace(range.start..end)
            } else {
                0
            };
            self.advance(range.start..end - trailing)
        };

        if visible(end) <= available {
            return TextFit {
                end,
                inline_size: self.advance(range.start..end),
                complete: end == range.end && !forced_break,
                forced_break,
                last_opportunity,
            };
        }

        if white_space.allow_wrap() {
            // The furthest soft wrap opportunity that still fits.
            let fitting = (range.start + 1..end)
                .rev()
                .filter(|index| self.is_soft_wrap_opportunity(*index))
                .find(|index| visible(*index) <= available);
            if let Some(index) = fitting {
                return TextFit::partial(self, range.start, index, last_opportunity);
            }
        }

        if !must_place_something {
            return TextFit {
                end: range.start,
                inline_size: Au::zero(),
                complete: false,
                forced_break: false,
                last_opportunity,
            };
        }

        // Nothing fits: overflow up to the first opportunity.
        let first = if white_space.allow_wrap() {
            (range.start + 1..end).find(|index| self.is_soft_wrap_opportunity(*index))
        } else {
            None
        };
        match first {
            Some(index) => TextFit::partial(self, range.start, index, last_opportunity),
            None => TextFit {
                end,
                inline_size: self.advance(range.start..end),
                complete: end == range.end && !forced_break,
                forced_break,
                last_opportunity,
            },
        }
    }

    /// The number of trailing collapsible white space clusters in `range`.
    fn trailing_whitespace(&self, range: Range<usize>) -> usize {
        range
            .rev()
            .take_while(|index| self.is_whitespace(*index) || self.is_segment_break(*index))
            .count()
    }

    /// Intrinsic contributions of `range`.
    fn content_sizes(&self, range: Range<usize>, white_space: WhiteSpace) -> ContentSizes {
        let mut sizes = ContentSizes::zero();
        let mut segment_start = range.start;
        let mut line_start = range.start;
        for index in range.start + 1..=range.end {
            let at_end = index == range.end;
            let forced = !at_end && white_space.preserves_newlines() && self.is_segment_break(index - 1);
            let soft = !at_end && white_space.allow_wrap() && self.is_soft_wrap_opportunity(index);
            if at_end || forced || soft {
                let trailing = if white_space.trims_trailing_whitespace() {
                    self.trailing_whitespace(segment_start..index)
                } else {
                    0
                };
                sizes.min_content = sizes
                    .min_content
                    .max(self.advance(segment_start..index - trailing));
                segment_start = index;
            }
            if at_end || forced {
                let trailing = if white_space.trims_trailing_whitespace() {
                    self.trailing_whitespace(line_start..index)
                } else {
                    0
                };
                sizes.max_content = sizes
                    .max_content
                    .max(self.advance(line_start..index - trailing));
                line_start = index;
            }
        }
        sizes
    }
}

/// The result of fitting a text range into a line.
#[derive(Clone, Debug, PartialEq)]
pub struct TextFit {
    /// The end of the clusters placed on this line.
    pub end: usize,
    /// The advance of the placed clusters, including trailing white space.
    pub inline_size: Au,
    /// Whether the whole range was placed.
    pub complete: bool,
    /// Whether the placed clusters end with a preserved segment break.
    pub forced_break: bool,
    /// The last soft wrap opportunity inside the range, remembered for backing up.
    pub last_opportunity: Option<usize>,
}

impl TextFit {
    fn partial<T: ShapedText + ?Sized>(
        text: &T,
        start: usize,
        end: usize,
        last_opportunity: Option<usize>,
    ) -> Self {
        TextFit {
            end,
            inline_size: text.advance(start..end),
            complete: false,
            forced_break: false,
            last_opportunity: last_opportunity.filter(|opportunity| *opportunity <= end),
        }
    }
}

/// A range of shaped text owned by one text box. Continuations of the box share the
/// same shaped text with later ranges.
#[derive(Clone, Debug)]
pub struct TextRun {
    pub text: Arc<dyn ShapedText + Send + Sync>,
    pub range: Range<usize>,
}

impl TextRun {
    pub fn new(text: Arc<dyn ShapedText + Send + Sync>) -> Self {
        let range = 0..text.len();
        TextRun { text, range }
    }

    pub fn advance(&self) -> Au {
        self.text.advance(self.range.clone())
    }

    /// Whether the run only holds collapsible white space. Such runs do not make a line
    /// non-empty.
    pub fn is_collapsible_whitespace(&self, white_space: WhiteSpace) -> bool {
        white_space.trims_trailing_whitespace() &&
            self.range
                .clone()
                .all(|index| self.text.is_whitespace(index))
    }

    /// Whether a soft wrap opportunity precedes the first cluster of this run.
    pub fn starts_with_wrap_opportunity(&self) -> bool {
        self.range.start < self.range.end && self.text.is_whitespace(self.range.start)
    }

    /// Whether a soft wrap opportunity follows the last cluster of this run.
    pub fn ends_with_wrap_opportunity(&self) -> bool {
        self.range.start < self.range.end && self.text.is_whitespace(self.range.end - 1)
    }
}

/// Text where every cluster is one character with the same advance. White space is a
/// soft wrap opportunity after it; `\n` is a segment break. Text is expected to have
/// gone through white space collapsing already.
#[derive(Clone, Debug)]
pub struct FixedAdvanceText {
    chars: Vec<char>,
    advance: Au,
}

impl FixedAdvanceText {
    pub fn new(text: &str, advance: Au) -> Self {
        FixedAdvanceText {
            chars: text.chars().collect(),
            advance,
        }
    }
}

impl ShapedText for FixedAdvanceText {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn advance(&self, range: Range<usize>) -> Au {
        self.advance * range.len() as i32
    }

    fn is_soft_wrap_opportunity(&self, index: usize) -> bool {
        index > 0 &&
            index < self.chars.len() &&
            self.chars[index - 1].is_whitespace() &&
            !self.chars[index].is_whitespace()
    }

    fn is_whitespace(&self, index: usize) -> bool {
        self.chars[index] == ' ' || self.chars[index] == '\t'
    }

    fn is_segment_break(&self, index: usize) -> bool {
        self.chars[index] == '\n'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str) -> FixedAdvanceText {
        FixedAdvanceText::new(text, Au::from_px(10))
    }

    #[test]
    fn test_everything_fits() {
        let shaped = text("hello world");
        let fit = shaped.reflow_to_width(0..11, Au::from_px(200), WhiteSpace::Normal, true);
        assert!(fit.complete);
        assert_eq!(fit.end, 11);
        assert_eq!(fit.last_opportunity, Some(6));
    }

    #[test]
    fn test_breaks_at_last_fitting_opportunity() {
        let shaped = text("aaa bbb ccc");
        // "aaa bbb " is 80px but its trailing space hangs, so 70px is enough.
        let fit = shaped.reflow_to_width(0..11, Au::from_px(70), WhiteSpace::Normal, false);
        assert!(!fit.complete);
        assert_eq!(fit.end, 8);
        assert_eq!(fit.inline_size, Au::from_px(80));
    }

    #[test]
    fn test_nothing_fits() {
        let shaped = text("abcdef ghi");
        let fit = shaped.reflow_to_width(0..10, Au::from_px(30), WhiteSpace::Normal, false);
        assert_eq!(fit.end, 0);
        assert!(!fit.complete);

        let forced = shaped.reflow_to_width(0..10, Au::from_px(30), WhiteSpace::Normal, true);
        assert_eq!(forced.end, 7);
    }

    #[test]
    fn test_nowrap_never_breaks() {
        let shaped = text("aaa bbb");
        let fit = shaped.reflow_to_width(0..7, Au::from_px(30), WhiteSpace::Nowrap, true);
        assert!(fit.complete);
        assert_eq!(fit.inline_size, Au::from_px(70));
    }

    #[test]
    fn test_preserved_newline_forces_break() {
        let shaped = text("ab\ncd");
        let fit = shaped.reflow_to_width(0..5, Au::from_px(500), WhiteSpace::Pre, false);
        assert!(fit.forced_break);
        assert!(!fit.complete);
        assert_eq!(fit.end, 3);
    }

    #[test]
    fn test_content_sizes() {
        let shaped = text("aa bbbb c");
        let sizes = shaped.content_sizes(0..9, WhiteSpace::Normal);
        assert_eq!(sizes.min_content, Au::from_px(40));
        assert_eq!(sizes.max_content, Au::from_px(90));
    }
}
