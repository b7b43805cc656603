/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Computed values consumed by layout. Style resolution happens elsewhere; layout only
//! reads these, resolving percentages against bases that it supplies itself.

use app_units::Au;
use num_traits::Zero;
use serde::Serialize;

use crate::flow::float::{Clear, FloatSide};
use crate::geom::{LogicalSides, LogicalVec2, PhysicalSides, WritingMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    FlowRoot,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum FloatProperty {
    #[default]
    None,
    Left,
    Right,
    InlineStart,
    InlineEnd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum ClearProperty {
    #[default]
    None,
    Left,
    Right,
    Both,
    InlineStart,
    InlineEnd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Scroll,
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum LengthPercentage {
    Length(Au),
    Percentage(f32),
}

impl Default for LengthPercentage {
    fn default() -> Self {
        LengthPercentage::Length(Au::zero())
    }
}

impl LengthPercentage {
    pub fn px(px: i32) -> Self {
        LengthPercentage::Length(Au::from_px(px))
    }

    pub fn resolve(&self, basis: Au) -> Au {
        match *self {
            LengthPercentage::Length(length) => length,
            LengthPercentage::Percentage(percentage) => basis.scale_by(percentage),
        }
    }

    /// Resolves against a basis that may be indefinite, in which case percentages
    /// behave as `auto`.
    pub fn maybe_resolve(&self, basis: Option<Au>) -> Option<Au> {
        match *self {
            LengthPercentage::Length(length) => Some(length),
            LengthPercentage::Percentage(percentage) => basis.map(|basis| basis.scale_by(percentage)),
        }
    }
}

/// A margin, or a preferred or minimum size: either `auto` or a length-percentage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum LengthPercentageOrAuto {
    #[default]
    Auto,
    LengthPercentage(LengthPercentage),
}

impl LengthPercentageOrAuto {
    pub fn px(px: i32) -> Self {
        LengthPercentageOrAuto::LengthPercentage(LengthPercentage::px(px))
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, LengthPercentageOrAuto::Auto)
    }

    pub fn resolve(&self, basis: Au) -> AuOrAuto {
        match self {
            LengthPercentageOrAuto::Auto => AuOrAuto::Auto,
            LengthPercentageOrAuto::LengthPercentage(lp) => AuOrAuto::LengthPercentage(lp.resolve(basis)),
        }
    }

    pub fn maybe_resolve(&self, basis: Option<Au>) -> Option<Au> {
        match self {
            LengthPercentageOrAuto::Auto => None,
            LengthPercentageOrAuto::LengthPercentage(lp) => lp.maybe_resolve(basis),
        }
    }
}

/// A `max-width` or `max-height` value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum MaxSize {
    #[default]
    None,
    LengthPercentage(LengthPercentage),
}

impl MaxSize {
    pub fn maybe_resolve(&self, basis: Option<Au>) -> Option<Au> {
        match self {
            MaxSize::None => None,
            MaxSize::LengthPercentage(lp) => lp.maybe_resolve(basis),
        }
    }
}

/// A resolved length which may still be `auto`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum AuOrAuto {
    Auto,
    LengthPercentage(Au),
}

impl AuOrAuto {
    pub fn auto_is(&self, f: impl FnOnce() -> Au) -> Au {
        match *self {
            AuOrAuto::Auto => f(),
            AuOrAuto::LengthPercentage(length) => length,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, AuOrAuto::Auto)
    }

    pub fn non_auto(&self) -> Option<Au> {
        match *self {
            AuOrAuto::Auto => None,
            AuOrAuto::LengthPercentage(length) => Some(length),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum VerticalAlign {
    #[default]
    Baseline,
    Sub,
    Super,
    Top,
    Bottom,
    Middle,
    TextTop,
    TextBottom,
    /// Aligns the vertical midpoint of the box with the parent's baseline.
    MiddleWithBaseline,
    /// Raises (positive) or lowers the box relative to the baseline. Percentages refer to
    /// the box's own line height.
    LengthPercentage(LengthPercentage),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum TextAlignLast {
    #[default]
    Auto,
    Start,
    End,
    Left,
    Right,
    Center,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum LineHeight {
    #[default]
    Normal,
    Number(f32),
    Length(Au),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum WhiteSpace {
    #[default]
    Normal,
    Nowrap,
    Pre,
    PreWrap,
    PreLine,
}

impl WhiteSpace {
    /// Whether lines may break at soft wrap opportunities.
    pub fn allow_wrap(&self) -> bool {
        !matches!(self, WhiteSpace::Nowrap | WhiteSpace::Pre)
    }

    /// Whether trailing spaces at the end of a line are removed.
    pub fn trims_trailing_whitespace(&self) -> bool {
        matches!(
            self,
            WhiteSpace::Normal | WhiteSpace::Nowrap | WhiteSpace::PreLine
        )
    }

    /// Whether segment breaks in the text force a line break.
    pub fn preserves_newlines(&self) -> bool {
        matches!(
            self,
            WhiteSpace::Pre | WhiteSpace::PreWrap | WhiteSpace::PreLine
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum BreakBetween {
    #[default]
    Auto,
    Avoid,
    Page,
    Column,
}

impl BreakBetween {
    pub fn is_forced(&self) -> bool {
        matches!(self, BreakBetween::Page | BreakBetween::Column)
    }
}

/// Font metrics of the first available font, supplied by the text collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FontMetrics {
    pub font_size: Au,
    pub ascent: Au,
    pub descent: Au,
    pub x_height: Au,
    pub line_gap: Au,
}

impl Default for FontMetrics {
    fn default() -> Self {
        FontMetrics::for_font_size(Au::from_px(16))
    }
}

impl FontMetrics {
    /// Metrics shaped like a common sans-serif face at the given size.
    pub fn for_font_size(font_size: Au) -> Self {
        FontMetrics {
            font_size,
            ascent: font_size.scale_by(0.8),
            descent: font_size.scale_by(0.2),
            x_height: font_size.scale_by(0.5),
            line_gap: Au::zero(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComputedValues {
    pub display: Display,
    pub float: FloatProperty,
    pub clear: ClearProperty,
    pub overflow: Overflow,
    pub margin: PhysicalSides<LengthPercentageOrAuto>,
    pub padding: PhysicalSides<LengthPercentage>,
    pub border_width: PhysicalSides<Au>,
    pub width: LengthPercentageOrAuto,
    pub height: LengthPercentageOrAuto,
    pub min_width: LengthPercentageOrAuto,
    pub min_height: LengthPercentageOrAuto,
    pub max_width: MaxSize,
    pub max_height: MaxSize,
    pub vertical_align: VerticalAlign,
    pub text_align: TextAlign,
    pub text_align_last: TextAlignLast,
    pub text_indent: LengthPercentage,
    pub line_height: LineHeight,
    pub font: FontMetrics,
    pub writing_mode: WritingMode,
    pub white_space: WhiteSpace,
    pub break_before: BreakBetween,
    pub break_after: BreakBetween,
}

impl Default for ComputedValues {
    fn default() -> Self {
        ComputedValues {
            display: Display::Block,
            float: FloatProperty::None,
            clear: ClearProperty::None,
            overflow: Overflow::Visible,
            margin: PhysicalSides::all(LengthPercentageOrAuto::px(0)),
            padding: PhysicalSides::all(LengthPercentage::default()),
            border_width: PhysicalSides::all(Au::zero()),
            width: LengthPercentageOrAuto::Auto,
            height: LengthPercentageOrAuto::Auto,
            min_width: LengthPercentageOrAuto::Auto,
            min_height: LengthPercentageOrAuto::Auto,
            max_width: MaxSize::None,
            max_height: MaxSize::None,
            vertical_align: VerticalAlign::Baseline,
            text_align: TextAlign::Start,
            text_align_last: TextAlignLast::Auto,
            text_indent: LengthPercentage::default(),
            line_height: LineHeight::Normal,
            font: FontMetrics::default(),
            writing_mode: WritingMode::horizontal_tb(),
            white_space: WhiteSpace::Normal,
            break_before: BreakBetween::Auto,
            break_after: BreakBetween::Auto,
        }
    }
}

/// Margins resolved against a containing block, with `auto` preserved.
#[derive(Clone, Debug)]
pub struct PaddingBorderMargin {
    pub padding: LogicalSides<Au>,
    pub border: LogicalSides<Au>,
    pub margin: LogicalSides<AuOrAuto>,

    /// Pre-computed sums in each axis
    pub padding_border_sums: LogicalVec2<Au>,
}

impl PaddingBorderMargin {
    pub fn zero() -> Self {
        PaddingBorderMargin {
            padding: LogicalSides::zero(),
            border: LogicalSides::zero(),
            margin: LogicalSides {
                inline_start: AuOrAuto::LengthPercentage(Au::zero()),
                inline_end: AuOrAuto::LengthPercentage(Au::zero()),
                block_start: AuOrAuto::LengthPercentage(Au::zero()),
                block_end: AuOrAuto::LengthPercentage(Au::zero()),
            },
            padding_border_sums: LogicalVec2::zero(),
        }
    }

    pub fn padding_border(&self) -> LogicalSides<Au> {
        self.padding + self.border
    }

    /// Margins with `auto` treated as zero.
    pub fn margin_or_zero(&self) -> LogicalSides<Au> {
        LogicalSides {
            inline_start: self.margin.inline_start.auto_is(Au::zero),
            inline_end: self.margin.inline_end.auto_is(Au::zero),
            block_start: self.margin.block_start.auto_is(Au::zero),
            block_end: self.margin.block_end.auto_is(Au::zero),
        }
    }
}

impl ComputedValues {
    pub fn is_floating(&self) -> bool {
        self.float != FloatProperty::None
    }

    pub fn is_inline_level(&self) -> bool {
        !self.is_floating() && matches!(self.display, Display::Inline | Display::InlineBlock)
    }

    pub fn is_block_level(&self) -> bool {
        !self.is_floating() && matches!(self.display, Display::Block | Display::FlowRoot)
    }

    /// Whether a block container with this style starts a new block formatting context,
    /// and with it its own float context.
    pub fn establishes_block_formatting_context(&self) -> bool {
        self.is_floating() ||
            self.display == Display::FlowRoot ||
            self.display == Display::InlineBlock ||
            self.overflow != Overflow::Visible
    }

    /// Resolves padding, border and margin against the inline size of the containing
    /// block, which is the basis for percentages in both axes.
    pub fn padding_border_margin(&self, containing_block_inline_size: Au, mode: WritingMode) -> PaddingBorderMargin {
        let padding = self
            .padding
            .to_logical(mode)
            .map_sides(|padding| padding.resolve(containing_block_inline_size).max(Au::zero()));
        let border = self.border_width.to_logical(mode);
        let margin = self
            .margin
            .to_logical(mode)
            .map_sides(|margin| margin.resolve(containing_block_inline_size));
        PaddingBorderMargin {
            padding_border_sums: LogicalVec2 {
                inline: padding.inline_sum() + border.inline_sum(),
                block: padding.block_sum() + border.block_sum(),
            },
            padding,
            border,
            margin,
        }
    }

    /// Preferred, minimum and maximum sizes in logical terms.
    pub fn box_size(&self, mode: WritingMode) -> LogicalVec2<LengthPercentageOrAuto> {
        if mode.is_horizontal() {
            LogicalVec2 {
                inline: self.width,
                block: self.height,
            }
        } else {
            LogicalVec2 {
                inline: self.height,
                block: self.width,
            }
        }
    }

    pub fn min_box_size(&self, mode: WritingMode) -> LogicalVec2<LengthPercentageOrAuto> {
        if mode.is_horizontal() {
            LogicalVec2 {
                inline: self.min_width,
                block: self.min_height,
            }
        } else {
            LogicalVec2 {
                inline: self.min_height,
                block: self.min_width,
            }
        }
    }

    pub fn max_box_size(&self, mode: WritingMode) -> LogicalVec2<MaxSize> {
        if mode.is_horizontal() {
            LogicalVec2 {
                inline: self.max_width,
                block: self.max_height,
            }
        } else {
            LogicalVec2 {
                inline: self.max_height,
                block: self.max_width,
            }
        }
    }

    /// The used `line-height`.
    pub fn computed_line_height(&self) -> Au {
        match self.line_height {
            LineHeight::Normal => self.font.ascent + self.font.descent + self.font.line_gap,
            LineHeight::Number(number) => self.font.font_size.scale_by(number),
            LineHeight::Length(length) => length,
        }
    }

    pub fn float_side(&self, container_writing_mode: WritingMode) -> Option<FloatSide> {
        FloatSide::from_style_and_container_writing_mode(self, container_writing_mode)
    }

    pub fn clear_value(&self, container_writing_mode: WritingMode) -> Clear {
        Clear::from_style_and_container_writing_mode(self, container_writing_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_margins_resolve_against_inline_size() {
        let mut style = ComputedValues::default();
        style.margin.top = LengthPercentageOrAuto::LengthPercentage(LengthPercentage::Percentage(0.1));
        style.padding.left = LengthPercentage::Percentage(0.5);
        style.border_width.right = Au::from_px(3);
        let pbm = style.padding_border_margin(Au::from_px(200), WritingMode::horizontal_tb());
        assert_eq!(
            pbm.margin.block_start,
            AuOrAuto::LengthPercentage(Au::from_px(20))
        );
        assert_eq!(pbm.padding.inline_start, Au::from_px(100));
        assert_eq!(pbm.padding_border_sums.inline, Au::from_px(103));
    }

    #[test]
    fn test_bfc_roots() {
        let mut style = ComputedValues::default();
        assert!(!style.establishes_block_formatting_context());
        style.overflow = Overflow::Hidden;
        assert!(style.establishes_block_formatting_context());
        style.overflow = Overflow::Visible;
        style.float = FloatProperty::Left;
        assert!(style.establishes_block_formatting_context());
        assert!(!style.is_block_level());
    }
}
