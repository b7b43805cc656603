/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Block-axis alignment of the boxes on a line: <https://drafts.csswg.org/css2/#line-height>

use app_units::Au;
use num_traits::Zero;

use super::line_layout::{LineBlockMetrics, LineEntry, LineItemKind, LineLayout};
use crate::style::{ComputedValues, VerticalAlign};

/// The layout bounds of an inline box with the given style: its font's ascent and
/// descent, with half of the leading added on each side.
pub(crate) fn strut(style: &ComputedValues) -> (Au, Au) {
    let font = &style.font;
    let leading = style.computed_line_height() - (font.ascent + font.descent);
    let half_leading = leading / 2;
    (font.ascent + half_leading, font.descent + (leading - half_leading))
}

/// How far above its parent's baseline a box with the given alignment puts its own
/// baseline.
fn baseline_shift(
    vertical_align: VerticalAlign,
    parent: &ComputedValues,
    own: &ComputedValues,
    ascent: Au,
    descent: Au,
) -> Au {
    match vertical_align {
        VerticalAlign::Baseline | VerticalAlign::Top | VerticalAlign::Bottom => Au::zero(),
        VerticalAlign::Sub => -(parent.font.font_size / 5),
        VerticalAlign::Super => parent.font.font_size / 3,
        VerticalAlign::TextTop => parent.font.ascent - ascent,
        VerticalAlign::TextBottom => descent - parent.font.descent,
        VerticalAlign::Middle => parent.font.x_height / 2 - (ascent - descent) / 2,
        VerticalAlign::MiddleWithBaseline => -((ascent - descent) / 2),
        VerticalAlign::LengthPercentage(length) => length.resolve(own.computed_line_height()),
    }
}

fn is_line_relative(vertical_align: VerticalAlign) -> bool {
    matches!(vertical_align, VerticalAlign::Top | VerticalAlign::Bottom)
}

/// A box aligned to the line box itself rather than to its parent.
#[derive(Clone, Copy)]
enum Aligned {
    Item(usize),
    Frame(usize),
}

/// Positions every item and span of the line in the block axis and returns the size of
/// the line. Empty lines take up no space.
pub(crate) fn align_block(layout: &mut LineLayout) -> LineBlockMetrics {
    let has_content = layout.has_content;

    // Each frame starts out with its own strut. The root only gets one on lines that have
    // content.
    for (index, frame) in layout.frames.iter_mut().enumerate() {
        let (ascent, descent) = match index == 0 && !has_content {
            true => (Au::zero(), Au::zero()),
            false => strut(&frame.style),
        };
        frame.ascent = ascent;
        frame.descent = descent;
    }

    let mut line_relative = Vec::new();
    let mut shifts = vec![Au::zero(); layout.entries.len()];
    for (entry_index, entry) in layout.entries.iter_mut().enumerate() {
        let LineEntry::Item(item) = entry else {
            continue;
        };
        if !matches!(item.kind, LineItemKind::Atomic { .. }) {
            let (ascent, descent) = strut(&item.style);
            item.ascent = ascent;
            item.descent = descent;
        }
        if !has_content {
            continue;
        }
        let parent = &layout.frames[item.frame];
        let vertical_align = item.style.vertical_align;
        if is_line_relative(vertical_align) {
            line_relative.push(Aligned::Item(entry_index));
            continue;
        }
        let shift = baseline_shift(vertical_align, &parent.style, &item.style, item.ascent, item.descent);
        shifts[entry_index] = shift;
        let parent = &mut layout.frames[item.frame];
        parent.ascent.max_assign(item.ascent + shift);
        parent.descent.max_assign(item.descent - shift);
    }

    // Frames are created in document order, so children come after their parents.
    let mut frame_shifts = vec![Au::zero(); layout.frames.len()];
    for index in (1..layout.frames.len()).rev() {
        if !has_content {
            break;
        }
        let frame = &layout.frames[index];
        let Some(parent_index) = frame.parent else {
            continue;
        };
        let vertical_align = frame.vertical_align();
        if is_line_relative(vertical_align) {
            line_relative.push(Aligned::Frame(index));
            continue;
        }
        let (ascent, descent) = (frame.ascent, frame.descent);
        let shift = baseline_shift(
            vertical_align,
            &layout.frames[parent_index].style,
            &frame.style,
            ascent,
            descent,
        );
        frame_shifts[index] = shift;
        let parent = &mut layout.frames[parent_index];
        parent.ascent.max_assign(ascent + shift);
        parent.descent.max_assign(descent - shift);
    }

    let root = &layout.frames[0];
    let mut baseline = root.ascent;
    let mut block_size = root.ascent + root.descent;

    // Boxes aligned to the bottom push the baseline down when taller than the line; those
    // aligned to the top extend the line downwards.
    let extent = |layout: &LineLayout, aligned: Aligned| match aligned {
        Aligned::Item(index) => match &layout.entries[index] {
            LineEntry::Item(item) => (item.style.vertical_align, item.ascent + item.descent),
            _ => (VerticalAlign::Baseline, Au::zero()),
        },
        Aligned::Frame(index) => {
            let frame = &layout.frames[index];
            (frame.vertical_align(), frame.ascent + frame.descent)
        },
    };
    for aligned in line_relative.iter() {
        let (vertical_align, size) = extent(&*layout, *aligned);
        if vertical_align == VerticalAlign::Bottom && size > block_size {
            baseline += size - block_size;
            block_size = size;
        }
    }
    for aligned in line_relative.iter() {
        let (_, size) = extent(&*layout, *aligned);
        block_size.max_assign(size);
    }
    if !has_content {
        block_size = Au::zero();
        baseline = Au::zero();
    }

    // Now resolve baselines top-down.
    layout.frames[0].baseline = baseline;
    for index in 1..layout.frames.len() {
        let frame = &layout.frames[index];
        let parent_baseline = frame
            .parent
            .map_or(baseline, |parent| layout.frames[parent].baseline);
        let frame_baseline = match frame.vertical_align() {
            VerticalAlign::Top => frame.ascent,
            VerticalAlign::Bottom => block_size - frame.descent,
            _ => parent_baseline - frame_shifts[index],
        };
        layout.frames[index].baseline = frame_baseline;
    }
    for (entry_index, entry) in layout.entries.iter_mut().enumerate() {
        let LineEntry::Item(item) = entry else {
            continue;
        };
        let parent_baseline = layout.frames[item.frame].baseline;
        item.baseline = match (has_content, item.style.vertical_align) {
            (false, _) => Au::zero(),
            (true, VerticalAlign::Top) => item.ascent,
            (true, VerticalAlign::Bottom) => block_size - item.descent,
            (true, _) => parent_baseline - shifts[entry_index],
        };
    }

    LineBlockMetrics {
        block_size,
        baseline,
    }
}

#[cfg(test)]
mod tests {
    use servo_arc::Arc as ServoArc;

    use super::*;
    use crate::box_tree::BoxTree;
    use crate::flow::inline::line_layout::InlineInput;
    use crate::geom::{LogicalRect, LogicalVec2};
    use crate::style::{FontMetrics, LengthPercentage, LineHeight};

    fn px(px: i32) -> Au {
        Au::from_px(px)
    }

    fn style(line_height: i32, vertical_align: VerticalAlign) -> ServoArc<ComputedValues> {
        ServoArc::new(ComputedValues {
            font: FontMetrics {
                font_size: px(16),
                ascent: px(12),
                descent: px(4),
                x_height: px(8),
                line_gap: Au::zero(),
            },
            line_height: LineHeight::Length(px(line_height)),
            vertical_align,
            ..ComputedValues::default()
        })
    }

    fn band() -> LogicalRect<Au> {
        LogicalRect {
            start_corner: LogicalVec2::zero(),
            size: LogicalVec2 {
                inline: px(500),
                block: px(500),
            },
        }
    }

    #[test]
    fn test_strut_splits_leading() {
        let style = style(20, VerticalAlign::Baseline);
        assert_eq!(strut(&style), (px(14), px(6)));
    }

    #[test]
    fn test_tall_atomic_on_baseline() {
        let root = style(20, VerticalAlign::Baseline);
        let mut tree = BoxTree::new();
        let image = tree.new_inline_box(root.clone());
        let mut layout = LineLayout::new(root.clone());
        layout.begin_line(band(), false, Au::zero());
        layout.reflow_box(InlineInput::Atomic {
            id: image,
            style: &root,
            margin_box_size: LogicalVec2 {
                inline: px(50),
                block: px(50),
            },
            ascent: px(50),
        });
        let metrics = layout.end_line_reflow();
        // The image sits on the baseline; the strut's descent hangs below it.
        assert_eq!(metrics.baseline, px(50));
        assert_eq!(metrics.block_size, px(56));
    }

    #[test]
    fn test_top_aligned_atomic_extends_line_downwards() {
        let root = style(20, VerticalAlign::Baseline);
        let top = style(20, VerticalAlign::Top);
        let mut tree = BoxTree::new();
        let image = tree.new_inline_box(root.clone());
        let mut layout = LineLayout::new(root.clone());
        layout.begin_line(band(), false, Au::zero());
        layout.reflow_box(InlineInput::Atomic {
            id: image,
            style: &top,
            margin_box_size: LogicalVec2 {
                inline: px(10),
                block: px(40),
            },
            ascent: px(40),
        });
        let metrics = layout.end_line_reflow();
        assert_eq!(metrics.baseline, px(14));
        assert_eq!(metrics.block_size, px(40));
        let item = layout.items().next().map(|item| item.baseline);
        assert_eq!(item, Some(px(40)));
    }

    /// Lays out a single atomic box with the given alignment on a 20px line and returns
    /// the line metrics together with the baseline of the box.
    fn align_atomic(vertical_align: VerticalAlign, block_size: i32) -> (LineBlockMetrics, Au) {
        let root = style(20, VerticalAlign::Baseline);
        let aligned = style(20, vertical_align);
        let mut tree = BoxTree::new();
        let image = tree.new_inline_box(root.clone());
        let mut layout = LineLayout::new(root);
        layout.begin_line(band(), false, Au::zero());
        layout.reflow_box(InlineInput::Atomic {
            id: image,
            style: &aligned,
            margin_box_size: LogicalVec2 {
                inline: px(10),
                block: px(block_size),
            },
            ascent: px(block_size),
        });
        let metrics = layout.end_line_reflow();
        let baseline = layout.items().next().map(|item| item.baseline);
        (metrics, baseline.unwrap_or_default())
    }

    fn strut_metrics() -> LineBlockMetrics {
        LineBlockMetrics {
            block_size: px(20),
            baseline: px(14),
        }
    }

    #[test]
    fn test_shifts_that_stay_within_the_strut() {
        // The box is 10px tall and sits on its bottom edge. The root strut is (14, 6) and
        // the parent font has ascent 12, descent 4, x-height 8 and size 16.
        let cases = [
            (VerticalAlign::Sub, px(14) + px(16) / 5),
            (VerticalAlign::TextTop, px(12)),
            (VerticalAlign::TextBottom, px(18)),
            (VerticalAlign::Middle, px(15)),
            (VerticalAlign::MiddleWithBaseline, px(19)),
        ];
        for (vertical_align, expected) in cases {
            let (metrics, baseline) = align_atomic(vertical_align, 10);
            assert_eq!(metrics, strut_metrics(), "{vertical_align:?}");
            assert_eq!(baseline, expected, "{vertical_align:?}");
        }
    }

    #[test]
    fn test_super_raises_the_line_baseline() {
        let raise = px(16) / 3;
        let (metrics, baseline) = align_atomic(VerticalAlign::Super, 10);
        assert_eq!(metrics.baseline, px(10) + raise);
        assert_eq!(metrics.block_size, px(16) + raise);
        assert_eq!(baseline, px(10));
    }

    #[test]
    fn test_length_and_percentage_shifts() {
        let (metrics, baseline) = align_atomic(VerticalAlign::LengthPercentage(LengthPercentage::px(7)), 10);
        assert_eq!(
            metrics,
            LineBlockMetrics {
                block_size: px(23),
                baseline: px(17),
            }
        );
        assert_eq!(baseline, px(10));

        // Percentages resolve against the box's own line height.
        let (metrics, baseline) = align_atomic(VerticalAlign::LengthPercentage(LengthPercentage::Percentage(0.5)), 10);
        assert_eq!(
            metrics,
            LineBlockMetrics {
                block_size: px(26),
                baseline: px(20),
            }
        );
        assert_eq!(baseline, px(10));
    }

    #[test]
    fn test_bottom_aligned_atomic() {
        let (metrics, baseline) = align_atomic(VerticalAlign::Bottom, 10);
        assert_eq!(metrics, strut_metrics());
        assert_eq!(baseline, px(20));

        // A taller box pushes the line baseline down by the difference.
        let (metrics, baseline) = align_atomic(VerticalAlign::Bottom, 40);
        assert_eq!(
            metrics,
            LineBlockMetrics {
                block_size: px(40),
                baseline: px(34),
            }
        );
        assert_eq!(baseline, px(40));
    }

    #[test]
    fn test_empty_line_has_no_height() {
        let root = style(20, VerticalAlign::Baseline);
        let mut layout = LineLayout::new(root);
        layout.begin_line(band(), false, Au::zero());
        assert_eq!(layout.end_line_reflow(), LineBlockMetrics::default());
    }
}
