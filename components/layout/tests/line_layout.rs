/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use std::sync::Arc;

use blockflow_config::opts::Opts;
use common::{
    LINE_HEIGHT, atomic, block, block_style, border_rect, float, init_logging, lay_out, lines, px, root, text,
};
use layout::box_tree::{BoxId, BoxTree};
use layout::context::NeverInterrupt;
use layout::flow::float::Clear;
use layout::flow::lines::{BreakType, LineFlags};
use layout::flow::verify::verify_line_invariants;
use layout::style::{ClearProperty, ComputedValues, FloatProperty, LengthPercentageOrAuto};
use layout::text::FixedAdvanceText;

fn left_float_style(inline_size: i32, block_size: i32) -> ComputedValues {
    ComputedValues {
        float: FloatProperty::Left,
        width: LengthPercentageOrAuto::px(inline_size),
        height: LengthPercentageOrAuto::px(block_size),
        ..block_style()
    }
}

#[test]
fn test_atomics_wrap_when_the_line_is_full() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let first = atomic(&mut tree, root, 100, 20);
    let second = atomic(&mut tree, root, 150, 20);
    let third = atomic(&mut tree, root, 100, 20);
    lay_out(&mut tree, root, 300);

    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].first_child, first);
    assert_eq!(lines[0].child_count, 2);
    assert_eq!(lines[1].first_child, third);
    assert_eq!(lines[1].child_count, 1);
    assert!(lines[0].flags.contains(LineFlags::LINE_WRAPPED));
    assert_eq!(lines[1].bounds.start_corner.block, lines[0].bounds.max_block_position());

    assert_eq!(border_rect(&tree, first).start_corner.inline, px(0));
    assert_eq!(border_rect(&tree, second).start_corner.inline, px(100));
    assert_eq!(border_rect(&tree, third).start_corner.inline, px(0));
    assert!(verify_line_invariants(&tree, root).is_empty());
}

#[test]
fn test_text_flows_beside_a_float() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let float = float(&mut tree, root, left_float_style(100, 50));
    text(&mut tree, root, "aaaa bbbb cccc dddd eeee");
    lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, float).start_corner.inline, px(0));
    assert_eq!(border_rect(&tree, float).start_corner.block, px(0));

    let lines = lines(&tree, root);
    let first = &lines[0];
    assert_eq!(first.bounds.start_corner.inline, px(100));
    assert!(first.bounds.size.inline <= px(200));
    assert!(first.is_impacted_by_floats());
    assert_eq!(first.floats.as_slice(), &[float]);

    // Lines that start below the float get the full width back.
    let below = lines
        .iter()
        .find(|line| line.bounds.start_corner.block >= px(50));
    if let Some(below) = below {
        assert_eq!(below.bounds.start_corner.inline, px(0));
    }
    assert!(verify_line_invariants(&tree, root).is_empty());
}

#[test]
fn test_oversized_content_is_placed_anyway() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let wide = atomic(&mut tree, root, 400, 20);
    let word = text(&mut tree, root, "abcdefghijklmnopqrstuvwxyz0123456789");
    lay_out(&mut tree, root, 300);

    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].first_child, wide);
    assert_eq!(lines[0].child_count, 1);
    assert_eq!(lines[1].first_child, word);
    assert_eq!(lines[1].child_count, 1);
    // The word has no break opportunity, so it stays whole.
    assert_eq!(tree.get(word).next_in_flow(), None);
    assert_eq!(border_rect(&tree, word).size.inline, px(360));
}

#[test]
fn test_atomic_moves_below_a_float_it_does_not_fit_beside() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let float = float(&mut tree, root, left_float_style(250, 50));
    let item = atomic(&mut tree, root, 100, 20);
    lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, float).start_corner.block, px(0));
    let rect = border_rect(&tree, item);
    assert_eq!(rect.start_corner.block, px(50));
    assert_eq!(rect.start_corner.inline, px(0));

    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].bounds.start_corner.block, px(50));
    assert_eq!(lines[0].floats.as_slice(), &[float]);
}

#[test]
fn test_text_after_a_float_on_the_same_line_moves_below_it() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let float = float(&mut tree, root, left_float_style(250, 50));
    let word = text(&mut tree, root, "abcdefghij");
    lay_out(&mut tree, root, 300);

    let float_rect = border_rect(&tree, float);
    assert_eq!(float_rect.start_corner.inline, px(0));
    assert_eq!(float_rect.start_corner.block, px(0));

    // The word does not fit in the 50px left beside the float.
    let rect = border_rect(&tree, word);
    assert_eq!(rect.start_corner.inline, px(0));
    assert!(rect.start_corner.block >= px(50));
    assert!(rect.max_inline_position() <= px(300));

    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].bounds.start_corner.block, px(50));
    assert_eq!(lines[0].floats.as_slice(), &[float]);
    assert!(verify_line_invariants(&tree, root).is_empty());
}

#[test]
fn test_line_break_with_clear_moves_the_next_line_below_floats() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    float(&mut tree, root, left_float_style(100, 50));
    text(&mut tree, root, "ab");
    let line_break = tree.new_line_break(common::arc(ComputedValues {
        clear: ClearProperty::Both,
        ..block_style()
    }));
    tree.append_child(root, line_break);
    let after = text(&mut tree, root, "cd");
    lay_out(&mut tree, root, 300);

    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].break_after, BreakType::Clear(Clear::Both));
    assert_eq!(lines[1].break_before, BreakType::Clear(Clear::Both));
    assert_eq!(lines[1].first_child, after);
    assert_eq!(lines[1].bounds.start_corner.block, px(50));
    assert_eq!(lines[1].bounds.start_corner.inline, px(0));
    assert!(lines[1].flags.contains(LineFlags::HAS_CLEARANCE));
}

#[test]
fn test_editing_text_relays_out_the_paragraph() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let paragraph = block(&mut tree, root, block_style());
    let content = text(&mut tree, paragraph, "aaaa bbbb cccc");
    let following = common::sized_block(&mut tree, root, 10);
    lay_out(&mut tree, root, 100);

    assert_eq!(lines(&tree, paragraph).len(), 2);
    assert!(tree.get(content).next_in_flow().is_some());
    assert_eq!(border_rect(&tree, following).start_corner.block, px(40));

    tree.set_text(content, Arc::new(FixedAdvanceText::new("aaaa", px(10))));
    lay_out(&mut tree, root, 100);

    let lines = lines(&tree, paragraph);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].first_child, content);
    assert_eq!(lines[0].child_count, 1);
    assert_eq!(tree.get(content).next_in_flow(), None);
    assert_eq!(border_rect(&tree, paragraph).size.block, px(20));
    assert_eq!(border_rect(&tree, following).start_corner.block, px(20));
    assert!(verify_line_invariants(&tree, root).is_empty());
}

#[test]
fn test_narrowing_rewraps_and_widening_pulls_back() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let content = text(&mut tree, root, "aaaa bbbb cccc dddd");
    lay_out(&mut tree, root, 300);
    assert_eq!(lines(&tree, root).len(), 1);

    lay_out(&mut tree, root, 100);
    assert_eq!(lines(&tree, root).len(), 2);
    assert!(verify_line_invariants(&tree, root).is_empty());

    lay_out(&mut tree, root, 300);
    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].first_child, content);
    assert_eq!(tree.get(content).next_in_flow(), None);
}

#[test]
fn test_line_backs_up_again_when_floats_below_narrow_it() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let short = float(&mut tree, root, left_float_style(30, 5));
    let wide = float(
        &mut tree,
        root,
        ComputedValues {
            clear: ClearProperty::Left,
            ..left_float_style(80, 100)
        },
    );
    let paragraph = block(&mut tree, root, block_style());
    // In the 270px band beside the short float the line backs up into "c d". The line
    // is taller than that band, and next to the wide float only 220px remain, so the
    // line backs up again, this time into "x y".
    let first = text(&mut tree, paragraph, "x y");
    text(&mut tree, paragraph, "aaaaaaaaaaaaaaaaaaaa");
    text(&mut tree, paragraph, "c d");
    text(&mut tree, paragraph, "eeee");
    lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, short).start_corner.block, px(0));
    assert_eq!(border_rect(&tree, wide).start_corner.block, px(5));
    let lines = lines(&tree, paragraph);
    assert!(lines.len() > 1);
    assert_eq!(lines[0].first_child, first);
    assert_eq!(lines[0].child_count, 1);
    assert_eq!(lines[0].bounds.start_corner.block, px(0));
    assert_eq!(lines[0].bounds.start_corner.inline, px(80));
    assert!(tree.get(first).next_in_flow().is_some());
    assert!(verify_line_invariants(&tree, paragraph).is_empty());
}

/// Builds a line that has to back up to a break opportunity before the float on it.
fn float_before_backup(tree: &mut BoxTree) -> (BoxId, BoxId) {
    let root = root(tree);
    text(tree, root, "aa");
    let float = float(tree, root, left_float_style(20, 40));
    text(tree, root, "a b");
    text(tree, root, "cccccc");
    (root, float)
}

#[test]
fn test_float_stays_on_line_after_backing_up() {
    init_logging();
    let mut tree = BoxTree::new();
    let (root, float) = float_before_backup(&mut tree);
    lay_out(&mut tree, root, 100);

    assert_eq!(border_rect(&tree, float).start_corner.block, px(0));
    let lines = lines(&tree, root);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].floats.as_slice(), &[float]);
    assert_eq!(lines[0].bounds.start_corner.inline, px(20));
}

#[test]
fn test_float_goes_below_line_after_backing_up_with_quirk() {
    init_logging();
    let mut tree = BoxTree::new();
    let (root, float) = float_before_backup(&mut tree);
    let mut opts = Opts::default();
    opts.quirks.float_below_line_after_backup = true;
    common::lay_out_with(&mut tree, root, 100, &opts, &NeverInterrupt);

    assert_eq!(border_rect(&tree, float).start_corner.block, px(LINE_HEIGHT));
    let lines = lines(&tree, root);
    assert_eq!(lines[0].bounds.start_corner.inline, px(0));
    assert_eq!(lines[0].floats.as_slice(), &[float]);
    assert_eq!(lines[1].bounds.start_corner.inline, px(20));
}
