/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use blockflow_config::opts::Opts;
use common::{
    arc, block, block_style, border_rect, float, geometry_snapshot, init_logging, lay_out, lay_out_with, lines, px,
    root, sized_block, text,
};
use layout::box_tree::{BoxId, BoxTree};
use layout::context::{LayoutContext, LineBudget, NeverInterrupt};
use layout::flow::verify::verify_line_invariants;
use layout::flow::Completeness;
use layout::geom::PhysicalSides;
use layout::paginate;
use layout::style::{BreakBetween, ClearProperty, ComputedValues, FloatProperty, LengthPercentageOrAuto};

fn margins(top: i32, bottom: i32) -> PhysicalSides<LengthPercentageOrAuto> {
    PhysicalSides {
        top: LengthPercentageOrAuto::px(top),
        right: LengthPercentageOrAuto::px(0),
        bottom: LengthPercentageOrAuto::px(bottom),
        left: LengthPercentageOrAuto::px(0),
    }
}

fn block_with_margins(tree: &mut BoxTree, parent: BoxId, height: i32, top: i32, bottom: i32) -> BoxId {
    block(
        tree,
        parent,
        ComputedValues {
            height: LengthPercentageOrAuto::px(height),
            margin: margins(top, bottom),
            ..block_style()
        },
    )
}

fn left_float(tree: &mut BoxTree, parent: BoxId, inline_size: i32, block_size: i32) -> BoxId {
    float(
        tree,
        parent,
        ComputedValues {
            float: FloatProperty::Left,
            width: LengthPercentageOrAuto::px(inline_size),
            height: LengthPercentageOrAuto::px(block_size),
            ..block_style()
        },
    )
}

fn paginate_with_defaults(tree: &mut BoxTree, root: BoxId, page_block_size: i32) -> Vec<(BoxId, layout::ReflowOutput)> {
    let opts = Opts::default();
    let context = LayoutContext::new(&opts, &NeverInterrupt);
    paginate(tree, &context, root, px(300), px(page_block_size))
}

#[test]
fn test_sibling_margins_collapse() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let first = block_with_margins(&mut tree, root, 50, 0, 20);
    let second = block_with_margins(&mut tree, root, 50, 10, 0);
    let output = lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, first).start_corner.block, px(0));
    assert_eq!(border_rect(&tree, second).start_corner.block, px(70));
    assert_eq!(output.block_size, px(120));
    assert_eq!(output.status.completeness, Completeness::Complete);
}

#[test]
fn test_negative_margin_collapses_with_positive() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    block_with_margins(&mut tree, root, 50, 0, 20);
    let second = block_with_margins(&mut tree, root, 50, -5, 0);
    lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, second).start_corner.block, px(65));
}

#[test]
fn test_first_child_margin_collapses_through_parent() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let parent = block(
        &mut tree,
        root,
        ComputedValues {
            margin: margins(10, 0),
            ..block_style()
        },
    );
    let child = block_with_margins(&mut tree, parent, 50, 30, 0);
    let output = lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, parent).start_corner.block, px(30));
    assert_eq!(border_rect(&tree, child).start_corner.block, px(0));
    assert_eq!(border_rect(&tree, parent).size.block, px(50));
    assert_eq!(output.block_size, px(80));
}

#[test]
fn test_empty_block_margins_collapse_through() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    block_with_margins(&mut tree, root, 50, 0, 10);
    let empty = block(
        &mut tree,
        root,
        ComputedValues {
            margin: margins(25, 5),
            ..block_style()
        },
    );
    let last = block_with_margins(&mut tree, root, 50, 15, 0);
    lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, empty).size.block, px(0));
    assert_eq!(border_rect(&tree, last).start_corner.block, px(75));
}

#[test]
fn test_clear_moves_block_below_float() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let float = left_float(&mut tree, root, 100, 50);
    let cleared = block(
        &mut tree,
        root,
        ComputedValues {
            clear: ClearProperty::Left,
            height: LengthPercentageOrAuto::px(10),
            ..block_style()
        },
    );
    let output = lay_out(&mut tree, root, 300);

    assert_eq!(border_rect(&tree, float).start_corner.block, px(0));
    assert_eq!(border_rect(&tree, cleared).start_corner.block, px(50));
    assert!(tree.geometry(cleared).clearance.is_some());
    assert_eq!(output.block_size, px(60));
}

#[test]
fn test_root_grows_to_contain_floats() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    left_float(&mut tree, root, 100, 80);
    sized_block(&mut tree, root, 30);
    let output = lay_out(&mut tree, root, 300);
    assert_eq!(output.block_size, px(80));
}

#[test]
fn test_pagination_splits_blocks_between_pages() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    for _ in 0..10 {
        sized_block(&mut tree, root, 50);
    }
    let pages = paginate_with_defaults(&mut tree, root, 200);

    assert_eq!(pages.len(), 3);
    let counts: Vec<usize> = pages
        .iter()
        .map(|(page, _)| lines(&tree, *page).len())
        .collect();
    assert_eq!(counts, vec![4, 4, 2]);
    assert_eq!(pages[0].1.status.completeness, Completeness::NotComplete);
    assert_eq!(pages[1].1.status.completeness, Completeness::NotComplete);
    assert_eq!(pages[2].1.status.completeness, Completeness::Complete);
    assert_eq!(pages[0].0, root);
    assert_eq!(tree.get(root).next_in_flow(), Some(pages[1].0));

    // Every page starts its content at the top.
    for (page, _) in pages.iter() {
        let first = lines(&tree, *page)[0].first_child;
        assert_eq!(border_rect(&tree, first).start_corner.block, px(0));
    }
}

#[test]
fn test_pagination_splits_paragraph_lines() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let words = vec!["abcdefghi"; 25].join(" ");
    text(&mut tree, root, &words);
    let opts = Opts::default();
    let context = LayoutContext::new(&opts, &NeverInterrupt);
    let pages = paginate(&mut tree, &context, root, px(100), px(200));

    let counts: Vec<usize> = pages
        .iter()
        .map(|(page, _)| lines(&tree, *page).len())
        .collect();
    assert_eq!(counts, vec![10, 10, 5]);
    assert_eq!(counts.iter().sum::<usize>(), 25);
    assert!(
        pages
            .last()
            .is_some_and(|(_, output)| output.status.completeness.is_complete())
    );
    for (page, _) in pages.iter() {
        assert!(verify_line_invariants(&tree, *page).is_empty());
    }
}

#[test]
fn test_float_that_does_not_fit_is_pushed_to_next_page() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    sized_block(&mut tree, root, 180);
    let float = left_float(&mut tree, root, 100, 50);
    text(&mut tree, root, "ab");
    let pages = paginate_with_defaults(&mut tree, root, 200);

    assert_eq!(pages.len(), 2);
    let (first_page, first_output) = &pages[0];
    assert_eq!(first_output.status.completeness, Completeness::OverflowIncomplete);
    assert!(
        first_output
            .status
            .resume
            .as_ref()
            .is_some_and(|resume| resume.pushed_floats.contains(&float))
    );
    assert_eq!(first_output.status.next_in_flow, Some(pages[1].0));
    assert_eq!(lines(&tree, *first_page).len(), 2);
    assert_eq!(border_rect(&tree, float).start_corner.block, px(0));
    assert!(pages[1].1.status.completeness.is_complete());
}

#[test]
fn test_forced_break_starts_a_new_page() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    sized_block(&mut tree, root, 50);
    sized_block(&mut tree, root, 50);
    let breaking = block(
        &mut tree,
        root,
        ComputedValues {
            height: LengthPercentageOrAuto::px(50),
            break_before: BreakBetween::Page,
            ..block_style()
        },
    );
    let pages = paginate_with_defaults(&mut tree, root, 1000);

    assert_eq!(pages.len(), 2);
    assert_eq!(lines(&tree, pages[0].0).len(), 2);
    assert_eq!(lines(&tree, pages[1].0)[0].first_child, breaking);
    assert_eq!(border_rect(&tree, breaking).start_corner.block, px(0));
}

/// Blocks with text, next to a float that covers the first two.
fn build_document(tree: &mut BoxTree, middle_height: i32) -> BoxId {
    let root = root(tree);
    left_float(tree, root, 100, 100);
    for height in [50, middle_height, 50] {
        let child = sized_block(tree, root, height);
        text(tree, child, "ab");
    }
    root
}

#[test]
fn test_second_reflow_changes_nothing() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = build_document(&mut tree, 50);
    lay_out(&mut tree, root, 300);
    let first = geometry_snapshot(&tree, root);
    lay_out(&mut tree, root, 300);
    assert_eq!(geometry_snapshot(&tree, root), first);
    assert!(verify_line_invariants(&tree, root).is_empty());
}

#[test]
fn test_incremental_reflow_matches_full_reflow() {
    init_logging();
    let mut incremental = BoxTree::new();
    let root = build_document(&mut incremental, 50);
    lay_out(&mut incremental, root, 300);
    let middle = lines(&incremental, root)
        .iter()
        .filter(|line| line.is_block())
        .nth(1)
        .map(|line| line.first_child);
    let Some(middle) = middle else {
        panic!("Missing middle block");
    };
    incremental.set_style(
        middle,
        arc(ComputedValues {
            height: LengthPercentageOrAuto::px(80),
            ..block_style()
        }),
    );
    lay_out(&mut incremental, root, 300);

    let mut full = BoxTree::new();
    let full_root = build_document(&mut full, 80);
    let opts = Opts {
        nonincremental_layout: true,
        ..Opts::default()
    };
    lay_out_with(&mut full, full_root, 300, &opts, &NeverInterrupt);

    assert_eq!(geometry_snapshot(&incremental, root), geometry_snapshot(&full, full_root));
}

#[test]
fn test_interrupted_reflow_resumes() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    for _ in 0..10 {
        sized_block(&mut tree, root, 50);
    }
    let budget = LineBudget::new(3);
    let output = lay_out_with(&mut tree, root, 300, &Opts::default(), &budget);
    assert!(output.interrupted);
    assert_eq!(budget.remaining(), 0);
    let laid_out = lines(&tree, root)
        .iter()
        .filter(|line| !line.is_dirty())
        .count();
    assert_eq!(laid_out, 3);

    let output = lay_out(&mut tree, root, 300);
    assert!(!output.interrupted);
    assert_eq!(output.block_size, px(500));

    let mut fresh = BoxTree::new();
    let fresh_root = common::root(&mut fresh);
    for _ in 0..10 {
        sized_block(&mut fresh, fresh_root, 50);
    }
    lay_out(&mut fresh, fresh_root, 300);
    assert_eq!(geometry_snapshot(&tree, root), geometry_snapshot(&fresh, fresh_root));
}

#[test]
fn test_removing_and_inserting_blocks() {
    init_logging();
    let mut tree = BoxTree::new();
    let root = root(&mut tree);
    let first = sized_block(&mut tree, root, 50);
    let second = sized_block(&mut tree, root, 50);
    let third = sized_block(&mut tree, root, 50);
    lay_out(&mut tree, root, 300);
    assert_eq!(border_rect(&tree, third).start_corner.block, px(100));

    tree.remove_child(second);
    let output = lay_out(&mut tree, root, 300);
    assert_eq!(border_rect(&tree, third).start_corner.block, px(50));
    assert_eq!(output.block_size, px(100));
    assert_eq!(lines(&tree, root).len(), 2);

    let inserted = tree.new_block_container(arc(ComputedValues {
        height: LengthPercentageOrAuto::px(30),
        ..block_style()
    }));
    tree.insert_after(root, Some(first), inserted);
    let output = lay_out(&mut tree, root, 300);
    assert_eq!(border_rect(&tree, inserted).start_corner.block, px(50));
    assert_eq!(border_rect(&tree, third).start_corner.block, px(80));
    assert_eq!(output.block_size, px(130));
    assert!(verify_line_invariants(&tree, root).is_empty());
}
