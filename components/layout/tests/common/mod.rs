/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use std::sync::Arc;

use app_units::Au;
use blockflow_config::opts::Opts;
use layout::box_tree::{AtomicContent, BoxId, BoxTree};
use layout::context::{InterruptSignal, LayoutContext, NeverInterrupt};
use layout::flow::lines::LineBox;
use layout::flow::{ReflowOutput, reflow_root};
use layout::geom::{LogicalRect, LogicalVec2};
use layout::style::{ComputedValues, LengthPercentageOrAuto, LineHeight};
use layout::text::FixedAdvanceText;
use servo_arc::Arc as ServoArc;

pub const LINE_HEIGHT: i32 = 20;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn px(px: i32) -> Au {
    Au::from_px(px)
}

/// A block with a fixed line height, so that line block sizes are predictable.
pub fn block_style() -> ComputedValues {
    ComputedValues {
        line_height: LineHeight::Length(px(LINE_HEIGHT)),
        ..ComputedValues::default()
    }
}

pub fn arc(style: ComputedValues) -> ServoArc<ComputedValues> {
    ServoArc::new(style)
}

pub fn root(tree: &mut BoxTree) -> BoxId {
    tree.new_block_container(arc(block_style()))
}

pub fn block(tree: &mut BoxTree, parent: BoxId, style: ComputedValues) -> BoxId {
    let id = tree.new_block_container(arc(style));
    tree.append_child(parent, id);
    id
}

/// A block of the given block size with no content.
pub fn sized_block(tree: &mut BoxTree, parent: BoxId, block_size: i32) -> BoxId {
    block(
        tree,
        parent,
        ComputedValues {
            height: LengthPercentageOrAuto::px(block_size),
            ..block_style()
        },
    )
}

/// Text where every character is 10px wide.
pub fn text(tree: &mut BoxTree, parent: BoxId, content: &str) -> BoxId {
    let id = tree.new_text(
        arc(block_style()),
        Arc::new(FixedAdvanceText::new(content, px(10))),
    );
    tree.append_child(parent, id);
    id
}

/// An atomic inline whose baseline is its block-end edge.
pub fn atomic(tree: &mut BoxTree, parent: BoxId, inline_size: i32, block_size: i32) -> BoxId {
    let id = tree.new_atomic(
        arc(block_style()),
        AtomicContent {
            content_size: LogicalVec2 {
                inline: px(inline_size),
                block: px(block_size),
            },
            baseline: None,
        },
    );
    tree.append_child(parent, id);
    id
}

pub fn float(tree: &mut BoxTree, parent: BoxId, style: ComputedValues) -> BoxId {
    block(tree, parent, style)
}

pub fn lay_out(tree: &mut BoxTree, root: BoxId, inline_size: i32) -> ReflowOutput {
    lay_out_with(tree, root, inline_size, &Opts::default(), &NeverInterrupt)
}

pub fn lay_out_with(
    tree: &mut BoxTree,
    root: BoxId,
    inline_size: i32,
    opts: &Opts,
    interrupt: &dyn InterruptSignal,
) -> ReflowOutput {
    let context = LayoutContext::new(opts, interrupt);
    reflow_root(tree, &context, root, px(inline_size), None)
}

pub fn lines(tree: &BoxTree, container: BoxId) -> Vec<LineBox> {
    tree.block_container(container)
        .map(|data| data.lines().iter().cloned().collect())
        .unwrap_or_default()
}

pub fn border_rect(tree: &BoxTree, id: BoxId) -> LogicalRect<Au> {
    tree.geometry(id).border_rect
}

/// Every geometry in the subtree, in tree order, for comparing passes.
pub fn geometry_snapshot(tree: &BoxTree, id: BoxId) -> String {
    let mut snapshot = format!("{id:?} {:?}\n", tree.geometry(id));
    for child in tree.children(id) {
        snapshot.push_str(&geometry_snapshot(tree, child));
    }
    snapshot
}
