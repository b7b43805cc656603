/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Moving content between the fragments of a block container.
//!
//! A block container that does not fit in a fragmentainer is continued by a chain of
//! continuation boxes linked through `next_in_flow`. Lines that go to the next fragment
//! are kept, with their children unlinked from the tree, in the container's overflow
//! until its next-in-flow takes them. A fragment that has room pulls lines back from its
//! next-in-flow.

use std::mem;

use app_units::Au;
use log::{debug, trace};
use num_traits::Zero;

use crate::box_tree::{BoxId, BoxTree};
use crate::context::LayoutContext;
use crate::flow::lines::{self, LineBox, LineIndex};
use crate::flow::{reflow_root, BlockContainerData, OverflowContent, ReflowOutput};

/// Gathers what earlier passes left for `container` before it is laid out: its own
/// overflow, if its next-in-flow never took it, and the overflow of its prev-in-flow.
/// Returns the floats the prev-in-flow could not place, which go first.
pub(crate) fn take_pushed_content(tree: &mut BoxTree, container: BoxId, data: &mut BlockContainerData) -> Vec<BoxId> {
    // Floats this fragment pushed in the last pass are pushed again if they still don't
    // fit, so they are forgotten here.
    data.pushed_floats.clear();

    if let Some(OverflowContent { mut lines, children }) = data.overflow.take() {
        trace!("{container:?} takes back {} pushed lines", lines.len());
        tree.append_children(container, &children);
        lines.mark_all_dirty();
        data.lines.append(lines);
    }

    let Some(previous) = tree.get(container).prev_in_flow() else {
        return Vec::new();
    };
    let (overflow, pushed_floats) = match tree.get_mut(previous).block_container_mut() {
        Some(previous_data) => (
            previous_data.overflow.take(),
            mem::take(&mut previous_data.pushed_floats),
        ),
        None => (None, Vec::new()),
    };
    if let Some(OverflowContent { mut lines, children }) = overflow {
        trace!("{container:?} takes {} lines from {previous:?}", lines.len());
        tree.prepend_children(container, &children);
        lines.mark_all_dirty();
        if let Some(first) = data.lines.get_mut(0) {
            first.flags.insert(lines::LineFlags::PREVIOUS_MARGIN_DIRTY);
        }
        data.lines.prepend(lines);
    }
    pushed_floats
}

/// Moves the lines from `first_pushed` onwards, and the children on them, into the
/// overflow of `container`. Returns the first child moved, if any.
pub(crate) fn push_lines(
    tree: &mut BoxTree,
    data: &mut BlockContainerData,
    container: BoxId,
    first_pushed: LineIndex,
) -> Option<BoxId> {
    let first_child = data.lines.get(first_pushed)?.first_child;
    let mut lines = data.lines.split_off(first_pushed);
    lines.mark_all_dirty();
    let children = tree.split_children_off(first_child);
    debug!(
        "{container:?} pushes {} lines and {} children to its next fragment",
        lines.len(),
        children.len()
    );
    data.overflow = Some(OverflowContent { lines, children });
    Some(first_child)
}

/// Makes sure the block child on line `index` has a continuation, placed on the line
/// after it. The continuation is then pushed along with the rest of the lines.
pub(crate) fn claim_next_in_flow(
    tree: &mut BoxTree,
    data: &mut BlockContainerData,
    container: BoxId,
    child: BoxId,
    index: LineIndex,
) {
    let next = match tree.get(child).next_in_flow() {
        Some(next) => {
            if tree.next_sibling(child) != Some(next) {
                lines::detach_child(tree, next);
                tree.link_after(container, Some(child), next);
            }
            next
        },
        None => tree.create_block_continuation(child),
    };
    let has_line = data
        .lines
        .get(index + 1)
        .is_some_and(|line| line.first_child == next);
    if !has_line {
        data.lines.insert(index + 1, LineBox::new_block(next));
    }
}

/// Pulls the first line of `next_in_flow`, with its children, to the end of `container`.
/// Returns false when the next-in-flow has nothing left.
pub(crate) fn pull_line(
    tree: &mut BoxTree,
    data: &mut BlockContainerData,
    container: BoxId,
    next_in_flow: Option<BoxId>,
) -> bool {
    let Some(next) = next_in_flow else {
        return false;
    };
    let Some(next_data) = tree.get_mut(next).block_container_mut() else {
        return false;
    };
    if next_data.in_reflow {
        return false;
    }

    if !next_data.lines.is_empty() {
        let line = next_data.lines.remove(0);
        if let Some(following) = next_data.lines.get_mut(0) {
            following.flags.insert(lines::LineFlags::PREVIOUS_MARGIN_DIRTY);
        }
        let children: Vec<BoxId> = tree
            .siblings_from(Some(line.first_child))
            .take(line.child_count)
            .collect();
        for child in children.iter() {
            tree.unlink(*child);
        }
        tree.append_children(container, &children);
        pull(tree, data, next, line);
        return true;
    }

    // The next-in-flow may itself have pushed lines that its own next-in-flow has not
    // taken yet. Those come back all at once.
    let Some(OverflowContent { mut lines, children }) = next_data.overflow.take() else {
        return false;
    };
    trace!("Pulled {} pushed lines from {next:?}", lines.len());
    tree.append_children(container, &children);
    lines.mark_all_dirty();
    data.lines.append(lines);
    tree.mark_dirty(next);
    true
}

fn pull(tree: &mut BoxTree, data: &mut BlockContainerData, next: BoxId, line: LineBox) {
    trace!("Pulled a line starting at {:?} from {next:?}", line.first_child);
    data.lines.push(mark_dirty(line));
    tree.mark_dirty(next);
}

fn mark_dirty(mut line: LineBox) -> LineBox {
    line.mark_dirty();
    line.flags.insert(lines::LineFlags::PREVIOUS_MARGIN_DIRTY);
    line
}

/// The content block size laid out by the fragments before `container`.
pub(crate) fn consumed_content_block_size(tree: &BoxTree, container: BoxId) -> Au {
    let mut consumed = Au::zero();
    let mut current = tree.get(container).prev_in_flow();
    while let Some(previous) = current {
        if let Some(data) = tree.block_container(previous) {
            consumed += data.fragment_content_block_size;
        }
        current = tree.get(previous).prev_in_flow();
    }
    consumed
}

/// Removes the continuation of a container that turned out to fit, once everything has
/// been pulled back from it.
pub(crate) fn drop_empty_next_in_flow(tree: &mut BoxTree, container: BoxId) {
    let Some(next) = tree.get(container).next_in_flow() else {
        return;
    };
    let is_empty = tree.block_container(next).is_some_and(|data| {
        !data.in_reflow &&
            data.lines.is_empty() &&
            data.overflow.is_none() &&
            data.pushed_floats.is_empty()
    });
    if is_empty {
        trace!("Removing empty continuation {next:?} of {container:?}");
        tree.remove_child(next);
    }
}

/// Lays out `root` into pages of `page_block_size`, creating continuations of the root as
/// needed. Returns every page's root fragment with its output.
pub fn paginate(
    tree: &mut BoxTree,
    context: &LayoutContext,
    root: BoxId,
    inline_size: Au,
    page_block_size: Au,
) -> Vec<(BoxId, ReflowOutput)> {
    let mut pages = Vec::new();
    let mut current = Some(root);
    while let Some(page) = current {
        let output = reflow_root(tree, context, page, inline_size, Some(page_block_size));
        current = match output.interrupted {
            true => None,
            false => output.status.next_in_flow,
        };
        pages.push((page, output));
    }
    pages
}
