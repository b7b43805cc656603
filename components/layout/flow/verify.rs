/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Debugging aids for line lists, enabled through the debug options.

use log::{debug, error};

use crate::box_tree::{BoxId, BoxKind, BoxTree};

/// Checks that the line list of every block container under `root` covers its children
/// exactly once and in order, and that laid out lines do not go back up. Every problem
/// found is logged and returned.
pub fn verify_line_invariants(tree: &BoxTree, root: BoxId) -> Vec<String> {
    let mut problems = Vec::new();
    verify_container(tree, root, &mut problems);
    for problem in problems.iter() {
        error!("Line list invariant broken: {problem}");
    }
    problems
}

fn verify_container(tree: &BoxTree, container: BoxId, problems: &mut Vec<String>) {
    let Some(data) = tree.block_container(container) else {
        return;
    };

    let mut expected = tree.first_child(container);
    let mut previous_end = None;
    for (index, line) in data.lines.iter().enumerate() {
        if line.child_count == 0 {
            problems.push(format!("{container:?}: line {index} has no children"));
        }
        if Some(line.first_child) != expected {
            problems.push(format!(
                "{container:?}: line {index} starts at {:?}, expected {expected:?}",
                line.first_child
            ));
        }
        if line.is_block() && line.child_count != 1 {
            problems.push(format!(
                "{container:?}: block line {index} has {} children",
                line.child_count
            ));
        }
        for child in line.children(tree) {
            if tree.get(child).is_block_level() != line.is_block() {
                problems.push(format!(
                    "{container:?}: line {index} holds {child:?} of the wrong level"
                ));
            }
        }
        if !line.is_dirty() {
            if previous_end.is_some_and(|end| line.block_start() < end) {
                problems.push(format!("{container:?}: line {index} starts above the line before it"));
            }
            previous_end = Some(line.block_end());
        }
        expected = line.next_box(tree);
    }
    if let Some(uncovered) = expected {
        problems.push(format!("{container:?}: {uncovered:?} is on no line"));
    }

    for child in tree.children(container) {
        verify_descendants(tree, child, problems);
    }
}

/// Block containers can sit inside spans as floats or inline-blocks.
fn verify_descendants(tree: &BoxTree, id: BoxId, problems: &mut Vec<String>) {
    match tree.get(id).kind {
        BoxKind::BlockContainer(_) => verify_container(tree, id, problems),
        BoxKind::InlineBox => {
            for child in tree.children(id) {
                verify_descendants(tree, child, problems);
            }
        },
        _ => {},
    }
}

/// Logs the line list of every block container under `root` as JSON.
pub fn dump_line_lists(tree: &BoxTree, root: BoxId) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if let Some(data) = tree.block_container(id) {
            match serde_json::to_string_pretty(&data.lines) {
                Ok(json) => debug!("Lines of {id:?}: {json}"),
                Err(err) => error!("Could not serialize the lines of {id:?}: {err}"),
            }
        }
        stack.extend(tree.children(id));
    }
}
