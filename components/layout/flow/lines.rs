/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Line lists.
//!
//! Every block container keeps an ordered list of lines covering all of its children. A
//! line is either a run of inline-level siblings laid out together, or a single
//! block-level child. Lines are plain records addressed by index; nothing holds a
//! reference to a line across a structural change of the list.

use std::cell::Cell;
use std::ops::Range;

use app_units::Au;
use bitflags::bitflags;
use serde::Serialize;
use smallvec::SmallVec;

use crate::box_tree::{BoxFlags, BoxId, BoxKind, BoxTree};
use crate::flow::float::Clear;
use crate::fragment_tree::{CollapsedMargin, OverflowAreas};
use crate::geom::LogicalRect;

pub type LineIndex = usize;

bitflags! {
    /// Per-line state kept between reflows.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
    #[serde(transparent)]
    pub struct LineFlags: u16 {
        /// The line must be laid out again.
        const DIRTY = 1 << 0;
        /// The margin state entering the line changed, so a block line may move even
        /// though its child is clean.
        const PREVIOUS_MARGIN_DIRTY = 1 << 1;
        /// The line has no content that takes up space. Only valid with `EMPTY_CACHE_VALID`.
        const EMPTY = 1 << 2;
        const EMPTY_CACHE_VALID = 1 << 3;
        /// Floats narrowed the line, or a float was placed from it.
        const IMPACTED_BY_FLOATS = 1 << 4;
        /// The line ended at a soft wrap opportunity because its content did not fit.
        const LINE_WRAPPED = 1 << 5;
        /// The child of this block line was moved down past floats by `clear`.
        const HAS_CLEARANCE = 1 << 6;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Inline,
    Block,
}

/// A break at one edge of a line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub enum BreakType {
    #[default]
    None,
    /// A forced line break.
    Line,
    /// Floats on the given sides must be cleared before the next content.
    Clear(Clear),
    /// A forced page or column break.
    Page,
}

/// The margin collapsing state at a line boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub(crate) struct MarginState {
    /// The block position, relative to the container's border box, below the last
    /// content that does not collapse.
    pub b_coord: Au,
    /// Margins seen since that content, not yet turned into space.
    pub prev_margin: CollapsedMargin,
    /// Whether block-start margins of children turn into space here. Until some content
    /// is found, they collapse through the container's own block-start margin instead.
    pub apply_start_margin: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LineBox {
    pub kind: LineKind,
    pub first_child: BoxId,
    pub child_count: usize,
    /// The line box, relative to the container's border box. For a block line this is the
    /// border box of the child.
    pub bounds: LogicalRect<Au>,
    /// The baseline, relative to the container's border box.
    pub baseline: Option<Au>,
    pub carried_out_block_end_margin: CollapsedMargin,
    /// Margins this line folded into the container's own block-start margin.
    pub(crate) start_margin_contribution: CollapsedMargin,
    pub flags: LineFlags,
    /// Floats placed from this line, in placement order.
    pub floats: SmallVec<[BoxId; 2]>,
    pub break_before: BreakType,
    pub break_after: BreakType,
    pub overflow: OverflowAreas,
    /// The margin state the line was last laid out with, and the state after it.
    pub(crate) entry: Option<MarginState>,
    pub(crate) exit: Option<MarginState>,
}

impl LineBox {
    fn new(kind: LineKind, first_child: BoxId, child_count: usize) -> Self {
        LineBox {
            kind,
            first_child,
            child_count,
            bounds: LogicalRect::zero(),
            baseline: None,
            carried_out_block_end_margin: CollapsedMargin::zero(),
            start_margin_contribution: CollapsedMargin::zero(),
            flags: LineFlags::DIRTY,
            floats: SmallVec::new(),
            break_before: BreakType::None,
            break_after: BreakType::None,
            overflow: OverflowAreas::default(),
            entry: None,
            exit: None,
        }
    }

    pub fn new_inline(first_child: BoxId, child_count: usize) -> Self {
        debug_assert!(child_count > 0);
        Self::new(LineKind::Inline, first_child, child_count)
    }

    pub fn new_block(child: BoxId) -> Self {
        Self::new(LineKind::Block, child, 1)
    }

    pub fn is_block(&self) -> bool {
        self.kind == LineKind::Block
    }

    pub fn is_inline(&self) -> bool {
        self.kind == LineKind::Inline
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(LineFlags::DIRTY)
    }

    pub fn mark_dirty(&mut self) {
        self.flags.insert(LineFlags::DIRTY);
        self.flags.remove(LineFlags::EMPTY_CACHE_VALID);
    }

    pub fn is_impacted_by_floats(&self) -> bool {
        self.flags.contains(LineFlags::IMPACTED_BY_FLOATS)
    }

    /// The cached emptiness of the line, if it is still valid.
    pub fn cached_is_empty(&self) -> Option<bool> {
        self.flags
            .contains(LineFlags::EMPTY_CACHE_VALID)
            .then(|| self.flags.contains(LineFlags::EMPTY))
    }

    pub(crate) fn set_empty(&mut self, empty: bool) {
        self.flags.set(LineFlags::EMPTY, empty);
        self.flags.insert(LineFlags::EMPTY_CACHE_VALID);
    }

    pub fn block_start(&self) -> Au {
        self.bounds.start_corner.block
    }

    pub fn block_end(&self) -> Au {
        self.bounds.max_block_position()
    }

    /// The children of this line, in order.
    pub fn children<'a>(&self, tree: &'a BoxTree) -> impl Iterator<Item = BoxId> + 'a {
        tree.siblings_from(Some(self.first_child))
            .take(self.child_count)
    }

    /// The box after the last child of this line.
    pub fn next_box(&self, tree: &BoxTree) -> Option<BoxId> {
        tree.siblings_from(Some(self.first_child))
            .nth(self.child_count)
    }

    /// Moves the line and everything recorded about its position in the block axis.
    pub(crate) fn slide(&mut self, block_delta: Au) {
        self.bounds.start_corner.block += block_delta;
        self.overflow.ink.start_corner.block += block_delta;
        self.overflow.scrollable.start_corner.block += block_delta;
        if let Some(baseline) = self.baseline.as_mut() {
            *baseline += block_delta;
        }
        for state in [self.entry.as_mut(), self.exit.as_mut()].into_iter().flatten() {
            state.b_coord += block_delta;
        }
    }
}

/// The lines of one block container.
#[derive(Debug, Default, Serialize)]
pub struct LineList {
    lines: Vec<LineBox>,
    /// Index of the line last found by [`LineList::first_line_at`]. Cleared on every
    /// structural change.
    #[serde(skip)]
    cursor: Cell<Option<LineIndex>>,
}

impl LineList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineBox> {
        self.lines.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut LineBox> {
        self.lines.iter_mut()
    }

    pub fn get(&self, index: LineIndex) -> Option<&LineBox> {
        self.lines.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: LineIndex) -> Option<&mut LineBox> {
        self.lines.get_mut(index)
    }

    pub fn last(&self) -> Option<&LineBox> {
        self.lines.last()
    }

    fn invalidate_cursor(&self) {
        self.cursor.set(None);
    }

    /// The cached cursor, for verification.
    pub(crate) fn cursor(&self) -> Option<LineIndex> {
        self.cursor.get()
    }

    pub(crate) fn insert(&mut self, index: LineIndex, line: LineBox) {
        self.invalidate_cursor();
        self.lines.insert(index, line);
    }

    pub(crate) fn remove(&mut self, index: LineIndex) -> LineBox {
        self.invalidate_cursor();
        self.lines.remove(index)
    }

    pub(crate) fn push(&mut self, line: LineBox) {
        self.invalidate_cursor();
        self.lines.push(line);
    }

    /// Removes the lines from `index` onwards and returns them as a new list.
    pub(crate) fn split_off(&mut self, index: LineIndex) -> LineList {
        self.invalidate_cursor();
        LineList {
            lines: self.lines.split_off(index),
            cursor: Cell::new(None),
        }
    }

    pub(crate) fn prepend(&mut self, mut other: LineList) {
        self.invalidate_cursor();
        other.lines.append(&mut self.lines);
        self.lines = other.lines;
    }

    pub(crate) fn append(&mut self, mut other: LineList) {
        self.invalidate_cursor();
        self.lines.append(&mut other.lines);
    }

    pub(crate) fn mark_all_dirty(&mut self) {
        for line in self.lines.iter_mut() {
            line.mark_dirty();
        }
    }

    /// The first line whose block end is past `block_position`, for painting and hit
    /// testing. Searches from the line found by the previous call.
    pub fn first_line_at(&self, block_position: Au) -> Option<LineIndex> {
        if self.lines.is_empty() {
            return None;
        }
        let mut index = self
            .cursor
            .get()
            .filter(|index| *index < self.lines.len())
            .unwrap_or(0);
        while index > 0 && self.lines[index - 1].block_end() > block_position {
            index -= 1;
        }
        while index < self.lines.len() && self.lines[index].block_end() <= block_position {
            index += 1;
        }
        if index == self.lines.len() {
            return None;
        }
        self.cursor.set(Some(index));
        Some(index)
    }

    /// Finds the line holding `child`, a child of the container, and the offset of the
    /// child within it.
    pub fn find_line_containing(&self, tree: &BoxTree, child: BoxId) -> Option<(LineIndex, usize)> {
        self.locate(tree, child, None)
    }

    /// Like [`LineList::find_line_containing`], but walks the child list as if `ignored`
    /// were not linked into it yet.
    fn locate(&self, tree: &BoxTree, child: BoxId, ignored: Option<BoxId>) -> Option<(LineIndex, usize)> {
        let first = self.lines.first()?.first_child;
        let mut siblings = tree
            .siblings_from(Some(first))
            .filter(|id| Some(*id) != ignored);
        for (index, line) in self.lines.iter().enumerate() {
            for offset in 0..line.child_count {
                match siblings.next() {
                    Some(id) if id == child => return Some((index, offset)),
                    Some(_) => {},
                    None => return None,
                }
            }
        }
        None
    }
}

/// Updates the line list of `parent` after `child` was linked into its child list.
///
/// Lines of containers that are being laid out are left alone; the reflow in progress
/// owns them. Children of inline boxes need nothing here, because the dirty bits of the
/// inline box mark the line that contains it.
pub(crate) fn note_child_inserted(tree: &mut BoxTree, parent: BoxId, child: BoxId) {
    debug_assert!(
        !tree.get(child).is_block_level() || matches!(tree.get(parent).kind, BoxKind::BlockContainer(_)),
        "Block-level boxes must not be placed in inline boxes"
    );
    let Some(data) = tree.block_container(parent) else {
        return;
    };
    if data.in_reflow {
        return;
    }

    let mut data = tree.take_block_container_data(parent);
    insert_line_for_child(tree, &mut data.lines, child);
    data.content_sizes = None;
    tree.restore_block_container_data(parent, data);
}

fn insert_line_for_child(tree: &BoxTree, lines: &mut LineList, child: BoxId) {
    let previous = tree.prev_sibling(child);
    let next = tree.next_sibling(child);
    let previous_line = previous.and_then(|previous| lines.locate(tree, previous, Some(child)));

    if tree.get(child).is_block_level() {
        let index = match previous_line {
            Some((index, offset)) if lines.lines[index].is_inline() => {
                // The block splits the inline line it was inserted into.
                let line = &mut lines.lines[index];
                let remaining = line.child_count - offset - 1;
                line.child_count = offset + 1;
                line.mark_dirty();
                if remaining > 0 {
                    if let Some(next) = next {
                        lines.insert(index + 1, LineBox::new_inline(next, remaining));
                    }
                }
                index + 1
            },
            Some((index, _)) => index + 1,
            None => 0,
        };
        lines.insert(index, LineBox::new_block(child));
        if let Some(following) = lines.get_mut(index + 1) {
            following.flags.insert(LineFlags::PREVIOUS_MARGIN_DIRTY);
        }
        return;
    }

    match previous_line {
        Some((index, _)) if lines.lines[index].is_inline() => {
            let line = &mut lines.lines[index];
            line.child_count += 1;
            line.mark_dirty();
        },
        _ => {
            let index = previous_line.map_or(0, |(index, _)| index + 1);
            match lines.get_mut(index) {
                Some(line) if line.is_inline() && Some(line.first_child) == next => {
                    line.first_child = child;
                    line.child_count += 1;
                    line.mark_dirty();
                },
                _ => lines.insert(index, LineBox::new_inline(child, 1)),
            }
        },
    }
}

/// Updates the line list of `parent` before `child` is unlinked from it. Removing a float
/// records the block range it covered as float damage for the next reflow.
pub(crate) fn note_child_removed(tree: &mut BoxTree, parent: BoxId, child: BoxId) {
    if tree.get(child).is_float() {
        if let Some((container, range)) = float_damage_range(tree, child) {
            if let Some(data) = tree.get_mut(container).block_container_mut() {
                data.removed_float_damage.push(range);
            }
        }
    }
    remove_line_for_child(tree, parent, child);
}

/// Unlinks `child` from its parent, keeping the parent's lines consistent. When the parent
/// is being laid out, the child is only flagged; the reflow in progress drops its line.
pub(crate) fn detach_child(tree: &mut BoxTree, child: BoxId) {
    if let Some(parent) = tree.parent(child) {
        let in_reflow = tree
            .block_container(parent)
            .is_some_and(|data| data.in_reflow);
        if in_reflow {
            tree.get_mut(child).flags.insert(BoxFlags::DETACHED);
        } else {
            remove_line_for_child(tree, parent, child);
        }
        tree.unlink(child);
    }
}

fn remove_line_for_child(tree: &mut BoxTree, parent: BoxId, child: BoxId) {
    let in_reflow = match tree.block_container(parent) {
        Some(data) => data.in_reflow,
        None => return,
    };
    if in_reflow {
        return;
    }

    let mut data = tree.take_block_container_data(parent);
    data.content_sizes = None;
    let lines = &mut data.lines;
    if let Some((index, offset)) = lines.find_line_containing(tree, child) {
        if lines.lines[index].is_block() {
            lines.remove(index);
            // Inline lines on both sides of the removed block now belong to one run.
            if index > 0 && index < lines.len() && lines.lines[index - 1].is_inline() && lines.lines[index].is_inline() {
                let merged = lines.remove(index);
                let line = &mut lines.lines[index - 1];
                line.child_count += merged.child_count;
                line.mark_dirty();
            }
            if let Some(following) = lines.get_mut(index) {
                following.flags.insert(LineFlags::PREVIOUS_MARGIN_DIRTY);
            }
        } else {
            let next = tree.next_sibling(child);
            let line = &mut lines.lines[index];
            line.child_count -= 1;
            line.mark_dirty();
            line.floats.retain(|float| *float != child);
            if line.child_count == 0 {
                lines.remove(index);
            } else if offset == 0 {
                if let Some(next) = next {
                    line.first_child = next;
                }
            }
            // Content from the next line may now fit on the previous one.
            if index > 0 && lines.lines[index - 1].is_inline() {
                lines.lines[index - 1].mark_dirty();
            }
        }
    }
    tree.restore_block_container_data(parent, data);
}

/// The block container a float was placed in and the block range its margin box covered,
/// relative to that container.
fn float_damage_range(tree: &BoxTree, float: BoxId) -> Option<(BoxId, Range<Au>)> {
    let mut container = tree.parent(float)?;
    while tree.block_container(container).is_none() {
        container = tree.parent(container)?;
    }
    let rect = tree.geometry(float).margin_rect();
    Some((container, rect.block_range()))
}
