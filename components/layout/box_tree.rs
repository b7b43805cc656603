/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The box tree: an index arena of boxes with parent, sibling and continuation links.
//!
//! Boxes are never freed during the lifetime of a tree; removed boxes are unlinked and
//! marked detached, so a [`BoxId`] never points at a different box than the one it was
//! created for.

use std::mem;
use std::sync::Arc;

use app_units::Au;
use bitflags::bitflags;
use log::trace;
use serde::Serialize;
use servo_arc::Arc as ServoArc;

use crate::flow::BlockContainerData;
use crate::flow::lines;
use crate::fragment_tree::BoxGeometry;
use crate::geom::LogicalVec2;
use crate::style::ComputedValues;
use crate::text::{ShapedText, TextRun};

/// A handle to a box in a [`BoxTree`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct BoxId(usize);

impl BoxId {
    pub fn index(&self) -> usize {
        self.0
    }
}

bitflags! {
    /// Invalidation state of a box between reflows.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BoxFlags: u8 {
        /// The box itself changed and must be laid out again.
        const IS_DIRTY = 1 << 0;
        /// Some descendant is dirty.
        const HAS_DIRTY_CHILDREN = 1 << 1;
        /// The box has been removed from the tree.
        const DETACHED = 1 << 2;
    }
}

/// An atomic inline or replaced box with a fixed content size.
#[derive(Clone, Debug)]
pub struct AtomicContent {
    pub content_size: LogicalVec2<Au>,
    /// Distance from the block-start content edge to the baseline. `None` aligns the
    /// block-end margin edge with the baseline.
    pub baseline: Option<Au>,
}

#[derive(Debug)]
pub enum BoxKind {
    /// A block container: block-level boxes, floats and inline-blocks.
    BlockContainer(BlockContainerData),
    /// An inline box (a span).
    InlineBox,
    Text(TextRun),
    Atomic(AtomicContent),
    /// A forced line break.
    LineBreak,
}

#[derive(Debug)]
pub struct LayoutBox {
    pub style: ServoArc<ComputedValues>,
    pub kind: BoxKind,
    pub(crate) parent: Option<BoxId>,
    pub(crate) first_child: Option<BoxId>,
    pub(crate) last_child: Option<BoxId>,
    pub(crate) prev_sibling: Option<BoxId>,
    pub(crate) next_sibling: Option<BoxId>,
    pub(crate) prev_in_flow: Option<BoxId>,
    pub(crate) next_in_flow: Option<BoxId>,
    pub(crate) flags: BoxFlags,
    pub(crate) geometry: BoxGeometry,
}

impl LayoutBox {
    fn new(style: ServoArc<ComputedValues>, kind: BoxKind) -> Self {
        LayoutBox {
            style,
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            prev_in_flow: None,
            next_in_flow: None,
            flags: BoxFlags::IS_DIRTY,
            geometry: BoxGeometry::default(),
        }
    }

    pub fn geometry(&self) -> &BoxGeometry {
        &self.geometry
    }

    pub fn flags(&self) -> BoxFlags {
        self.flags
    }

    pub fn parent(&self) -> Option<BoxId> {
        self.parent
    }

    pub fn next_sibling(&self) -> Option<BoxId> {
        self.next_sibling
    }

    pub fn prev_in_flow(&self) -> Option<BoxId> {
        self.prev_in_flow
    }

    pub fn next_in_flow(&self) -> Option<BoxId> {
        self.next_in_flow
    }

    pub fn needs_reflow(&self) -> bool {
        self.flags
            .intersects(BoxFlags::IS_DIRTY | BoxFlags::HAS_DIRTY_CHILDREN)
    }

    pub fn block_container(&self) -> Option<&BlockContainerData> {
        match &self.kind {
            BoxKind::BlockContainer(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn block_container_mut(&mut self) -> Option<&mut BlockContainerData> {
        match &mut self.kind {
            BoxKind::BlockContainer(data) => Some(data),
            _ => None,
        }
    }

    /// Whether this box takes part in inline layout: text, spans, atomic inlines,
    /// inline-blocks, line breaks and floats, which live on lines through their placeholder.
    pub fn is_inline_level(&self) -> bool {
        match self.kind {
            BoxKind::BlockContainer(_) => !self.style.is_block_level(),
            _ => true,
        }
    }

    pub fn is_block_level(&self) -> bool {
        !self.is_inline_level()
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, BoxKind::BlockContainer(_)) && self.style.is_floating()
    }
}

#[derive(Debug, Default)]
pub struct BoxTree {
    boxes: Vec<LayoutBox>,
}

impl BoxTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, layout_box: LayoutBox) -> BoxId {
        self.boxes.push(layout_box);
        BoxId(self.boxes.len() - 1)
    }

    pub fn new_block_container(&mut self, style: ServoArc<ComputedValues>) -> BoxId {
        self.push(LayoutBox::new(
            style,
            BoxKind::BlockContainer(BlockContainerData::default()),
        ))
    }

    pub fn new_inline_box(&mut self, style: ServoArc<ComputedValues>) -> BoxId {
        self.push(LayoutBox::new(style, BoxKind::InlineBox))
    }

    pub fn new_text(&mut self, style: ServoArc<ComputedValues>, text: Arc<dyn ShapedText + Send + Sync>) -> BoxId {
        self.push(LayoutBox::new(style, BoxKind::Text(TextRun::new(text))))
    }

    pub fn new_atomic(&mut self, style: ServoArc<ComputedValues>, content: AtomicContent) -> BoxId {
        self.push(LayoutBox::new(style, BoxKind::Atomic(content)))
    }

    pub fn new_line_break(&mut self, style: ServoArc<ComputedValues>) -> BoxId {
        self.push(LayoutBox::new(style, BoxKind::LineBreak))
    }

    pub fn get(&self, id: BoxId) -> &LayoutBox {
        &self.boxes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: BoxId) -> &mut LayoutBox {
        &mut self.boxes[id.0]
    }

    pub fn style(&self, id: BoxId) -> &ServoArc<ComputedValues> {
        &self.boxes[id.0].style
    }

    pub fn geometry(&self, id: BoxId) -> &BoxGeometry {
        &self.boxes[id.0].geometry
    }

    pub(crate) fn geometry_mut(&mut self, id: BoxId) -> &mut BoxGeometry {
        &mut self.boxes[id.0].geometry
    }

    pub fn block_container(&self, id: BoxId) -> Option<&BlockContainerData> {
        self.boxes[id.0].block_container()
    }

    pub fn first_child(&self, id: BoxId) -> Option<BoxId> {
        self.boxes[id.0].first_child
    }

    pub fn last_child(&self, id: BoxId) -> Option<BoxId> {
        self.boxes[id.0].last_child
    }

    pub fn next_sibling(&self, id: BoxId) -> Option<BoxId> {
        self.boxes[id.0].next_sibling
    }

    pub fn prev_sibling(&self, id: BoxId) -> Option<BoxId> {
        self.boxes[id.0].prev_sibling
    }

    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.boxes[id.0].parent
    }

    pub fn children(&self, id: BoxId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// The boxes from `first` to the last sibling.
    pub fn siblings_from(&self, first: Option<BoxId>) -> Children<'_> {
        Children { tree: self, next: first }
    }

    /// Takes the block container data out of a box for the duration of its reflow, so that
    /// its children can be laid out with mutable access to the tree. The box is left with
    /// empty data marked as being in reflow until the data is restored.
    pub(crate) fn take_block_container_data(&mut self, id: BoxId) -> BlockContainerData {
        let placeholder = BlockContainerData {
            in_reflow: true,
            ..BlockContainerData::default()
        };
        match &mut self.boxes[id.0].kind {
            BoxKind::BlockContainer(data) => mem::replace(data, placeholder),
            _ => unreachable!("Tried to reflow a box that isn't a block container"),
        }
    }

    pub(crate) fn restore_block_container_data(&mut self, id: BoxId, data: BlockContainerData) {
        match &mut self.boxes[id.0].kind {
            BoxKind::BlockContainer(slot) => *slot = data,
            _ => unreachable!("Tried to restore data into a box that isn't a block container"),
        }
    }

    // Invalidation

    /// Marks a box as needing reflow, along with the path to the root.
    pub fn mark_dirty(&mut self, id: BoxId) {
        self.boxes[id.0].flags.insert(BoxFlags::IS_DIRTY);
        self.mark_ancestors_dirty(id);
    }

    pub(crate) fn mark_ancestors_dirty(&mut self, id: BoxId) {
        let mut current = self.boxes[id.0].parent;
        while let Some(ancestor) = current {
            let ancestor_box = &mut self.boxes[ancestor.0];
            ancestor_box.flags.insert(BoxFlags::HAS_DIRTY_CHILDREN);
            if let BoxKind::BlockContainer(data) = &mut ancestor_box.kind {
                data.content_sizes = None;
            }
            current = ancestor_box.parent;
        }
        if let BoxKind::BlockContainer(data) = &mut self.boxes[id.0].kind {
            data.content_sizes = None;
        }
    }

    pub(crate) fn clear_dirty_bits(&mut self, id: BoxId) {
        self.boxes[id.0]
            .flags
            .remove(BoxFlags::IS_DIRTY | BoxFlags::HAS_DIRTY_CHILDREN);
    }

    /// Replaces the style of a box.
    pub fn set_style(&mut self, id: BoxId, style: ServoArc<ComputedValues>) {
        self.boxes[id.0].style = style;
        self.mark_dirty(id);
    }

    /// Replaces the content of a text box. Any continuations made from the old content
    /// are removed.
    pub fn set_text(&mut self, id: BoxId, text: Arc<dyn ShapedText + Send + Sync>) {
        while let Some(continuation) = self.boxes[id.0].next_in_flow {
            self.remove_child(continuation);
        }
        if let BoxKind::Text(run) = &mut self.boxes[id.0].kind {
            *run = TextRun::new(text);
        }
        self.mark_dirty(id);
    }

    // Structure

    /// Appends `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: BoxId, child: BoxId) {
        let previous = self.boxes[parent.0].last_child;
        self.link_after(parent, previous, child);
        lines::note_child_inserted(self, parent, child);
        self.mark_dirty(child);
    }

    /// Inserts `child` into `parent` directly after `previous`, or first when `previous`
    /// is `None`.
    pub fn insert_after(&mut self, parent: BoxId, previous: Option<BoxId>, child: BoxId) {
        self.link_after(parent, previous, child);
        lines::note_child_inserted(self, parent, child);
        self.mark_dirty(child);
    }

    /// Removes a box and all of its continuations from their parents.
    pub fn remove_child(&mut self, child: BoxId) {
        let mut current = Some(child);
        while let Some(id) = current {
            current = self.boxes[id.0].next_in_flow;
            if let Some(previous) = self.boxes[id.0].prev_in_flow {
                self.boxes[previous.0].next_in_flow = None;
            }
            self.boxes[id.0].prev_in_flow = None;
            self.boxes[id.0].next_in_flow = None;
            if let Some(parent) = self.boxes[id.0].parent {
                lines::note_child_removed(self, parent, id);
                self.mark_dirty(parent);
                self.unlink(id);
            }
            self.boxes[id.0].flags.insert(BoxFlags::DETACHED);
        }
    }

    /// Links `child` into `parent`'s child list without touching line lists.
    pub(crate) fn link_after(&mut self, parent: BoxId, previous: Option<BoxId>, child: BoxId) {
        debug_assert!(self.boxes[child.0].parent.is_none());
        let next = match previous {
            Some(previous) => self.boxes[previous.0].next_sibling,
            None => self.boxes[parent.0].first_child,
        };
        {
            let child_box = &mut self.boxes[child.0];
            child_box.parent = Some(parent);
            child_box.prev_sibling = previous;
            child_box.next_sibling = next;
            child_box.flags.remove(BoxFlags::DETACHED);
        }
        match previous {
            Some(previous) => self.boxes[previous.0].next_sibling = Some(child),
            None => self.boxes[parent.0].first_child = Some(child),
        }
        match next {
            Some(next) => self.boxes[next.0].prev_sibling = Some(child),
            None => self.boxes[parent.0].last_child = Some(child),
        }
    }

    /// Unlinks a box from its parent's child list without touching line lists.
    pub(crate) fn unlink(&mut self, child: BoxId) {
        let Some(parent) = self.boxes[child.0].parent else {
            return;
        };
        let previous = self.boxes[child.0].prev_sibling;
        let next = self.boxes[child.0].next_sibling;
        match previous {
            Some(previous) => self.boxes[previous.0].next_sibling = next,
            None => self.boxes[parent.0].first_child = next,
        }
        match next {
            Some(next) => self.boxes[next.0].prev_sibling = previous,
            None => self.boxes[parent.0].last_child = previous,
        }
        let child_box = &mut self.boxes[child.0];
        child_box.parent = None;
        child_box.prev_sibling = None;
        child_box.next_sibling = None;
    }

    /// Detaches `first` and every later sibling from their parent, returning them in order.
    pub(crate) fn split_children_off(&mut self, first: BoxId) -> Vec<BoxId> {
        let moved: Vec<BoxId> = self.siblings_from(Some(first)).collect();
        for id in &moved {
            self.unlink(*id);
        }
        moved
    }

    /// Links `children` at the start of `parent`'s child list.
    pub(crate) fn prepend_children(&mut self, parent: BoxId, children: &[BoxId]) {
        let mut previous = None;
        for child in children {
            self.link_after(parent, previous, *child);
            previous = Some(*child);
        }
    }

    /// Links `children` at the end of `parent`'s child list.
    pub(crate) fn append_children(&mut self, parent: BoxId, children: &[BoxId]) {
        for child in children {
            let previous = self.boxes[parent.0].last_child;
            self.link_after(parent, previous, *child);
        }
    }

    // Continuations

    /// Creates an empty continuation of a block container, linked after it in flow and,
    /// when it has a parent, as its next sibling.
    pub(crate) fn create_block_continuation(&mut self, id: BoxId) -> BoxId {
        debug_assert!(self.boxes[id.0].next_in_flow.is_none());
        let style = self.boxes[id.0].style.clone();
        let continuation = self.new_block_container(style);
        self.link_in_flow(id, continuation);
        if let Some(parent) = self.boxes[id.0].parent {
            self.link_after(parent, Some(id), continuation);
        }
        trace!("Created continuation {continuation:?} of {id:?}");
        continuation
    }

    fn link_in_flow(&mut self, id: BoxId, continuation: BoxId) {
        let old_next = self.boxes[id.0].next_in_flow;
        self.boxes[continuation.0].prev_in_flow = Some(id);
        self.boxes[continuation.0].next_in_flow = old_next;
        if let Some(old_next) = old_next {
            self.boxes[old_next.0].prev_in_flow = Some(continuation);
        }
        self.boxes[id.0].next_in_flow = Some(continuation);
    }

    /// Splits a text box at cluster `at`, which must lie strictly inside its range. The
    /// new continuation holds the clusters from `at` onwards and follows the box as its
    /// next sibling.
    pub(crate) fn split_text(&mut self, id: BoxId, at: usize) -> BoxId {
        let (style, rest) = match &mut self.boxes[id.0].kind {
            BoxKind::Text(run) => {
                debug_assert!(run.range.start < at && at < run.range.end);
                let rest = TextRun {
                    text: run.text.clone(),
                    range: at..run.range.end,
                };
                run.range.end = at;
                (self.boxes[id.0].style.clone(), rest)
            },
            _ => unreachable!("Tried to split a box that isn't text"),
        };
        let continuation = self.push(LayoutBox::new(style, BoxKind::Text(rest)));
        self.link_in_flow(id, continuation);
        if let Some(parent) = self.boxes[id.0].parent {
            self.link_after(parent, Some(id), continuation);
        }
        continuation
    }

    /// Splits an inline box so that `first_moved` and every later child move into a new
    /// continuation, which follows the box as its next sibling. With `None`, the
    /// continuation starts out empty.
    pub(crate) fn split_inline_box(&mut self, id: BoxId, first_moved: Option<BoxId>) -> BoxId {
        let style = self.boxes[id.0].style.clone();
        let continuation = self.push(LayoutBox::new(style, BoxKind::InlineBox));
        self.link_in_flow(id, continuation);
        if let Some(parent) = self.boxes[id.0].parent {
            self.link_after(parent, Some(id), continuation);
        }
        if let Some(first_moved) = first_moved {
            let moved = self.split_children_off(first_moved);
            self.append_children(continuation, &moved);
        }
        continuation
    }

    /// Undoes one step of earlier line breaking: merges the continuation that directly
    /// follows `id` in its parent back into it. Returns whether anything was merged.
    pub(crate) fn rejoin_next_in_flow(&mut self, id: BoxId) -> bool {
        let Some(next) = self.boxes[id.0].next_in_flow else {
            return false;
        };
        if self.boxes[id.0].next_sibling != Some(next) {
            return false;
        }
        match self.boxes[id.0].kind {
            BoxKind::Text(_) => {
                let end = match &self.boxes[next.0].kind {
                    BoxKind::Text(run) => run.range.end,
                    _ => unreachable!("Text continuation that isn't text"),
                };
                if let BoxKind::Text(run) = &mut self.boxes[id.0].kind {
                    run.range.end = end;
                }
            },
            BoxKind::InlineBox => {
                let junction = self.boxes[id.0].last_child;
                if let Some(first) = self.boxes[next.0].first_child {
                    let moved = self.split_children_off(first);
                    self.append_children(id, &moved);
                }
                if let Some(junction) = junction {
                    self.rejoin_next_in_flow(junction);
                }
            },
            // Block containers are only continued across fragments, which is handled by
            // pulling lines rather than by rejoining.
            _ => return false,
        }
        let after = self.boxes[next.0].next_in_flow;
        self.boxes[id.0].next_in_flow = after;
        if let Some(after) = after {
            self.boxes[after.0].prev_in_flow = Some(id);
        }
        self.boxes[next.0].next_in_flow = None;
        self.boxes[next.0].prev_in_flow = None;
        self.unlink(next);
        self.boxes[next.0].flags.insert(BoxFlags::DETACHED);
        true
    }

    /// Moves a box to a new parent, after `previous`, without touching line lists.
    pub(crate) fn reparent(&mut self, id: BoxId, new_parent: BoxId, previous: Option<BoxId>) {
        self.unlink(id);
        self.link_after(new_parent, previous, id);
    }
}

pub struct Children<'a> {
    tree: &'a BoxTree,
    next: Option<BoxId>,
}

impl Iterator for Children<'_> {
    type Item = BoxId;

    fn next(&mut self) -> Option<BoxId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
