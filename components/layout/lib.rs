/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Block formatting context reflow.
//!
//! Lays out a tree of block containers, inline content and floats into positioned boxes.
//! Block containers keep a line list between passes so that later passes only lay out
//! lines whose content changed or that moved relative to floats. Content that does not
//! fit in a fragmentainer is pushed to continuations of the containers it is in.

pub mod box_tree;
pub mod context;
pub mod flow;
pub mod fragment_tree;
pub mod geom;
pub mod sizing;
pub mod style;
pub mod text;

pub use box_tree::{AtomicContent, BoxFlags, BoxId, BoxKind, BoxTree, LayoutBox};
pub use context::{Deadline, InterruptSignal, LayoutContext, LineBudget, NeverInterrupt};
pub use flow::fragmentation::paginate;
pub use flow::{Completeness, ReflowOutput, ReflowStatus, reflow_root};
pub use fragment_tree::{BoxGeometry, CollapsedMargin, OverflowAreas};
pub use style::ComputedValues;
