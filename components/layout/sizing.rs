/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Intrinsic inline sizes.
//!
//! <https://dbaron.org/css/intrinsic/>

use std::ops::{Add, AddAssign};

use app_units::Au;
use num_traits::Zero;
use serde::Serialize;

use crate::geom::WritingMode;
use crate::style::{ComputedValues, LengthPercentage, LengthPercentageOrAuto};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContentSizes {
    pub min_content: Au,
    pub max_content: Au,
}

impl ContentSizes {
    pub fn zero() -> Self {
        Self {
            min_content: Au::zero(),
            max_content: Au::zero(),
        }
    }

    pub fn max(&self, other: Self) -> Self {
        Self {
            min_content: self.min_content.max(other.min_content),
            max_content: self.max_content.max(other.max_content),
        }
    }

    pub fn max_assign(&mut self, other: Self) {
        *self = self.max(other);
    }

    /// <https://drafts.csswg.org/css2/visudet.html#shrink-to-fit-float>
    pub fn shrink_to_fit(&self, available_size: Au) -> Au {
        available_size.max(self.min_content).min(self.max_content)
    }
}

impl Add for ContentSizes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            min_content: self.min_content + rhs.min_content,
            max_content: self.max_content + rhs.max_content,
        }
    }
}

impl AddAssign for ContentSizes {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl From<Au> for ContentSizes {
    fn from(size: Au) -> Self {
        Self {
            min_content: size,
            max_content: size,
        }
    }
}

/// <https://dbaron.org/css/intrinsic/#outer-intrinsic>
///
/// Percentages in padding and margin resolve against zero here, as they would against
/// an indefinite containing block.
pub fn outer_inline_content_sizes(
    style: &ComputedValues,
    mode: WritingMode,
    get_inner_content_sizes: impl FnOnce() -> ContentSizes,
) -> ContentSizes {
    let size = style.box_size(mode).inline;
    let min_size = style.min_box_size(mode).inline.maybe_resolve(None);
    let max_size = style.max_box_size(mode).inline.maybe_resolve(None);

    // Percentages for `width` are treated as `auto`.
    let mut inner = match size.maybe_resolve(None) {
        Some(length) => ContentSizes::from(length),
        None => get_inner_content_sizes(),
    };
    if let Some(max_size) = max_size {
        inner.min_content.min_assign(max_size);
        inner.max_content.min_assign(max_size);
    }
    if let Some(min_size) = min_size {
        inner.min_content.max_assign(min_size);
        inner.max_content.max_assign(min_size);
    }

    let padding = style.padding.to_logical(mode);
    let border = style.border_width.to_logical(mode);
    let margin = style.margin.to_logical(mode);
    let length_part = |value: LengthPercentage| match value {
        LengthPercentage::Length(length) => length,
        LengthPercentage::Percentage(_) => Au::zero(),
    };
    let margin_part = |value: LengthPercentageOrAuto| match value {
        LengthPercentageOrAuto::Auto => Au::zero(),
        LengthPercentageOrAuto::LengthPercentage(value) => length_part(value),
    };
    let pbm = length_part(padding.inline_start) +
        length_part(padding.inline_end) +
        border.inline_sum() +
        margin_part(margin.inline_start) +
        margin_part(margin.inline_end);
    inner + ContentSizes::from(pbm)
}
