/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Property-based tests for the float context.

mod common;

use app_units::Au;
use common::px;
use layout::box_tree::BoxTree;
use layout::flow::float::{
    Clear, FloatContext, FloatPlacement, FloatSide, FlowAreaQuery, PlacementInfo,
};
use layout::geom::{LogicalRect, LogicalVec2};
use layout::style::ComputedValues;
use num_traits::Zero;
use quickcheck::{Arbitrary, Gen, TestResult, quickcheck};
use servo_arc::Arc as ServoArc;

const CONTAINER_INLINE_SIZE: i32 = 300;

#[derive(Clone, Debug)]
struct FloatInput {
    inline_size: u16,
    block_size: u16,
    side: FloatSide,
    clear: Clear,
    /// How far the content before the float has moved down since the last float.
    ceiling_advance: u16,
}

impl Arbitrary for FloatInput {
    fn arbitrary(generator: &mut Gen) -> FloatInput {
        FloatInput {
            inline_size: u16::arbitrary(generator) % 320,
            block_size: u16::arbitrary(generator) % 200 + 1,
            side: match bool::arbitrary(generator) {
                true => FloatSide::InlineStart,
                false => FloatSide::InlineEnd,
            },
            clear: *generator
                .choose(&[Clear::None, Clear::None, Clear::InlineStart, Clear::InlineEnd, Clear::Both])
                .unwrap_or(&Clear::None),
            ceiling_advance: u16::arbitrary(generator) % 50,
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = FloatInput>> {
        let this = self.clone();
        Box::new(
            self.inline_size
                .shrink()
                .map(move |inline_size| FloatInput {
                    inline_size,
                    ..this.clone()
                }),
        )
    }
}

struct PlacedFloat {
    rect: LogicalRect<Au>,
    input: FloatInput,
    ceiling: Au,
}

fn place_all(inputs: &[FloatInput]) -> Vec<PlacedFloat> {
    let mut tree = BoxTree::new();
    let mut floats = FloatContext::new(px(CONTAINER_INLINE_SIZE));
    let mut ceiling = Au::zero();
    let mut placed = Vec::new();
    for input in inputs {
        ceiling += px(input.ceiling_advance as i32);
        floats.set_ceiling_from_non_floats(ceiling);
        let box_id = tree.new_block_container(ServoArc::new(ComputedValues::default()));
        let info = PlacementInfo {
            size: LogicalVec2 {
                inline: px(input.inline_size as i32),
                block: px(input.block_size as i32),
            },
            side: input.side,
            clear: input.clear,
            box_id,
            is_continuation: false,
        };
        match floats.place_float(&info, None, false) {
            FloatPlacement::Placed(corner) => placed.push(PlacedFloat {
                rect: LogicalRect {
                    start_corner: corner,
                    size: info.size,
                },
                input: input.clone(),
                ceiling,
            }),
            FloatPlacement::Pushed => unreachable!("Pushed a float without a fragmentainer"),
        }
    }
    placed
}

fn overlaps(a: &LogicalRect<Au>, b: &LogicalRect<Au>) -> bool {
    a.start_corner.inline < b.max_inline_position() &&
        b.start_corner.inline < a.max_inline_position() &&
        a.start_corner.block < b.max_block_position() &&
        b.start_corner.block < a.max_block_position()
}

#[test]
fn test_floats_never_overlap() {
    fn check(inputs: Vec<FloatInput>) -> TestResult {
        let placed = place_all(&inputs);
        for (index, float) in placed.iter().enumerate() {
            for other in placed[..index].iter() {
                if float.rect.size.inline.is_zero() || other.rect.size.inline.is_zero() {
                    continue;
                }
                if overlaps(&float.rect, &other.rect) {
                    return TestResult::error(format!("{:?} overlaps {:?}", float.rect, other.rect));
                }
            }
        }
        TestResult::passed()
    }
    common::init_logging();
    quickcheck(check as fn(Vec<FloatInput>) -> TestResult);
}

#[test]
fn test_floats_stay_between_the_walls_when_they_fit() {
    fn check(inputs: Vec<FloatInput>) -> bool {
        place_all(&inputs).iter().all(|float| {
            float.input.inline_size as i32 > CONTAINER_INLINE_SIZE ||
                (float.rect.start_corner.inline >= Au::zero() &&
                    float.rect.max_inline_position() <= px(CONTAINER_INLINE_SIZE))
        })
    }
    quickcheck(check as fn(Vec<FloatInput>) -> bool);
}

#[test]
fn test_float_tops_never_go_up() {
    fn check(inputs: Vec<FloatInput>) -> bool {
        let placed = place_all(&inputs);
        placed.windows(2).all(|pair| pair[0].rect.start_corner.block <= pair[1].rect.start_corner.block) &&
            placed.iter().all(|float| float.rect.start_corner.block >= float.ceiling)
    }
    quickcheck(check as fn(Vec<FloatInput>) -> bool);
}

#[test]
fn test_floats_clear_what_they_ask_to() {
    fn check(inputs: Vec<FloatInput>) -> bool {
        let placed = place_all(&inputs);
        placed.iter().enumerate().all(|(index, float)| {
            placed[..index].iter().all(|earlier| {
                let cleared = match float.input.clear {
                    Clear::None => false,
                    Clear::InlineStart => earlier.input.side == FloatSide::InlineStart,
                    Clear::InlineEnd => earlier.input.side == FloatSide::InlineEnd,
                    Clear::Both => true,
                };
                !cleared || float.rect.start_corner.block >= earlier.rect.max_block_position()
            })
        })
    }
    quickcheck(check as fn(Vec<FloatInput>) -> bool);
}

#[test]
fn test_bands_narrow_monotonically_with_block_size() {
    fn check(inputs: Vec<FloatInput>, query_top: u16, height: u16) -> bool {
        let mut tree = BoxTree::new();
        let mut floats = FloatContext::new(px(CONTAINER_INLINE_SIZE));
        for input in inputs.iter() {
            let box_id = tree.new_block_container(ServoArc::new(ComputedValues::default()));
            floats.place_float(
                &PlacementInfo {
                    size: LogicalVec2 {
                        inline: px(input.inline_size as i32),
                        block: px(input.block_size as i32),
                    },
                    side: input.side,
                    clear: input.clear,
                    box_id,
                    is_continuation: false,
                },
                None,
                false,
            );
        }
        let position = px(query_top as i32 % 1000);
        let band = floats.available_space(position, FlowAreaQuery::BandFromPoint);
        let taller = floats.available_space(
            position,
            FlowAreaQuery::WidthWithinHeight(band.rect.size.block.min(px(2000)) + px(height as i32 % 200)),
        );
        taller.rect.size.inline <= band.rect.size.inline && band.rect.size.block > Au::zero()
    }
    quickcheck(check as fn(Vec<FloatInput>, u16, u16) -> bool);
}

#[test]
fn test_snapshot_restores_placement() {
    let mut tree = BoxTree::new();
    let mut floats = FloatContext::new(px(CONTAINER_INLINE_SIZE));
    let snapshot = floats.snapshot();
    let box_id = tree.new_block_container(ServoArc::new(ComputedValues::default()));
    let info = PlacementInfo {
        size: LogicalVec2 {
            inline: px(100),
            block: px(50),
        },
        side: FloatSide::InlineStart,
        clear: Clear::None,
        box_id,
        is_continuation: false,
    };
    assert_eq!(
        floats.place_float(&info, None, false),
        FloatPlacement::Placed(LogicalVec2::zero())
    );
    assert!(floats.has_floats());
    assert_eq!(
        floats
            .available_space(Au::zero(), FlowAreaQuery::BandFromPoint)
            .rect
            .start_corner
            .inline,
        px(100)
    );

    floats.restore(&snapshot);
    assert!(!floats.has_floats());
    assert!(!floats.contains_float(box_id));
    let area = floats.available_space(Au::zero(), FlowAreaQuery::BandFromPoint);
    assert_eq!(area.rect.size.inline, px(CONTAINER_INLINE_SIZE));
    assert!(!area.has_floats);
}

#[test]
fn test_float_pushed_past_fragmentainer_end() {
    let mut tree = BoxTree::new();
    let mut floats = FloatContext::new(px(CONTAINER_INLINE_SIZE));
    floats.set_ceiling_from_non_floats(px(150));
    let info = |block: i32, tree: &mut BoxTree| PlacementInfo {
        size: LogicalVec2 {
            inline: px(50),
            block: px(block),
        },
        side: FloatSide::InlineStart,
        clear: Clear::None,
        box_id: tree.new_block_container(ServoArc::new(ComputedValues::default())),
        is_continuation: false,
    };
    let tall = info(100, &mut tree);
    assert_eq!(floats.place_float(&tall, Some(px(200)), false), FloatPlacement::Pushed);
    assert!(floats.has_pushed_floats());

    // Floats keep their order, so a later float that would fit is pushed as well.
    let short = info(10, &mut tree);
    assert_eq!(floats.place_float(&short, Some(px(200)), false), FloatPlacement::Pushed);
    assert!(!floats.has_floats());
}
