//! Instance types handed to the presentation layer
//!
//! Plain `#[repr(C)]` structs so a renderer can upload the snapshot lists
//! straight into instance buffers.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Filled circle (material cells, neutrons)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CircleShape {
    pub center: Vec2,
    pub radius: f32,
    pub category: i32,
}

impl CircleShape {
    pub const fn new(center: Vec2, radius: f32, category: i32) -> Self {
        Self {
            center,
            radius,
            category,
        }
    }
}

/// Axis-aligned rectangle (water cells, rod segments)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct RectShape {
    pub center: Vec2,
    /// Full width and height
    pub size: Vec2,
    pub category: i32,
}

impl RectShape {
    pub const fn new(center: Vec2, size: Vec2, category: i32) -> Self {
        Self {
            center,
            size,
            category,
        }
    }
}

/// Category codes for shapes
///
/// Material circles use the element code (0 inert, 1 fissile, 2 xenon).
/// Water rectangles use a 0..=255 heat ramp or `WATER_BOILING`.
pub mod category {
    pub const NEUTRON_THERMAL: i32 = -1;
    pub const NEUTRON_FAST: i32 = -4;
    pub const WATER_BOILING: i32 = -1;
    pub const ROD_ABSORBER: i32 = -2;
    pub const ROD_MODERATOR: i32 = -3;
    /// Withdrawn section of a rod without a moderating tip
    pub const ROD_CHANNEL: i32 = -5;
    pub const ROD_RAIL: i32 = -6;
}
