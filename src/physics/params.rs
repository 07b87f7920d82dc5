use super::{collision::ImpulseParams, BroadPhaseMode};
use crate::math as m;

/// Deepest octree a [`World`][super::World] will build.
/// Depth 6 already has 262144 leaves.
pub const MAX_OCTREE_DEPTH: u32 = 6;

/// Errors from validating simulation configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("Bounds center must be finite, got {0:?}")]
    NonFiniteCenter(m::Vec3),
    #[error("Bounds half width must be finite and positive, got {0}")]
    InvalidHalfWidth(f32),
    #[error("Octree depth {depth} is larger than the maximum of {max}")]
    DepthTooLarge { depth: u32, max: u32 },
    #[error("Unknown broad phase mode {0:?}")]
    UnknownMode(String),
    #[error("Restitution must be finite and non-negative, got {0}")]
    InvalidRestitution(f32),
    #[error("Position correction must be between 0 and 1, got {0}")]
    InvalidPositionCorrection(f32),
}

/// Parameters for the creation of a [`World`][super::World].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct WorldParams {
    /// Center of the region covered by the octree.
    ///
    /// Particles outside the region still work, they just all end up
    /// in the outermost leaves, so keep it around where things happen.
    pub bounds_center: m::Vec3,
    /// Distance from `bounds_center` to the edges of the octree's region.
    pub bounds_half_width: f32,
    /// Number of times the region is split into octants.
    /// The tree has `8^depth` leaves.
    ///
    /// Deeper trees do fewer unnecessary checks as long as leaves stay
    /// larger than the particles, after which particles start
    /// spilling into many leaves and the tree gets slower again.
    pub octree_depth: u32,
    /// Which broad phase a fresh [`TickContext`][super::TickContext] starts with.
    pub initial_mode: BroadPhaseMode,
    /// How many particles to initially allocate space for.
    /// More space will be allocated as needed.
    pub initial_capacity: usize,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            bounds_center: m::Vec3::zero(),
            bounds_half_width: 10.0,
            octree_depth: 3,
            initial_mode: BroadPhaseMode::Baseline,
            initial_capacity: 0,
        }
    }
}

impl WorldParams {
    #[inline]
    pub fn with_bounds(mut self, center: m::Vec3, half_width: f32) -> Self {
        self.bounds_center = center;
        self.bounds_half_width = half_width;
        self
    }

    #[inline]
    pub fn with_octree_depth(mut self, depth: u32) -> Self {
        self.octree_depth = depth;
        self
    }

    #[inline]
    pub fn with_initial_mode(mut self, mode: BroadPhaseMode) -> Self {
        self.initial_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        let c = self.bounds_center;
        if !(c.x.is_finite() && c.y.is_finite() && c.z.is_finite()) {
            return Err(ParamsError::NonFiniteCenter(c));
        }
        if !(self.bounds_half_width.is_finite() && self.bounds_half_width > 0.0) {
            return Err(ParamsError::InvalidHalfWidth(self.bounds_half_width));
        }
        if self.octree_depth > MAX_OCTREE_DEPTH {
            return Err(ParamsError::DepthTooLarge {
                depth: self.octree_depth,
                max: MAX_OCTREE_DEPTH,
            });
        }
        Ok(())
    }
}

impl ImpulseParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.restitution.is_finite() && self.restitution >= 0.0) {
            return Err(ParamsError::InvalidRestitution(self.restitution));
        }
        if !(0.0..=1.0).contains(&self.position_correction) {
            return Err(ParamsError::InvalidPositionCorrection(
                self.position_correction,
            ));
        }
        Ok(())
    }
}
