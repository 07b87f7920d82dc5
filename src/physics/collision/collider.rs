use crate::math::{self as m, Unit};

/// A moving sphere, the only kind of dynamic object in the simulation.
///
/// Center and radius define the sphere's footprint in the broad phase.
/// Velocity and mass are only touched by collision resolvers and the integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    pub center: m::Vec3,
    pub radius: f32,
    #[cfg_attr(feature = "serde-types", serde(default))]
    pub velocity: m::Vec3,
    /// Mass in kilograms. Zero, negative or infinite mass makes the sphere immovable.
    #[cfg_attr(feature = "serde-types", serde(default = "default_mass"))]
    pub mass: f32,
}

#[cfg(feature = "serde-types")]
fn default_mass() -> f32 {
    1.0
}

impl Sphere {
    /// Create a sphere at rest with unit mass.
    pub fn new(center: m::Vec3, radius: f32) -> Self {
        Sphere {
            center,
            radius,
            velocity: m::Vec3::zero(),
            mass: 1.0,
        }
    }

    /// Set the velocity of the sphere in a builder-like chain.
    pub fn with_velocity(mut self, velocity: m::Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the mass of the sphere in a builder-like chain.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Inverse of the mass, zero for immovable spheres.
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 && self.mass.is_finite() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Check if two spheres overlap. Touching spheres do not count.
    #[inline]
    pub fn overlaps(&self, other: &Sphere) -> bool {
        let r = self.radius + other.radius;
        (other.center - self.center).mag_sq() < r * r
    }

    /// Signed distance from the sphere's surface to a plane,
    /// negative when the sphere penetrates it.
    #[inline]
    pub fn plane_distance(&self, plane: &Plane) -> f32 {
        plane.signed_distance(self.center) - self.radius
    }
}

/// An infinite static plane.
///
/// The plane is the set of points `x` where `normal.dot(x) == offset`.
/// The side the normal points to is considered outside.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    normal: Unit<m::Vec3>,
    offset: f32,
}

impl Plane {
    /// Create a plane from a normal and its distance from the origin along the normal.
    pub fn new(normal: Unit<m::Vec3>, offset: f32) -> Self {
        Plane { normal, offset }
    }

    /// Create a plane that passes through `point`.
    pub fn from_point_normal(point: m::Vec3, normal: Unit<m::Vec3>) -> Self {
        Plane {
            normal,
            offset: normal.dot(point),
        }
    }

    #[inline]
    pub fn normal(&self) -> Unit<m::Vec3> {
        self.normal
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Distance of a point from the plane, negative behind it.
    #[inline]
    pub fn signed_distance(&self, point: m::Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }
}
