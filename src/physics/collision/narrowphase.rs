//! Exact intersection tests between pairs of shapes.

use super::{Plane, Sphere};
use crate::math::{self as m, Unit};

/// below this center distance two spheres are treated as coincident
const COINCIDENT_DIST_SQ: f32 = 1e-8;

/// An intersection between two objects.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// The normal, facing away from the first object
    pub normal: Unit<m::Vec3>,
    /// Penetration depth
    pub depth: f32,
    /// Point of contact on the surface of the first object, in world space
    pub point: m::Vec3,
}

/// Check two spheres for intersection.
pub fn sphere_sphere(s1: &Sphere, s2: &Sphere) -> Option<Contact> {
    let r_sum = s1.radius + s2.radius;
    let dist = s2.center - s1.center;
    let dist_sq = dist.mag_sq();

    let depth;
    let normal;
    if dist_sq >= r_sum * r_sum {
        return None;
    } else if dist_sq < COINCIDENT_DIST_SQ {
        // same position, consider penetration to be on x axis
        depth = r_sum;
        normal = Unit::unit_x();
    } else {
        depth = r_sum - dist_sq.sqrt();
        normal = Unit::new_normalize(dist);
    }

    Some(Contact {
        normal,
        depth,
        point: s1.center + s1.radius * *normal,
    })
}

/// Check a sphere against a plane.
///
/// The normal of the contact faces from the sphere into the plane,
/// i.e. it is the plane's normal flipped.
pub fn sphere_plane(sphere: &Sphere, plane: &Plane) -> Option<Contact> {
    let depth = -sphere.plane_distance(plane);
    if depth <= 0.0 {
        return None;
    }
    let normal = -plane.normal();
    Some(Contact {
        normal,
        depth,
        point: sphere.center + sphere.radius * *normal,
    })
}
