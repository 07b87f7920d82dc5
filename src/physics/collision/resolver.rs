//! Collision resolvers decide what happens when the broad phase
//! hands them a pair of shapes that might be touching.

use super::{narrowphase, Plane, Sphere};
use crate::physics::{ParamsError, ParticleKey};

use std::collections::HashSet;

/// A particle handed to a resolver, along with the key it's stored under.
#[derive(Debug)]
pub struct ParticleMut<'a> {
    pub key: ParticleKey,
    pub sphere: &'a mut Sphere,
}

/// Something that checks a pair of shapes for contact and responds to it.
///
/// Broad phases call these for every candidate pair they find.
/// Every call counts as one collision check, whether or not anything was touching.
pub trait CollisionResolver {
    /// Called once at the start of every tick, before any checks.
    ///
    /// A pair of spheres sharing several octree leaves is handed over once per
    /// shared leaf, so resolvers that move things should use this to forget
    /// which pairs they have already handled.
    fn begin_tick(&mut self) {}
    /// Check and resolve a pair of spheres. Returns `true` if they were in contact.
    fn sphere_sphere(&mut self, a: ParticleMut<'_>, b: ParticleMut<'_>) -> bool;
    /// Check and resolve a sphere against a static plane. Returns `true` if they were in contact.
    fn sphere_plane(&mut self, sphere: ParticleMut<'_>, plane: &Plane) -> bool;
}

impl<R: CollisionResolver + ?Sized> CollisionResolver for &mut R {
    fn begin_tick(&mut self) {
        (**self).begin_tick()
    }

    fn sphere_sphere(&mut self, a: ParticleMut<'_>, b: ParticleMut<'_>) -> bool {
        (**self).sphere_sphere(a, b)
    }

    fn sphere_plane(&mut self, sphere: ParticleMut<'_>, plane: &Plane) -> bool {
        (**self).sphere_plane(sphere, plane)
    }
}

/// Parameters of an [`ImpulseResolver`][self::ImpulseResolver].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct ImpulseParams {
    /// Coefficient of restitution. 0 makes collisions perfectly inelastic, 1 perfectly elastic.
    pub restitution: f32,
    /// Fraction of the penetration depth removed by moving the spheres apart, between 0 and 1.
    pub position_correction: f32,
}

impl Default for ImpulseParams {
    fn default() -> Self {
        Self {
            restitution: 0.8,
            position_correction: 1.0,
        }
    }
}

/// A resolver that bounces spheres off each other and off planes with normal impulses.
///
/// Each pair of spheres is resolved at most once per tick.
/// Repeated calls for a pair already in contact this tick do nothing and report no contact,
/// so both broad phase modes produce the same motion.
///
/// Friction and rotation are not modeled.
#[derive(Clone, Debug, Default)]
pub struct ImpulseResolver {
    params: ImpulseParams,
    resolved: HashSet<[ParticleKey; 2]>,
}

impl ImpulseResolver {
    /// Create a resolver, checking that the params are in range.
    pub fn new(params: ImpulseParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self {
            params,
            resolved: HashSet::new(),
        })
    }

    #[inline]
    pub fn params(&self) -> &ImpulseParams {
        &self.params
    }
}

impl CollisionResolver for ImpulseResolver {
    fn begin_tick(&mut self) {
        self.resolved.clear();
    }

    fn sphere_sphere(&mut self, a: ParticleMut<'_>, b: ParticleMut<'_>) -> bool {
        let pair = ParticleKey::ordered_pair(a.key, b.key);
        if self.resolved.contains(&pair) {
            return false;
        }
        let (s1, s2) = (a.sphere, b.sphere);
        let contact = match narrowphase::sphere_sphere(s1, s2) {
            Some(c) => c,
            None => return false,
        };
        self.resolved.insert(pair);
        let inv_masses = [s1.inverse_mass(), s2.inverse_mass()];
        let inv_mass_sum = inv_masses[0] + inv_masses[1];
        if inv_mass_sum == 0.0 {
            // two immovable things touching, nothing to do but still a contact
            return true;
        }
        let n = *contact.normal;

        let correction = contact.depth * self.params.position_correction / inv_mass_sum;
        s1.center -= n * (correction * inv_masses[0]);
        s2.center += n * (correction * inv_masses[1]);

        // separating pairs are left alone
        let approach_vel = (s1.velocity - s2.velocity).dot(n);
        if approach_vel > 0.0 {
            let impulse = (1.0 + self.params.restitution) * approach_vel / inv_mass_sum;
            s1.velocity -= n * (impulse * inv_masses[0]);
            s2.velocity += n * (impulse * inv_masses[1]);
        }
        true
    }

    fn sphere_plane(&mut self, sphere: ParticleMut<'_>, plane: &Plane) -> bool {
        let s = sphere.sphere;
        let contact = match narrowphase::sphere_plane(s, plane) {
            Some(c) => c,
            None => return false,
        };
        if s.inverse_mass() == 0.0 {
            return true;
        }
        let n = *contact.normal;
        s.center -= n * (contact.depth * self.params.position_correction);

        let approach_vel = s.velocity.dot(n);
        if approach_vel > 0.0 {
            s.velocity -= n * ((1.0 + self.params.restitution) * approach_vel);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::{self as m, Unit},
        physics::ParticleSet,
    };

    fn resolve_pair(resolver: &mut ImpulseResolver, s1: Sphere, s2: Sphere) -> (bool, Sphere, Sphere) {
        let mut set = ParticleSet::new();
        let k1 = set.insert(s1);
        let k2 = set.insert(s2);
        let touched = match set.get2_mut(k1, k2) {
            (Some(a), Some(b)) => resolver.sphere_sphere(
                ParticleMut { key: k1, sphere: a },
                ParticleMut { key: k2, sphere: b },
            ),
            _ => unreachable!(),
        };
        (touched, *set.get(k1).unwrap(), *set.get(k2).unwrap())
    }

    #[test]
    fn head_on_elastic_swap() {
        let mut resolver = ImpulseResolver::new(ImpulseParams {
            restitution: 1.0,
            position_correction: 1.0,
        })
        .expect("valid params");
        let (touched, a, b) = resolve_pair(
            &mut resolver,
            Sphere::new(m::Vec3::new(-0.45, 0.0, 0.0), 0.5).with_velocity(m::Vec3::unit_x()),
            Sphere::new(m::Vec3::new(0.45, 0.0, 0.0), 0.5).with_velocity(-m::Vec3::unit_x()),
        );
        assert!(touched);
        // equal masses exchange velocities in an elastic collision
        assert!((a.velocity + m::Vec3::unit_x()).mag() < 1e-5);
        assert!((b.velocity - m::Vec3::unit_x()).mag() < 1e-5);
        // and get pushed out of each other
        assert!((b.center - a.center).mag() > 0.9999);
    }

    #[test]
    fn separating_pair_keeps_velocity() {
        let mut resolver = ImpulseResolver::default();
        let (touched, a, b) = resolve_pair(
            &mut resolver,
            Sphere::new(m::Vec3::new(-0.45, 0.0, 0.0), 0.5).with_velocity(-m::Vec3::unit_x()),
            Sphere::new(m::Vec3::new(0.45, 0.0, 0.0), 0.5).with_velocity(m::Vec3::unit_x()),
        );
        assert!(touched);
        assert_eq!(a.velocity, -m::Vec3::unit_x());
        assert_eq!(b.velocity, m::Vec3::unit_x());
    }

    #[test]
    fn miss_is_a_no_op() {
        let mut resolver = ImpulseResolver::default();
        let s1 = Sphere::new(m::Vec3::zero(), 0.5).with_velocity(m::Vec3::unit_x());
        let s2 = Sphere::new(m::Vec3::new(3.0, 0.0, 0.0), 0.5);
        let (touched, a, b) = resolve_pair(&mut resolver, s1, s2);
        assert!(!touched);
        assert_eq!(a, s1);
        assert_eq!(b, s2);
    }

    #[test]
    fn out_of_range_params_are_rejected() {
        let bad = ImpulseParams {
            restitution: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            ImpulseResolver::new(bad),
            Err(ParamsError::InvalidRestitution(_))
        ));
        assert!(ImpulseResolver::new(ImpulseParams::default()).is_ok());
    }

    #[test]
    fn pair_resolved_once_per_tick() {
        let mut resolver = ImpulseResolver::new(ImpulseParams {
            restitution: 0.5,
            position_correction: 0.5,
        })
        .expect("valid params");
        let mut set = ParticleSet::new();
        let k1 = set.insert(Sphere::new(m::Vec3::new(-0.15, 0.0, 0.0), 0.2));
        let k2 = set.insert(Sphere::new(m::Vec3::new(0.15, 0.0, 0.0), 0.2));

        let check = |resolver: &mut ImpulseResolver, set: &mut ParticleSet| {
            let (a, b) = set.get2_mut(k2, k1);
            resolver.sphere_sphere(
                ParticleMut { key: k2, sphere: a.unwrap() },
                ParticleMut { key: k1, sphere: b.unwrap() },
            )
        };

        resolver.begin_tick();
        assert!(check(&mut resolver, &mut set));
        let after_first = (*set.get(k1).unwrap(), *set.get(k2).unwrap());
        // half the penetration is left, but the pair was already handled
        assert!(!check(&mut resolver, &mut set));
        assert_eq!((*set.get(k1).unwrap(), *set.get(k2).unwrap()), after_first);

        resolver.begin_tick();
        assert!(check(&mut resolver, &mut set));
        assert!(set.get(k2).unwrap().center.x > after_first.1.center.x);
    }

    #[test]
    fn bounce_off_floor() {
        let mut resolver = ImpulseResolver::new(ImpulseParams {
            restitution: 0.5,
            position_correction: 1.0,
        })
        .expect("valid params");
        let floor = Plane::new(Unit::unit_y(), 0.0);
        let mut set = ParticleSet::new();
        let key = set.insert(
            Sphere::new(m::Vec3::new(0.0, 0.9, 0.0), 1.0).with_velocity(m::Vec3::new(1.0, -2.0, 0.0)),
        );
        let sphere = set.get_mut(key).unwrap();
        assert!(resolver.sphere_plane(ParticleMut { key, sphere }, &floor));

        let s = set.get(key).unwrap();
        assert!((s.center.y - 1.0).abs() < 1e-5);
        assert!((s.velocity - m::Vec3::new(1.0, 1.0, 0.0)).mag() < 1e-5);
    }
}
