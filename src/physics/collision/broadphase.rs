//! Broad phase collision detection algorithms
//! are responsible for detecting pairs of possibly intersecting objects
//! and handing them to a resolver for an exact check.

use super::{resolver::ParticleMut, CollisionResolver, Plane};
use crate::physics::{ParticleKey, ParticleSet, TickCounters};

use itertools::Itertools;

const STALE_KEY_ERR: &str = "Broad phase produced a particle that no longer exists";

/// A broad phase algorithm for sphere-sphere pairs.
///
/// Planes are never part of a broad phase structure,
/// see [`resolve_planes`][self::resolve_planes] for those.
pub trait BroadPhase {
    /// Find pairs of potentially intersecting spheres and run the resolver on each.
    fn resolve_spheres<R: CollisionResolver + ?Sized>(
        &mut self,
        particles: &mut ParticleSet,
        resolver: &mut R,
        counters: &mut TickCounters,
    );
}

/// The simplest possible broad phase algorithm,
/// which pairs every particle with every other particle.
/// Very inefficient, but never misses anything,
/// which makes it the reference other broad phases are checked against.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl BruteForce {
    /// Every unordered pair of particles in the set.
    pub fn pairs(particles: &ParticleSet) -> Vec<[ParticleKey; 2]> {
        let keys: Vec<ParticleKey> = particles.keys().collect();
        keys.iter()
            .tuple_combinations()
            .map(|(&a, &b)| [a, b])
            .collect()
    }
}

impl BroadPhase for BruteForce {
    fn resolve_spheres<R: CollisionResolver + ?Sized>(
        &mut self,
        particles: &mut ParticleSet,
        resolver: &mut R,
        counters: &mut TickCounters,
    ) {
        let _span = tracy_span!("brute force spheres", "resolve_spheres");
        for pair in Self::pairs(particles) {
            resolve_sphere_pair(particles, pair, resolver, counters);
        }
    }
}

/// Run the resolver on every particle against every plane.
pub fn resolve_planes<R: CollisionResolver + ?Sized>(
    particles: &mut ParticleSet,
    planes: &[Plane],
    resolver: &mut R,
    counters: &mut TickCounters,
) {
    let _span = tracy_span!("brute force planes", "resolve_planes");
    for (key, sphere) in particles.iter_mut() {
        for plane in planes {
            let contact = resolver.sphere_plane(ParticleMut { key, sphere }, plane);
            counters.record_check(contact);
        }
    }
}

pub(crate) fn resolve_sphere_pair<R: CollisionResolver + ?Sized>(
    particles: &mut ParticleSet,
    [a, b]: [ParticleKey; 2],
    resolver: &mut R,
    counters: &mut TickCounters,
) {
    let (sphere_a, sphere_b) = particles.get2_mut(a, b);
    let contact = resolver.sphere_sphere(
        ParticleMut {
            key: a,
            sphere: sphere_a.expect(STALE_KEY_ERR),
        },
        ParticleMut {
            key: b,
            sphere: sphere_b.expect(STALE_KEY_ERR),
        },
    );
    counters.record_check(contact);
}

/// Resolver that only writes down what it was asked to check.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingResolver {
    pub sphere_pairs: Vec<[ParticleKey; 2]>,
    pub plane_checks: Vec<(ParticleKey, Plane)>,
}

#[cfg(test)]
impl CollisionResolver for RecordingResolver {
    fn sphere_sphere(&mut self, a: ParticleMut<'_>, b: ParticleMut<'_>) -> bool {
        self.sphere_pairs.push(ParticleKey::ordered_pair(a.key, b.key));
        a.sphere.overlaps(b.sphere)
    }

    fn sphere_plane(&mut self, sphere: ParticleMut<'_>, plane: &Plane) -> bool {
        self.plane_checks.push((sphere.key, *plane));
        sphere.sphere.plane_distance(plane) < 0.0
    }
}
