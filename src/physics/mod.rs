pub mod collision;
pub use collision::{
    BroadPhase, BruteForce, CollisionResolver, ImpulseResolver, Octree, Plane, Sphere,
};

pub mod forcefield;
pub use forcefield::ForceField;

mod params;
pub use params::{ParamsError, WorldParams, MAX_OCTREE_DEPTH};

mod particle_set;
pub use particle_set::{ParticleKey, ParticleSet};

/// Which broad phase algorithm runs on a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(rename_all = "lowercase"))]
pub enum BroadPhaseMode {
    /// Test every pair of particles.
    #[default]
    Baseline,
    /// Rebuild the octree and test only particles sharing a leaf.
    Partitioned,
}

impl BroadPhaseMode {
    /// The other mode.
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            BroadPhaseMode::Baseline => BroadPhaseMode::Partitioned,
            BroadPhaseMode::Partitioned => BroadPhaseMode::Baseline,
        }
    }
}

impl std::fmt::Display for BroadPhaseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BroadPhaseMode::Baseline => "baseline",
            BroadPhaseMode::Partitioned => "partitioned",
        })
    }
}

impl std::str::FromStr for BroadPhaseMode {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "brute-force" | "bruteforce" => Ok(BroadPhaseMode::Baseline),
            "partitioned" | "octree" => Ok(BroadPhaseMode::Partitioned),
            _ => Err(ParamsError::UnknownMode(s.to_string())),
        }
    }
}

/// Diagnostic counts for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickCounters {
    /// Number of times a resolver was called.
    pub collision_checks: usize,
    /// Number of resolver calls that reported a contact.
    pub contacts: usize,
}

impl TickCounters {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub(crate) fn record_check(&mut self, contact: bool) {
        self.collision_checks += 1;
        if contact {
            self.contacts += 1;
        }
    }
}

/// State owned by whoever drives the simulation and passed into every tick:
/// the active broad phase mode and the counters of the latest tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickContext {
    pub mode: BroadPhaseMode,
    pub counters: TickCounters,
}

impl TickContext {
    pub fn new(mode: BroadPhaseMode) -> Self {
        Self {
            mode,
            counters: TickCounters::default(),
        }
    }

    /// Switch to the other broad phase, returning the new mode.
    pub fn toggle_mode(&mut self) -> BroadPhaseMode {
        self.mode = self.mode.toggled();
        log::debug!("Broad phase mode switched to {}", self.mode);
        self.mode
    }
}

/// A particle simulation: the live particles, the static planes
/// and the octree used to speed up collision detection between particles.
pub struct World {
    pub particles: ParticleSet,
    pub planes: Vec<Plane>,
    octree: Octree,
    octree_filled: bool,
    params: WorldParams,
}

impl World {
    pub fn new(params: WorldParams) -> Result<Self, ParamsError> {
        params.validate()?;
        let octree = Octree::new(
            params.bounds_center,
            params.bounds_half_width,
            params.octree_depth,
        );
        log::debug!(
            "Created world with octree depth {} ({} leaves) around {:?}",
            params.octree_depth,
            octree.leaf_count(),
            params.bounds_center,
        );
        Ok(Self {
            particles: ParticleSet::with_capacity(params.initial_capacity),
            planes: Vec::new(),
            octree,
            octree_filled: false,
            params,
        })
    }

    /// A tick context starting in the mode given in this world's params.
    pub fn context(&self) -> TickContext {
        TickContext::new(self.params.initial_mode)
    }

    #[inline]
    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// The octree as it was filled on the latest tick.
    ///
    /// Empty after a baseline tick, since that doesn't use the tree.
    #[inline]
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Add a static plane to the world.
    pub fn add_plane(&mut self, plane: Plane) {
        self.planes.push(plane);
    }

    /// Detect and resolve every collision in the world with the context's broad phase.
    ///
    /// Planes are always checked against every particle regardless of mode.
    pub fn tick<R: CollisionResolver + ?Sized>(&mut self, ctx: &mut TickContext, resolver: &mut R) {
        let _span = tracy_span!("collision tick", "tick");
        ctx.counters.reset();
        resolver.begin_tick();

        match ctx.mode {
            BroadPhaseMode::Baseline => {
                if self.octree_filled {
                    self.octree.clear();
                    self.octree_filled = false;
                }
                BruteForce.resolve_spheres(&mut self.particles, resolver, &mut ctx.counters)
            }
            BroadPhaseMode::Partitioned => {
                self.octree
                    .resolve_spheres(&mut self.particles, resolver, &mut ctx.counters);
                self.octree_filled = true;
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!("Octree occupancy: {:?}", self.octree.stats());
                }
            }
        }
        collision::resolve_planes(&mut self.particles, &self.planes, resolver, &mut ctx.counters);

        log::trace!(
            "{} tick: {} particles, {} checks, {} contacts",
            ctx.mode,
            self.particles.len(),
            ctx.counters.collision_checks,
            ctx.counters.contacts,
        );
    }

    /// Move particles forward by `dt` seconds and then resolve collisions.
    ///
    /// Uses semi-implicit Euler integration: velocity is updated first
    /// and the new velocity is used to move the particle.
    pub fn step<R: CollisionResolver + ?Sized>(
        &mut self,
        dt: f32,
        forcefield: &impl ForceField,
        ctx: &mut TickContext,
        resolver: &mut R,
    ) {
        let _span = tracy_span!("integrate", "step");
        for (_, p) in self.particles.iter_mut() {
            if p.inverse_mass() == 0.0 {
                continue;
            }
            p.velocity += forcefield.value_at(p.center) * dt;
            p.center += p.velocity * dt;
        }
        self.tick(ctx, resolver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{self as m, Unit};
    use collision::{broadphase::RecordingResolver, ImpulseParams};

    fn world_with(mode: BroadPhaseMode) -> World {
        let params = WorldParams::default()
            .with_bounds(m::Vec3::zero(), 2.0)
            .with_octree_depth(1)
            .with_initial_mode(mode);
        World::new(params).expect("valid params")
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("Octree".parse::<BroadPhaseMode>(), Ok(BroadPhaseMode::Partitioned));
        assert_eq!(" baseline ".parse::<BroadPhaseMode>(), Ok(BroadPhaseMode::Baseline));
        assert_eq!(
            "sideways".parse::<BroadPhaseMode>(),
            Err(ParamsError::UnknownMode("sideways".to_string()))
        );
        for mode in [BroadPhaseMode::Baseline, BroadPhaseMode::Partitioned] {
            assert_eq!(mode.to_string().parse::<BroadPhaseMode>(), Ok(mode));
        }
    }

    #[test]
    fn toggling_switches_paths() {
        let mut world = world_with(BroadPhaseMode::Baseline);
        world.particles.insert(Sphere::new(m::Vec3::new(0.5, 0.5, 0.5), 0.1));
        world.particles.insert(Sphere::new(m::Vec3::new(-0.5, 0.5, 0.5), 0.1));
        world.particles.insert(Sphere::new(m::Vec3::new(-0.5, -0.5, 0.5), 0.1));

        let mut ctx = world.context();
        let mut resolver = RecordingResolver::default();
        world.tick(&mut ctx, &mut resolver);
        assert_eq!(ctx.counters.collision_checks, 3);
        // baseline doesn't touch the tree
        assert_eq!(world.octree().stats().entries, 0);

        assert_eq!(ctx.toggle_mode(), BroadPhaseMode::Partitioned);
        world.tick(&mut ctx, &mut resolver);
        // all in different octants
        assert_eq!(ctx.counters.collision_checks, 0);
        assert_eq!(world.octree().stats().entries, 3);

        assert_eq!(ctx.toggle_mode(), BroadPhaseMode::Baseline);
        world.tick(&mut ctx, &mut resolver);
        assert_eq!(ctx.counters.collision_checks, 3);
        // no leftovers from the partitioned tick
        assert_eq!(world.octree().stats().entries, 0);
    }

    #[test]
    fn counters_reset_every_tick() {
        let mut world = world_with(BroadPhaseMode::Partitioned);
        world.add_plane(Plane::new(Unit::unit_y(), -5.0));
        let a = world.particles.insert(Sphere::new(m::Vec3::new(0.5, 0.5, 0.5), 0.3));
        world.particles.insert(Sphere::new(m::Vec3::new(0.7, 0.5, 0.5), 0.3));

        let mut ctx = world.context();
        let mut resolver = RecordingResolver::default();
        world.tick(&mut ctx, &mut resolver);
        // one pair plus two plane checks
        assert_eq!(ctx.counters.collision_checks, 3);
        assert_eq!(ctx.counters.contacts, 1);

        world.particles.remove(a);
        world.tick(&mut ctx, &mut resolver);
        assert_eq!(ctx.counters.collision_checks, 1);
        assert_eq!(ctx.counters.contacts, 0);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = WorldParams::default().with_octree_depth(MAX_OCTREE_DEPTH + 3);
        assert!(matches!(
            World::new(params),
            Err(ParamsError::DepthTooLarge { .. })
        ));
    }

    #[test]
    fn falling_spheres_come_to_rest_on_floor() {
        for mode in [BroadPhaseMode::Baseline, BroadPhaseMode::Partitioned] {
            let mut world = world_with(mode);
            world.add_plane(Plane::new(Unit::unit_y(), -1.0));
            for i in 0..4 {
                let x = i as f32 * 0.5 - 0.75;
                world.particles.insert(Sphere::new(m::Vec3::new(x, 1.0, 0.0), 0.2));
            }
            let mut resolver = ImpulseResolver::new(ImpulseParams {
                restitution: 0.0,
                position_correction: 1.0,
            })
            .expect("valid params");
            let mut ctx = world.context();
            let gravity = forcefield::Gravity(m::Vec3::new(0.0, -9.81, 0.0));
            for _ in 0..240 {
                world.step(1.0 / 60.0, &gravity, &mut ctx, &mut resolver);
            }
            for (_, s) in world.particles.iter() {
                assert!((s.center.y + 0.8).abs() < 0.05, "{:?} in {} mode", s.center, mode);
            }
        }
    }

    #[test]
    fn both_modes_move_spheres_the_same() {
        let mut results = Vec::new();
        for mode in [BroadPhaseMode::Baseline, BroadPhaseMode::Partitioned] {
            let mut world = world_with(mode);
            // straddling the x split, so they share leaves 0 and 1
            let a = world.particles.insert(Sphere::new(m::Vec3::new(-0.15, -0.5, -0.5), 0.2));
            let b = world.particles.insert(Sphere::new(m::Vec3::new(0.15, -0.5, -0.5), 0.2));
            let mut resolver = ImpulseResolver::new(ImpulseParams {
                restitution: 0.5,
                position_correction: 0.5,
            })
            .expect("valid params");
            let mut ctx = world.context();
            for _ in 0..3 {
                world.tick(&mut ctx, &mut resolver);
            }
            let centers = [
                world.particles.get(a).unwrap().center,
                world.particles.get(b).unwrap().center,
            ];
            results.push((centers, ctx.counters.contacts));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0].1, 1);
    }

    #[test]
    fn both_modes_agree_on_contacts() {
        let spheres: Vec<Sphere> = (0..40)
            .map(|i| {
                let t = i as f32 * 0.37;
                Sphere::new(m::Vec3::new(t.sin() * 1.5, t.cos() * 1.5, (t * 0.5).sin()), 0.3)
            })
            .collect();

        let mut contacts = Vec::new();
        for mode in [BroadPhaseMode::Baseline, BroadPhaseMode::Partitioned] {
            let mut world = world_with(mode);
            for s in &spheres {
                world.particles.insert(*s);
            }
            let mut resolver = RecordingResolver::default();
            let mut ctx = world.context();
            world.tick(&mut ctx, &mut resolver);
            let mut touching: Vec<_> = resolver
                .sphere_pairs
                .iter()
                .copied()
                .filter(|[a, b]| {
                    world.particles.get(*a).unwrap().overlaps(world.particles.get(*b).unwrap())
                })
                .collect();
            touching.sort_by_key(|[a, b]| (a.index().to_bits(), b.index().to_bits()));
            touching.dedup();
            contacts.push(touching);
        }
        assert!(!contacts[0].is_empty());
        assert_eq!(contacts[0], contacts[1]);
    }
}
