//! Broad phase collision detection for simulations of moving spheres.
//!
//! Every tick a [`World`] hands candidate pairs of particles to a
//! [`CollisionResolver`], using either brute force or a fixed-depth [`Octree`]
//! depending on the [`BroadPhaseMode`] in the [`TickContext`].

// profiling spans that compile to nothing without the `tracy` feature
macro_rules! tracy_span {
    ($name:literal, $fn_name:literal) => {{
        #[cfg(feature = "tracy")]
        let span = tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0));
        #[cfg(not(feature = "tracy"))]
        let span = ();
        span
    }};
}

pub mod math;
pub use math::{uv, Axis, Unit, Vec3};

pub mod physics;
pub use physics::{
    collision::{
        self, narrowphase, resolve_planes, BroadPhase, BruteForce, CollisionResolver, Contact,
        ImpulseParams, ImpulseResolver, Octree, OctreeStats, ParticleMut, Plane, Sphere,
    },
    forcefield::{self, ForceField},
    BroadPhaseMode, ParamsError, ParticleKey, ParticleSet, TickContext, TickCounters, World,
    WorldParams, MAX_OCTREE_DEPTH,
};
