pub mod broadphase;
pub use broadphase::{resolve_planes, BroadPhase, BruteForce};

mod collider;
pub use collider::{Plane, Sphere};

pub mod narrowphase;
pub use narrowphase::Contact;

pub mod octree;
pub use octree::{Octree, OctreeStats};

pub mod resolver;
pub use resolver::{CollisionResolver, ImpulseParams, ImpulseResolver, ParticleMut};
