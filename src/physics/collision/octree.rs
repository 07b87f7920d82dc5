//! A fixed-depth octree for pruning sphere pair tests.
//!
//! The tree is built once with a fixed topology and then refilled every tick:
//! [`clear`][Octree::clear] empties the leaves, [`insert`][Octree::insert] puts
//! every live particle back, and [`resolve_collisions`][Octree::resolve_collisions]
//! tests the particles sharing each leaf against each other.
//!
//! Octants are indexed with a 3-bit code, one bit per axis:
//! bit 0 is set for the +X half, bit 1 for +Y and bit 2 for +Z.
//! Children of an interior node are always stored in this index order.
//!
//! A particle whose sphere crosses a split plane goes into every octant it touches,
//! so one particle can live in several leaves at once. Two overlapping spheres
//! always share at least one leaf.

use super::{
    broadphase::{resolve_sphere_pair, BroadPhase},
    CollisionResolver, Sphere,
};
use crate::{
    math::{self as m, AXES},
    physics::{ParticleKey, ParticleSet, TickCounters},
};

use itertools::Itertools;

/// A node of the octree, either splitting space into eight children or holding particles.
#[derive(Clone, Debug)]
pub enum Octree {
    Interior {
        /// The point where this node splits space into octants.
        center: m::Vec3,
        children: Box<[Octree; 8]>,
    },
    Leaf(Vec<ParticleKey>),
}

/// Summary of how particles are distributed in the leaves of an octree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub leaves: usize,
    pub occupied_leaves: usize,
    /// Total number of particle references, counting every leaf a particle is in.
    pub entries: usize,
    pub max_leaf_len: usize,
}

impl Octree {
    /// Create an octree with `depth` levels of interior nodes.
    ///
    /// `half_width` is the distance from `center` to the edge of the root node
    /// and is only used to place the children's centers.
    /// Depth 0 creates a single leaf.
    pub fn new(center: m::Vec3, half_width: f32, depth: u32) -> Self {
        if depth == 0 {
            return Octree::Leaf(Vec::new());
        }
        let hw = half_width / 2.0;
        let children = std::array::from_fn(|octant| {
            let mut offset = m::Vec3::zero();
            for axis in AXES {
                let sign = if octant & axis.bit() != 0 { 1.0 } else { -1.0 };
                offset += axis.unit() * (sign * hw);
            }
            Octree::new(center + offset, hw, depth - 1)
        });
        Octree::Interior {
            center,
            children: Box::new(children),
        }
    }

    /// The split point of the root, or `None` if the whole tree is a single leaf.
    pub fn center(&self) -> Option<m::Vec3> {
        match self {
            Octree::Interior { center, .. } => Some(*center),
            Octree::Leaf(_) => None,
        }
    }

    /// Number of interior levels below this node.
    pub fn depth(&self) -> u32 {
        let mut depth = 0;
        let mut node = self;
        while let Octree::Interior { children, .. } = node {
            depth += 1;
            node = &children[0];
        }
        depth
    }

    /// Insert a particle into every leaf its sphere overlaps.
    ///
    /// Inserting the same key twice stores it twice.
    /// It is never paired with itself during resolution.
    pub fn insert(&mut self, key: ParticleKey, sphere: &Sphere) {
        match self {
            Octree::Leaf(keys) => keys.push(key),
            Octree::Interior { center, children } => {
                let mut base_zone = 0;
                let mut spill = 0;
                for axis in AXES {
                    let c = m::component(sphere.center, axis);
                    let split = m::component(*center, axis);
                    if c >= split {
                        base_zone |= axis.bit();
                    }
                    // the sphere reaches across the split plane into the neighboring octant
                    if (c - split).abs() < sphere.radius {
                        spill |= axis.bit();
                    }
                }

                children[base_zone].insert(key, sphere);
                if spill == 0 {
                    return;
                }
                // every nonempty combination of crossed axes is another octant touched,
                // including the diagonal ones
                for crossed in 1..8 {
                    if spill & crossed == crossed {
                        children[base_zone ^ crossed].insert(key, sphere);
                    }
                }
            }
        }
    }

    /// Remove every particle from the tree, keeping its structure.
    pub fn clear(&mut self) {
        match self {
            Octree::Interior { children, .. } => {
                for child in children.iter_mut() {
                    child.clear();
                }
            }
            Octree::Leaf(keys) => keys.clear(),
        }
    }

    /// Clear the tree and insert every particle in the set.
    pub fn rebuild(&mut self, particles: &ParticleSet) {
        let _span = tracy_span!("rebuild octree", "rebuild");
        self.clear();
        for (key, sphere) in particles.iter() {
            self.insert(key, sphere);
        }
    }

    /// Run the resolver on every pair of particles that share a leaf.
    ///
    /// A pair sharing several leaves is resolved once per shared leaf.
    ///
    /// # Panics
    ///
    /// Panics if a particle in the tree has been removed from `particles`
    /// since it was inserted.
    pub fn resolve_collisions<R: CollisionResolver + ?Sized>(
        &self,
        particles: &mut ParticleSet,
        resolver: &mut R,
        counters: &mut TickCounters,
    ) {
        let _span = tracy_span!("resolve octree", "resolve_collisions");

        // gather in parallel, then resolve sequentially
        // because a particle may be in several leaves at once
        #[cfg(feature = "parallel")]
        {
            for pair in self.candidate_pairs() {
                resolve_sphere_pair(particles, pair, resolver, counters);
            }
        }

        #[cfg(not(feature = "parallel"))]
        self.resolve_node(particles, resolver, counters);
    }

    #[cfg(not(feature = "parallel"))]
    fn resolve_node<R: CollisionResolver + ?Sized>(
        &self,
        particles: &mut ParticleSet,
        resolver: &mut R,
        counters: &mut TickCounters,
    ) {
        match self {
            Octree::Interior { children, .. } => {
                for child in children.iter() {
                    child.resolve_node(particles, resolver, counters);
                }
            }
            Octree::Leaf(keys) => {
                for pair in leaf_pairs(keys) {
                    resolve_sphere_pair(particles, pair, resolver, counters);
                }
            }
        }
    }

    /// Every pair of particles that share a leaf, in leaf order,
    /// listed once for each leaf the pair shares.
    #[cfg(not(feature = "parallel"))]
    pub fn candidate_pairs(&self) -> Vec<[ParticleKey; 2]> {
        self.leaves().flat_map(leaf_pairs).collect()
    }

    /// Every pair of particles that share a leaf, in leaf order,
    /// listed once for each leaf the pair shares.
    #[cfg(feature = "parallel")]
    pub fn candidate_pairs(&self) -> Vec<[ParticleKey; 2]> {
        use rayon::prelude::*;

        let leaves: Vec<&[ParticleKey]> = self.leaves().collect();
        leaves.into_par_iter().flat_map_iter(leaf_pairs).collect()
    }

    /// Iterate over the contents of every leaf in depth-first octant order.
    ///
    /// For a tree of depth 1 the position of a leaf in this iterator
    /// is its octant index.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Octree::Interior { children, .. } => children.iter().map(Octree::leaf_count).sum(),
            Octree::Leaf(_) => 1,
        }
    }

    pub fn interior_count(&self) -> usize {
        match self {
            Octree::Interior { children, .. } => {
                1 + children.iter().map(Octree::interior_count).sum::<usize>()
            }
            Octree::Leaf(_) => 0,
        }
    }

    /// Compute occupancy statistics of the leaves.
    pub fn stats(&self) -> OctreeStats {
        self.leaves()
            .fold(OctreeStats::default(), |mut stats, leaf| {
                stats.leaves += 1;
                if !leaf.is_empty() {
                    stats.occupied_leaves += 1;
                }
                stats.entries += leaf.len();
                stats.max_leaf_len = stats.max_leaf_len.max(leaf.len());
                stats
            })
    }
}

fn leaf_pairs(leaf: &[ParticleKey]) -> impl '_ + Iterator<Item = [ParticleKey; 2]> {
    leaf.iter()
        .tuple_combinations()
        .filter(|(a, b)| a != b)
        .map(|(&a, &b)| [a, b])
}

impl BroadPhase for Octree {
    fn resolve_spheres<R: CollisionResolver + ?Sized>(
        &mut self,
        particles: &mut ParticleSet,
        resolver: &mut R,
        counters: &mut TickCounters,
    ) {
        self.rebuild(particles);
        self.resolve_collisions(particles, resolver, counters);
    }
}

/// Iterator over the leaves of an [`Octree`][self::Octree].
pub struct Leaves<'a> {
    stack: Vec<&'a Octree>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a [ParticleKey];

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Octree::Interior { children, .. } => {
                    // reversed so that octant 0 is popped first
                    self.stack.extend(children.iter().rev());
                }
                Octree::Leaf(keys) => return Some(keys.as_slice()),
            }
        }
        None
    }
}
