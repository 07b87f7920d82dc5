use super::Sphere;

use thunderdome as td;

/// Key type to look up a particle stored in a [`ParticleSet`][self::ParticleSet].
///
/// This is what spatial structures hold instead of the particles themselves,
/// so the same particle can be referenced from several places at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleKey(pub(crate) td::Index);

impl ParticleKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from particles to other things
    /// such as render objects.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }

    /// Order two keys so that unordered pairs have a single representation.
    #[inline]
    pub fn ordered_pair(a: ParticleKey, b: ParticleKey) -> [ParticleKey; 2] {
        if a.0.to_bits() <= b.0.to_bits() {
            [a, b]
        } else {
            [b, a]
        }
    }
}

impl std::hash::Hash for ParticleKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// The live particles of a simulation.
///
/// Particles are added and removed between ticks by whatever spawns them;
/// the broad phase only reads the set and mutates the particles through resolvers.
#[derive(Default)]
pub struct ParticleSet {
    particles: td::Arena<Sphere>,
}

impl ParticleSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate space for at least `capacity` particles.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: td::Arena::with_capacity(capacity),
        }
    }

    /// Insert a particle, returning a key that can be used to access it.
    #[inline]
    pub fn insert(&mut self, particle: Sphere) -> ParticleKey {
        ParticleKey(self.particles.insert(particle))
    }

    /// Remove a particle, returning it if it still existed.
    #[inline]
    pub fn remove(&mut self, key: ParticleKey) -> Option<Sphere> {
        self.particles.remove(key.0)
    }

    /// Access a particle, if it still exists.
    #[inline]
    pub fn get(&self, key: ParticleKey) -> Option<&Sphere> {
        self.particles.get(key.0)
    }

    /// Mutably access a particle, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: ParticleKey) -> Option<&mut Sphere> {
        self.particles.get_mut(key.0)
    }

    /// Mutably access two different particles at once.
    ///
    /// # Panics
    ///
    /// Panics if both keys are the same.
    #[inline]
    pub fn get2_mut(
        &mut self,
        a: ParticleKey,
        b: ParticleKey,
    ) -> (Option<&mut Sphere>, Option<&mut Sphere>) {
        self.particles.get2_mut(a.0, b.0)
    }

    #[inline]
    pub fn contains(&self, key: ParticleKey) -> bool {
        self.particles.contains(key.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (ParticleKey, &Sphere)> {
        self.particles.iter().map(|(k, p)| (ParticleKey(k), p))
    }

    pub fn iter_mut(&mut self) -> impl '_ + Iterator<Item = (ParticleKey, &mut Sphere)> {
        self.particles.iter_mut().map(|(k, p)| (ParticleKey(k), p))
    }

    pub fn keys(&self) -> impl '_ + Iterator<Item = ParticleKey> {
        self.particles.iter().map(|(k, _)| ParticleKey(k))
    }

    /// Keep only the particles for which the predicate returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(ParticleKey, &mut Sphere) -> bool) {
        self.particles.retain(|k, p| f(ParticleKey(k), p));
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

impl FromIterator<Sphere> for ParticleSet {
    fn from_iter<I: IntoIterator<Item = Sphere>>(iter: I) -> Self {
        let mut set = ParticleSet::new();
        for p in iter {
            set.insert(p);
        }
        set
    }
}
