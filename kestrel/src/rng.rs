//! Small deterministic pseudo random number generator.

/// Pseudo random number generator for the randomized parts of the search.
///
/// Uses the splitmix64 generator, which is more than good enough for occasionally picking a
/// random decision variable and keeps runs reproducible for a fixed seed.
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Rng {
        Rng {
            state: seed.wrapping_add(0x9e3779b97f4a7c15),
        }
    }

    /// The next pseudo random value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// A pseudo random value below the given bound.
    pub fn below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        self.next_u64() % bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_fixed_seed() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);

        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Rng::new(1);
        let mut b = Rng::new(2);

        assert_ne!(
            (0..4).map(|_| a.next_u64()).collect::<Vec<_>>(),
            (0..4).map(|_| b.next_u64()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn bounded_values_stay_below_bound() {
        let mut rng = Rng::new(7);
        for bound in 1..64 {
            for _ in 0..16 {
                assert!(rng.below(bound) < bound);
            }
        }
    }
}
