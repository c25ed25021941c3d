/*!
A minimal seeded pseudorandom generator, for the one place this crate needs randomness: breaking
ties in the diagnosis engine's hitting-set branch order deterministically under `Config::rng_seed`
(§4.7, §9 "cooperative cancellation" sibling note on reproducibility — property 6 requires that
re-running with identical inputs, seed included, reproduces the same diagnosis order).

A direct port of the teacher's `generic::minimal_pcg::MinimalPCG32`, translated from the "really
minimal" C PCG32 reference implementation: simple, fast, and exactly as seedable as this crate
needs, with no OS entropy source required.
*/

use rand::SeedableRng;
use rand_core::{impls, Error, RngCore};

/// State and increment, per the PCG32 reference algorithm.
#[derive(Default)]
pub struct MinimalPcg32 {
    state: u64,
    inc: u64,
}

impl RngCore for MinimalPcg32 {
    fn next_u32(&mut self) -> u32 {
        let old_state = self.state;

        self.state = old_state.wrapping_mul(6364136223846793005_u64).wrapping_add(self.inc);

        let xorshifted = ((old_state >> 18) ^ old_state) >> 27;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for MinimalPcg32 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        const INCREMENT: u64 = 3215534235932367344;
        Self { state: u64::from_le_bytes(seed).wrapping_add(INCREMENT), inc: INCREMENT }
    }
}

impl MinimalPcg32 {
    pub fn from_seed_u64(seed: u64) -> Self {
        Self::from_seed(seed.to_le_bytes())
    }

    /// Fisher-Yates, in place. Used to decide the order in which the diagnosis engine branches
    /// on a core's literals, so the search is reproducible given the same seed but not bound to
    /// the core's own enumeration order.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u32() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_same_sequence() {
        let mut a = MinimalPcg32::from_seed_u64(73);
        let mut b = MinimalPcg32::from_seed_u64(73);
        for _ in 0..5 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = MinimalPcg32::from_seed_u64(1);
        let mut items: Vec<u32> = (0..8).collect();
        rng.shuffle(&mut items);
        items.sort_unstable();
        assert_eq!(items, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn different_seeds_can_produce_different_shuffles() {
        let mut a = MinimalPcg32::from_seed_u64(1);
        let mut b = MinimalPcg32::from_seed_u64(2);
        let base: Vec<u32> = (0..8).collect();
        let mut x = base.clone();
        let mut y = base.clone();
        a.shuffle(&mut x);
        b.shuffle(&mut y);
        assert_ne!(x, y);
    }
}
