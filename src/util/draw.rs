//! Draw-without-replacement pools for colors, names and spawn points

use rand::Rng;

/// An exhaustible bag of values drawn uniformly without replacement.
///
/// Once every value has been handed out the bag re-seeds itself from the
/// source set, so a pool can outlive its nominal size (name pools recycle).
#[derive(Debug, Clone)]
pub struct DrawPool<T: Clone> {
    source: Vec<T>,
    remaining: Vec<T>,
}

impl<T: Clone> DrawPool<T> {
    /// Build a pool over a non-empty source set.
    pub fn new(source: Vec<T>) -> Self {
        debug_assert!(!source.is_empty(), "draw pool needs at least one value");
        Self {
            remaining: source.clone(),
            source,
        }
    }

    /// Draw one value, never repeating until the pool runs dry.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> T {
        if self.remaining.is_empty() {
            self.remaining = self.source.clone();
        }
        let idx = rng.gen_range(0..self.remaining.len());
        self.remaining.swap_remove(idx)
    }

    /// Values left before the next re-seed.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_draw_is_unique_until_exhausted() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut pool = DrawPool::new(vec![1, 2, 3, 4, 5]);

        let mut drawn: Vec<i32> = (0..5).map(|_| pool.draw(&mut rng)).collect();
        drawn.sort_unstable();
        assert_eq!(drawn, vec![1, 2, 3, 4, 5]);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_exhausted_pool_reseeds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut pool = DrawPool::new(vec!["a", "b"]);

        for _ in 0..2 {
            pool.draw(&mut rng);
        }
        // Next draw comes from a fresh copy of the source set.
        let again = pool.draw(&mut rng);
        assert!(again == "a" || again == "b");
        assert_eq!(pool.remaining(), 1);
    }
}
