/**
 * The source of randomness for sampling. Anything implementing `rand::Rng` works, so
 * production code passes `rand::thread_rng()` and tests pass a seeded `StdRng` or a
 * hand-written sequence.
 */
use rand::Rng;


pub trait Randomness {
    /// Return an integer uniformly distributed in `0..n`. `n` is never zero.
    fn below(&mut self, n: usize) -> usize;

    /// Return a real uniformly distributed in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Permute `items` in place with the Fisher-Yates shuffle.
    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}


impl<R: Rng> Randomness for R {
    fn below(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }

    fn uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}




#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::testing::Identity;
    use super::*;

    #[test]
    fn identity_shuffle_keeps_order() {
        let mut v = vec![1, 2, 3, 4, 5];
        Identity.shuffle(&mut v);
        assert_eq!(v, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn seeded_shuffle_is_a_reproducible_permutation() {
        let mut a: Vec<usize> = (0..20).collect();
        let mut b = a.clone();
        StdRng::seed_from_u64(7).shuffle(&mut a);
        StdRng::seed_from_u64(7).shuffle(&mut b);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn uniform_stays_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let x = rng.uniform();
            assert!(x >= 0.0 && x < 1.0);
        }
    }
}
