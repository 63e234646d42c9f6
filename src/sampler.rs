use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::outcome::{Outcome, Prob3};

// Weight layout of every sampler: away, draw, home.
const CLASS_ORDER: [Outcome; 3] = [Outcome::Away, Outcome::Draw, Outcome::Home];

/// Categorical draw over one fixture's normalized triple.
///
/// Built once per fixture and reused across trials. Classes with zero weight
/// are never returned.
#[derive(Debug, Clone)]
pub struct OutcomeSampler {
    dist: WeightedIndex<f64>,
}

impl OutcomeSampler {
    /// `None` when the triple has no positive mass or holds a negative or
    /// non-finite weight.
    pub fn new(p: &Prob3) -> Option<Self> {
        if !p.sum().is_finite() {
            return None;
        }
        let weights = CLASS_ORDER.map(|o| p.get(o));
        WeightedIndex::new(weights).ok().map(|dist| Self { dist })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome {
        CLASS_ORDER[self.dist.sample(rng)]
    }
}

/// One-off draw from a triple; `None` when it cannot be sampled.
pub fn sample_outcome<R: Rng + ?Sized>(rng: &mut R, p: &Prob3) -> Option<Outcome> {
    OutcomeSampler::new(p).map(|s| s.sample(rng))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{OutcomeSampler, sample_outcome};
    use crate::outcome::{Outcome, Prob3};

    #[test]
    fn certain_outcome_is_always_drawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sampler = OutcomeSampler::new(&Prob3::new(0.0, 1.0, 0.0)).unwrap();
        for _ in 0..500 {
            assert_eq!(sampler.sample(&mut rng), Outcome::Draw);
        }
    }

    #[test]
    fn zero_mass_classes_never_appear() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let sampler = OutcomeSampler::new(&Prob3::new(0.0, 0.4999999, 0.4999999)).unwrap();
        for _ in 0..2000 {
            assert_ne!(sampler.sample(&mut rng), Outcome::Home);
        }
        let edge = OutcomeSampler::new(&Prob3::new(0.5, 0.5, 0.0)).unwrap();
        for _ in 0..2000 {
            assert_ne!(edge.sample(&mut rng), Outcome::Away);
        }
    }

    #[test]
    fn unsampleable_triples() {
        assert!(OutcomeSampler::new(&Prob3::new(0.0, 0.0, 0.0)).is_none());
        assert!(OutcomeSampler::new(&Prob3::new(f64::NAN, 0.5, 0.5)).is_none());
        assert!(OutcomeSampler::new(&Prob3::new(-0.1, 0.6, 0.5)).is_none());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sample_outcome(&mut rng, &Prob3::new(0.0, 0.0, 0.0)), None);
    }

    #[test]
    fn empirical_frequencies_track_probabilities() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let sampler = OutcomeSampler::new(&Prob3::new(0.5, 0.3, 0.2)).unwrap();
        let n = 20_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            match sampler.sample(&mut rng) {
                Outcome::Home => counts[0] += 1,
                Outcome::Draw => counts[1] += 1,
                Outcome::Away => counts[2] += 1,
            }
        }
        let freq = |c: usize| c as f64 / n as f64;
        assert!((freq(counts[0]) - 0.5).abs() < 0.02);
        assert!((freq(counts[1]) - 0.3).abs() < 0.02);
        assert!((freq(counts[2]) - 0.2).abs() < 0.02);
    }
}
