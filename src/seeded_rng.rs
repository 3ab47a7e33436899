//! Construction of the random number generators used by the engines.
//!
//! All randomness flows through explicitly passed ChaCha8 generators; there
//! is no process-global random state. One run-level generator drives every
//! practice-level draw in sequence. Each practice's patient roster gets its
//! own generator derived from the global seed and the practice id, so that
//! generating rosters in a different order (or in parallel, one day) cannot
//! disturb the draws of any other roster.

use blake2::{Blake2b512, Digest};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Run-level generator, used for all practice-level draws.
pub fn run_rng(global_seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(global_seed)
}

/// Generator for one practice's patient roster.
///
/// The practice id is combined with the global seed and hashed; the hash
/// seeds the generator. The same (seed, practice id) pair always yields the
/// same draw sequence, independently of every other roster in the run.
pub fn roster_rng(global_seed: u64, practice_id: u32) -> ChaCha8Rng {
    let message = format!("roster-{practice_id}-{global_seed}");
    let mut hasher = Blake2b512::new();
    hasher.update(message);
    let seed = hasher.finalize()[0..32]
        .try_into()
        .expect("Unexpectedly failed to obtain correct-length slice");
    ChaCha8Rng::from_seed(seed)
}
