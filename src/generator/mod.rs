//! Collision-free random string generation.
//!
//! A [`UniqueStringGenerator`] draws fixed-length strings uniformly from an
//! [`Alphabet`] and remembers every value it has returned, retrying on
//! collision. Each instance is its own uniqueness domain: a generator used for
//! file names never sees the values of one used for file contents.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::GeneratorError;

mod alphabet;

pub use alphabet::{Alphabet, CharacterClass, CharacterClasses};

/// Draws allowed per call before giving up on finding an unused value.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Upper bound on the up-front allocation in [`UniqueStringGenerator::generate_batch`].
const MAX_PREALLOCATED: usize = 1024;

pub struct UniqueStringGenerator<R: Rng = StdRng> {
    alphabet: Alphabet,
    rng: R,
    // BLAKE3 digests of every value returned so far
    seen: HashSet<[u8; 32]>,
    issued_by_length: HashMap<usize, usize>,
    max_attempts: usize,
}

impl UniqueStringGenerator<StdRng> {
    /// Creates a generator seeded from the operating system's entropy source.
    ///
    /// # Examples
    ///
    /// ```
    /// # use uniquegen::generator::{CharacterClasses, UniqueStringGenerator};
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut generator = UniqueStringGenerator::new(CharacterClasses::ALL)?;
    /// let first = generator.generate_unique(10)?;
    /// let second = generator.generate_unique(10)?;
    /// assert_eq!(first.len(), 10);
    /// assert_ne!(first, second);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(classes: CharacterClasses) -> Result<Self, GeneratorError> {
        Self::with_rng(classes, StdRng::from_os_rng())
    }

    /// Creates a generator whose output is fully determined by `seed`.
    pub fn seeded(classes: CharacterClasses, seed: u64) -> Result<Self, GeneratorError> {
        Self::with_rng(classes, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> UniqueStringGenerator<R> {
    pub fn with_rng(classes: CharacterClasses, rng: R) -> Result<Self, GeneratorError> {
        Ok(UniqueStringGenerator {
            alphabet: Alphabet::from_classes(classes)?,
            rng,
            seen: HashSet::new(),
            issued_by_length: HashMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Caps the number of draws a single call may make. Zero is treated as one.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Number of unique values handed out so far.
    pub fn issued(&self) -> usize {
        self.seen.len()
    }

    /// Number of distinct strings of `length` the alphabet can form,
    /// saturating at `u128::MAX`.
    pub fn capacity(&self, length: usize) -> u128 {
        let base = self.alphabet.len() as u128;
        u32::try_from(length)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .unwrap_or(u128::MAX)
    }

    /// Returns a string of exactly `length` characters that this generator has
    /// never returned before.
    ///
    /// A zero length yields the empty string without drawing from the RNG or
    /// recording anything.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::ExhaustedUniqueSpace`] when every string of this
    /// length has already been issued, or when the attempt budget runs out.
    pub fn generate_unique(&mut self, length: usize) -> Result<String, GeneratorError> {
        if length == 0 {
            return Ok(String::new());
        }

        let issued = self.issued_by_length.get(&length).copied().unwrap_or(0);
        if issued as u128 >= self.capacity(length) {
            return Err(GeneratorError::ExhaustedUniqueSpace {
                length,
                issued,
                attempts: 0,
            });
        }

        for attempt in 1..=self.max_attempts {
            let candidate = self.draw(length);
            if self.seen.insert(*blake3::hash(candidate.as_bytes()).as_bytes()) {
                *self.issued_by_length.entry(length).or_default() += 1;
                return Ok(candidate);
            }
            trace!(length, attempt, "collision, drawing again");
        }

        Err(GeneratorError::ExhaustedUniqueSpace {
            length,
            issued,
            attempts: self.max_attempts,
        })
    }

    /// Produces `count` pairwise-distinct strings of `length` characters.
    ///
    /// With `length == 0` the result is `count` empty strings.
    pub fn generate_batch(
        &mut self,
        count: usize,
        length: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        if length == 0 {
            return Ok(vec![String::new(); count]);
        }

        // a count beyond the remaining space fails long before the vector fills
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOCATED));
        for _ in 0..count {
            values.push(self.generate_unique(length)?);
        }
        Ok(values)
    }

    fn draw(&mut self, length: usize) -> String {
        let symbols = self.alphabet.symbols();
        let rng = &mut self.rng;
        (0..length)
            .map(|_| symbols[rng.random_range(0..symbols.len())])
            .collect()
    }
}
