//! Pattern oracle: a 32-bit Galois LFSR that produces the test data and
//! regenerates it for verification.
//!
//! The generator state threads through an entire phase (it is never reset per
//! chunk), so every word depends on its absolute position in the stream.
//! Reordered, truncated, duplicated or partially overwritten chunks all show
//! up as mismatches. The verifier recomputes the expected stream from the
//! seed instead of storing it, which keeps memory at one chunk no matter how
//! large the transfer is.
//!
//! Words are serialized little-endian when they go into a byte buffer.

use std::fmt;

/// Size of one generated word in bytes.
pub const WORD_BYTES: usize = 4;

/// Feedback taps of the primitive polynomial x^32 + x^7 + x^5 + x^3 + x^2 + x + 1
/// (Koopman notation, Galois right-shift form). Period is 2^32 - 1.
const TAPS: u32 = 0x8000_0057;

/// Register steps per emitted word; every output bit is freshly shifted.
const STEPS_PER_WORD: u32 = 32;

/// Generator state. Never zero: zero is the one fixed point of the register.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LfsrState(u32);

impl LfsrState {
    /// Create a state from a seed, or `None` if the seed is zero.
    #[must_use]
    pub const fn from_seed(seed: u32) -> Option<Self> {
        if seed == 0 { None } else { Some(Self(seed)) }
    }

    /// The raw register value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Advance one word and return it.
    pub const fn next_word(&mut self) -> u32 {
        let mut v = self.0;
        let mut i = 0;
        while i < STEPS_PER_WORD {
            v = step(v);
            i += 1;
        }
        self.0 = v;
        v
    }

    /// The word at zero-based `index` of the stream seeded with `self`.
    ///
    /// A pure function of (seed, position) that leaves `self` untouched, for
    /// checking an artifact at an arbitrary offset.
    #[must_use]
    pub fn word_at(self, index: u64) -> u32 {
        let mut state = self;
        let mut word = 0;
        for _ in 0..=index {
            word = state.next_word();
        }
        word
    }
}

impl fmt::Debug for LfsrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LfsrState({:#010x})", self.0)
    }
}

/// One Galois step. A non-zero input always yields a non-zero output: an even
/// value shifts to something non-zero, an odd one picks up the top tap bit.
const fn step(v: u32) -> u32 {
    (v >> 1) ^ (0u32.wrapping_sub(v & 1) & TAPS)
}

/// Fill `out` with the next `out.len()` words.
pub fn generate(state: &mut LfsrState, out: &mut [u32]) {
    for word in out {
        *word = state.next_word();
    }
}

/// Regenerate `input.len()` words and compare them against `input`.
///
/// The state is advanced past every word whether or not they match, so the
/// caller stays aligned with the stream.
pub fn verify(state: &mut LfsrState, input: &[u32]) -> bool {
    first_mismatch(state, input).is_none()
}

/// Like [`verify`], but returns the index of the first mismatching word.
pub fn first_mismatch(state: &mut LfsrState, input: &[u32]) -> Option<usize> {
    let mut first = None;
    for (i, &actual) in input.iter().enumerate() {
        let expected = state.next_word();
        if first.is_none() && actual != expected {
            first = Some(i);
        }
    }
    first
}

/// Fill a byte buffer with the next words, little-endian.
///
/// `out.len()` must be a multiple of [`WORD_BYTES`]; a trailing partial word
/// is left untouched.
pub fn fill_bytes(state: &mut LfsrState, out: &mut [u8]) {
    debug_assert_eq!(out.len() % WORD_BYTES, 0);
    for chunk in out.chunks_exact_mut(WORD_BYTES) {
        chunk.copy_from_slice(&state.next_word().to_le_bytes());
    }
}

/// First word of a byte buffer that differs from the generated stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordMismatch {
    /// Word index within the buffer.
    pub index: usize,
    /// Word the generator produced.
    pub expected: u32,
    /// Word found in the buffer.
    pub actual: u32,
}

/// Check a byte buffer against the next words and report the first mismatch,
/// advancing the state past the whole buffer either way.
pub fn check_bytes(state: &mut LfsrState, input: &[u8]) -> Option<WordMismatch> {
    debug_assert_eq!(input.len() % WORD_BYTES, 0);
    let mut first = None;
    for (index, chunk) in input.chunks_exact(WORD_BYTES).enumerate() {
        let expected = state.next_word();
        if first.is_none() {
            let actual = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if actual != expected {
                first = Some(WordMismatch {
                    index,
                    expected,
                    actual,
                });
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seed(v: u32) -> LfsrState {
        LfsrState::from_seed(v).unwrap()
    }

    #[test]
    fn zero_seed_is_rejected() {
        assert!(LfsrState::from_seed(0).is_none());
    }

    #[test]
    fn stream_is_not_constant() {
        let mut s = seed(1);
        let mut words = [0u32; 64];
        generate(&mut s, &mut words);
        assert!(words.iter().all(|&w| w != 0));
        assert!(words.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn state_threads_across_calls() {
        let mut whole = seed(7);
        let mut one = [0u32; 8];
        generate(&mut whole, &mut one);

        let mut split = seed(7);
        let mut a = [0u32; 3];
        let mut b = [0u32; 5];
        generate(&mut split, &mut a);
        generate(&mut split, &mut b);

        assert_eq!(&one[..3], &a);
        assert_eq!(&one[3..], &b);
        assert_eq!(whole, split);
    }

    #[test]
    fn word_at_matches_stream() {
        let mut s = seed(0xDEAD_BEEF);
        let mut words = [0u32; 16];
        generate(&mut s, &mut words);
        for (i, &w) in words.iter().enumerate() {
            assert_eq!(seed(0xDEAD_BEEF).word_at(i as u64), w);
        }
    }

    #[test]
    fn verify_advances_state_after_mismatch() {
        let mut gen_state = seed(3);
        let mut words = [0u32; 8];
        generate(&mut gen_state, &mut words);
        words[1] ^= 1;

        let mut check = seed(3);
        assert_eq!(first_mismatch(&mut check, &words), Some(1));
        assert_eq!(check, gen_state);
    }

    #[test]
    fn byte_helpers_are_little_endian_words() {
        let mut a = seed(11);
        let mut bytes = [0u8; 16];
        fill_bytes(&mut a, &mut bytes);

        let mut b = seed(11);
        let mut words = [0u32; 4];
        generate(&mut b, &mut words);
        for (chunk, w) in bytes.chunks_exact(4).zip(words) {
            assert_eq!(chunk, w.to_le_bytes());
        }
    }

    #[test]
    fn check_bytes_reports_expected_and_actual() {
        let mut g = seed(5);
        let mut bytes = [0u8; 32];
        fill_bytes(&mut g, &mut bytes);
        bytes[13] ^= 0x80;

        let mut v = seed(5);
        let m = check_bytes(&mut v, &bytes).unwrap();
        assert_eq!(m.index, 3);
        assert_eq!(m.expected, seed(5).word_at(3));
        assert_eq!(m.actual, m.expected ^ 0x8000);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = seed(1);
        let mut b = seed(2);
        let mut wa = [0u32; 4];
        let mut wb = [0u32; 4];
        generate(&mut a, &mut wa);
        generate(&mut b, &mut wb);
        assert_ne!(wa, wb);
    }

    #[test]
    fn register_does_not_cycle_quickly() {
        let start = seed(1);
        let mut s = start;
        for _ in 0..100_000 {
            s.next_word();
            assert_ne!(s, start);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn round_trip_verifies(s in 1u32.., n in 0usize..512) {
            let mut g = seed(s);
            let mut words = vec![0u32; n];
            generate(&mut g, &mut words);
            let mut v = seed(s);
            prop_assert!(verify(&mut v, &words));
            prop_assert_eq!(v, g);
        }

        #[test]
        fn single_word_corruption_is_detected(
            s in 1u32..,
            n in 1usize..512,
            pos in any::<prop::sample::Index>(),
            flip in 1u32..,
        ) {
            let mut g = seed(s);
            let mut words = vec![0u32; n];
            generate(&mut g, &mut words);
            let i = pos.index(n);
            words[i] ^= flip;
            let mut v = seed(s);
            prop_assert_eq!(first_mismatch(&mut v, &words), Some(i));
        }

        #[test]
        fn byte_corruption_is_detected(s in 1u32.., words in 1usize..256, pos in any::<prop::sample::Index>()) {
            let mut g = seed(s);
            let mut bytes = vec![0u8; words * WORD_BYTES];
            fill_bytes(&mut g, &mut bytes);
            let at = pos.index(bytes.len());
            bytes[at] = bytes[at].wrapping_add(1);
            let mut v = seed(s);
            let mismatch = check_bytes(&mut v, &bytes);
            prop_assert_eq!(mismatch.map(|m| m.index), Some(at / WORD_BYTES));
            prop_assert_eq!(v, g);
        }
    }
}
