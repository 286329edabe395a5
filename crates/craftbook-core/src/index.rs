//! Fixed-width search prefilter embedded in every searchable record.
//!
//! Text is lowercased and split on whitespace; every character unigram and
//! bigram of every word sets one of 128 bits. A query token sets the bits of
//! its own grams. A token contained in a text lies inside a single word of
//! it, so a true match always satisfies `object.contains(query)`. The
//! converse does not hold; callers must confirm with an exact text match.

use std::ops::{BitOr, BitOrAssign};

/// 128-bit token bitset, stored as four arena words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IndexBits(pub [u32; 4]);

impl IndexBits {
    pub const EMPTY: IndexBits = IndexBits([0; 4]);
    pub const WORDS: usize = 4;
    const BITS: u32 = 128;

    pub fn set(&mut self, bit: u32) {
        let bit = bit % Self::BITS;
        self.0[(bit / 32) as usize] |= 1 << (bit % 32);
    }

    pub fn get(&self, bit: u32) -> bool {
        let bit = bit % Self::BITS;
        self.0[(bit / 32) as usize] & (1 << (bit % 32)) != 0
    }

    /// True when every bit of `query` is also set here.
    pub fn contains(&self, query: &IndexBits) -> bool {
        self.0
            .iter()
            .zip(query.0.iter())
            .all(|(have, want)| have & want == *want)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    pub fn to_words(self) -> [i32; 4] {
        self.0.map(|w| w as i32)
    }

    pub fn from_words(words: [i32; 4]) -> Self {
        IndexBits(words.map(|w| w as u32))
    }
}

impl BitOr for IndexBits {
    type Output = IndexBits;

    fn bitor(mut self, rhs: IndexBits) -> IndexBits {
        self |= rhs;
        self
    }
}

impl BitOrAssign for IndexBits {
    fn bitor_assign(&mut self, rhs: IndexBits) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a |= b;
        }
    }
}

// ---------------------------------------------------------------------------
// Gram hashing
// ---------------------------------------------------------------------------

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn gram_bit(chars: &[char]) -> u32 {
    let mut h = FNV_OFFSET;
    for c in chars {
        let mut buf = [0u8; 4];
        for &b in c.encode_utf8(&mut buf).as_bytes() {
            h ^= b as u32;
            h = h.wrapping_mul(FNV_PRIME);
        }
    }
    h % IndexBits::BITS
}

/// Accumulates index bits from display text and from other records' bits.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    bits: IndexBits,
    chars: Vec<char>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every word of `text`, case-insensitively.
    pub fn add_text(&mut self, text: &str) -> &mut Self {
        let lower = text.to_lowercase();
        for word in lower.split_whitespace() {
            self.add_word(word);
        }
        self
    }

    pub fn add_opt(&mut self, text: Option<&str>) -> &mut Self {
        if let Some(text) = text {
            self.add_text(text);
        }
        self
    }

    /// Merge bits computed for another record (group members, recipe I/O).
    pub fn add_bits(&mut self, bits: IndexBits) -> &mut Self {
        self.bits |= bits;
        self
    }

    pub fn finish(&self) -> IndexBits {
        self.bits
    }

    fn add_word(&mut self, word: &str) {
        self.chars.clear();
        self.chars.extend(word.chars());
        for c in &self.chars {
            self.bits.set(gram_bit(std::slice::from_ref(c)));
        }
        for pair in self.chars.windows(2) {
            self.bits.set(gram_bit(pair));
        }
    }
}

/// Bits a single (already lowercased) query token requires.
pub fn token_bits(token: &str) -> IndexBits {
    IndexBuilder::new().add_text(token).finish()
}
