// Post tag encoding.
// Maps a fixed tag vocabulary onto bits of a compact bitset.

use serde::{Serialize, Serializer};

use crate::error::{FolioError, Result};

/// Known tags and the bit each one occupies.
pub const TAGS: [(&str, u32); 29] = [
    ("backend", 1),
    ("frontend", 2),
    ("database", 3),
    ("security", 4),
    ("python", 5),
    ("javascript", 6),
    ("java", 7),
    ("c/c++", 8),
    ("arduino", 9),
    ("raspberry pi", 10),
    ("linux", 11),
    ("windows", 12),
    ("hardware", 13),
    ("software", 14),
    ("iot", 15),
    ("wearable", 16),
    ("ollama", 17),
    ("llm", 18),
    ("numpy", 19),
    ("scipy", 20),
    ("opencv", 21),
    ("flask", 22),
    ("vite", 23),
    ("esp32", 24),
    ("micropython", 25),
    ("multiprocessing", 26),
    ("music theory", 27),
    ("audio processing", 28),
    ("computer vision", 29),
];

/// Bytes needed for the highest tag bit.
pub const ENCODED_LEN: usize = 4;

/// Set of tags stored as one bit per known tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TagSet(u32);

fn bit_of(tag: &str) -> Result<u32> {
    TAGS.iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, bit)| *bit)
        .ok_or_else(|| FolioError::UnknownTag(tag.to_string()))
}

impl TagSet {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Encode tag names, rejecting any outside the vocabulary.
    pub fn encode<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        let mut set = Self::empty();
        for tag in tags {
            set.insert(tag.as_ref())?;
        }
        Ok(set)
    }

    /// Tag names present, in vocabulary order.
    pub fn decode(&self) -> Vec<&'static str> {
        TAGS.iter()
            .filter(|(_, bit)| self.0 & (1 << bit) != 0)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn has(&self, tag: &str) -> Result<bool> {
        Ok(self.0 & (1 << bit_of(tag)?) != 0)
    }

    pub fn insert(&mut self, tag: &str) -> Result<()> {
        self.0 |= 1 << bit_of(tag)?;
        Ok(())
    }

    pub fn remove(&mut self, tag: &str) -> Result<()> {
        self.0 &= !(1 << bit_of(tag)?);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Every tag that can be encoded.
    pub fn available() -> Vec<&'static str> {
        TAGS.iter().map(|(name, _)| *name).collect()
    }

    /// Big-endian byte form.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        self.0.to_be_bytes()
    }

    /// Read a big-endian byte form of any length; bits beyond the vocabulary are dropped.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let value = bytes
            .iter()
            .fold(0u32, |acc, b| acc.wrapping_shl(8) | u32::from(*b));
        Self(value & Self::mask())
    }

    /// Binary digit text, eight digits per byte, as stored in the database.
    pub fn to_bit_string(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{:08b}", b)).collect()
    }

    /// Parse binary digit text of any length. Empty text is the empty set.
    pub fn from_bit_string(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::empty());
        }
        if !text.chars().all(|c| c == '0' || c == '1') {
            return Err(FolioError::Other(format!("invalid tag bits '{}'", text)));
        }
        // Only the low 32 digits can carry known tags.
        let low = &text[text.len().saturating_sub(32)..];
        let value = u32::from_str_radix(low, 2)
            .map_err(|e| FolioError::Other(format!("invalid tag bits '{}': {}", text, e)))?;
        Ok(Self(value & Self::mask()))
    }

    fn mask() -> u32 {
        TAGS.iter().fold(0, |acc, (_, bit)| acc | (1 << bit))
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.decode())
    }
}
