// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#[cfg(test)]
use std::fmt::Display;
#[cfg(test)]
use std::fmt::Formatter;

/// Wrapper around the underlying hash function.
///
/// Used both to identify a card by its content and to fingerprint the
/// source lines a card was parsed from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CardHash {
    inner: blake3::Hash,
}

impl CardHash {
    #[cfg(test)]
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        Self {
            inner: blake3::hash(bytes),
        }
    }

    /// The first eight bytes of the hash, as a seed for deterministic
    /// randomness.
    pub fn seed(self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.inner.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

#[cfg(test)]
impl Display for CardHash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.inner.to_hex())
    }
}

pub struct Hasher {
    inner: blake3::Hasher,
}

impl Hasher {
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> CardHash {
        CardHash {
            inner: self.inner.finalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let hash = CardHash::hash_bytes(b"test");
        assert_eq!(
            hash.to_string(),
            "4878ca0425c739fa427f7eda20fe845f6b2e46ba5fe2a14df5b1e32f50603215"
        );
    }

    #[test]
    fn test_seed_is_stable() {
        let a = CardHash::hash_bytes(b"What is the capital of France?");
        let b = CardHash::hash_bytes(b"What is the capital of France?");
        let c = CardHash::hash_bytes(b"What is the capital of Spain?");
        assert_eq!(a.seed(), b.seed());
        assert_ne!(a.seed(), c.seed());
    }

    #[test]
    fn test_hasher_matches_one_shot() {
        let mut hasher = Hasher::new();
        hasher.update(b"te");
        hasher.update(b"st");
        assert_eq!(hasher.finalize(), CardHash::hash_bytes(b"test"));
    }
}
