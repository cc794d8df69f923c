// Copyright 2025 the foma-lookup authors
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

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

// Hashing a multi-megabyte network file on every load would cost a
// noticeable fraction of what a cache miss costs, so large inputs are
// keyed by length plus bounded head and tail samples. Compressed data
// makes prefix/suffix collisions between distinct networks vanishingly
// unlikely.
const SAMPLE_BYTES: usize = 4096;

pub(crate) fn network_cache_key(bytes: &[u8], invert: bool) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.len().hash(&mut hasher);
    invert.hash(&mut hasher);

    if bytes.len() <= 2 * SAMPLE_BYTES {
        bytes.hash(&mut hasher);
    } else {
        bytes[..SAMPLE_BYTES].hash(&mut hasher);
        bytes[bytes.len() - SAMPLE_BYTES..].hash(&mut hasher);
    }

    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_inputs_get_distinct_keys() {
        assert_ne!(
            network_cache_key(b"network one", false),
            network_cache_key(b"network two", false)
        );
    }

    #[test]
    fn invert_is_part_of_the_key() {
        assert_ne!(
            network_cache_key(b"network", false),
            network_cache_key(b"network", true)
        );
    }

    #[test]
    fn large_inputs_are_sampled_but_stable() {
        let big = vec![0x42u8; 3 * SAMPLE_BYTES];
        assert_eq!(
            network_cache_key(&big, false),
            network_cache_key(&big, false)
        );

        let mut tweaked = big.clone();
        *tweaked.last_mut().unwrap() = 0x43;
        assert_ne!(
            network_cache_key(&big, false),
            network_cache_key(&tweaked, false)
        );
    }
}
