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
use once_cell::sync::Lazy;
use std::env;

/// Maximum number of parsed networks kept in the process-wide cache.
///
/// Set via the `FOMA_LOOKUP_CACHE_SIZE` environment variable; defaults to
/// 8. Each entry holds a complete automaton, so memory scales with the
/// size of the cached networks. Zero or unparsable values fall back to
/// the default.
///
/// ```bash
/// export FOMA_LOOKUP_CACHE_SIZE=32
/// ```
pub(crate) static CACHE_SIZE: Lazy<usize> = Lazy::new(|| {
    env::var("FOMA_LOOKUP_CACHE_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(8)
});

/// Disables the network cache entirely.
///
/// Set `FOMA_LOOKUP_DISABLE_CACHE` to `1`, `true`, or `yes` (case
/// insensitive); anything else, or leaving it unset, keeps the cache on.
/// Useful when memory is tight or when every load must exercise the
/// parser.
pub(crate) static DISABLE_CACHE: Lazy<bool> =
    Lazy::new(|| match env::var("FOMA_LOOKUP_DISABLE_CACHE") {
        Ok(val) => {
            let val = val.to_lowercase();
            val == "1" || val == "true" || val == "yes"
        }
        Err(_) => false,
    });
