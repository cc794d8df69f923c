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

//! Process-wide LRU cache of parsed networks, keyed by input bytes and
//! the invert flag. Hits share the immutable automaton behind an `Arc`;
//! nothing is ever copied out of the cache.

mod hashing;

pub(crate) use hashing::network_cache_key;

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use once_cell::sync::Lazy;

use crate::environment::{CACHE_SIZE, DISABLE_CACHE};
use crate::types::Automaton;

static NETWORK_CACHE: Lazy<Mutex<LruCache<u64, Arc<Automaton>>>> = Lazy::new(|| {
    let capacity = NonZeroUsize::new(*CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(capacity))
});

pub(crate) fn get_cached_network(key: u64) -> Option<Arc<Automaton>> {
    if *DISABLE_CACHE {
        return None;
    }
    let mut cache = NETWORK_CACHE.lock().unwrap();
    cache.get(&key).map(Arc::clone)
}

pub(crate) fn insert_network(key: u64, net: Arc<Automaton>) {
    if *DISABLE_CACHE {
        return;
    }
    NETWORK_CACHE.lock().unwrap().put(key, net);
}
