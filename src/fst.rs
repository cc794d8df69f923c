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

//! The user-facing transducer handle.

use std::path::Path;
use std::sync::Arc;

use tracing::trace;

use crate::caching;
use crate::error::Result;
use crate::lookup::{render_analysis, render_surface, PathIter, Side};
use crate::parse;
use crate::types::Automaton;

/// Construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FstOptions {
    /// Swap upper and lower labels on every arc at load time, for
    /// networks written with the opposite label convention.
    pub invert: bool,
}

/// A loaded transducer.
///
/// Construction parses the whole network up front; afterwards the
/// automaton is immutable, and an `Fst` is a cheap clone (`Arc` inside)
/// safe to share across threads. The lookup methods return lazy
/// iterators: each `next()` may perform an arbitrary amount of search
/// before yielding, and dropping an iterator abandons its search with
/// nothing outstanding.
#[derive(Debug, Clone)]
pub struct Fst {
    net: Arc<Automaton>,
}

impl Fst {
    /// Load a network from the raw bytes of a Foma file (gzip-compressed,
    /// or already-inflated network text).
    pub fn from_bytes(bytes: &[u8], options: FstOptions) -> Result<Self> {
        let key = caching::network_cache_key(bytes, options.invert);
        if let Some(net) = caching::get_cached_network(key) {
            trace!(name = %net.name(), "network cache hit");
            return Ok(Fst { net });
        }

        let mut net = parse::load(bytes)?;
        if options.invert {
            net.invert_labels();
        }
        let net = Arc::new(net);
        caching::insert_network(key, Arc::clone(&net));
        Ok(Fst { net })
    }

    /// Load a network from a file.
    pub fn from_path(path: impl AsRef<Path>, options: FstOptions) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, options)
    }

    /// All analyses of a surface form, as sequences of symbol texts
    /// (lemma fragments and tags). Flag diacritics never appear in
    /// results; an unknown input character silently prunes the branches
    /// that would need to consume it.
    pub fn analyze<'f>(&'f self, surface: &str) -> Analyses<'f> {
        trace!(input = surface, "analyze");
        let tokens = self.net.sigma().tokenize(surface);
        Analyses {
            paths: PathIter::new(&self.net, Side::Down, tokens),
        }
    }

    /// All surface forms of an analysis string (lemma plus tags, e.g.
    /// `eat+V+Past`).
    pub fn generate<'f>(&'f self, analysis: &str) -> Surfaces<'f> {
        trace!(input = analysis, "generate");
        let tokens = self.net.sigma().tokenize(analysis);
        Surfaces {
            paths: PathIter::new(&self.net, Side::Up, tokens),
        }
    }

    /// Network name from the properties block.
    pub fn name(&self) -> &str {
        self.net.name()
    }

    pub fn arity(&self) -> u32 {
        self.net.arity()
    }

    /// The underlying graph, for callers that want to inspect the
    /// alphabet or walk arcs themselves.
    pub fn automaton(&self) -> &Automaton {
        &self.net
    }
}

/// Lazy stream of analyses; see [`Fst::analyze`].
pub struct Analyses<'f> {
    paths: PathIter<'f>,
}

impl Iterator for Analyses<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        let path = self.paths.next()?;
        Some(render_analysis(self.paths.net(), &path))
    }
}

/// Lazy stream of surface forms; see [`Fst::generate`].
pub struct Surfaces<'f> {
    paths: PathIter<'f>,
}

impl Iterator for Surfaces<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let path = self.paths.next()?;
        Some(render_surface(self.paths.net(), &path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::collections::BTreeMap;
    use std::io::Write;

    /// Pairs eat+N+Mass:eats, eat+N+Pl:eats, eat+V+3P+Sg:eats,
    /// eat+V+Past:ate.
    const EAT: &str = "\
##foma-net 1.0##
##props##
2 14 13 17 1 4 0 1 0 0 0 2 eat
##sigma##
0 @_EPSILON_SYMBOL_@
3 +3P
4 +Mass
5 +N
6 +Past
7 +Pl
8 +Sg
9 +V
10 a
11 e
12 s
13 t
##states##
0 11 10 9 0
11 1
1 10 2 0
2 13 3 0
3 5 12 4 0
9 12 7
4 4 0 5 0
7 0 5
5 -1 -1 1
7 3 0 8 0
8 8 0 5 0
9 10 13 10 0
10 13 11 11 0
11 9 0 12 0
12 6 0 5 0
-1 -1 -1 -1 -1
##end##
";

    /// sheep+N+Sg:sheep and sheep+N+Pl:sheep.
    const SHEEP: &str = "\
##foma-net 1.0##
##props##
2 8 8 11 1 2 0 1 0 0 1 2 sheep
##sigma##
0 @_EPSILON_SYMBOL_@
3 +N
4 +Pl
5 +Sg
6 e
7 h
8 p
9 s
##states##
0 9 1 0
1 7 2 0
2 6 3 0
3 6 4 0
4 8 5 0
5 3 0 6 0
6 5 0 7 0
4 0 7
7 -1 -1 1
-1 -1 -1 -1 -1
##end##
";

    /// Two paths over the surface `ab`: one sets CASE to A then requires
    /// B (never viable), the other sets CASE to B.
    const FLAGGED: &str = "\
##foma-net 1.0##
##props##
2 7 6 10 1 1 0 1 0 0 1 2 flagged
##sigma##
0 @_EPSILON_SYMBOL_@
3 @P.CASE.A@
4 @P.CASE.B@
5 @R.CASE.B@
6 a
7 b
##states##
0 6 1 0
1 3 2 0
4 3
2 5 4 0
3 5 4 0
4 7 5 0
5 -1 -1 1
-1 -1 -1 -1 -1
##end##
";

    fn gz(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn fst(text: &str) -> Result<Fst> {
        Ok(Fst::from_bytes(&gz(text), FstOptions::default())?)
    }

    fn multiset<I: IntoIterator<Item = T>, T: Ord>(items: I) -> BTreeMap<T, usize> {
        let mut counts = BTreeMap::new();
        for item in items {
            *counts.entry(item).or_insert(0) += 1;
        }
        counts
    }

    fn tags(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn analyze_eats() -> Result<()> {
        let fst = fst(EAT)?;
        let analyses = multiset(fst.analyze("eats"));
        assert_eq!(
            analyses,
            multiset([
                tags(&["eat", "+N", "+Mass"]),
                tags(&["eat", "+N", "+Pl"]),
                tags(&["eat", "+V", "+3P", "+Sg"]),
            ])
        );
        Ok(())
    }

    #[test]
    fn analyze_ate() -> Result<()> {
        let fst = fst(EAT)?;
        let analyses: Vec<_> = fst.analyze("ate").collect();
        assert_eq!(analyses, vec![tags(&["eat", "+V", "+Past"])]);
        Ok(())
    }

    #[test]
    fn generate_past() -> Result<()> {
        let fst = fst(EAT)?;
        let surfaces: Vec<_> = fst.generate("eat+V+Past").collect();
        assert_eq!(surfaces, vec!["ate".to_string()]);
        Ok(())
    }

    #[test]
    fn generate_plural() -> Result<()> {
        let fst = fst(EAT)?;
        let surfaces: Vec<_> = fst.generate("eat+N+Pl").collect();
        assert_eq!(surfaces, vec!["eats".to_string()]);
        Ok(())
    }

    #[test]
    fn analyze_gibberish_is_empty() -> Result<()> {
        let fst = fst(EAT)?;
        assert_eq!(fst.analyze("xyzzy").count(), 0);
        assert_eq!(fst.generate("xyzzy").count(), 0);
        Ok(())
    }

    #[test]
    fn sheep_has_two_analyses() -> Result<()> {
        let fst = fst(SHEEP)?;
        let analyses = multiset(fst.analyze("sheep"));
        assert_eq!(
            analyses,
            multiset([
                tags(&["sheep", "+N", "+Sg"]),
                tags(&["sheep", "+N", "+Pl"]),
            ])
        );
        Ok(())
    }

    #[test]
    fn round_trip_analyses_regenerate_the_surface() -> Result<()> {
        let fst = fst(EAT)?;
        for surface in ["eats", "ate"] {
            for analysis in fst.analyze(surface) {
                let joined = analysis.concat();
                let surfaces: Vec<_> = fst.generate(&joined).collect();
                assert!(
                    surfaces.contains(&surface.to_string()),
                    "generate({joined}) = {surfaces:?} should contain {surface}"
                );
            }
        }
        Ok(())
    }

    #[test]
    fn inversion_swaps_the_directions() -> Result<()> {
        let plain = fst(EAT)?;
        let inverted = Fst::from_bytes(&gz(EAT), FstOptions { invert: true })?;

        // Inverted analysis of an analysis string behaves like plain
        // generation, and vice versa.
        let inv_down = multiset(inverted.analyze("eat+V+Past").map(|a| a.concat()));
        let plain_up = multiset(plain.generate("eat+V+Past"));
        assert_eq!(inv_down, plain_up);

        let inv_up = multiset(inverted.generate("eats"));
        let plain_down = multiset(plain.analyze("eats").map(|a| a.concat()));
        assert_eq!(inv_up, plain_down);
        Ok(())
    }

    #[test]
    fn enumeration_is_deterministic() -> Result<()> {
        let fst = fst(EAT)?;
        let first: Vec<_> = fst.analyze("eats").collect();
        let second: Vec<_> = fst.analyze("eats").collect();
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn violating_flag_paths_are_never_emitted() -> Result<()> {
        let fst = fst(FLAGGED)?;
        // Exactly one of the two arc sequences satisfies its flags, and
        // no flag symbol leaks into the rendered result.
        let analyses: Vec<_> = fst.analyze("ab").collect();
        assert_eq!(analyses, vec![tags(&["ab"])]);

        let surfaces: Vec<_> = fst.generate("ab").collect();
        assert_eq!(surfaces, vec!["ab".to_string()]);
        Ok(())
    }

    #[test]
    fn lazy_streams_can_be_abandoned() -> Result<()> {
        let fst = fst(EAT)?;
        let mut analyses = fst.analyze("eats");
        assert!(analyses.next().is_some());
        drop(analyses);

        // A fresh stream starts over from the beginning.
        assert_eq!(fst.analyze("eats").count(), 3);
        Ok(())
    }

    #[test]
    fn name_and_arity_come_from_the_properties_block() -> Result<()> {
        let fst = fst(EAT)?;
        assert_eq!(fst.name(), "eat");
        assert_eq!(fst.arity(), 2);
        Ok(())
    }

    #[test]
    fn repeated_loads_share_the_cached_automaton() -> Result<()> {
        let bytes = gz(SHEEP);
        let a = Fst::from_bytes(&bytes, FstOptions::default())?;
        let b = Fst::from_bytes(&bytes, FstOptions::default())?;
        assert!(Arc::ptr_eq(&a.net, &b.net));

        // The invert flag is part of the cache key.
        let c = Fst::from_bytes(&bytes, FstOptions { invert: true })?;
        assert!(!Arc::ptr_eq(&a.net, &c.net));
        Ok(())
    }

    #[test]
    fn from_path_reads_a_file() -> Result<()> {
        let dir = std::env::temp_dir();
        let path = dir.join("foma_lookup_from_path_test.fomabin");
        std::fs::write(&path, gz(EAT))?;

        let fst = Fst::from_path(&path, FstOptions::default())?;
        assert_eq!(fst.name(), "eat");

        std::fs::remove_file(&path)?;
        Ok(())
    }
}
