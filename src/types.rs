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

//! The in-memory transducer graph.
//!
//! States and symbols are referenced by dense integer ids rather than
//! pointers, so the automaton is a plain read-only value: cycles cost
//! nothing, and sharing it across threads needs no synchronization.

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::flags::FlagDiacritic;
use crate::sigma::SymbolTable;

pub type SymbolId = u32;
pub type StateId = u32;

/// Symbol id 0 is epsilon by Foma convention.
pub const EPSILON: SymbolId = 0;

/// One entry of the network alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    /// Consumes no input, emits no output.
    Epsilon,
    /// Matches a character outside the alphabet; emits nothing on the
    /// other side.
    Unknown,
    /// Matches a character outside the alphabet and passes it through.
    Identity,
    /// A single character, e.g. `a`.
    Grapheme(String),
    /// A multi-character tag, e.g. `+Pl`.
    MultiChar(String),
    /// A feature-environment constraint, e.g. `@P.CASE.NOM@`.
    Flag(FlagDiacritic),
}

impl Symbol {
    pub fn is_flag(&self) -> bool {
        matches!(self, Symbol::Flag(_))
    }

    /// The text this symbol contributes to rendered results, if any.
    /// Epsilon, the wildcards, and flags have no surface rendering.
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            Symbol::Grapheme(text) | Symbol::MultiChar(text) => Some(text),
            _ => None,
        }
    }
}

/// A transition. The source state is implicit: arcs are stored flat,
/// grouped by source, and reached through [`Automaton::arcs_from`].
/// Insertion order within a state is preserved; it determines result
/// order during lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub upper: SymbolId,
    pub lower: SymbolId,
    pub to: StateId,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct ArcRange {
    offset: u32,
    len: u32,
}

/// An immutable transducer: flat arc storage with per-state ranges, an
/// accepting-state set, and the alphabet the arcs index into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automaton {
    ranges: Vec<ArcRange>,
    arcs: Vec<Arc>,
    accepting: FixedBitSet,
    sigma: SymbolTable,
    name: String,
    arity: u32,
}

impl Automaton {
    pub const START: StateId = 0;

    pub(crate) fn new(
        per_state: Vec<SmallVec<[Arc; 4]>>,
        accepting_states: &[StateId],
        sigma: SymbolTable,
        name: String,
        arity: u32,
    ) -> Self {
        // Even an arcless network has its start state.
        let state_count = per_state.len().max(1);

        let mut ranges = Vec::with_capacity(state_count);
        let mut arcs = Vec::with_capacity(per_state.iter().map(|state_arcs| state_arcs.len()).sum());
        for state_arcs in &per_state {
            ranges.push(ArcRange {
                offset: arcs.len() as u32,
                len: state_arcs.len() as u32,
            });
            arcs.extend_from_slice(state_arcs);
        }
        ranges.resize(state_count, ArcRange {
            offset: arcs.len() as u32,
            len: 0,
        });

        let mut accepting = FixedBitSet::with_capacity(state_count);
        for &state in accepting_states {
            accepting.insert(state as usize);
        }

        Automaton {
            ranges,
            arcs,
            accepting,
            sigma,
            name,
            arity,
        }
    }

    pub fn state_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn arcs_from(&self, state: StateId) -> &[Arc] {
        let range = self.ranges[state as usize];
        &self.arcs[range.offset as usize..(range.offset + range.len) as usize]
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting.contains(state as usize)
    }

    pub fn sigma(&self) -> &SymbolTable {
        &self.sigma
    }

    /// Network name from the properties block.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arity from the properties block: 2 for a transducer, 1 for a plain
    /// automaton.
    pub fn arity(&self) -> u32 {
        self.arity
    }

    /// Swap upper and lower labels on every arc. Applied once at
    /// construction when [`FstOptions::invert`](crate::FstOptions) is set,
    /// for networks written with the opposite label convention.
    pub(crate) fn invert_labels(&mut self) {
        for arc in &mut self.arcs {
            std::mem::swap(&mut arc.upper, &mut arc.lower);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn two_state() -> Automaton {
        let arc = Arc {
            upper: 3,
            lower: 4,
            to: 1,
        };
        Automaton::new(
            vec![smallvec![arc], smallvec![]],
            &[1],
            SymbolTable::with_epsilon(),
            "test".to_string(),
            2,
        )
    }

    #[test]
    fn flat_layout_round_trips() {
        let net = two_state();
        assert_eq!(net.state_count(), 2);
        assert_eq!(net.arc_count(), 1);
        assert_eq!(net.arcs_from(0).len(), 1);
        assert_eq!(net.arcs_from(1).len(), 0);
        assert!(!net.is_accepting(0));
        assert!(net.is_accepting(1));
    }

    #[test]
    fn inversion_swaps_labels() {
        let mut net = two_state();
        net.invert_labels();
        let arc = net.arcs_from(0)[0];
        assert_eq!(arc.upper, 4);
        assert_eq!(arc.lower, 3);
    }

    #[test]
    fn empty_network_still_has_a_start_state() {
        let net = Automaton::new(
            Vec::new(),
            &[],
            SymbolTable::with_epsilon(),
            String::new(),
            2,
        );
        assert_eq!(net.state_count(), 1);
        assert_eq!(net.arcs_from(Automaton::START).len(), 0);
    }
}
