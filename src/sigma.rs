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

//! The network alphabet and the input tokenizer.

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::types::{Symbol, SymbolId, EPSILON};

/// Interned alphabet of one network: dense id ↔ symbol storage plus a
/// text index for tokenization.
///
/// Ids come straight from the sigma section of the network file. Foma
/// leaves gaps in the id space (ids 1 and 2 are simply absent when the
/// network uses no unknown symbols), so definedness is tracked per id and
/// the parser rejects arcs that reference an undefined one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    texts: Vec<String>,
    defined: FixedBitSet,
    /// Grapheme and multi-char texts only; what the tokenizer can match.
    matchable: FxHashMap<String, SymbolId>,
    /// Longest matchable text, in bytes.
    max_match_len: usize,
}

/// One unit of tokenized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    /// A symbol of the alphabet.
    Sym(SymbolId),
    /// A character with no alphabet entry. Only an identity or unknown
    /// arc can consume it.
    Outside(char),
}

impl SymbolTable {
    /// A table with only the reserved epsilon entry at id 0.
    pub(crate) fn with_epsilon() -> Self {
        let mut table = SymbolTable {
            symbols: Vec::new(),
            texts: Vec::new(),
            defined: FixedBitSet::new(),
            matchable: FxHashMap::default(),
            max_match_len: 0,
        };
        table.define(EPSILON, "@_EPSILON_SYMBOL_@", Symbol::Epsilon);
        table
    }

    pub(crate) fn define(&mut self, id: SymbolId, text: &str, symbol: Symbol) {
        let index = id as usize;
        if self.symbols.len() <= index {
            self.symbols.resize(index + 1, Symbol::Epsilon);
            self.texts.resize(index + 1, String::new());
            self.defined.grow(index + 1);
        }

        if matches!(symbol, Symbol::Grapheme(_) | Symbol::MultiChar(_)) {
            self.matchable.insert(text.to_string(), id);
            self.max_match_len = self.max_match_len.max(text.len());
        }

        self.symbols[index] = symbol;
        self.texts[index] = text.to_string();
        self.defined.insert(index);
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.defined.contains(id as usize)
    }

    /// Number of id slots, including gaps.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Panics on an undefined id; the parser validates every arc label, so
    /// this indicates a bug rather than bad input.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        assert!(self.contains(id), "undefined symbol id {id}");
        &self.symbols[id as usize]
    }

    /// Verbatim sigma text for a defined id.
    pub fn text(&self, id: SymbolId) -> &str {
        assert!(self.contains(id), "undefined symbol id {id}");
        &self.texts[id as usize]
    }

    pub fn id_of(&self, text: &str) -> Option<SymbolId> {
        self.matchable.get(text).copied()
    }

    /// Greedy longest-match tokenization over grapheme and multi-char
    /// texts, one [`Token::Outside`] per character nothing matches.
    /// Deterministic and independent of lookup direction.
    pub(crate) fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            let limit = self.max_match_len.min(rest.len());

            // Candidate cut points, longest first.
            let mut ends: SmallVec<[usize; 8]> = SmallVec::new();
            for (i, c) in rest.char_indices() {
                let end = i + c.len_utf8();
                if end > limit {
                    break;
                }
                ends.push(end);
            }

            let hit = ends
                .iter()
                .rev()
                .find_map(|&end| self.matchable.get(&rest[..end]).map(|&id| (id, end)));

            match hit {
                Some((id, end)) => {
                    tokens.push(Token::Sym(id));
                    rest = &rest[end..];
                }
                None => {
                    let c = rest.chars().next().unwrap();
                    tokens.push(Token::Outside(c));
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        tokens
    }
}
