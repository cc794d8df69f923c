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

//! The bidirectional path search.
//!
//! One depth-first routine serves both lookup directions: `Down` matches
//! input against the lower side of each arc and collects the upper side
//! (analysis), `Up` is the mirror image (generation). The traversal is
//! non-deterministic — epsilon arcs and shared input symbols fan out —
//! so results form a lazy stream driven by an explicit frame stack
//! rather than recursion: each `next()` resumes exactly where the
//! previous one paused.
//!
//! Termination on cyclic networks comes from a per-path visited set of
//! `(state, input cursor, environment fingerprint)` triples: a branch
//! never re-enters a configuration already on its own stack, while
//! sibling branches are free to revisit it.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::flags::{FlagEnv, FlagOutcome};
use crate::sigma::Token;
use crate::types::{Automaton, StateId, Symbol, SymbolId};

/// Which arc label the input is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// Match lower, collect upper: surface form in, analyses out.
    Down,
    /// Match upper, collect lower: analysis in, surface forms out.
    Up,
}

/// One element of a raw output path. Almost always a symbol id; identity
/// pass-through emits the concrete input character instead, since a
/// character outside the alphabet has no id to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutSym {
    Sym(SymbolId),
    Literal(char),
}

struct Frame {
    state: StateId,
    cursor: usize,
    /// Index of the next untried arc of `state`.
    next_arc: usize,
    /// Output length on entry; backtracking truncates to it.
    out_len: usize,
    env: Rc<FlagEnv>,
    env_hash: u64,
    accept_checked: bool,
}

/// Lazy stream of accepting paths. Holds the whole search state; dropping
/// it abandons the search with nothing outstanding.
pub(crate) struct PathIter<'n> {
    net: &'n Automaton,
    side: Side,
    tokens: Vec<Token>,
    stack: Vec<Frame>,
    /// Single growable buffer shared by every frame on the stack.
    out: Vec<OutSym>,
    visited: FxHashSet<(StateId, usize, u64)>,
}

impl<'n> PathIter<'n> {
    pub(crate) fn new(net: &'n Automaton, side: Side, tokens: Vec<Token>) -> Self {
        let env = Rc::new(FlagEnv::default());
        let env_hash = env.fingerprint();

        let mut visited = FxHashSet::default();
        visited.insert((Automaton::START, 0, env_hash));

        PathIter {
            net,
            side,
            tokens,
            stack: vec![Frame {
                state: Automaton::START,
                cursor: 0,
                next_arc: 0,
                out_len: 0,
                env,
                env_hash,
                accept_checked: false,
            }],
            out: Vec::new(),
            visited,
        }
    }

    pub(crate) fn net(&self) -> &'n Automaton {
        self.net
    }

    /// Try arcs of the top frame until one can be traversed; push the
    /// resulting frame and report true, or report false when the top
    /// frame is exhausted.
    fn descend(&mut self) -> bool {
        loop {
            let top = self.stack.last_mut().expect("descend on empty stack");
            let (state, cursor, top_hash) = (top.state, top.cursor, top.env_hash);
            let arcs = self.net.arcs_from(state);

            if top.next_arc >= arcs.len() {
                return false;
            }
            let arc = arcs[top.next_arc];
            top.next_arc += 1;
            let env = Rc::clone(&top.env);

            let (in_sym, out_sym) = match self.side {
                Side::Down => (arc.lower, arc.upper),
                Side::Up => (arc.upper, arc.lower),
            };

            let Some((next_cursor, emit, new_env)) = self.step(in_sym, out_sym, cursor, &env)
            else {
                continue;
            };

            let (env, env_hash) = match new_env {
                Some(changed) => {
                    let hash = changed.fingerprint();
                    (Rc::new(changed), hash)
                }
                None => (env, top_hash),
            };

            let key = (arc.to, next_cursor, env_hash);
            if self.visited.contains(&key) {
                // Already on this path; taking the arc would loop.
                continue;
            }
            self.visited.insert(key);

            let out_len = self.out.len();
            self.out.push(emit);
            self.stack.push(Frame {
                state: arc.to,
                cursor: next_cursor,
                next_arc: 0,
                out_len,
                env,
                env_hash,
                accept_checked: false,
            });
            return true;
        }
    }

    /// Can the arc labelled `in_sym`/`out_sym` be traversed from input
    /// position `cursor`? On success: the new cursor, the output element,
    /// and a replacement environment when a flag changed it.
    fn step(
        &self,
        in_sym: SymbolId,
        out_sym: SymbolId,
        cursor: usize,
        env: &FlagEnv,
    ) -> Option<(usize, OutSym, Option<FlagEnv>)> {
        match self.net.sigma().symbol(in_sym) {
            Symbol::Flag(flag) => match env.evaluate(flag) {
                FlagOutcome::Fail => None,
                FlagOutcome::Pass => Some((cursor, OutSym::Sym(in_sym), None)),
                FlagOutcome::Update(next) => Some((cursor, OutSym::Sym(in_sym), Some(next))),
            },
            Symbol::Epsilon => Some((cursor, OutSym::Sym(out_sym), None)),
            Symbol::Unknown | Symbol::Identity => match self.tokens.get(cursor)? {
                Token::Outside(c) => Some((cursor + 1, self.wildcard_output(out_sym, *c), None)),
                Token::Sym(_) => None,
            },
            Symbol::Grapheme(_) | Symbol::MultiChar(_) => match self.tokens.get(cursor)? {
                Token::Sym(id) if *id == in_sym => Some((cursor + 1, OutSym::Sym(out_sym), None)),
                _ => None,
            },
        }
    }

    fn wildcard_output(&self, out_sym: SymbolId, c: char) -> OutSym {
        match self.net.sigma().symbol(out_sym) {
            // Identity passes the concrete character through.
            Symbol::Identity => OutSym::Literal(c),
            _ => OutSym::Sym(out_sym),
        }
    }
}

impl Iterator for PathIter<'_> {
    type Item = Vec<OutSym>;

    fn next(&mut self) -> Option<Vec<OutSym>> {
        while !self.stack.is_empty() {
            let top = self.stack.last_mut().expect("non-empty stack");
            if !top.accept_checked {
                top.accept_checked = true;
                if top.cursor == self.tokens.len() && self.net.is_accepting(top.state) {
                    return Some(self.out.clone());
                }
            }

            if !self.descend() {
                let frame = self.stack.pop().expect("non-empty stack");
                self.out.truncate(frame.out_len);
                self.visited
                    .remove(&(frame.state, frame.cursor, frame.env_hash));
            }
        }
        None
    }
}

/// Render a raw path as analysis elements: flags, epsilon, and the
/// wildcards contribute nothing; runs of adjacent characters coalesce
/// into one fragment; each multi-char tag stands alone.
pub(crate) fn render_analysis(net: &Automaton, path: &[OutSym]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut fragment = String::new();

    for out in path {
        match out {
            OutSym::Literal(c) => fragment.push(*c),
            OutSym::Sym(id) => match net.sigma().symbol(*id) {
                Symbol::Grapheme(text) => fragment.push_str(text),
                Symbol::MultiChar(text) => {
                    if !fragment.is_empty() {
                        parts.push(std::mem::take(&mut fragment));
                    }
                    parts.push(text.clone());
                }
                _ => {}
            },
        }
    }
    if !fragment.is_empty() {
        parts.push(fragment);
    }
    parts
}

/// Render a raw path as one surface string.
pub(crate) fn render_surface(net: &Automaton, path: &[OutSym]) -> String {
    let mut surface = String::new();
    for out in path {
        match out {
            OutSym::Literal(c) => surface.push(*c),
            OutSym::Sym(id) => {
                if let Some(text) = net.sigma().symbol(*id).visible_text() {
                    surface.push_str(text);
                }
            }
        }
    }
    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_text;

    fn paths(net: &Automaton, side: Side, input: &str) -> Vec<Vec<String>> {
        PathIter::new(net, side, net.sigma().tokenize(input))
            .map(|p| render_analysis(net, &p))
            .collect()
    }

    #[test]
    fn epsilon_self_loop_terminates() {
        let net = parse_text(
            "##foma-net 1.0##\n\
             ##props##\n\
             2 2 2 3 1 1 0 1 0 0 0 2 loop\n\
             ##sigma##\n\
             0 @_EPSILON_SYMBOL_@\n\
             3 a\n\
             ##states##\n\
             0 0 0 0\n\
             3 1\n\
             1 -1 -1 1\n\
             -1 -1 -1 -1 -1\n\
             ##end##\n",
        )
        .unwrap();

        let results = paths(&net, Side::Down, "a");
        assert_eq!(results, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn identity_passes_unknown_characters_through() {
        let net = parse_text(
            "##foma-net 1.0##\n\
             ##props##\n\
             2 1 2 2 1 1 1 1 1 1 1 2 id\n\
             ##sigma##\n\
             0 @_EPSILON_SYMBOL_@\n\
             1 @_UNKNOWN_SYMBOL_@\n\
             2 @_IDENTITY_SYMBOL_@\n\
             3 x\n\
             ##states##\n\
             0 2 1 0\n\
             1 -1 -1 1\n\
             -1 -1 -1 -1 -1\n\
             ##end##\n",
        )
        .unwrap();

        // 'q' is not in sigma: identity consumes it and emits it unchanged.
        assert_eq!(paths(&net, Side::Down, "q"), vec![vec!["q".to_string()]]);
        // 'x' is in sigma, so the identity arc must not match it.
        assert!(paths(&net, Side::Down, "x").is_empty());
    }

    #[test]
    fn unknown_matches_without_passing_through() {
        let net = parse_text(
            "##foma-net 1.0##\n\
             ##props##\n\
             2 1 2 2 1 1 1 1 1 1 1 2 unk\n\
             ##sigma##\n\
             0 @_EPSILON_SYMBOL_@\n\
             1 @_UNKNOWN_SYMBOL_@\n\
             2 @_IDENTITY_SYMBOL_@\n\
             3 x\n\
             ##states##\n\
             0 3 1 1 0\n\
             1 -1 -1 1\n\
             -1 -1 -1 -1 -1\n\
             ##end##\n",
        )
        .unwrap();

        // upper x : lower unknown — analyzing an out-of-sigma char
        // yields the upper symbol.
        assert_eq!(paths(&net, Side::Down, "q"), vec![vec!["x".to_string()]]);
        assert!(paths(&net, Side::Down, "x").is_empty());
    }

    #[test]
    fn empty_input_accepts_only_at_an_accepting_start() {
        let accepting = parse_text(
            "##foma-net 1.0##\n\
             ##props##\n\
             2 0 1 1 1 1 1 1 1 1 1 2 e\n\
             ##sigma##\n\
             0 @_EPSILON_SYMBOL_@\n\
             ##states##\n\
             0 -1 -1 1\n\
             -1 -1 -1 -1 -1\n\
             ##end##\n",
        )
        .unwrap();
        assert_eq!(paths(&accepting, Side::Down, "").len(), 1);
        assert!(paths(&accepting, Side::Down, "a").is_empty());
    }

    #[test]
    fn sibling_branches_may_revisit_states() {
        // Two epsilon arcs into the same accepting state: both paths must
        // be reported even though they share (state, cursor, env).
        let net = parse_text(
            "##foma-net 1.0##\n\
             ##props##\n\
             2 3 3 4 1 2 0 1 0 0 1 2 fan\n\
             ##sigma##\n\
             0 @_EPSILON_SYMBOL_@\n\
             3 +A\n\
             4 +B\n\
             ##states##\n\
             0 3 0 1 0\n\
             4 0 1\n\
             1 -1 -1 1\n\
             -1 -1 -1 -1 -1\n\
             ##end##\n",
        )
        .unwrap();

        let results = paths(&net, Side::Down, "");
        assert_eq!(
            results,
            vec![vec!["+A".to_string()], vec!["+B".to_string()]]
        );
    }

    #[test]
    fn enumeration_order_is_stable() {
        let net = parse_text(
            "##foma-net 1.0##\n\
             ##props##\n\
             2 3 3 4 1 2 0 1 0 0 1 2 fan\n\
             ##sigma##\n\
             0 @_EPSILON_SYMBOL_@\n\
             3 +A\n\
             4 +B\n\
             ##states##\n\
             0 3 0 1 0\n\
             4 0 1\n\
             1 -1 -1 1\n\
             -1 -1 -1 -1 -1\n\
             ##end##\n",
        )
        .unwrap();

        let first = paths(&net, Side::Down, "");
        let second = paths(&net, Side::Down, "");
        assert_eq!(first, second);
    }
}
