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

//! Reader for the Foma text network format.
//!
//! A network file is gzip-compressed UTF-8 text: a `##foma-net` header,
//! a `##props##` block, a `##sigma##` block of `<id> <text>` pairs, a
//! `##states##` block of whitespace-separated integer records, and an
//! `##end##` sentinel. State records come in four shapes (two to five
//! integers); records that omit the source state reuse the source of the
//! previous full record (the "implied state"). Files may concatenate
//! several networks; only the first is loaded.

use std::io::Read;

use flate2::read::GzDecoder;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{parse_err, Result};
use crate::flags::{parse_flag, FlagParse};
use crate::sigma::SymbolTable;
use crate::types::{Arc, Automaton, StateId, Symbol, SymbolId};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub(crate) fn load(bytes: &[u8]) -> Result<Automaton> {
    let text = inflate(bytes)?;
    parse_text(&text)
}

fn inflate(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .map_err(|e| parse_err(0, format!("gzip decompression failed: {e}")))?;
        Ok(text)
    } else {
        // Already-inflated network text, as produced by `zcat` or tests.
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| parse_err(0, format!("network text is not valid UTF-8: {e}")))
    }
}

enum Section {
    Header,
    PropsMarker,
    PropsBody,
    SigmaMarker,
    Sigma,
    States,
    End,
    Done,
}

struct Loader {
    sigma: SymbolTable,
    per_state: Vec<SmallVec<[Arc; 4]>>,
    accepting: Vec<StateId>,
    implied: Option<StateId>,
    name: String,
    arity: u32,
}

pub(crate) fn parse_text(text: &str) -> Result<Automaton> {
    let mut section = Section::Header;
    let mut loader = Loader {
        sigma: SymbolTable::with_epsilon(),
        per_state: Vec::new(),
        accepting: Vec::new(),
        implied: None,
        name: String::new(),
        arity: 2,
    };
    let mut last_line = 0;

    for (index, line) in text.lines().enumerate() {
        let ln = index + 1;
        last_line = ln;

        match section {
            Section::Header => {
                if line.trim().is_empty() {
                    continue;
                }
                if !line.starts_with("##foma-net") {
                    return Err(parse_err(
                        ln,
                        format!("expected ##foma-net header, found `{line}`"),
                    ));
                }
                section = Section::PropsMarker;
            }
            Section::PropsMarker => {
                if line.trim() != "##props##" {
                    return Err(parse_err(
                        ln,
                        format!("expected ##props## section, found `{line}`"),
                    ));
                }
                section = Section::PropsBody;
            }
            Section::PropsBody => {
                loader.read_props(ln, line)?;
                section = Section::SigmaMarker;
            }
            Section::SigmaMarker => {
                if line.trim() != "##sigma##" {
                    return Err(parse_err(
                        ln,
                        format!("expected ##sigma## section, found `{line}`"),
                    ));
                }
                section = Section::Sigma;
            }
            Section::Sigma => {
                if line.starts_with("##") {
                    if line.trim() == "##states##" {
                        section = Section::States;
                    } else {
                        return Err(parse_err(ln, format!("unrecognized section `{line}`")));
                    }
                } else if !line.trim().is_empty() {
                    loader.read_sigma_line(ln, line)?;
                }
            }
            Section::States => {
                if line.starts_with("##") {
                    if line.trim() == "##end##" {
                        section = Section::Done;
                    } else {
                        return Err(parse_err(ln, format!("unrecognized section `{line}`")));
                    }
                } else if loader.read_state_record(ln, line)? {
                    section = Section::End;
                }
            }
            Section::End => {
                if line.trim().is_empty() {
                    continue;
                }
                if line.trim() != "##end##" {
                    return Err(parse_err(ln, format!("expected ##end##, found `{line}`")));
                }
                section = Section::Done;
            }
            Section::Done => unreachable!(),
        }

        if matches!(section, Section::Done) {
            // First network wins; anything after ##end## is ignored.
            break;
        }
    }

    if !matches!(section, Section::Done) {
        return Err(parse_err(last_line, "truncated network: missing ##end##"));
    }

    let net = loader.finish();
    debug!(
        name = %net.name(),
        states = net.state_count(),
        arcs = net.arc_count(),
        sigma = net.sigma().len(),
        "loaded foma network"
    );
    Ok(net)
}

impl Loader {
    /// The properties line is mostly ignored: the first field (arity) and
    /// the last (network name) are kept.
    fn read_props(&mut self, ln: usize, line: &str) -> Result<()> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(parse_err(ln, "malformed properties line"));
        }
        self.arity = fields[0]
            .parse()
            .map_err(|_| parse_err(ln, format!("non-integer arity `{}`", fields[0])))?;
        self.name = fields[fields.len() - 1].to_string();
        Ok(())
    }

    /// `<id><sep><text>`: the id ends at the first whitespace character,
    /// exactly one separator character follows, and the rest of the line
    /// is the verbatim symbol text. A line `5  ` therefore defines the
    /// single-space symbol.
    fn read_sigma_line(&mut self, ln: usize, line: &str) -> Result<()> {
        let Some((pos, sep)) = line.char_indices().find(|&(_, c)| c.is_whitespace()) else {
            return Err(parse_err(
                ln,
                format!("sigma line `{line}` has no id/text separator"),
            ));
        };

        let id: SymbolId = line[..pos]
            .parse()
            .map_err(|_| parse_err(ln, format!("non-integer symbol id `{}`", &line[..pos])))?;
        let text = &line[pos + sep.len_utf8()..];
        if text.is_empty() {
            return Err(parse_err(ln, format!("symbol {id} has empty text")));
        }

        let symbol = classify(ln, text)?;
        self.sigma.define(id, text, symbol);
        Ok(())
    }

    /// Returns true when the record is the `-1 -1 -1 -1 -1` sentinel.
    fn read_state_record(&mut self, ln: usize, line: &str) -> Result<bool> {
        let mut fields: SmallVec<[i64; 5]> = SmallVec::new();
        for raw in line.split_whitespace() {
            if fields.len() == 5 {
                return Err(parse_err(ln, "state record has more than five fields"));
            }
            let n: i64 = raw
                .parse()
                .map_err(|_| parse_err(ln, format!("non-integer field `{raw}` in state record")))?;
            fields.push(n);
        }

        match fields.as_slice() {
            [] => Ok(false),
            [-1, -1, -1, -1, -1] => Ok(true),
            &[i, d] => {
                let s = self.implied(ln)?;
                self.record(ln, s, i, i, d, 0)
            }
            &[i, o, d] => {
                let s = self.implied(ln)?;
                self.record(ln, s, i, o, d, 0)
            }
            &[s, i, d, f] => self.full_record(ln, s, i, i, d, f),
            &[s, i, o, d, f] => self.full_record(ln, s, i, o, d, f),
            _ => Err(parse_err(
                ln,
                format!("state record has {} fields; expected 2 to 5", fields.len()),
            )),
        }
    }

    fn implied(&self, ln: usize) -> Result<StateId> {
        self.implied
            .ok_or_else(|| parse_err(ln, "implied-state shorthand before any full record"))
    }

    fn full_record(&mut self, ln: usize, s: i64, i: i64, o: i64, d: i64, f: i64) -> Result<bool> {
        if s < 0 {
            return Err(parse_err(ln, format!("negative source state {s}")));
        }
        let s = s as StateId;
        self.implied = Some(s);
        self.record(ln, s, i, o, d, f)
    }

    fn record(&mut self, ln: usize, s: StateId, i: i64, o: i64, d: i64, f: i64) -> Result<bool> {
        self.touch(s);
        if f > 0 {
            self.accepting.push(s);
        }
        if d < 0 {
            // Accepting-state-only record.
            return Ok(false);
        }
        if i < 0 || o < 0 {
            return Err(parse_err(ln, "arc record has a negative symbol id"));
        }

        let (upper, lower) = (i as SymbolId, o as SymbolId);
        for id in [upper, lower] {
            if !self.sigma.contains(id) {
                return Err(parse_err(
                    ln,
                    format!("arc references symbol id {id} absent from sigma"),
                ));
            }
        }

        let to = d as StateId;
        self.touch(to);
        self.per_state[s as usize].push(Arc { upper, lower, to });
        Ok(false)
    }

    /// States are declared implicitly by appearing in a record; the state
    /// vector grows lazily as new ids are observed.
    fn touch(&mut self, state: StateId) {
        let index = state as usize;
        if self.per_state.len() <= index {
            self.per_state.resize_with(index + 1, SmallVec::new);
        }
    }

    fn finish(self) -> Automaton {
        Automaton::new(
            self.per_state,
            &self.accepting,
            self.sigma,
            self.name,
            self.arity,
        )
    }
}

fn classify(ln: usize, text: &str) -> Result<Symbol> {
    match text {
        "@_EPSILON_SYMBOL_@" => Ok(Symbol::Epsilon),
        "@_UNKNOWN_SYMBOL_@" => Ok(Symbol::Unknown),
        "@_IDENTITY_SYMBOL_@" => Ok(Symbol::Identity),
        _ => match parse_flag(text) {
            FlagParse::Flag(flag) => Ok(Symbol::Flag(flag)),
            FlagParse::Malformed(reason) => Err(parse_err(ln, reason)),
            FlagParse::NotAFlag => Ok(if text.chars().count() == 1 {
                Symbol::Grapheme(text.to_string())
            } else {
                Symbol::MultiChar(text.to_string())
            }),
        },
    }
}
