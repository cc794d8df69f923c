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

//! Flag diacritics: zero-surface symbols that constrain a feature
//! environment instead of matching input.
//!
//! A flag looks like `@P.CASE.NOM@` — operator, feature, optional value.
//! Traversing an arc carrying one either fails (the branch is pruned) or
//! succeeds, possibly replacing the environment along that branch:
//!
//! | Op | Value    | Precondition                              | Effect            |
//! |----|----------|-------------------------------------------|-------------------|
//! | P  | required | none                                      | feature := value  |
//! | N  | required | none                                      | feature := ¬value |
//! | R  | optional | set (no value) / set to value             | none              |
//! | D  | optional | unset (no value) / not set to value       | none              |
//! | C  | none     | none                                      | clear feature     |
//! | U  | required | unset, == value, or ¬other                | feature := value  |

use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

static FLAG_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([A-Z])\.([^.@]+)(?:\.([^@]+))?@$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagOp {
    /// `P`: positive setting.
    Positive,
    /// `N`: negative setting.
    Negative,
    /// `R`: require.
    Require,
    /// `D`: disallow.
    Disallow,
    /// `C`: clear.
    Clear,
    /// `U`: unification.
    Unify,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagDiacritic {
    pub op: FlagOp,
    pub feature: String,
    pub value: Option<String>,
}

/// Result of inspecting a sigma text for flag shape.
pub(crate) enum FlagParse {
    /// Not flag-shaped at all; classify as an ordinary symbol.
    NotAFlag,
    Flag(FlagDiacritic),
    /// Flag-shaped but invalid (unknown operator, wrong arity).
    Malformed(String),
}

pub(crate) fn parse_flag(text: &str) -> FlagParse {
    let Some(caps) = FLAG_SHAPE.captures(text) else {
        return FlagParse::NotAFlag;
    };

    let op = match &caps[1] {
        "P" => FlagOp::Positive,
        "N" => FlagOp::Negative,
        "R" => FlagOp::Require,
        "D" => FlagOp::Disallow,
        "C" => FlagOp::Clear,
        "U" => FlagOp::Unify,
        other => {
            return FlagParse::Malformed(format!(
                "unknown flag-diacritic operator `{other}` in `{text}`"
            ))
        }
    };

    let feature = caps[2].to_string();
    let value = caps.get(3).map(|m| m.as_str().to_string());

    match (op, &value) {
        (FlagOp::Positive | FlagOp::Negative | FlagOp::Unify, None) => {
            FlagParse::Malformed(format!("flag `{text}` requires a value"))
        }
        (FlagOp::Clear, Some(_)) => {
            FlagParse::Malformed(format!("flag `{text}` does not take a value"))
        }
        _ => FlagParse::Flag(FlagDiacritic { op, feature, value }),
    }
}

/// A feature binding. Absence from the environment means "unset".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum FlagValue {
    Set(String),
    Negated(String),
}

/// The feature environment threaded through a search. Fresh at the root of
/// every lookup; replaced (never mutated in place) along a branch whenever
/// a flag with a post-effect succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FlagEnv {
    values: FxHashMap<String, FlagValue>,
}

pub(crate) enum FlagOutcome {
    /// Constraint violated; prune the branch.
    Fail,
    /// Constraint satisfied, environment unchanged.
    Pass,
    /// Constraint satisfied with a new environment.
    Update(FlagEnv),
}

impl FlagEnv {
    pub(crate) fn evaluate(&self, flag: &FlagDiacritic) -> FlagOutcome {
        let current = self.values.get(&flag.feature);

        match (flag.op, flag.value.as_deref()) {
            (FlagOp::Positive, Some(v)) => self.rebind(&flag.feature, FlagValue::Set(v.to_string())),
            (FlagOp::Negative, Some(v)) => {
                self.rebind(&flag.feature, FlagValue::Negated(v.to_string()))
            }
            (FlagOp::Require, None) => match current {
                Some(_) => FlagOutcome::Pass,
                None => FlagOutcome::Fail,
            },
            (FlagOp::Require, Some(v)) => match current {
                Some(FlagValue::Set(cur)) if cur == v => FlagOutcome::Pass,
                _ => FlagOutcome::Fail,
            },
            (FlagOp::Disallow, None) => match current {
                None => FlagOutcome::Pass,
                Some(_) => FlagOutcome::Fail,
            },
            (FlagOp::Disallow, Some(v)) => match current {
                Some(FlagValue::Set(cur)) if cur == v => FlagOutcome::Fail,
                _ => FlagOutcome::Pass,
            },
            (FlagOp::Clear, _) => {
                if current.is_none() {
                    FlagOutcome::Pass
                } else {
                    let mut next = self.clone();
                    next.values.remove(&flag.feature);
                    FlagOutcome::Update(next)
                }
            }
            (FlagOp::Unify, Some(v)) => match current {
                None => self.rebind(&flag.feature, FlagValue::Set(v.to_string())),
                Some(FlagValue::Set(cur)) if cur == v => FlagOutcome::Pass,
                Some(FlagValue::Negated(cur)) if cur != v => {
                    self.rebind(&flag.feature, FlagValue::Set(v.to_string()))
                }
                Some(_) => FlagOutcome::Fail,
            },
            // Arities the parser rejects; unreachable for parsed networks.
            _ => FlagOutcome::Fail,
        }
    }

    fn rebind(&self, feature: &str, value: FlagValue) -> FlagOutcome {
        if self.values.get(feature) == Some(&value) {
            return FlagOutcome::Pass;
        }
        let mut next = self.clone();
        next.values.insert(feature.to_string(), value);
        FlagOutcome::Update(next)
    }

    /// Order-independent digest of the bindings, used in the search's
    /// cycle-guard key so that revisiting a state with a different
    /// environment is not mistaken for a cycle.
    pub(crate) fn fingerprint(&self) -> u64 {
        let mut pairs: Vec<(&String, &FlagValue)> = self.values.iter().collect();
        pairs.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

        let mut hasher = FxHasher::default();
        for (feature, value) in pairs {
            feature.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        hasher.finish()
    }
}
