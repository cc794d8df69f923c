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

//! Bidirectional lookup over finite-state transducers in the Foma text
//! network format.
//!
//! ```no_run
//! use foma_lookup::{Fst, FstOptions};
//!
//! let fst = Fst::from_path("english.fomabin", FstOptions::default())?;
//! for analysis in fst.analyze("eats") {
//!     println!("{}", analysis.join(" "));
//! }
//! # Ok::<(), foma_lookup::Error>(())
//! ```
mod caching;
mod environment;
mod lookup;
mod parse;

pub mod error;
pub mod flags;
pub mod fst;
pub mod sigma;
pub mod types;

pub use crate::error::{Error, Result};
pub use crate::flags::{FlagDiacritic, FlagOp};
pub use crate::fst::{Analyses, Fst, FstOptions, Surfaces};
pub use crate::sigma::SymbolTable;
pub use crate::types::{Automaton, StateId, Symbol, SymbolId};
