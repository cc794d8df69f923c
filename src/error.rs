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
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while constructing an [`Fst`](crate::Fst).
///
/// Lookup itself never fails: an input that reaches no accepting path
/// simply produces an empty result sequence.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    /// Malformed network input. `line` is the 1-based line number in the
    /// decompressed stream; 0 for conditions that predate line splitting
    /// (gzip failure, missing header).
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// File access failure in [`Fst::from_path`](crate::Fst::from_path).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub(crate) fn parse_err(line: usize, reason: impl Into<String>) -> Error {
    Error::Parse {
        line,
        reason: reason.into(),
    }
}
