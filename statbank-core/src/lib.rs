// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Statbank Core
//!
//! Typed queries for the Statbank statistics API (subjects, tables, table
//! metadata and table data) and the client that forwards them upstream.

pub mod client;
pub mod error;
pub mod filter;
pub mod format;
pub mod query;

pub use client::{ClientConfig, StatbankClient, TableData, DEFAULT_BASE_URL};
pub use error::{Result, StatbankError, UpstreamDetail};
pub use filter::VariableFilter;
pub use format::{DataFormat, Encoding, TimeOrder, ValuePresentation};
pub use query::{DataQuery, Endpoint, SubjectsQuery, TableInfoQuery, TablesQuery, DEFAULT_LANG};
