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

//! Output formats and the enumerated options of a data query.
//!
//! The requested [`DataFormat`] decides two things: whether the upstream body
//! is pulled as a stream, and how it is decoded before being handed back
//! ([`Encoding`]).

use crate::error::{Result, StatbankError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Output format of a data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    #[default]
    JsonStat,
    Json,
    Csv,
    Xlsx,
    Bulk,
    Px,
    Tsv,
    Html5,
    Html5InclNotes,
    SdmxCompact,
    SdmxGeneric,
}

/// How a response body is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Parsed structured data
    Json,
    /// UTF-8 text, returned verbatim
    Text,
    /// Opaque bytes
    Binary,
}

impl DataFormat {
    /// Every format accepted by the data endpoint, in upstream order.
    pub fn all() -> &'static [DataFormat] {
        &[
            Self::JsonStat,
            Self::Json,
            Self::Csv,
            Self::Xlsx,
            Self::Bulk,
            Self::Px,
            Self::Tsv,
            Self::Html5,
            Self::Html5InclNotes,
            Self::SdmxCompact,
            Self::SdmxGeneric,
        ]
    }

    /// Spelling sent in the `format` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonStat => "JSONSTAT",
            Self::Json => "JSON",
            Self::Csv => "CSV",
            Self::Xlsx => "XLSX",
            Self::Bulk => "BULK",
            Self::Px => "PX",
            Self::Tsv => "TSV",
            Self::Html5 => "HTML5",
            Self::Html5InclNotes => "HTML5InclNotes",
            Self::SdmxCompact => "SDMXCOMPACT",
            Self::SdmxGeneric => "SDMXGENERIC",
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Json | Self::JsonStat => Encoding::Json,
            Self::Csv | Self::Px | Self::Tsv | Self::Html5 | Self::Html5InclNotes => {
                Encoding::Text
            }
            Self::Xlsx | Self::Bulk | Self::SdmxCompact | Self::SdmxGeneric => Encoding::Binary,
        }
    }

    /// Large-payload formats are pulled from upstream as a chunked stream.
    pub fn is_streamed(&self) -> bool {
        matches!(self, Self::Bulk | Self::SdmxCompact | Self::SdmxGeneric)
    }

    /// MIME type used when relaying the payload.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::JsonStat | Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Tsv => "text/tab-separated-values; charset=utf-8",
            Self::Px => "text/plain; charset=utf-8",
            Self::Html5 | Self::Html5InclNotes => "text/html; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Bulk => "application/octet-stream",
            Self::SdmxCompact | Self::SdmxGeneric => "application/xml",
        }
    }

    /// Comma-separated list of valid formats, for error messages.
    pub fn valid_list() -> String {
        Self::all()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = StatbankError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();
        Self::all()
            .iter()
            .copied()
            .find(|f| f.as_str().to_uppercase() == normalized)
            .ok_or_else(|| {
                StatbankError::invalid(format!(
                    "Invalid format '{}'. Valid formats are: {}",
                    s,
                    Self::valid_list()
                ))
            })
    }
}

/// Sort order of the time variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOrder {
    Ascending,
    Descending,
}

impl TimeOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }
}

impl FromStr for TimeOrder {
    type Err = StatbankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ascending" => Ok(Self::Ascending),
            "descending" => Ok(Self::Descending),
            _ => Err(StatbankError::invalid(format!(
                "Invalid timeOrder '{}'. Valid values are: Ascending, Descending",
                s
            ))),
        }
    }
}

/// Whether values are presented as codes or texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePresentation {
    Code,
    Text,
}

impl ValuePresentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "Code",
            Self::Text => "Text",
        }
    }
}

impl FromStr for ValuePresentation {
    type Err = StatbankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "code" => Ok(Self::Code),
            "text" => Ok(Self::Text),
            _ => Err(StatbankError::invalid(format!(
                "Invalid valuePresentation '{}'. Valid values are: Code, Text",
                s
            ))),
        }
    }
}

// All three enums travel as their canonical spelling and parse leniently.
macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(DataFormat);
string_serde!(TimeOrder);
string_serde!(ValuePresentation);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("csv".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        assert_eq!("JsonStat".parse::<DataFormat>().unwrap(), DataFormat::JsonStat);
        assert_eq!(
            "html5inclnotes".parse::<DataFormat>().unwrap(),
            DataFormat::Html5InclNotes
        );
        assert_eq!(DataFormat::Html5InclNotes.as_str(), "HTML5InclNotes");
    }

    #[test]
    fn test_unknown_format_lists_valid_set() {
        let err = "parquet".parse::<DataFormat>().unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        let message = err.to_string();
        assert!(message.contains("parquet"));
        for format in DataFormat::all() {
            assert!(message.contains(format.as_str()), "missing {}", format);
        }
    }

    #[test]
    fn test_encoding_families() {
        let json: Vec<_> = DataFormat::all()
            .iter()
            .filter(|f| f.encoding() == Encoding::Json)
            .collect();
        assert_eq!(json, vec![&DataFormat::JsonStat, &DataFormat::Json]);

        for f in [
            DataFormat::Csv,
            DataFormat::Px,
            DataFormat::Tsv,
            DataFormat::Html5,
            DataFormat::Html5InclNotes,
        ] {
            assert_eq!(f.encoding(), Encoding::Text, "{}", f);
        }

        for f in [
            DataFormat::Xlsx,
            DataFormat::Bulk,
            DataFormat::SdmxCompact,
            DataFormat::SdmxGeneric,
        ] {
            assert_eq!(f.encoding(), Encoding::Binary, "{}", f);
        }
    }

    #[test]
    fn test_streamed_formats() {
        let streamed: Vec<_> = DataFormat::all()
            .iter()
            .filter(|f| f.is_streamed())
            .map(|f| f.as_str())
            .collect();
        assert_eq!(streamed, vec!["BULK", "SDMXCOMPACT", "SDMXGENERIC"]);
    }

    #[test]
    fn test_serde_uses_canonical_spelling() {
        let format: DataFormat = serde_json::from_str("\"tsv\"").unwrap();
        assert_eq!(serde_json::to_string(&format).unwrap(), "\"TSV\"");

        let order: TimeOrder = serde_json::from_str("\"descending\"").unwrap();
        assert_eq!(serde_json::to_string(&order).unwrap(), "\"Descending\"");

        assert!(serde_json::from_str::<ValuePresentation>("\"label\"").is_err());
    }
}
