//! Housekeeping file reading.
//!
//! Housekeeping files (`hk.pff`) contain one JSON object per line. Each object has a
//! single key naming the source, e.g., `QUABO`, `WRSWITCH`, or `GPS`, whose value is an
//! object of telemetry fields. Values are collected per source and field in file
//! order.
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::Result;

/// A housekeeping value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HkValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HkValue {
    /// Parse text as an integer, then a float, and otherwise keep it as text.
    ///
    /// ```
    /// use pff::hk::HkValue;
    ///
    /// assert_eq!(HkValue::parse("12"), HkValue::Integer(12));
    /// assert_eq!(HkValue::parse("1.0"), HkValue::Float(1.0));
    /// assert_eq!(HkValue::parse("0x1f"), HkValue::Text("0x1f".into()));
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Self::Integer(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Self::Float(v);
        }
        Self::Text(s.to_string())
    }

    /// Coerce a JSON value. Numbers are parsed from their textual form, so `1.0` stays
    /// a float, and booleans become 0 or 1.
    #[must_use]
    pub fn coerce(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            Value::Bool(b) => Self::Integer(i64::from(*b)),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Fields reported under instrument specific labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    DetectorTemp,
    FpgaTemp,
}

impl CanonicalField {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DetectorTemp => "det_temp",
            Self::FpgaTemp => "fpga_temp",
        }
    }
}

/// Instrument labels and the canonical field they report.
const ALIASES: &[(&str, CanonicalField)] = &[
    ("TEMP1", CanonicalField::DetectorTemp),
    ("TEMP2", CanonicalField::FpgaTemp),
];

/// The name a housekeeping field is stored under.
#[must_use]
pub fn canonical_name(label: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == label)
        .map_or(label, |(_, field)| field.name())
}

/// Field values of a single housekeeping source.
pub type Category = BTreeMap<String, Vec<HkValue>>;

/// Housekeeping values by source and field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Housekeeping {
    categories: BTreeMap<String, Category>,
}

impl Housekeeping {
    /// Read housekeeping lines from `reader`.
    ///
    /// Lines that are not a JSON object with exactly one object valued key are skipped.
    /// The fields of a source are fixed by the first line seen for it; fields that only
    /// appear later are ignored so all values of a source stay aligned.
    ///
    /// # Errors
    /// [crate::Error::Io] if reading fails.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut hk = Housekeeping::default();
        // label -> stored name, per source
        let mut schemas: HashMap<String, HashMap<String, String>> = HashMap::new();

        for (lineno, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let Ok(obj) = serde_json::from_slice::<Map<String, Value>>(&line) else {
                debug!(lineno, "skipping non-JSON housekeeping line");
                continue;
            };
            let mut entries = obj.into_iter();
            let (Some((source, Value::Object(fields))), None) = (entries.next(), entries.next())
            else {
                debug!(lineno, "skipping housekeeping line without a single source object");
                continue;
            };

            let schema = schemas.entry(source.clone()).or_insert_with(|| {
                fields
                    .keys()
                    .map(|label| (label.clone(), canonical_name(label).to_string()))
                    .collect()
            });
            let category = hk.categories.entry(source).or_insert_with(|| {
                schema
                    .values()
                    .map(|name| (name.clone(), Vec::new()))
                    .collect()
            });

            for (label, value) in &fields {
                let Some(name) = schema.get(label) else {
                    trace!(label, "ignoring field not in source schema");
                    continue;
                };
                if let Some(values) = category.get_mut(name) {
                    values.push(HkValue::coerce(value));
                }
            }
        }
        Ok(hk)
    }

    /// Read the housekeeping file at `path`.
    ///
    /// # Errors
    /// [crate::Error::Io] if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Source names, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, source: &str) -> Option<&Category> {
        self.categories.get(source)
    }

    #[must_use]
    pub fn field(&self, source: &str, name: &str) -> Option<&[HkValue]> {
        self.get(source)?.get(name).map(Vec::as_slice)
    }
}
