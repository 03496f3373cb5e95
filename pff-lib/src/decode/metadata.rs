use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::trace;

use crate::layout::{FieldLayout, FieldRange, Layout};
use crate::{Error, Result};

/// Per-sample values of one header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataColumn {
    pub name: &'static str,
    pub values: Vec<u64>,
}

/// Header fields of one quabo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadrantMetadata {
    /// Quabo key, e.g., `quabo_0`.
    pub key: &'static str,
    pub columns: Vec<MetadataColumn>,
}

/// Columnar record header values, index aligned with the rows of the decoded
/// [SampleBlock](super::SampleBlock).
///
/// Serializes as a JSON object of field name to values, nested under the quabo key
/// for per-quabo layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetadataTable {
    /// Metadata was not decoded.
    #[default]
    Empty,
    Flat(Vec<MetadataColumn>),
    Quadrants(Vec<QuadrantMetadata>),
}

impl MetadataTable {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Number of samples, i.e., the length of every column.
    #[must_use]
    pub fn samples(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Flat(cols) => cols.first().map_or(0, |c| c.values.len()),
            Self::Quadrants(quads) => quads
                .iter()
                .find_map(|q| q.columns.first())
                .map_or(0, |c| c.values.len()),
        }
    }

    /// Values of a top-level field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[u64]> {
        match self {
            Self::Flat(cols) => find(cols, name),
            _ => None,
        }
    }

    /// Values of a field under the quabo object `key`.
    #[must_use]
    pub fn quadrant_field(&self, key: &str, name: &str) -> Option<&[u64]> {
        match self {
            Self::Quadrants(quads) => find(&quads.iter().find(|q| q.key == key)?.columns, name),
            _ => None,
        }
    }

    /// Top-level keys; field names for flat tables, quabo keys for nested ones.
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        match self {
            Self::Empty => vec![],
            Self::Flat(cols) => cols.iter().map(|c| c.name).collect(),
            Self::Quadrants(quads) => quads.iter().map(|q| q.key).collect(),
        }
    }
}

fn find<'a>(cols: &'a [MetadataColumn], name: &str) -> Option<&'a [u64]> {
    cols.iter()
        .find(|c| c.name == name)
        .map(|c| c.values.as_slice())
}

struct Columns<'a>(&'a [MetadataColumn]);

impl Serialize for Columns<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for col in self.0 {
            map.serialize_entry(col.name, &col.values)?;
        }
        map.end()
    }
}

impl Serialize for MetadataTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_map(Some(0))?.end(),
            Self::Flat(cols) => Columns(cols).serialize(serializer),
            Self::Quadrants(quads) => {
                let mut map = serializer.serialize_map(Some(quads.len()))?;
                for q in quads {
                    map.serialize_entry(q.key, &Columns(&q.columns))?;
                }
                map.end()
            }
        }
    }
}

/// Strip the NUL/whitespace padding following the JSON text of a header.
pub(crate) fn trim_header(header: &[u8]) -> &[u8] {
    let end = header
        .iter()
        .rposition(|b| !matches!(b, 0 | b' ' | b'\n' | b'\r' | b'\t'))
        .map_or(0, |i| i + 1);
    &header[..end]
}

/// Decode the JSON header of a record. `header` must not include the sentinel.
pub(crate) fn parse_header(header: &[u8]) -> Result<Map<String, Value>> {
    Ok(serde_json::from_slice(trim_header(header))?)
}

/// Build the metadata table for the whole records in `buf`.
///
/// The schema comes from the JSON header of the first record; values for every
/// record are then sliced from the registered byte ranges.
pub(crate) fn decode_metadata(
    buf: &[u8],
    record_width: usize,
    layout: &Layout,
) -> Result<MetadataTable> {
    if buf.len() < record_width {
        return Ok(MetadataTable::Empty);
    }
    let header = parse_header(&buf[..layout.json_width()])?;
    trace!(fields = ?header.keys().collect::<Vec<_>>(), "metadata schema");

    match layout.fields {
        FieldLayout::Flat(ranges) => {
            check_fields(&header, ranges, None)?;
            Ok(MetadataTable::Flat(columns(buf, record_width, ranges, &header, None)?))
        }
        FieldLayout::Quadrants(quads) => {
            for (key, value) in &header {
                let Some(quad) = quads.iter().find(|q| q.key == key) else {
                    return Err(Error::UnknownMetadataField(key.clone()));
                };
                let Value::Object(fields) = value else {
                    return Err(Error::MalformedMetadata {
                        field: key.clone(),
                        sample: 0,
                        value: value.to_string(),
                    });
                };
                check_fields(fields, quad.fields, Some(quad.key))?;
            }

            let mut out = Vec::with_capacity(quads.len());
            for quad in quads {
                let Some(Value::Object(fields)) = header.get(quad.key) else {
                    continue;
                };
                out.push(QuadrantMetadata {
                    key: quad.key,
                    columns: columns(buf, record_width, quad.fields, fields, Some(quad.key))?,
                });
            }
            Ok(MetadataTable::Quadrants(out))
        }
    }
}

fn check_fields(
    fields: &Map<String, Value>,
    ranges: &[FieldRange],
    quadrant: Option<&str>,
) -> Result<()> {
    for name in fields.keys() {
        if !ranges.iter().any(|r| r.name == name) {
            return Err(Error::UnknownMetadataField(label(quadrant, name)));
        }
    }
    Ok(())
}

fn label(quadrant: Option<&str>, name: &str) -> String {
    match quadrant {
        Some(q) => format!("{q}.{name}"),
        None => name.to_string(),
    }
}

/// Extract columns, in registry order, for the fields present in `fields`.
fn columns(
    buf: &[u8],
    record_width: usize,
    ranges: &'static [FieldRange],
    fields: &Map<String, Value>,
    quadrant: Option<&str>,
) -> Result<Vec<MetadataColumn>> {
    ranges
        .iter()
        .filter(|r| fields.contains_key(r.name))
        .map(|r| {
            Ok(MetadataColumn {
                name: r.name,
                values: column(buf, record_width, r, quadrant)?,
            })
        })
        .collect()
}

fn column(
    buf: &[u8],
    record_width: usize,
    range: &FieldRange,
    quadrant: Option<&str>,
) -> Result<Vec<u64>> {
    buf.chunks_exact(record_width)
        .enumerate()
        .map(|(sample, record)| {
            let raw = &record[range.start..range.end];
            parse_digits(raw).ok_or_else(|| Error::MalformedMetadata {
                field: label(quadrant, range.name),
                sample,
                value: String::from_utf8_lossy(raw).into_owned(),
            })
        })
        .collect()
}

/// Parse a space padded ASCII decimal.
fn parse_digits(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}
