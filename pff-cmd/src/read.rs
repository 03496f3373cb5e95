use anyhow::{Context, Result};
use pff::decode::MetadataColumn;
use pff::{DecodeOptions, MetadataTable, PffFile, SampleBlock};
use serde::Serialize;
use std::{
    io::{stdout, Write},
    path::Path,
};
use tracing::info;

use crate::info::{render_text, Format};

#[derive(Debug, Clone, PartialEq, Serialize)]
struct FieldSummary {
    name: String,
    first: u64,
    last: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Summary {
    filename: String,
    samples: usize,
    pixels: usize,
    channel: String,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    fields: Vec<FieldSummary>,
}

#[derive(Serialize)]
struct Decoded<'a> {
    data: &'a SampleBlock,
    metadata: &'a MetadataTable,
}

fn field_summaries(metadata: &MetadataTable) -> Vec<FieldSummary> {
    let one = |prefix: Option<&str>, col: &MetadataColumn| {
        let (first, last) = (col.values.first()?, col.values.last()?);
        Some(FieldSummary {
            name: prefix.map_or_else(|| col.name.to_string(), |p| format!("{p}.{}", col.name)),
            first: *first,
            last: *last,
        })
    };
    match metadata {
        MetadataTable::Flat(cols) => cols.iter().filter_map(|c| one(None, c)).collect(),
        MetadataTable::Quadrants(quads) => quads
            .iter()
            .flat_map(|q| q.columns.iter().filter_map(move |c| one(Some(q.key), c)))
            .collect(),
        MetadataTable::Empty => Vec::default(),
    }
}

fn summarize(
    fpath: &Path,
    data: &SampleBlock,
    metadata: &MetadataTable,
    channel: Option<usize>,
) -> Summary {
    let values = data.to_f64();
    let (min, max, mean) = if values.is_empty() {
        (None, None, None)
    } else {
        (
            Some(values.fold(f64::INFINITY, |a, &b| a.min(b))),
            Some(values.fold(f64::NEG_INFINITY, |a, &b| a.max(b))),
            values.mean(),
        )
    };

    Summary {
        filename: fpath.to_string_lossy().to_string(),
        samples: data.samples(),
        pixels: data.pixels(),
        channel: channel.map_or_else(|| "all".to_string(), |c| c.to_string()),
        min,
        max,
        mean,
        fields: field_summaries(metadata),
    }
}

pub fn read(
    fpath: &Path,
    samples: Option<usize>,
    channel: Option<usize>,
    metadata: bool,
    format: &Format,
) -> Result<()> {
    let pff = PffFile::open(fpath).context("resolving record geometry")?;
    let mut opts = DecodeOptions::builder().include_metadata(metadata).build();
    opts.sample_limit = samples;
    opts.channel = channel;

    let (data, table) = pff
        .read(&opts)
        .with_context(|| format!("decoding {:?}", pff.path()))?;
    info!("decoded {} samples from {:?}", data.samples(), pff.path());

    match format {
        Format::Json => serde_json::to_writer(
            stdout(),
            &Decoded {
                data: &data,
                metadata: &table,
            },
        )
        .context("serializing to json"),
        Format::Text => {
            let summary = summarize(pff.path(), &data, &table, channel);
            let text = render_text(TEXT_TEMPLATE, &summary).context("serializing summary")?;
            stdout()
                .write_all(str::as_bytes(&text))
                .context("writing to stdout")
        }
    }
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Samples: {{ samples }}
Pixels:  {{ pixels }}
Channel: {{ channel }}
Min:     {{ min }}
Max:     {{ max }}
Mean:    {{ mean }}
{{ #if fields }}-------------------------------------------------------------------------------
Field                                   First                 Last
-------------------------------------------------------------------------------
{{ #each fields }}{{ name }}{{ lpad 40 first }}{{ lpad 21 last }}
{{ /each }}{{ /if }}";

#[cfg(test)]
mod tests {
    use super::*;
    use pff::decode::QuadrantMetadata;

    #[test]
    fn test_field_summaries() {
        let table = MetadataTable::Quadrants(vec![QuadrantMetadata {
            key: "quabo_2",
            columns: vec![
                MetadataColumn {
                    name: "pkt_num",
                    values: vec![10, 11, 12],
                },
                MetadataColumn {
                    name: "tv_sec",
                    values: vec![],
                },
            ],
        }]);

        let fields = field_summaries(&table);

        assert_eq!(
            fields,
            vec![FieldSummary {
                name: "quabo_2.pkt_num".to_string(),
                first: 10,
                last: 12,
            }]
        );
        assert!(field_summaries(&MetadataTable::Empty).is_empty());
    }

    #[test]
    fn test_summarize_empty() {
        let data = SampleBlock::empty(pff::layout::ElementType::U8, 1);
        let summary = summarize(Path::new("x.pff"), &data, &MetadataTable::Empty, Some(4));

        assert_eq!(summary.samples, 0);
        assert_eq!(summary.min, None);
        assert_eq!(summary.mean, None);

        let text = render_text(TEXT_TEMPLATE, &summary).unwrap();
        assert!(text.contains("Channel: 4\n"), "{text}");
    }
}
