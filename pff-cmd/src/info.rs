use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use pff::layout::ElementType;
use pff::{PffFile, ProductType};
use serde::Serialize;
use std::{
    io::{stdout, Write},
    path::Path,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    start: String,
    product: ProductType,
    element: ElementType,
    module: u32,
    seqno: u32,
    metadata_width: usize,
    pixel_count: usize,
    record_width: usize,
    samples: usize,
}

fn summarize(fpath: &Path) -> Result<Info> {
    let pff = PffFile::open(fpath).context("resolving record geometry")?;
    let geo = pff.geometry();
    debug!("{geo:?}");
    let samples = pff.sample_count().context("counting samples")?;

    Ok(Info {
        filename: pff.path().to_string_lossy().to_string(),
        start: geo.start.and_utc().to_rfc3339(),
        product: geo.product,
        element: geo.layout().element,
        module: geo.module,
        seqno: geo.seqno,
        metadata_width: geo.metadata_width,
        pixel_count: geo.pixel_count,
        record_width: geo.record_width,
        samples,
    })
}

pub fn info(fpath: &Path, format: &Format) -> Result<()> {
    let info = summarize(fpath)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(TEXT_TEMPLATE, &info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

/// Render `data` with a handlebars template. Templates may use `lpad <width> <value>`.
pub fn render_text<T: Serialize>(template: &str, data: &T) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or(0).max(v.len());
        format!("{}{v}", " ".repeat(num - v.len()))
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("text", template)
        .context("registering template")?;

    hb.render("text", data).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Start:          {{ start }}
Product:        {{ product }} ({{ element }})
Module:         {{ module }}
Seqno:          {{ seqno }}
Metadata width: {{ metadata_width }}
Pixels:         {{ pixel_count }}
Record width:   {{ record_width }}
Samples:        {{ samples }}
";
