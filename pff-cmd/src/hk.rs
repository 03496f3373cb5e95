use anyhow::{Context, Result};
use pff::hk::Housekeeping;
use std::{io::stdout, path::Path};
use tracing::debug;

pub fn hk(fpath: &Path, source: Option<&str>) -> Result<()> {
    let hk = Housekeeping::from_file(fpath).with_context(|| format!("reading {fpath:?}"))?;
    debug!("sources: {:?}", hk.sources().collect::<Vec<_>>());

    match source {
        Some(name) => {
            let category = hk
                .get(name)
                .with_context(|| format!("no {name} housekeeping in {fpath:?}"))?;
            serde_json::to_writer_pretty(stdout(), category).context("serializing to json")
        }
        None => serde_json::to_writer_pretty(stdout(), &hk).context("serializing to json"),
    }
}
