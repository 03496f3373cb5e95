#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use pff::layout::{ElementType, FieldLayout, FieldRange, Layout};
use pff::pixelmap::QUABO_DIM;
use pff::{FileGeometry, ProductType};

pub fn file_name(product: ProductType) -> String {
    format!(
        "start_2023-08-02T00:39:53Z.dp_{}.bpp_{}.module_254.seqno_0.pff",
        product.tag(),
        product.layout().element.width()
    )
}

pub fn geometry(product: ProductType) -> FileGeometry {
    FileGeometry::from_file_name(file_name(product)).unwrap()
}

/// Header value written for `field` of `quadrant` in `sample`, sized to fit the range.
pub fn field_value(
    quadrant: Option<usize>,
    field: &FieldRange,
    index: usize,
    sample: usize,
) -> u64 {
    let q = quadrant.map_or(0, |q| q + 1);
    let max = 10u64.pow(u32::try_from(field.len() - 1).unwrap());
    (q as u64 * 1000 + sample as u64 * 10 + index as u64) % max
}

/// Pixel value written for `(sample, pixel)`.
pub fn pixel_value(element: ElementType, sample: usize, pixel: usize) -> i64 {
    let v = (sample * 1031 + pixel * 7) as i64;
    match element {
        ElementType::I16 => v % 60000 - 30000,
        ElementType::U16 => v % 65536,
        ElementType::U8 => v % 256,
    }
}

fn put(buf: &mut [u8], at: usize, text: &str) {
    buf[at..at + text.len()].copy_from_slice(text.as_bytes());
}

/// Write the fields of one JSON object so each value lands exactly on its range.
/// `open` is written before the first key, returns the end of the last value.
fn put_fields(
    buf: &mut [u8],
    mut pos: usize,
    open: &str,
    fields: &[FieldRange],
    quadrant: Option<usize>,
    sample: usize,
) -> usize {
    for (index, field) in fields.iter().enumerate() {
        let sep = if index == 0 { open } else { "," };
        let key = format!("\"{}\":", field.name);
        let key_at = field.start - key.len();
        assert!(key_at >= pos + sep.len(), "no room for {}", field.name);
        put(buf, pos, sep);
        put(buf, key_at, &key);
        let value = field_value(quadrant, field, index, sample);
        put(buf, field.start, &format!("{value:>width$}", width = field.len()));
        pos = field.end;
    }
    pos
}

/// The metadata region of record `sample`, sentinel included.
pub fn header(layout: &Layout, sample: usize) -> Vec<u8> {
    let mut buf = vec![b' '; layout.metadata_width];
    match layout.fields {
        FieldLayout::Flat(fields) => {
            let pos = put_fields(&mut buf, 0, "{", fields, None, sample);
            put(&mut buf, pos, "}");
        }
        FieldLayout::Quadrants(quads) => {
            let mut pos = 0;
            for (q, quad) in quads.iter().enumerate() {
                let open = if q == 0 {
                    format!("{{\"{}\":{{", quad.key)
                } else {
                    format!("}},\"{}\":{{", quad.key)
                };
                pos = put_fields(&mut buf, pos, &open, quad.fields, Some(q), sample);
            }
            put(&mut buf, pos, "}}");
        }
    }
    put(&mut buf, layout.json_width(), "\n*");
    buf
}

/// A complete record for `sample`.
pub fn record(geometry: &FileGeometry, sample: usize) -> Vec<u8> {
    let layout = geometry.layout();
    let mut buf = header(layout, sample);
    for pixel in 0..geometry.pixel_count {
        let v = pixel_value(layout.element, sample, pixel);
        match layout.element {
            ElementType::I16 => buf.extend_from_slice(&(v as i16).to_le_bytes()),
            ElementType::U16 => buf.extend_from_slice(&(v as u16).to_le_bytes()),
            ElementType::U8 => buf.push(v as u8),
        }
    }
    assert_eq!(buf.len(), geometry.record_width);
    buf
}

/// `count` consecutive records.
pub fn records(geometry: &FileGeometry, count: usize) -> Vec<u8> {
    (0..count).flat_map(|s| record(geometry, s)).collect()
}

/// Write a data file of `count` records for `product` into `dir`.
pub fn write_pff(dir: &Path, product: ProductType, count: usize) -> PathBuf {
    let path = dir.join(file_name(product));
    fs::write(&path, records(&geometry(product), count)).unwrap();
    path
}

/// Invertible scramble of the native grid; `a` must be odd.
pub fn scrambled(a: usize) -> Vec<Vec<[usize; 2]>> {
    (0..QUABO_DIM)
        .map(|r| {
            (0..QUABO_DIM)
                .map(|c| [(a * r + 3 * c) % QUABO_DIM + 1, (r + 2 * c) % QUABO_DIM + 1])
                .collect()
        })
        .collect()
}

/// Write bga and qfp pixel map files into `dir`. The qfp file also carries the
/// inverse table.
pub fn write_pixel_maps(dir: &Path) {
    let bga = serde_json::json!({ "pixel_map_maroc2phys": scrambled(5) });
    fs::write(
        dir.join("pixel_map_maroc2phys_bga.json"),
        serde_json::to_vec(&bga).unwrap(),
    )
    .unwrap();

    let forward = scrambled(7);
    let mut inverse = vec![vec![[0usize; 2]; QUABO_DIM]; QUABO_DIM];
    for (r, cols) in forward.iter().enumerate() {
        for (c, [x, y]) in cols.iter().enumerate() {
            inverse[x - 1][y - 1] = [r, c];
        }
    }
    let qfp = serde_json::json!({
        "pixel_map_maroc2phys": forward,
        "pixel_map_phys2maroc": inverse,
    });
    fs::write(
        dir.join("pixel_map_maroc2phys_qfp.json"),
        serde_json::to_vec(&qfp).unwrap(),
    )
    .unwrap();
}
