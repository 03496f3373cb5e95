//! Translation between native quabo pixel addressing and the canonical image.
//!
//! Each quabo is a 16x16 sensor. The sensor driver addresses pixels by a native
//! `(row, col)` location which a board specific table maps to a 1-based physical
//! `(x, y)` position on the sensor. The four quabos of a mobo are mounted rotated by
//! 90 degrees relative to each other, so the physical position is rotated according
//! to the quabo's quadrant before being placed in the 32x32 composite image.
//!
//! Pixel map tables are loaded once and are read-only afterwards.
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Width and height of a single quabo sensor.
pub const QUABO_DIM: usize = 16;
/// Width and height of the composite image.
pub const IMAGE_DIM: usize = 2 * QUABO_DIM;
/// Number of pixels in the composite image.
pub const IMAGE_PIXELS: usize = IMAGE_DIM * IMAGE_DIM;
/// Number of quabos on a mobo.
pub const QUADRANTS: usize = 4;

/// Quabo board hardware revision, which determines the pixel map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardVariant {
    Bga,
    Qfp,
}

impl BoardVariant {
    pub const ALL: [BoardVariant; 2] = [Self::Bga, Self::Qfp];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bga => "bga",
            Self::Qfp => "qfp",
        }
    }
}

impl FromStr for BoardVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bga" => Ok(Self::Bga),
            "qfp" => Ok(Self::Qfp),
            _ => Err(Error::InvalidBoardVariant(s.to_string())),
        }
    }
}

impl Display for BoardVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Native sensor-driver pixel address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NativeLoc {
    pub row: usize,
    pub col: usize,
}

impl NativeLoc {
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl Display for NativeLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Document format of pixel map files.
#[derive(Deserialize)]
struct PixelMapDoc {
    /// Physical `[x, y]`, 1-based, indexed by native `[row][col]`.
    pixel_map_maroc2phys: Vec<Vec<[usize; 2]>>,
    /// Native `[row, col]` indexed by physical `[x - 1][y - 1]`.
    #[serde(default)]
    pixel_map_phys2maroc: Option<Vec<Vec<[usize; 2]>>>,
}

/// Bidirectional native/physical pixel table for one board variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMap {
    native_to_physical: Vec<Vec<(usize, usize)>>,
    physical_to_native: [[NativeLoc; QUABO_DIM]; QUABO_DIM],
}

impl PixelMap {
    /// Create from a native-to-physical table, deriving the inverse.
    ///
    /// `table[row][col]` is the 1-based physical `[x, y]` of the native location
    /// `(row, col)`.
    ///
    /// # Errors
    /// [Error::InvalidPixelMap] unless the table maps exactly onto every physical
    /// position of a quabo once.
    pub fn from_native_to_physical(table: Vec<Vec<[usize; 2]>>) -> Result<Self> {
        let mut inverse: [[Option<NativeLoc>; QUABO_DIM]; QUABO_DIM] =
            [[None; QUABO_DIM]; QUABO_DIM];
        let mut count = 0;
        for (row, cols) in table.iter().enumerate() {
            for (col, &[x, y]) in cols.iter().enumerate() {
                if !(1..=QUABO_DIM).contains(&x) || !(1..=QUABO_DIM).contains(&y) {
                    return Err(Error::InvalidPixelMap(format!(
                        "physical location [{x}, {y}] for ({row}, {col}) is outside 1..={QUABO_DIM}"
                    )));
                }
                let slot = &mut inverse[x - 1][y - 1];
                if let Some(prev) = slot {
                    return Err(Error::InvalidPixelMap(format!(
                        "physical location [{x}, {y}] is mapped by both {prev} and ({row}, {col})"
                    )));
                }
                *slot = Some(NativeLoc::new(row, col));
                count += 1;
            }
        }
        if count != QUABO_DIM * QUABO_DIM {
            return Err(Error::InvalidPixelMap(format!(
                "expected {} entries, got {count}",
                QUABO_DIM * QUABO_DIM
            )));
        }

        let mut physical_to_native = [[NativeLoc::default(); QUABO_DIM]; QUABO_DIM];
        for (x, ys) in inverse.iter().enumerate() {
            for (y, loc) in ys.iter().enumerate() {
                // every slot is filled; 256 distinct entries were placed above
                physical_to_native[x][y] = loc.unwrap_or_default();
            }
        }

        Ok(PixelMap {
            native_to_physical: table
                .into_iter()
                .map(|cols| cols.into_iter().map(|[x, y]| (x, y)).collect())
                .collect(),
            physical_to_native,
        })
    }

    /// Read a pixel map document.
    ///
    /// If the document also carries a `pixel_map_phys2maroc` table it must agree with
    /// the inverse derived from `pixel_map_maroc2phys`.
    ///
    /// # Errors
    /// [Error::Json] if the document cannot be decoded, or [Error::InvalidPixelMap].
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let doc: PixelMapDoc = serde_json::from_reader(reader)?;
        let map = Self::from_native_to_physical(doc.pixel_map_maroc2phys)?;
        if let Some(inverse) = doc.pixel_map_phys2maroc {
            map.verify_inverse(&inverse)?;
        }
        Ok(map)
    }

    fn verify_inverse(&self, inverse: &[Vec<[usize; 2]>]) -> Result<()> {
        if inverse.len() != QUABO_DIM || inverse.iter().any(|ys| ys.len() != QUABO_DIM) {
            return Err(Error::InvalidPixelMap(format!(
                "physical-to-native table must be {QUABO_DIM}x{QUABO_DIM}"
            )));
        }
        for (x, ys) in inverse.iter().enumerate() {
            for (y, &[row, col]) in ys.iter().enumerate() {
                let want = self.physical_to_native[x][y];
                if want != NativeLoc::new(row, col) {
                    return Err(Error::InvalidPixelMap(format!(
                        "physical [{}, {}] maps to ({row}, {col}), expected {want}",
                        x + 1,
                        y + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// 1-based physical `(x, y)` of a native location.
    ///
    /// # Errors
    /// [Error::PixelOutOfRange] if `loc` is not in the table.
    pub fn physical(&self, loc: NativeLoc) -> Result<(usize, usize)> {
        self.native_to_physical
            .get(loc.row)
            .and_then(|cols| cols.get(loc.col))
            .copied()
            .ok_or_else(|| Error::PixelOutOfRange(format!("native location {loc} is not mapped")))
    }

    /// Native location of a 1-based physical `(x, y)`.
    ///
    /// # Errors
    /// [Error::PixelOutOfRange] if `x` or `y` is outside the quabo.
    pub fn native(&self, x: usize, y: usize) -> Result<NativeLoc> {
        if !(1..=QUABO_DIM).contains(&x) || !(1..=QUABO_DIM).contains(&y) {
            return Err(Error::PixelOutOfRange(format!(
                "physical location [{x}, {y}] is outside the quabo"
            )));
        }
        Ok(self.physical_to_native[x - 1][y - 1])
    }

    /// All native locations in the table, row-major.
    pub fn native_locs(&self) -> impl Iterator<Item = NativeLoc> + '_ {
        self.native_to_physical
            .iter()
            .enumerate()
            .flat_map(|(row, cols)| (0..cols.len()).map(move |col| NativeLoc::new(row, col)))
    }

    /// Canonical image index for a native location on the quabo in `quadrant`.
    ///
    /// # Errors
    /// [Error::InvalidQuadrant], or [Error::PixelOutOfRange] if `loc` is not mapped.
    pub fn native_to_canonical(&self, quadrant: usize, loc: NativeLoc) -> Result<usize> {
        let (x, y) = self.physical(loc)?;
        place(quadrant, y - 1, x - 1)
    }

    /// Native location for a canonical image index on the quabo in `quadrant`.
    ///
    /// # Errors
    /// [Error::InvalidQuadrant], or [Error::PixelOutOfRange] if `index` is not part of
    /// the quadrant.
    pub fn canonical_to_native(&self, quadrant: usize, index: usize) -> Result<NativeLoc> {
        let (i, j) = unplace(quadrant, index)?;
        self.native(j + 1, i + 1)
    }
}

/// Pixel maps for all board variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMaps {
    bga: PixelMap,
    qfp: PixelMap,
}

impl PixelMaps {
    #[must_use]
    pub fn new(bga: PixelMap, qfp: PixelMap) -> Self {
        Self { bga, qfp }
    }

    /// Load `pixel_map_maroc2phys_bga.json` and `pixel_map_maroc2phys_qfp.json` from `dir`.
    ///
    /// # Errors
    /// [Error::Io] if a file cannot be opened, otherwise see [PixelMap::from_json].
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let load = |variant: BoardVariant| -> Result<PixelMap> {
            let path = dir
                .as_ref()
                .join(format!("pixel_map_maroc2phys_{variant}.json"));
            debug!(?path, "loading pixel map");
            PixelMap::from_json(BufReader::new(File::open(&path)?))
        };
        Ok(Self {
            bga: load(BoardVariant::Bga)?,
            qfp: load(BoardVariant::Qfp)?,
        })
    }

    #[must_use]
    pub fn get(&self, variant: BoardVariant) -> &PixelMap {
        match variant {
            BoardVariant::Bga => &self.bga,
            BoardVariant::Qfp => &self.qfp,
        }
    }

    /// Canonical image index of a native location. See [PixelMap::native_to_canonical].
    ///
    /// # Errors
    /// See [PixelMap::native_to_canonical].
    pub fn native_to_canonical(
        &self,
        quadrant: usize,
        variant: BoardVariant,
        loc: NativeLoc,
    ) -> Result<usize> {
        self.get(variant).native_to_canonical(quadrant, loc)
    }

    /// Native location of a canonical image index. See [PixelMap::canonical_to_native].
    ///
    /// # Errors
    /// See [PixelMap::canonical_to_native].
    pub fn canonical_to_native(
        &self,
        quadrant: usize,
        variant: BoardVariant,
        index: usize,
    ) -> Result<NativeLoc> {
        self.get(variant).canonical_to_native(quadrant, index)
    }
}

/// Place the 0-based quabo position `(i, j)` into the composite image.
///
/// Quadrant 3 is unrotated in the top-left block, and each of quadrants 0, 1 and 2
/// is rotated a further 90 degrees clockwise about the image center.
fn place(quadrant: usize, i: usize, j: usize) -> Result<usize> {
    const N: usize = IMAGE_DIM - 1;
    let (row, col) = match quadrant {
        0 => (j, N - i),
        1 => (N - i, N - j),
        2 => (N - j, i),
        3 => (i, j),
        _ => return Err(Error::InvalidQuadrant(quadrant)),
    };
    Ok(row * IMAGE_DIM + col)
}

/// Inverse of [place].
fn unplace(quadrant: usize, index: usize) -> Result<(usize, usize)> {
    const N: usize = IMAGE_DIM - 1;
    if quadrant >= QUADRANTS {
        return Err(Error::InvalidQuadrant(quadrant));
    }
    if index >= IMAGE_PIXELS {
        return Err(Error::PixelOutOfRange(format!(
            "index {index} is outside the {IMAGE_DIM}x{IMAGE_DIM} image"
        )));
    }
    let (row, col) = (index / IMAGE_DIM, index % IMAGE_DIM);
    let (i, j) = match quadrant {
        0 => (N - col, row),
        1 => (N - row, N - col),
        2 => (col, N - row),
        _ => (row, col),
    };
    if i >= QUABO_DIM || j >= QUABO_DIM {
        return Err(Error::PixelOutOfRange(format!(
            "index {index} is not in quadrant {quadrant}"
        )));
    }
    Ok((i, j))
}

/// The quadrant whose quabo covers canonical image `index`.
///
/// # Errors
/// [Error::PixelOutOfRange] if `index` is outside the image.
pub fn quadrant_of(index: usize) -> Result<usize> {
    if index >= IMAGE_PIXELS {
        return Err(Error::PixelOutOfRange(format!(
            "index {index} is outside the {IMAGE_DIM}x{IMAGE_DIM} image"
        )));
    }
    let top = index / IMAGE_DIM < QUABO_DIM;
    let left = index % IMAGE_DIM < QUABO_DIM;
    Ok(match (top, left) {
        (true, true) => 3,
        (true, false) => 0,
        (false, false) => 1,
        (false, true) => 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    /// Invertible affine scramble of the native grid.
    fn scrambled() -> Vec<Vec<[usize; 2]>> {
        (0..QUABO_DIM)
            .map(|r| {
                (0..QUABO_DIM)
                    .map(|c| [(5 * r + 3 * c) % QUABO_DIM + 1, (r + 2 * c) % QUABO_DIM + 1])
                    .collect()
            })
            .collect()
    }

    #[test_case("bga" => BoardVariant::Bga)]
    #[test_case("qfp" => BoardVariant::Qfp)]
    fn test_variant_parse(s: &str) -> BoardVariant {
        s.parse().unwrap()
    }

    #[test]
    fn test_invalid_variant() {
        let zult = "qfb".parse::<BoardVariant>();
        assert!(matches!(zult, Err(Error::InvalidBoardVariant(ref s)) if s == "qfb"));
    }

    #[test]
    fn test_place_unplace() {
        for q in 0..QUADRANTS {
            let mut seen = HashSet::new();
            for i in 0..QUABO_DIM {
                for j in 0..QUABO_DIM {
                    let idx = place(q, i, j).unwrap();
                    assert_eq!(quadrant_of(idx).unwrap(), q, "q={q} i={i} j={j}");
                    assert_eq!(unplace(q, idx).unwrap(), (i, j));
                    assert!(seen.insert(idx));
                }
            }
        }
    }

    #[test_case(3, 0, 0 => 0)]
    #[test_case(0, 0, 0 => 31)]
    #[test_case(1, 0, 0 => 1023)]
    #[test_case(2, 0, 0 => 992)]
    #[test_case(0, 15, 15 => 15 * 32 + 16)]
    fn test_place_corners(q: usize, i: usize, j: usize) -> usize {
        place(q, i, j).unwrap()
    }

    #[test]
    fn test_bad_quadrant() {
        assert!(matches!(place(4, 0, 0), Err(Error::InvalidQuadrant(4))));
        assert!(matches!(unplace(7, 0), Err(Error::InvalidQuadrant(7))));
    }

    #[test]
    fn test_index_outside_quadrant() {
        // index 0 is the top-left corner, which belongs to quadrant 3
        assert!(matches!(unplace(0, 0), Err(Error::PixelOutOfRange(_))));
        assert!(matches!(unplace(3, 1024), Err(Error::PixelOutOfRange(_))));
    }

    #[test]
    fn test_from_native_to_physical() {
        let map = PixelMap::from_native_to_physical(scrambled()).unwrap();
        assert_eq!(map.physical(NativeLoc::new(1, 1)).unwrap(), (9, 4));
        assert_eq!(map.native(9, 4).unwrap(), NativeLoc::new(1, 1));
        assert_eq!(map.native_locs().count(), 256);
        assert!(matches!(
            map.physical(NativeLoc::new(16, 0)),
            Err(Error::PixelOutOfRange(_))
        ));
        assert!(matches!(map.native(0, 1), Err(Error::PixelOutOfRange(_))));
    }

    #[test]
    fn test_duplicate_physical() {
        let mut table = scrambled();
        table[0][1] = table[0][0];
        let zult = PixelMap::from_native_to_physical(table);
        assert!(matches!(zult, Err(Error::InvalidPixelMap(_))), "got {zult:?}");
    }

    #[test]
    fn test_physical_out_of_range() {
        let mut table = scrambled();
        table[3][3] = [17, 1];
        assert!(matches!(
            PixelMap::from_native_to_physical(table),
            Err(Error::InvalidPixelMap(_))
        ));
    }

    #[test]
    fn test_short_table() {
        let mut table = scrambled();
        table.pop();
        assert!(matches!(
            PixelMap::from_native_to_physical(table),
            Err(Error::InvalidPixelMap(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let map = PixelMap::from_native_to_physical(scrambled()).unwrap();
        for q in 0..QUADRANTS {
            for loc in map.native_locs() {
                let idx = map.native_to_canonical(q, loc).unwrap();
                assert_eq!(map.canonical_to_native(q, idx).unwrap(), loc, "q={q}");
            }
        }
    }

    #[test]
    fn test_maps_shareable() {
        fn is_send_sync<T: Send + Sync>() {}
        is_send_sync::<PixelMaps>();
    }
}
