use anyhow::{bail, Context, Result};
use pff::config::Configs;
use pff::pixelmap::IMAGE_DIM;
use pff::{BoardVariant, NativeLoc, PixelMaps};
use std::path::Path;
use tracing::debug;

/// Parse a native location given as `<row>,<col>`.
pub fn parse_native(s: &str) -> Result<NativeLoc, String> {
    let Some((row, col)) = s.split_once(',') else {
        return Err("expected <row>,<col>".to_string());
    };
    let row = row.trim().parse().map_err(|e| format!("invalid row: {e}"))?;
    let col = col.trim().parse().map_err(|e| format!("invalid col: {e}"))?;
    Ok(NativeLoc::new(row, col))
}

/// Board variant from the command line or, failing that, the run's obs_config.
pub fn resolve_board(
    board: Option<BoardVariant>,
    config: Option<&Path>,
    module: Option<u32>,
) -> Result<BoardVariant> {
    if let Some(board) = board {
        return Ok(board);
    }
    let (Some(dir), Some(module)) = (config, module) else {
        bail!("either --board or both --config and --module are required");
    };
    let configs = Configs::load_dir(dir).with_context(|| format!("loading configs from {dir:?}"))?;
    match configs.board_variant(module).context("reading obs_config")? {
        Some(board) => {
            debug!("module {module} uses board {board}");
            Ok(board)
        }
        None => bail!("obs_config in {dir:?} has no board for module {module}"),
    }
}

pub fn pixel(
    maps_dir: &Path,
    board: BoardVariant,
    quadrant: usize,
    native: Option<NativeLoc>,
    index: Option<usize>,
) -> Result<()> {
    let maps = PixelMaps::load_dir(maps_dir)
        .with_context(|| format!("loading pixel maps from {maps_dir:?}"))?;
    println!("{}", translate(&maps, board, quadrant, native, index)?);
    Ok(())
}

fn translate(
    maps: &PixelMaps,
    board: BoardVariant,
    quadrant: usize,
    native: Option<NativeLoc>,
    index: Option<usize>,
) -> Result<String> {
    match (native, index) {
        (Some(loc), None) => {
            let index = maps.native_to_canonical(quadrant, board, loc)?;
            Ok(format!(
                "native {loc} -> index {index} (row {}, col {})",
                index / IMAGE_DIM,
                index % IMAGE_DIM
            ))
        }
        (None, Some(index)) => {
            let loc = maps.canonical_to_native(quadrant, board, index)?;
            Ok(format!("index {index} -> native {loc}"))
        }
        _ => bail!("exactly one of --native or --index is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pff::pixelmap::{PixelMap, QUABO_DIM};

    fn identity() -> PixelMap {
        let table = (0..QUABO_DIM)
            .map(|r| (0..QUABO_DIM).map(|c| [r + 1, c + 1]).collect())
            .collect();
        PixelMap::from_native_to_physical(table).unwrap()
    }

    #[test]
    fn test_parse_native() {
        assert_eq!(parse_native("3, 15").unwrap(), NativeLoc::new(3, 15));
        assert!(parse_native("3").is_err());
        assert!(parse_native("a,1").is_err());
    }

    #[test]
    fn test_translate() {
        let maps = PixelMaps::new(identity(), identity());

        // physical (1, 1) on quadrant 3 is the top-left corner
        let text =
            translate(&maps, BoardVariant::Bga, 3, Some(NativeLoc::new(0, 0)), None).unwrap();
        assert_eq!(text, "native (0, 0) -> index 0 (row 0, col 0)");

        let text = translate(&maps, BoardVariant::Qfp, 3, None, Some(33)).unwrap();
        assert_eq!(text, "index 33 -> native (1, 1)");

        assert!(translate(&maps, BoardVariant::Qfp, 3, None, None).is_err());
    }

    #[test]
    fn test_resolve_board() {
        assert_eq!(
            resolve_board(Some(BoardVariant::Qfp), None, None).unwrap(),
            BoardVariant::Qfp
        );
        assert!(resolve_board(None, None, Some(1)).is_err());

        let tmpdir = tempfile::tempdir().unwrap();
        std::fs::write(
            tmpdir.path().join("obs_config.json"),
            r#"{"domes": [{"modules": [{"id": 7, "quabo_version": "bga"}]}]}"#,
        )
        .unwrap();
        assert_eq!(
            resolve_board(None, Some(tmpdir.path()), Some(7)).unwrap(),
            BoardVariant::Bga
        );
        assert!(resolve_board(None, Some(tmpdir.path()), Some(8)).is_err());
    }
}
