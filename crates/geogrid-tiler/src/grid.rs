//! Tile grid geometry.
//!
//! A source raster of `rows x cols` pixels is cut into windows of
//! `tile_rows x tile_cols` pixels, visited row-major (outer loop over rows,
//! inner loop over columns). Each window becomes one file named by its
//! 1-based inclusive pixel bounds: `{xs:05}-{xe:05}.{ys:05}-{ye:05}`.
//!
//! A grid may be restricted to a column range (one hemisphere). Pixel
//! windows still use global columns, but file names are numbered relative to
//! the first column of the range.

use crate::{Result, TileError};
use serde::{Deserialize, Serialize};

/// Size of a raster or tile in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Number of rows (y extent).
    pub rows: u32,
    /// Number of columns (x extent).
    pub cols: u32,
}

impl GridSize {
    /// Create a size from rows and columns.
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Square size.
    pub const fn square(n: u32) -> Self {
        Self { rows: n, cols: n }
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// One rectangular pixel window of the source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Global column of the top-left pixel (0-based).
    pub x: u32,
    /// Global row of the top-left pixel (0-based).
    pub y: u32,
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
}

/// Western or eastern half of a global grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// Columns `0..cols/2`.
    West,
    /// Columns `cols/2..cols`.
    East,
}

impl Hemisphere {
    /// Both halves, west first.
    pub const ALL: [Hemisphere; 2] = [Hemisphere::West, Hemisphere::East];

    /// Subdirectory name for the half.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Hemisphere::West => "west",
            Hemisphere::East => "east",
        }
    }

    /// Column range `[start, end)` of this half in a grid of `cols` columns.
    pub fn col_range(&self, cols: u32) -> (u32, u32) {
        let mid = cols / 2;
        match self {
            Hemisphere::West => (0, mid),
            Hemisphere::East => (mid, cols),
        }
    }
}

impl std::fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A regular tiling of a pixel grid, optionally restricted to a column range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    rows: u32,
    cols: u32,
    tile: GridSize,
    col_start: u32,
    col_end: u32,
}

impl TileGrid {
    /// Tile the whole grid.
    ///
    /// Fails if the tile size is zero or does not evenly divide the grid.
    pub fn new(grid: GridSize, tile: GridSize) -> Result<Self> {
        Self::with_columns(grid, tile, 0, grid.cols)
    }

    /// Tile one hemisphere of the grid.
    pub fn hemisphere(grid: GridSize, tile: GridSize, half: Hemisphere) -> Result<Self> {
        let (start, end) = half.col_range(grid.cols);
        Self::with_columns(grid, tile, start, end)
    }

    fn with_columns(grid: GridSize, tile: GridSize, col_start: u32, col_end: u32) -> Result<Self> {
        let width = col_end - col_start;
        let uneven = tile.rows == 0
            || tile.cols == 0
            || grid.rows % tile.rows != 0
            || width % tile.cols != 0;
        if uneven {
            return Err(TileError::UnevenGrid {
                rows: grid.rows,
                cols: width,
                tile_rows: tile.rows,
                tile_cols: tile.cols,
            });
        }

        Ok(Self {
            rows: grid.rows,
            cols: grid.cols,
            tile,
            col_start,
            col_end,
        })
    }

    /// Tile dimensions.
    pub fn tile_size(&self) -> GridSize {
        self.tile
    }

    /// Size of the tiled area (rows x columns in range).
    pub fn extent(&self) -> GridSize {
        GridSize::new(self.rows, self.col_end - self.col_start)
    }

    /// First global column covered by this grid.
    pub fn col_start(&self) -> u32 {
        self.col_start
    }

    /// Number of tile rows.
    pub fn tile_rows(&self) -> u32 {
        self.rows / self.tile.rows
    }

    /// Number of tile columns.
    pub fn tile_cols(&self) -> u32 {
        (self.col_end - self.col_start) / self.tile.cols
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.tile_rows() as usize * self.tile_cols() as usize
    }

    /// Whether the grid has no tiles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this grid covers only part of the source columns.
    pub fn is_partial(&self) -> bool {
        self.col_start != 0 || self.col_end != self.cols
    }

    /// Iterate tiles row-major: outer loop over rows, inner over columns.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        let tile = self.tile;
        (0..self.rows)
            .step_by(tile.rows as usize)
            .flat_map(move |y| {
                (self.col_start..self.col_end)
                    .step_by(tile.cols as usize)
                    .map(move |x| Tile {
                        x,
                        y,
                        width: tile.cols,
                        height: tile.rows,
                    })
            })
    }

    /// Output file name of a tile, with x bounds relative to the first column
    /// of this grid.
    pub fn file_name(&self, tile: &Tile) -> String {
        let x = tile.x - self.col_start;
        format!(
            "{:05}-{:05}.{:05}-{:05}",
            x + 1,
            x + tile.width,
            tile.y + 1,
            tile.y + tile.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tile_count() {
        let grid = TileGrid::new(GridSize::new(3600, 7200), GridSize::square(200)).unwrap();
        assert_eq!(grid.tile_rows(), 18);
        assert_eq!(grid.tile_cols(), 36);
        assert_eq!(grid.len(), 648);
        assert_eq!(grid.tiles().count(), 648);
    }

    #[test]
    fn test_first_and_last_file_names() {
        let grid = TileGrid::new(GridSize::new(3600, 7200), GridSize::square(200)).unwrap();
        let tiles: Vec<Tile> = grid.tiles().collect();
        assert_eq!(grid.file_name(&tiles[0]), "00001-00200.00001-00200");
        assert_eq!(
            grid.file_name(tiles.last().unwrap()),
            "07001-07200.03401-03600"
        );
    }

    #[test]
    fn test_row_major_order() {
        let grid = TileGrid::new(GridSize::new(4, 6), GridSize::new(2, 3)).unwrap();
        let origins: Vec<(u32, u32)> = grid.tiles().map(|t| (t.x, t.y)).collect();
        assert_eq!(origins, vec![(0, 0), (3, 0), (0, 2), (3, 2)]);
    }

    #[test]
    fn test_every_pixel_covered_once() {
        let grid = TileGrid::new(GridSize::new(12, 20), GridSize::new(3, 5)).unwrap();
        let mut seen = HashSet::new();
        for tile in grid.tiles() {
            for y in tile.y..tile.y + tile.height {
                for x in tile.x..tile.x + tile.width {
                    assert!(seen.insert((x, y)), "pixel ({}, {}) covered twice", x, y);
                }
            }
        }
        assert_eq!(seen.len(), 12 * 20);
    }

    #[test]
    fn test_file_name_formula() {
        let grid = TileGrid::new(GridSize::new(21600, 43200), GridSize::square(1200)).unwrap();
        for tile in grid.tiles().take(50) {
            let expected = format!(
                "{:05}-{:05}.{:05}-{:05}",
                tile.x + 1,
                tile.x + 1200,
                tile.y + 1,
                tile.y + 1200
            );
            assert_eq!(grid.file_name(&tile), expected);
        }
    }

    #[test]
    fn test_rectangular_tiles() {
        let grid = TileGrid::new(GridSize::new(600, 1200), GridSize::new(200, 300)).unwrap();
        let tiles: Vec<Tile> = grid.tiles().collect();
        assert_eq!(tiles.len(), 12);
        assert_eq!(grid.file_name(&tiles[1]), "00301-00600.00001-00200");
        assert_eq!(grid.file_name(&tiles[4]), "00001-00300.00201-00400");
    }

    #[test]
    fn test_east_hemisphere_renumbered() {
        let size = GridSize::new(2400, 4800);
        let east = TileGrid::hemisphere(size, GridSize::square(1200), Hemisphere::East).unwrap();
        assert_eq!(east.col_start(), 2400);
        assert!(east.is_partial());

        let tiles: Vec<Tile> = east.tiles().collect();
        assert_eq!(tiles.len(), 4);
        // Pixel window uses the global column
        assert_eq!(tiles[0].x, 2400);
        assert_eq!(east.file_name(&tiles[0]), "00001-01200.00001-01200");
        assert_eq!(east.file_name(&tiles[1]), "01201-02400.00001-01200");
        for tile in &tiles {
            let xs: u32 = east.file_name(tile)[..5].parse().unwrap();
            assert_eq!(xs, tile.x + 1 - 2400);
        }
    }

    #[test]
    fn test_west_hemisphere_matches_global_numbering() {
        let size = GridSize::new(2400, 4800);
        let west = TileGrid::hemisphere(size, GridSize::square(1200), Hemisphere::West).unwrap();
        let full = TileGrid::new(size, GridSize::square(1200)).unwrap();
        let tile = west.tiles().nth(1).unwrap();
        assert_eq!(west.file_name(&tile), full.file_name(&tile));
        assert_eq!(west.extent(), GridSize::new(2400, 2400));
    }

    #[test]
    fn test_uneven_grid_rejected() {
        assert!(matches!(
            TileGrid::new(GridSize::new(1000, 1000), GridSize::square(300)),
            Err(TileError::UnevenGrid { .. })
        ));
        assert!(TileGrid::new(GridSize::new(1000, 1000), GridSize::new(0, 100)).is_err());
        // Each half must be divisible on its own
        assert!(
            TileGrid::hemisphere(GridSize::new(100, 300), GridSize::square(100), Hemisphere::West)
                .is_err()
        );
    }
}
