use serde::{Deserialize, Serialize};

/// Height of a flat-top hex relative to its corner-to-corner width (√3⁄2).
pub const HEIGHT_RATIO: f64 = 0.866;

/// Horizontal distance between neighbouring columns, relative to hex width.
const COLUMN_STEP: f64 = 0.75;

const EDGE_EPSILON: f64 = 1e-9;

/// Row/column address of a cell. Unique per map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridAddress {
    pub row: u32,
    pub col: u32,
}

impl GridAddress {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Even columns sit half a hex lower than odd ones.
    pub const fn is_even_column(self) -> bool {
        self.col % 2 == 0
    }

    pub fn terrain(self) -> Terrain {
        Terrain::at(self)
    }
}

/// Pixel geometry of the even-column-shifted, flat-top hex layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexLayout {
    pub hex_width: f64,
}

impl Default for HexLayout {
    fn default() -> Self {
        Self { hex_width: 70.0 }
    }
}

impl HexLayout {
    pub const fn new(hex_width: f64) -> Self {
        Self { hex_width }
    }

    pub fn hex_height(&self) -> f64 {
        self.hex_width * HEIGHT_RATIO
    }

    /// Top-left corner of the cell's bounding box in world space.
    pub fn anchor(&self, address: GridAddress) -> (f64, f64) {
        let hex_height = self.hex_height();
        let x = address.col as f64 * self.hex_width * COLUMN_STEP;
        let shift = if address.is_even_column() {
            hex_height * 0.5
        } else {
            0.0
        };
        let y = address.row as f64 * hex_height + shift;
        (x, y)
    }

    pub fn center(&self, address: GridAddress) -> (f64, f64) {
        let (x, y) = self.anchor(address);
        (x + self.hex_width * 0.5, y + self.hex_height() * 0.5)
    }

    /// Vertices clockwise from the top-left: flat edges on top and bottom.
    pub fn corners(&self, address: GridAddress) -> [(f64, f64); 6] {
        let (x, y) = self.anchor(address);
        let w = self.hex_width;
        let h = self.hex_height();
        [
            (x + w * 0.25, y),
            (x + w * 0.75, y),
            (x + w, y + h * 0.5),
            (x + w * 0.75, y + h),
            (x + w * 0.25, y + h),
            (x, y + h * 0.5),
        ]
    }

    /// Size of the box enclosing a `rows` x `cols` grid.
    pub fn bounding_size(&self, rows: u32, cols: u32) -> (f64, f64) {
        let hex_height = self.hex_height();
        let width = cols as f64 * self.hex_width * COLUMN_STEP + self.hex_width * 0.25;
        let height = rows as f64 * hex_height + hex_height * 0.5;
        (width, height)
    }

    /// Whether the world point lies inside the hex at `address`.
    pub fn contains(&self, address: GridAddress, x: f64, y: f64) -> bool {
        let (cx, cy) = self.center(address);
        let half_w = self.hex_width * 0.5;
        let half_h = self.hex_height() * 0.5;
        let dx = (x - cx).abs();
        let dy = (y - cy).abs();
        if dy > half_h + EDGE_EPSILON {
            return false;
        }
        // Slanted edges run from (±w/2, 0) to (±w/4, ±h/2) relative to the center.
        dx <= half_w - dy * (self.hex_width * 0.25) / half_h + EDGE_EPSILON
    }

    /// Inverse of [`anchor`](Self::anchor) for hit-testing: the in-bounds cell
    /// covering the world point, if any.
    pub fn address_at(&self, x: f64, y: f64, rows: u32, cols: u32) -> Option<GridAddress> {
        if rows == 0 || cols == 0 || !x.is_finite() || !y.is_finite() || self.hex_width <= 0.0 {
            return None;
        }

        let hex_height = self.hex_height();
        let approx_col = (x / (self.hex_width * COLUMN_STEP)).floor() as i64;
        for col in (approx_col - 1)..=(approx_col + 1) {
            if col < 0 || col >= i64::from(cols) {
                continue;
            }
            let shift = if col % 2 == 0 { hex_height * 0.5 } else { 0.0 };
            let approx_row = ((y - shift) / hex_height).floor() as i64;
            for row in (approx_row - 1)..=(approx_row + 1) {
                if row < 0 || row >= i64::from(rows) {
                    continue;
                }
                let address = GridAddress::new(row as u32, col as u32);
                if self.contains(address, x, y) {
                    return Some(address);
                }
            }
        }
        None
    }
}

/// Terrain is never sent by the server; it is derived from the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Grass,
    Forest,
    Mountain,
    Water,
    Desert,
    Swamp,
}

impl Terrain {
    pub fn hash(address: GridAddress) -> u32 {
        let mixed = u64::from(address.row) * 31 + u64::from(address.col) * 17;
        (mixed % 100) as u32
    }

    pub fn at(address: GridAddress) -> Self {
        match Self::hash(address) {
            0..=39 => Self::Grass,
            40..=59 => Self::Forest,
            60..=69 => Self::Mountain,
            70..=79 => Self::Water,
            80..=89 => Self::Desert,
            _ => Self::Swamp,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Forest => "forest",
            Self::Mountain => "mountain",
            Self::Water => "water",
            Self::Desert => "desert",
            Self::Swamp => "swamp",
        }
    }
}
