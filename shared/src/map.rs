use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::TurnWindowConfig;
use crate::hex::{GridAddress, Terrain};
use crate::player::PlayerState;

/// Reply of `GET /Land`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandResponse {
    pub map: WireMap,
    #[serde(default)]
    pub init_plan_min: u32,
    #[serde(default)]
    pub init_plan_sec: u32,
    #[serde(default)]
    pub plan_rev_min: u32,
    #[serde(default)]
    pub plan_rev_sec: u32,
}

impl LandResponse {
    /// `init_*` seeds the decision window, `plan_rev_*` the edit window.
    pub fn turn_windows(&self) -> TurnWindowConfig {
        TurnWindowConfig::new(
            self.init_plan_min.saturating_mul(60).saturating_add(self.init_plan_sec),
            self.plan_rev_min.saturating_mul(60).saturating_add(self.plan_rev_sec),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireMap {
    #[serde(rename = "adjacencyMatrix", default)]
    pub adjacency_matrix: Vec<Vec<Option<WireCell>>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireCell {
    #[serde(rename = "player_Id", default)]
    pub owner_id: u32,
    #[serde(default)]
    pub deposit: f64,
    #[serde(rename = "citycenter", default)]
    pub city_center: bool,
    #[serde(default)]
    pub p: Option<WireOwner>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireOwner {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapCell {
    pub address: GridAddress,
    /// 0 = unowned.
    pub owner_id: u32,
    /// Negative marks unclaimed/derelict land; never shown to the user.
    pub deposit: f64,
    pub is_city_center: bool,
    pub owner_display_name: String,
}

impl MapCell {
    pub const fn is_owned(&self) -> bool {
        self.owner_id > 0
    }

    pub fn terrain(&self) -> Terrain {
        self.address.terrain()
    }
}

/// Immutable map as delivered by one refresh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapSnapshot {
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<Vec<Option<MapCell>>>,
}

impl MapSnapshot {
    pub fn from_wire(map: &WireMap) -> Self {
        let rows = map.adjacency_matrix.len() as u32;
        let cols = map
            .adjacency_matrix
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0) as u32;

        let cells = map
            .adjacency_matrix
            .iter()
            .enumerate()
            .map(|(row, wire_row)| {
                wire_row
                    .iter()
                    .enumerate()
                    .map(|(col, wire)| {
                        let wire = wire.as_ref()?;
                        Some(MapCell {
                            address: GridAddress::new(row as u32, col as u32),
                            owner_id: wire.owner_id,
                            deposit: wire.deposit,
                            is_city_center: wire.city_center,
                            owner_display_name: wire
                                .p
                                .as_ref()
                                .map(|owner| owner.name.clone())
                                .unwrap_or_default(),
                        })
                    })
                    .collect()
            })
            .collect();

        Self { rows, cols, cells }
    }
}

/// What the info popup shows for a clicked cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellDescription {
    pub owner_display_name: String,
    /// Magnitude only.
    pub deposit: f64,
}

impl fmt::Display for CellDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Territory of {}: {:.2} resources",
            self.owner_display_name, self.deposit
        )
    }
}

/// Read-only lookup over the current [`MapSnapshot`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapCellIndex {
    snapshot: MapSnapshot,
}

impl MapCellIndex {
    pub fn new(snapshot: MapSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_land(land: &LandResponse) -> Self {
        Self::new(MapSnapshot::from_wire(&land.map))
    }

    pub fn rows(&self) -> u32 {
        self.snapshot.rows
    }

    pub fn cols(&self) -> u32 {
        self.snapshot.cols
    }

    pub fn snapshot(&self) -> &MapSnapshot {
        &self.snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.rows == 0 || self.snapshot.cols == 0
    }

    /// `None` for out-of-range addresses and holes in the matrix.
    pub fn cell_at(&self, address: GridAddress) -> Option<&MapCell> {
        self.snapshot
            .cells
            .get(address.row as usize)?
            .get(address.col as usize)?
            .as_ref()
    }

    pub fn describe_cell(&self, address: GridAddress) -> Option<CellDescription> {
        let cell = self.cell_at(address)?;
        Some(CellDescription {
            owner_display_name: cell.owner_display_name.clone(),
            deposit: cell.deposit.abs(),
        })
    }

    /// Present cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &MapCell> {
        self.snapshot.cells.iter().flatten().flatten()
    }

    /// The player's bindings must describe the same grid as the snapshot.
    pub fn matches_player(&self, player: &PlayerState) -> bool {
        player.rows == self.snapshot.rows && player.cols == self.snapshot.cols
    }
}
