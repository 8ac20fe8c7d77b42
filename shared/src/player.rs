use serde::{Deserialize, Serialize};

/// Grid binding of a player as sent by `GET /player/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    pub rows: u32,
    pub cols: u32,
    /// Turn counter.
    pub t: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub bindings: Option<Bindings>,
    #[serde(default)]
    pub constructionplan: Option<String>,
}

impl PlayerResponse {
    /// `None` until the server has bound the player to a map.
    pub fn state(&self) -> Option<PlayerState> {
        let bindings = self.bindings?;
        Some(PlayerState {
            id: self.id,
            name: self.name.clone(),
            budget: self.budget,
            turn_index: bindings.t,
            rows: bindings.rows,
            cols: bindings.cols,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: u32,
    pub name: String,
    pub budget: f64,
    pub turn_index: u32,
    pub rows: u32,
    pub cols: u32,
}

impl PlayerState {
    /// Treasury as shown in the info panel.
    pub fn treasury_label(&self) -> String {
        format!("{} gold", self.budget.round() as i64)
    }
}
