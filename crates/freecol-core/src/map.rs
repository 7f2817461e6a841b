use freecol_protocol::{PlayerId, Position, SettlementId, TileTypeId, UnitId};
use serde::{Deserialize, Serialize};

use crate::rules::{CompiledRules, TileType};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileTypeId,
    pub owner: Option<PlayerId>,
    /// Settlement whose land this tile is, when claimed.
    pub owning_settlement: Option<SettlementId>,
    pub settlement: Option<SettlementId>,
    /// Units standing on the tile (not aboard carriers). Kept sorted by id.
    pub units: Vec<UnitId>,
    pub road: bool,
    pub river: u8,
    pub plowed: bool,
    pub lost_city_rumour: bool,
}

impl Tile {
    pub fn new(tile_type: TileTypeId) -> Self {
        Self {
            tile_type,
            owner: None,
            owning_settlement: None,
            settlement: None,
            units: Vec::new(),
            road: false,
            river: 0,
            plowed: false,
            lost_city_rumour: false,
        }
    }

    pub fn kind<'r>(&self, rules: &'r CompiledRules) -> &'r TileType {
        rules.tile_type(self.tile_type)
    }

    pub fn is_land(&self, rules: &CompiledRules) -> bool {
        self.kind(rules).land
    }

    pub fn is_high_seas(&self, rules: &CompiledRules) -> bool {
        self.kind(rules).high_seas
    }
}

/// Rectangular map, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Map {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Map {
    pub fn new(width: i32, height: i32, fill: TileTypeId) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            tiles: vec![Tile::new(fill); (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub fn index_of(&self, pos: Position) -> Option<usize> {
        self.contains(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index_of(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index_of(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &Tile)> {
        let width = self.width;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (Position::new(i as i32 % width, i as i32 / width), tile))
    }

    pub fn set_tile_type(&mut self, pos: Position, tile_type: TileTypeId) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.tile_type = tile_type;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_outside_bounds_have_no_tile() {
        let map = Map::new(4, 3, TileTypeId::new(0));
        assert!(map.tile(Position::new(3, 2)).is_some());
        assert!(map.tile(Position::new(4, 0)).is_none());
        assert!(map.tile(Position::new(0, -1)).is_none());
        assert_eq!(map.iter().count(), 12);
        let (last, _) = map.iter().last().expect("tiles");
        assert_eq!(last, Position::new(3, 2));
    }
}
