//! The spatial index of the simulation.

use crate::error::GridError;
use crate::{TrafficLightId, VehicleId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The largest number of cells a grid may have.
pub const MAX_CELLS: usize = 1 << 24;

/// A cell on the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the position displaced by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// The number of 4-neighbourhood hops between two positions.
    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The number of 8-neighbourhood hops between two positions.
    pub fn chebyshev(self, other: Self) -> u32 {
        u32::max(self.x.abs_diff(other.x), self.y.abs_diff(other.y))
    }

    /// Whether the two positions share an edge.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.manhattan(other) == 1
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// An agent occupying a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupant {
    Vehicle(VehicleId),
    Light(TrafficLightId),
}

/// A bounded 2-D grid indexing which agents occupy each cell.
///
/// A cell holds at most one vehicle. Lights are placed once and
/// share their cell with whichever vehicle is passing through.
#[derive(Clone, Debug)]
pub struct GridWorld {
    width: i32,
    height: i32,
    cells: Vec<SmallVec<[Occupant; 2]>>,
}

impl GridWorld {
    /// Creates an empty grid.
    ///
    /// Fails if the cell count cannot be indexed.
    pub(crate) fn new(width: i32, height: i32) -> Result<Self, GridError> {
        let len = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(w, h)| w.checked_mul(h))
            .filter(|len| *len <= MAX_CELLS)
            .ok_or(GridError::TooLarge { width, height })?;
        Ok(Self {
            width,
            height,
            cells: vec![SmallVec::new(); len],
        })
    }

    /// The number of columns.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// The number of rows.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether the position lies on the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        (0..self.width).contains(&pos.x) && (0..self.height).contains(&pos.y)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Gets the agents occupying a cell.
    pub fn occupants(&self, pos: Position) -> Result<&[Occupant], GridError> {
        self.index(pos)
            .map(|idx| self.cells[idx].as_slice())
            .ok_or(GridError::OutOfBounds(pos))
    }

    /// Gets the vehicle occupying a cell, if any.
    /// Positions off the grid hold nothing.
    pub fn vehicle_at(&self, pos: Position) -> Option<VehicleId> {
        self.occupants(pos).ok()?.iter().find_map(|occ| match occ {
            Occupant::Vehicle(id) => Some(*id),
            _ => None,
        })
    }

    /// Gets the light stationed on a cell, if any.
    pub fn light_at(&self, pos: Position) -> Option<TrafficLightId> {
        self.occupants(pos).ok()?.iter().find_map(|occ| match occ {
            Occupant::Light(id) => Some(*id),
            _ => None,
        })
    }

    /// Whether a vehicle could enter the cell.
    pub fn is_free(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.vehicle_at(pos).is_none()
    }

    /// Places an agent on the grid. Returns `false` if the cell already
    /// holds an agent of the same kind.
    pub(crate) fn place(&mut self, occupant: Occupant, pos: Position) -> Result<bool, GridError> {
        let idx = self.index(pos).ok_or(GridError::OutOfBounds(pos))?;
        let taken = match occupant {
            Occupant::Vehicle(_) => self.vehicle_at(pos).is_some(),
            Occupant::Light(_) => self.light_at(pos).is_some(),
        };
        if taken {
            return Ok(false);
        }
        self.cells[idx].push(occupant);
        Ok(true)
    }

    /// Removes an agent from a cell, if it is there.
    pub(crate) fn remove(&mut self, occupant: Occupant, pos: Position) {
        if let Some(idx) = self.index(pos) {
            self.cells[idx].retain(|occ| *occ != occupant);
        }
    }

    /// Moves a vehicle between two cells as a single operation.
    ///
    /// The move is rejected, leaving the grid untouched, if the destination is
    /// off the grid, already holds a vehicle, or the vehicle is not at `from`.
    pub fn move_vehicle(&mut self, id: VehicleId, from: Position, to: Position) -> bool {
        let (Some(src), Some(dst)) = (self.index(from), self.index(to)) else {
            return false;
        };
        let occupant = Occupant::Vehicle(id);
        if !self.cells[src].contains(&occupant) || self.vehicle_at(to).is_some() {
            return false;
        }
        self.cells[src].retain(|occ| *occ != occupant);
        self.cells[dst].push(occupant);
        true
    }

    /// Exchanges the cells of two vehicles as a single operation.
    ///
    /// The swap is rejected, leaving the grid untouched, unless `a` is at
    /// `a_pos` and `b` is at `b_pos` on two distinct cells.
    pub fn swap_vehicles(
        &mut self,
        a: VehicleId,
        a_pos: Position,
        b: VehicleId,
        b_pos: Position,
    ) -> bool {
        let (Some(ia), Some(ib)) = (self.index(a_pos), self.index(b_pos)) else {
            return false;
        };
        let (occ_a, occ_b) = (Occupant::Vehicle(a), Occupant::Vehicle(b));
        if ia == ib || !self.cells[ia].contains(&occ_a) || !self.cells[ib].contains(&occ_b) {
            return false;
        }
        self.cells[ia].retain(|occ| *occ != occ_a);
        self.cells[ib].retain(|occ| *occ != occ_b);
        self.cells[ia].push(occ_b);
        self.cells[ib].push(occ_a);
        true
    }

    /// Iterates over every vehicle on the grid along with its cell, row by row.
    pub fn vehicles(&self) -> impl Iterator<Item = (Position, VehicleId)> + '_ {
        self.cells.iter().enumerate().flat_map(move |(idx, cell)| {
            let pos = Position::new(idx as i32 % self.width, idx as i32 / self.width);
            cell.iter().filter_map(move |occ| match occ {
                Occupant::Vehicle(id) => Some((pos, *id)),
                _ => None,
            })
        })
    }
}
