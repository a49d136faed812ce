use crate::personality::Personality;
use crate::{GridWorld, Position, VehicleId};
use pathfinding::directed::bfs::bfs;

/// Finds a shortest path from `src` to `dst` for the given vehicle.
///
/// Cells holding other vehicles are impassable, except for the destination
/// itself, which may be vacated by the time it is reached. Cells holding
/// lights are always passable. Neighbours are expanded in the personality's
/// preferred order, which decides between equally short paths. The returned path starts with `src`.
pub fn find_path(
    grid: &GridWorld,
    vehicle: VehicleId,
    personality: Personality,
    src: Position,
    dst: Position,
) -> Option<Vec<Position>> {
    if !grid.in_bounds(src) || !grid.in_bounds(dst) {
        return None;
    }
    if src == dst {
        return Some(vec![src]);
    }
    let order = personality.neighbour_order();
    bfs(
        &src,
        |pos| successors(*pos, dst, vehicle, order, grid),
        |pos| *pos == dst,
    )
}

fn successors(
    pos: Position,
    dst: Position,
    vehicle: VehicleId,
    order: [(i32, i32); 4],
    grid: &GridWorld,
) -> impl Iterator<Item = Position> + '_ {
    order
        .into_iter()
        .map(move |(dx, dy)| pos.offset(dx, dy))
        .filter(move |next| {
            grid.in_bounds(*next)
                && (*next == dst
                    || grid
                        .vehicle_at(*next)
                        .map_or(true, |other| other == vehicle))
        })
}
