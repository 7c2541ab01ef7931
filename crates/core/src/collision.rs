//! Collision and placement - validity checks and drop projection

use crate::grid::Grid;
use crate::pieces::Piece;

/// Check whether every filled cell of `piece` is placeable on `grid`
///
/// A cell must be inside the side walls and above the floor. Cells above the
/// visible board (`y < 0`) are never checked for occupancy, which lets pieces
/// spawn partly off-screen.
pub fn is_valid(piece: &Piece, grid: &Grid) -> bool {
    let width = grid.width() as i16;
    let height = grid.height() as i16;
    piece
        .cells()
        .all(|(x, y)| x >= 0 && x < width && y < height && (y < 0 || grid.is_empty_at(x, y)))
}

/// Lowest position `piece` reaches by falling straight down
fn drop_to_rest(piece: &Piece, grid: &Grid) -> Piece {
    let mut rest = *piece;
    loop {
        let lower = rest.moved(0, 1);
        if !is_valid(&lower, grid) {
            return rest;
        }
        rest = lower;
    }
}

/// Landing preview for `piece`; the piece itself is untouched
pub fn ghost_drop(piece: &Piece, grid: &Grid) -> Piece {
    drop_to_rest(piece, grid)
}

/// Resting position for an instant drop of the falling piece
pub fn hard_drop(piece: &Piece, grid: &Grid) -> Piece {
    drop_to_rest(piece, grid)
}

/// Rotate clockwise if the result fits, otherwise revert
///
/// A rejected rotation is undone by three more clockwise turns, so the
/// returned piece is identical to the input. Returns the resulting piece and
/// whether the rotation was kept.
pub fn try_rotate(piece: &Piece, grid: &Grid) -> (Piece, bool) {
    let rotated = piece.rotated();
    if is_valid(&rotated, grid) {
        return (rotated, true);
    }

    let reverted = rotated.rotated().rotated().rotated();
    debug_assert_eq!(reverted, *piece);
    (reverted, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::LockedPositions;
    use crate::types::{BoardSize, PieceKind};

    fn empty_grid() -> Grid {
        Grid::empty(BoardSize::STANDARD)
    }

    #[test]
    fn test_walls_and_floor() {
        let grid = empty_grid();
        let piece = Piece::spawn(PieceKind::I, BoardSize::STANDARD);

        assert!(is_valid(&piece, &grid));
        assert!(is_valid(&piece.moved(-3, 0), &grid));
        assert!(!is_valid(&piece.moved(-4, 0), &grid));
        assert!(is_valid(&piece.moved(3, 0), &grid));
        assert!(!is_valid(&piece.moved(4, 0), &grid));
        assert!(is_valid(&piece.moved(0, 19), &grid));
        assert!(!is_valid(&piece.moved(0, 20), &grid));
    }

    #[test]
    fn test_above_board_ignores_occupancy() {
        let size = BoardSize::STANDARD;
        let locked: LockedPositions = (0..10).map(|x| (x, 0, 0)).collect();
        let grid = Grid::build(size, &locked);
        let piece = Piece::spawn(PieceKind::I, size);

        assert!(!is_valid(&piece, &grid));
        assert!(is_valid(&piece.moved(0, -1), &grid));
        assert!(!is_valid(&piece.moved(-4, -1), &grid));
    }

    #[test]
    fn test_ghost_drop_stops_on_stack() {
        let size = BoardSize::STANDARD;
        let locked: LockedPositions = [(3, 15, 0)].into_iter().collect();
        let grid = Grid::build(size, &locked);
        let piece = Piece::spawn(PieceKind::O, size);

        let ghost = ghost_drop(&piece, &grid);
        assert_eq!(ghost.y, 13);
        assert_eq!(piece.y, 0);
    }

    #[test]
    fn test_hard_drop_empty_board() {
        let grid = empty_grid();
        for kind in PieceKind::ALL {
            let piece = Piece::spawn(kind, BoardSize::STANDARD);
            let landed = hard_drop(&piece, &grid);
            assert_eq!(landed.y, 20 - piece.shape.height() as i16, "{:?}", kind);
            assert_eq!(landed.x, piece.x);
        }
    }

    #[test]
    fn test_rotation_rejected_at_floor() {
        let grid = empty_grid();
        // Horizontal I on the floor cannot stand up.
        let piece = Piece::spawn(PieceKind::I, BoardSize::STANDARD).moved(0, 19);
        let (after, rotated) = try_rotate(&piece, &grid);
        assert!(!rotated);
        assert_eq!(after, piece);
    }

    #[test]
    fn test_rotation_accepted_in_open_space() {
        let grid = empty_grid();
        let piece = Piece::spawn(PieceKind::T, BoardSize::STANDARD).moved(0, 5);
        let (after, rotated) = try_rotate(&piece, &grid);
        assert!(rotated);
        assert_eq!(after.shape, piece.shape.rotate_cw());
    }
}
