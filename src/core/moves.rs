//! Move-legality tables: permitted relative destinations by tag.
//!
//! A table is a pure lookup from relative offset `(dr, dc)` to a tag and is
//! shared read-only across every state of a piece type. Occupancy filtering
//! is the arbiter's job; the table only answers "is this offset in the
//! piece's repertoire for this kind of lookup".
//!
//! Rule format (one offset per line): `"<dr>,<dc>[:<tag>]"` with
//! `tag ∈ {capture, non_capture, 1st}`. Blank lines and `#` comments are
//! ignored; a missing or unknown tag means the offset works both ways.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::board::BoardGeometry;
use crate::types::Cell;

/// How an offset may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTag {
    /// Usable whether or not the destination is occupied.
    Either,
    /// Only toward an occupied destination (pawn diagonal).
    CaptureOnly,
    /// Only toward an empty destination (pawn forward step).
    NonCaptureOnly,
    /// Only while the piece is still in its first-action state
    /// (pawn double step).
    FirstMoveOnly,
}

impl MoveTag {
    /// Unknown tags deliberately fall back to `Either` rather than failing
    /// the whole rule file.
    fn parse(s: &str) -> Self {
        match s.trim() {
            "capture" => MoveTag::CaptureOnly,
            "non_capture" => MoveTag::NonCaptureOnly,
            "1st" => MoveTag::FirstMoveOnly,
            _ => MoveTag::Either,
        }
    }
}

/// Which table entries a lookup should surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveFlags {
    pub capture: bool,
    pub non_capture: bool,
    pub allow_first: bool,
}

impl MoveFlags {
    /// Everything except first-move-only offsets.
    pub fn any() -> Self {
        Self {
            capture: true,
            non_capture: true,
            allow_first: false,
        }
    }

    /// Capture-eligible lookup (destination holds an enemy).
    pub fn capture_only() -> Self {
        Self {
            capture: true,
            non_capture: false,
            allow_first: false,
        }
    }

    /// Non-capture lookup (destination empty).
    pub fn non_capture_only() -> Self {
        Self {
            capture: false,
            non_capture: true,
            allow_first: false,
        }
    }

    pub fn with_first(mut self, allow: bool) -> Self {
        self.allow_first = allow;
        self
    }

    fn admits(self, tag: MoveTag) -> bool {
        match tag {
            MoveTag::Either => true,
            MoveTag::CaptureOnly => self.capture,
            MoveTag::NonCaptureOnly => self.non_capture,
            MoveTag::FirstMoveOnly => self.allow_first,
        }
    }
}

#[derive(Debug, Error)]
pub enum MovesError {
    #[error("line {line}: malformed offset {text:?}")]
    MalformedOffset { line: usize, text: String },
}

/// Immutable offset table for one piece type.
#[derive(Debug, Clone, Default)]
pub struct Moves {
    offsets: HashMap<(i8, i8), MoveTag>,
}

impl Moves {
    /// Parse the line-oriented rule format.
    pub fn parse(text: &str) -> Result<Self, MovesError> {
        let mut offsets = HashMap::new();
        for (idx, raw) in text.lines().enumerate() {
            // Trailing comments allowed: "1,0:capture  # note".
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let (coords, tag) = match line.split_once(':') {
                Some((c, t)) => (c, MoveTag::parse(t)),
                None => (line, MoveTag::Either),
            };

            let parsed = coords.split_once(',').and_then(|(dr, dc)| {
                Some((dr.trim().parse::<i8>().ok()?, dc.trim().parse::<i8>().ok()?))
            });
            let Some(offset) = parsed else {
                return Err(MovesError::MalformedOffset {
                    line: idx + 1,
                    text: raw.to_string(),
                });
            };

            offsets.insert(offset, tag);
        }
        Ok(Self { offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn tag(&self, offset: (i8, i8)) -> Option<MoveTag> {
        self.offsets.get(&offset).copied()
    }

    /// All in-bounds destinations from `origin` whose tag is compatible
    /// with `flags`. Pure; no occupancy knowledge.
    pub fn get_moves(&self, origin: Cell, flags: MoveFlags, geometry: &BoardGeometry) -> Vec<Cell> {
        let mut out: Vec<Cell> = self
            .offsets
            .iter()
            .filter(|(_, &tag)| flags.admits(tag))
            .map(|(&(dr, dc), _)| origin.offset(dr, dc))
            .filter(|&cell| geometry.contains(cell))
            .collect();
        out.sort_unstable();
        out
    }

    /// Whether `dst` is reachable from `src` under `flags`.
    pub fn permits(&self, src: Cell, dst: Cell, flags: MoveFlags, geometry: &BoardGeometry) -> bool {
        if !geometry.contains(dst) {
            return false;
        }
        self.tag(src.delta_to(dst)).is_some_and(|tag| flags.admits(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pawn_white() -> Moves {
        Moves::parse(
            "# white pawn\n\
             -1,0:non_capture\n\
             -2,0:1st\n\
             -1,-1:capture\n\
             -1,1:capture\n",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let m = Moves::parse("\n# header\n  \n1,0\n0,1:capture # trailing\n").unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.tag((1, 0)), Some(MoveTag::Either));
        assert_eq!(m.tag((0, 1)), Some(MoveTag::CaptureOnly));
    }

    #[test]
    fn test_unknown_tag_defaults_to_either() {
        let m = Moves::parse("1,1:sideways").unwrap();
        assert_eq!(m.tag((1, 1)), Some(MoveTag::Either));
    }

    #[test]
    fn test_malformed_offset_is_an_error() {
        assert!(Moves::parse("one,two").is_err());
        assert!(Moves::parse("3").is_err());
    }

    #[test]
    fn test_get_moves_filters_by_flags() {
        let g = BoardGeometry::standard();
        let m = pawn_white();
        let origin = Cell::new(6, 3);

        let noncap = m.get_moves(origin, MoveFlags::non_capture_only(), &g);
        assert_eq!(noncap, vec![Cell::new(5, 3)]);

        let cap = m.get_moves(origin, MoveFlags::capture_only(), &g);
        assert_eq!(cap, vec![Cell::new(5, 2), Cell::new(5, 4)]);

        let first = m.get_moves(origin, MoveFlags::non_capture_only().with_first(true), &g);
        assert!(first.contains(&Cell::new(4, 3)));
    }

    #[test]
    fn test_get_moves_clips_to_board() {
        let g = BoardGeometry::standard();
        let m = pawn_white();
        // From the top row every white-pawn offset leaves the board.
        assert!(m
            .get_moves(Cell::new(0, 0), MoveFlags::any().with_first(true), &g)
            .is_empty());
    }

    #[test]
    fn test_permits_matches_get_moves() {
        let g = BoardGeometry::standard();
        let m = pawn_white();
        let origin = Cell::new(6, 3);
        assert!(m.permits(origin, Cell::new(5, 3), MoveFlags::non_capture_only(), &g));
        assert!(!m.permits(origin, Cell::new(5, 3), MoveFlags::capture_only(), &g));
        assert!(!m.permits(origin, Cell::new(4, 3), MoveFlags::non_capture_only(), &g));
    }
}
