/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub enum Tile {
    #[default]
    Empty,
    Ground,
    Brick,
    Question,
    Used,
    PipeTopLeft,
    PipeTopRight,
    PipeLeft,
    PipeRight,
    Flagpole,
    FlagTop,
    Castle,
    CastleDoor,
    Coin,
    Invisible,    // Solid, drawn as empty until hit
    Hard,
    Bridge,       // One-way: supports from above only
    Lava,
    Cloud,
    Vine,
    Platform,
    UndergroundGround,
    UndergroundBrick,
}

impl Tile {
    /// Does this tile block movement on every axis?
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            Tile::Ground
                | Tile::Brick
                | Tile::Question
                | Tile::Used
                | Tile::PipeTopLeft
                | Tile::PipeTopRight
                | Tile::PipeLeft
                | Tile::PipeRight
                | Tile::Hard
                | Tile::Platform
                | Tile::UndergroundGround
                | Tile::UndergroundBrick
                | Tile::Castle
                | Tile::Invisible
        )
    }

    pub fn is_passable(self) -> bool {
        !self.is_solid()
    }

    /// Can a big player smash this tile from below?
    pub fn is_breakable(self) -> bool {
        matches!(self, Tile::Brick | Tile::UndergroundBrick)
    }

    /// Does an upward collision with this tile fire the block-hit side effect?
    pub fn is_bumpable(self) -> bool {
        self.is_breakable() || matches!(self, Tile::Question | Tile::Used | Tile::Invisible)
    }

    /// Lands an actor falling onto it, ignored on every other contact.
    pub fn is_one_way(self) -> bool {
        matches!(self, Tile::Bridge)
    }

    pub fn is_lethal(self) -> bool {
        matches!(self, Tile::Lava)
    }

    pub fn is_flagpole(self) -> bool {
        matches!(self, Tile::Flagpole | Tile::FlagTop)
    }
}
