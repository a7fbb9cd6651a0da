/// The semantic class of a sparse volumetric grid.
///
/// This tag is not cosmetic: it determines the expected value semantics of
/// the grid (fog: bounded density in `[0, 1]` with a defined background;
/// level set: signed distance with the surface at the zero crossing) and
/// which operations are legal on it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GridClass {
    #[default]
    Unknown,
    FogVolume,
    LevelSet,
}

impl GridClass {
    /// The canonical display name, also used inside grid container files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::FogVolume => "fog volume",
            Self::LevelSet => "level set",
        }
    }

    /// Inverse of [`as_str`](Self::as_str). Unrecognized names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "fog volume" => Self::FogVolume,
            "level set" => Self::LevelSet,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for GridClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_round_trip() {
        for class in [GridClass::Unknown, GridClass::FogVolume, GridClass::LevelSet] {
            assert_eq!(GridClass::from_name(class.as_str()), class);
        }
        assert_eq!(GridClass::from_name("staggered"), GridClass::Unknown);
    }
}
