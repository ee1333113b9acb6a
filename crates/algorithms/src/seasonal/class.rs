//! Three-state water classes and their composite rules

/// Per-pixel water class of monthly and seasonal rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum PixClass {
    #[default]
    NoData = 0,
    NotWater = 1,
    Water = 2,
}

impl PixClass {
    pub const ALL: [PixClass; 3] = [PixClass::NoData, PixClass::NotWater, PixClass::Water];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PixClass::NoData),
            1 => Some(PixClass::NotWater),
            2 => Some(PixClass::Water),
            _ => None,
        }
    }

    /// Unknown codes read as no-data
    pub fn from_code_lossy(code: u8) -> Self {
        Self::from_code(code).unwrap_or(PixClass::NoData)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            PixClass::NoData => "nodata",
            PixClass::NotWater => "notwater",
            PixClass::Water => "water",
        }
    }
}

/// Combine the months of one season window.
///
/// Any water month makes the pixel water. Otherwise it is no-data only
/// when every month is no-data. An empty window is no-data.
pub fn season_class(months: &[PixClass]) -> PixClass {
    if months.contains(&PixClass::Water) {
        PixClass::Water
    } else if months.iter().all(|&m| m == PixClass::NoData) {
        PixClass::NoData
    } else {
        PixClass::NotWater
    }
}

/// Cross the dry and wet composites of one year
pub fn permanent_class(dry: PixClass, wet: PixClass) -> PixClass {
    use PixClass::*;
    match (dry, wet) {
        (Water, Water) => Water,
        (Water, NotWater) | (NotWater, Water) | (NotWater, NotWater) => NotWater,
        _ => NoData,
    }
}
