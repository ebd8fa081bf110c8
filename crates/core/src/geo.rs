use crate::record::GpsTags;
use serde::{Deserialize, Serialize};

/// Degrees/minutes/seconds triple as stored in EXIF GPS rationals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl Dms {
    pub fn new(degrees: f64, minutes: f64, seconds: f64) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
        }
    }

    pub fn to_unsigned_decimal(self) -> f64 {
        self.degrees + self.minutes / 60.0 + self.seconds / 3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn parse(reference: &str) -> Option<Self> {
        match reference.trim().chars().next()?.to_ascii_uppercase() {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Hemisphere::South | Hemisphere::West => -1.0,
            Hemisphere::North | Hemisphere::East => 1.0,
        }
    }
}

/// Signed decimal degrees; negated for southern and western references.
pub fn dms_to_decimal(dms: Dms, reference: Hemisphere) -> f64 {
    dms.to_unsigned_decimal() * reference.sign()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Requires latitude, longitude and both references.
    pub fn from_gps(tags: &GpsTags) -> Option<Self> {
        let lat_ref = Hemisphere::parse(tags.latitude_ref.as_deref()?)?;
        let lon_ref = Hemisphere::parse(tags.longitude_ref.as_deref()?)?;
        Some(Self {
            latitude: dms_to_decimal(tags.latitude?, lat_ref),
            longitude: dms_to_decimal(tags.longitude?, lon_ref),
        })
    }
}
