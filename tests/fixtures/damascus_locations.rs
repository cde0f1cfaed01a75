//! Real Damascus-area delivery locations for realistic test fixtures.
//!
//! The depot is a central warehouse; the rest are commercial and residential
//! delivery points spread across the metro area, far enough apart that
//! great-circle travel estimates are meaningful.

/// A named location with coordinates and a typical parcel demand.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub demand: i64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64, demand: i64) -> Self {
        Self {
            name,
            lat,
            lon,
            demand,
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

pub const DEPOT: Location = Location::new("Central Warehouse", 33.5130, 36.2920, 0);

pub const DELIVERY_POINTS: &[Location] = &[
    Location::new("Bab Touma Market", 33.5138, 36.3091, 2),
    Location::new("Mezzeh 86 Residences", 33.4837, 36.2352, 2),
    Location::new("Baramkeh Square", 33.5012, 36.2844, 1),
    Location::new("Qassaa Commercial", 33.5175, 36.3132, 2),
    Location::new("Abu Rummaneh Offices", 33.5159, 36.3028, 1),
    Location::new("Kafr Sousa Business Park", 33.4865, 36.2458, 3),
    Location::new("Malki Residences", 33.5221, 36.2913, 2),
    Location::new("Shaalan Boutiques", 33.5166, 36.2987, 1),
    Location::new("Mazzeh Autostrade Hub", 33.4849, 36.2614, 2),
    Location::new("Dummar Heights Center", 33.5531, 36.2405, 2),
    Location::new("Jaramana Main Street", 33.4850, 36.3489, 2),
    Location::new("Midan Market", 33.4938, 36.3033, 2),
    Location::new("Rukn al Din North", 33.5403, 36.3004, 2),
    Location::new("Qaboun Industrial", 33.5459, 36.3388, 3),
    Location::new("Douma City Center", 33.5715, 36.4012, 3),
    Location::new("Sayyida Zeinab Plaza", 33.4394, 36.3625, 2),
    Location::new("Kisweh Junction", 33.3643, 36.2306, 3),
    Location::new("Harran al Awamid Depot", 33.4935, 36.5255, 2),
];
