use serde::{Deserialize, Serialize};

///
/// GeoPoint
///
/// Latitude/longitude pair, stored as the JSON object `{"Lat":..,"Lng":..}`.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GeoPoint {
    #[serde(rename = "Lat")]
    pub lat: f64,

    #[serde(rename = "Lng")]
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both coordinates finite and in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}
