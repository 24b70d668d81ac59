//! Position extraction from FIT activity files.
//!
//! Decoding is done by `fitparser`; this module only picks the
//! `position_lat` and `position_long` fields out of `record` messages and
//! converts them from semicircles to degrees.

use fitparser::profile::MesgNum;
use fitparser::Value;

use crate::error::TrackError;
use crate::GpsPoint;

/// sint32 "invalid" marker.
const INVALID_SINT32: i32 = 0x7FFF_FFFF;

const FIT_SIGNATURE: &[u8; 4] = b".FIT";

/// Convert a 32-bit semicircle angle to degrees: `value · 180 / 2^31`.
#[inline]
pub fn semicircles_to_degrees(value: i32) -> f64 {
    value as f64 * 180.0 / 2f64.powi(31)
}

/// Whether the bytes start with a FIT file header.
pub fn is_fit(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[8..12] == FIT_SIGNATURE
}

fn semicircles(value: &Value) -> Option<i32> {
    match value {
        Value::SInt32(v) if *v != INVALID_SINT32 => Some(*v),
        Value::Array(values) => values.iter().find_map(semicircles),
        _ => None,
    }
}

/// Extract all valid record positions, in file order. Records without a
/// position (indoor sessions, GPS dropouts) are skipped.
pub fn read_fit(bytes: &[u8]) -> Result<Vec<GpsPoint>, TrackError> {
    let records = fitparser::de::from_bytes(bytes).map_err(|e| TrackError::Fit(e.to_string()))?;

    let mut points = Vec::new();
    for record in records {
        if record.kind() != MesgNum::Record {
            continue;
        }
        let mut lat = None;
        let mut lon = None;
        for field in record.fields() {
            match field.name() {
                "position_lat" => lat = semicircles(field.value()),
                "position_long" => lon = semicircles(field.value()),
                _ => {}
            }
        }
        if let (Some(lat), Some(lon)) = (lat, lon) {
            points.push(GpsPoint::new(
                semicircles_to_degrees(lat),
                semicircles_to_degrees(lon),
            ));
        }
    }

    Ok(points)
}
