//! Geographic primitives: geohash encoding, neighbor enumeration, haversine.
//!
//! This module provides:
//! - Standard base-32 geohash encode/decode at precisions 1-12
//! - 8-neighbor enumeration (N, NE, E, SE, S, SW, W, NW)
//! - Haversine distance on a spherical Earth (R = 6371 km)
//!
//! Coordinates are validated strictly: latitude must lie in [-90, 90] and
//! longitude in [-180, 180], boundary values included. Anything else is an
//! [`Error::InvalidCoordinate`].

use crate::error::{Error, Result};

/// Mean Earth radius in kilometers (spherical approximation).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geohash base-32 alphabet (excludes a, i, l, o).
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Maximum supported geohash precision.
pub const MAX_PRECISION: usize = 12;

/// Validate a coordinate pair.
///
/// Accepts the full closed ranges, so `lat = ±90` and `lng = ±180` pass.
/// Non-finite values are rejected.
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<()> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(Error::invalid_coordinate(lat, lng));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(Error::invalid_coordinate(lat, lng));
    }
    Ok(())
}

/// Encode a coordinate pair as a base-32 geohash of the given precision.
///
/// Bits alternate longitude-first, five bits per output character.
///
/// # Example
///
/// ```
/// use geoprox_core::geo::encode;
///
/// assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
/// assert_eq!(encode(42.605, -5.603, 5).unwrap(), "ezs42");
/// ```
pub fn encode(lat: f64, lng: f64, precision: usize) -> Result<String> {
    validate_coordinates(lat, lng)?;
    let precision = precision.clamp(1, MAX_PRECISION);

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);

    let mut hash = String::with_capacity(precision);
    let mut bits = 0u8;
    let mut ch = 0usize;
    let mut even = true; // even bit positions encode longitude

    while hash.len() < precision {
        if even {
            let mid = (lng_lo + lng_hi) / 2.0;
            if lng >= mid {
                ch = (ch << 1) | 1;
                lng_lo = mid;
            } else {
                ch <<= 1;
                lng_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if lat >= mid {
                ch = (ch << 1) | 1;
                lat_lo = mid;
            } else {
                ch <<= 1;
                lat_hi = mid;
            }
        }
        even = !even;
        bits += 1;
        if bits == 5 {
            hash.push(BASE32[ch] as char);
            bits = 0;
            ch = 0;
        }
    }

    Ok(hash)
}

/// Decode a geohash to the bounding box it identifies.
///
/// Returns `((lat_lo, lat_hi), (lng_lo, lng_hi))`.
pub fn decode_bounds(geohash: &str) -> Result<((f64, f64), (f64, f64))> {
    if geohash.is_empty() || geohash.len() > MAX_PRECISION {
        return Err(Error::invalid_geohash(geohash));
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for c in geohash.bytes() {
        let idx = BASE32
            .iter()
            .position(|&b| b == c.to_ascii_lowercase())
            .ok_or_else(|| Error::invalid_geohash(geohash))?;
        for shift in (0..5).rev() {
            let bit = (idx >> shift) & 1;
            if even {
                let mid = (lng_lo + lng_hi) / 2.0;
                if bit == 1 {
                    lng_lo = mid;
                } else {
                    lng_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if bit == 1 {
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even = !even;
        }
    }

    Ok(((lat_lo, lat_hi), (lng_lo, lng_hi)))
}

/// Decode a geohash to the center point of its cell as `(lat, lng)`.
pub fn decode(geohash: &str) -> Result<(f64, f64)> {
    let ((lat_lo, lat_hi), (lng_lo, lng_hi)) = decode_bounds(geohash)?;
    Ok(((lat_lo + lat_hi) / 2.0, (lng_lo + lng_hi) / 2.0))
}

/// The 8 neighboring cells of a geohash, in order N, NE, E, SE, S, SW, W, NW.
///
/// Neighbors are derived by re-encoding the cell center offset by one cell
/// span in each direction. Longitude wraps at the antimeridian; latitude is
/// clamped at the poles, so polar cells can repeat a neighbor.
pub fn neighbors(geohash: &str) -> Result<[String; 8]> {
    let ((lat_lo, lat_hi), (lng_lo, lng_hi)) = decode_bounds(geohash)?;
    let lat_span = lat_hi - lat_lo;
    let lng_span = lng_hi - lng_lo;
    let center_lat = (lat_lo + lat_hi) / 2.0;
    let center_lng = (lng_lo + lng_hi) / 2.0;
    let precision = geohash.len();

    // (dlat, dlng) multipliers: N, NE, E, SE, S, SW, W, NW
    const DIRS: [(f64, f64); 8] = [
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
        (-1.0, 1.0),
        (-1.0, 0.0),
        (-1.0, -1.0),
        (0.0, -1.0),
        (1.0, -1.0),
    ];

    let mut out: [String; 8] = Default::default();
    for (i, (dlat, dlng)) in DIRS.iter().enumerate() {
        let lat = (center_lat + dlat * lat_span).clamp(-90.0, 90.0);
        let lng = wrap_longitude(center_lng + dlng * lng_span);
        out[i] = encode(lat, lng, precision)?;
    }
    Ok(out)
}

/// Wrap a longitude into [-180, 180).
fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Haversine distance between two points in kilometers.
///
/// Spherical Earth approximation with R = 6371 km; accuracy ~0.3% for
/// practical distances. Inputs are degrees.
///
/// # Example
///
/// ```
/// use geoprox_core::geo::haversine_km;
///
/// // Paris to London: ~343 km
/// let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
/// assert!((d - 343.5).abs() < 5.0);
/// ```
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a =
        (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlng / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_hashes() {
        // Published reference hashes
        assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
        assert_eq!(encode(42.605, -5.603, 5).unwrap(), "ezs42");

        // Lower Manhattan sits in the dr5 region
        let nyc = encode(40.71, -74.01, 6).unwrap();
        assert!(nyc.starts_with("dr5"), "got {nyc}");
    }

    #[test]
    fn test_encode_boundary_coordinates() {
        assert!(encode(90.0, 180.0, 5).is_ok());
        assert!(encode(-90.0, -180.0, 5).is_ok());
        assert!(encode(0.0, 0.0, 5).is_ok());
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(matches!(
            encode(90.1, 0.0, 5),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            encode(0.0, 180.5, 5),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            encode(f64::NAN, 0.0, 5),
            Err(Error::InvalidCoordinate { .. })
        ));
        // Legacy data with wildly out-of-range values must surface, not pass
        assert!(encode(5000.0, 0.0, 5).is_err());
        assert!(encode(0.0, 100_000.0, 5).is_err());
    }

    #[test]
    fn test_decode_roundtrip() {
        for (lat, lng) in [
            (57.64911, 10.40744),
            (40.71, -74.01),
            (-33.8688, 151.2093),
            (0.0, 0.0),
        ] {
            let hash = encode(lat, lng, 7).unwrap();
            let (clat, clng) = decode(&hash).unwrap();
            // Center of the decoded cell must re-encode to the same hash
            assert_eq!(encode(clat, clng, 7).unwrap(), hash);
            // And must be within one cell of the input
            assert!((clat - lat).abs() < 0.01);
            assert!((clng - lng).abs() < 0.01);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("abcà").is_err());
        assert!(decode("dr5ai").is_err()); // 'a' and 'i' are not base-32 geohash chars
    }

    #[test]
    fn test_neighbors_directions() {
        let center = "u4pruyd";
        let (clat, clng) = decode(center).unwrap();
        let n = neighbors(center).unwrap();

        assert_eq!(n.len(), 8);
        for hash in &n {
            assert_eq!(hash.len(), center.len());
            assert_ne!(hash, center);
        }
        // All 8 distinct away from the poles
        let unique: std::collections::HashSet<_> = n.iter().collect();
        assert_eq!(unique.len(), 8);

        // Directional sanity: N is north of center, E is east, SW is both
        let (nlat, _) = decode(&n[0]).unwrap();
        assert!(nlat > clat);
        let (_, elng) = decode(&n[2]).unwrap();
        assert!(elng > clng);
        let (swlat, swlng) = decode(&n[5]).unwrap();
        assert!(swlat < clat && swlng < clng);
    }

    #[test]
    fn test_neighbors_antimeridian_wrap() {
        // Cell hugging the antimeridian: eastern neighbors wrap around
        let hash = encode(0.0, 179.99, 5).unwrap();
        let n = neighbors(&hash).unwrap();
        let (_, elng) = decode(&n[2]).unwrap();
        assert!(elng < 0.0, "east neighbor should wrap to negative lng, got {elng}");
    }

    #[test]
    fn test_haversine_known_distances() {
        assert!(haversine_km(0.0, 0.0, 0.0, 0.0).abs() < 1e-9);

        // Paris to London (~343 km)
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 343.5).abs() < 5.0, "got {d}");

        // One degree of longitude at the equator (~111.2 km)
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.5, "got {d}");

        // Pole to pole (~20,015 km)
        let d = haversine_km(90.0, 0.0, -90.0, 0.0);
        assert!((d - 20_015.0).abs() < 5.0, "got {d}");
    }
}
