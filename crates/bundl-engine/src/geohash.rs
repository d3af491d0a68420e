//! Standard base32 geohash encoding, used to tag `NearbyBroadcast` events
//! with the cell a new order falls into (spec.md §4.6).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const BASE32: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision matching the cell size push topics subscribe to: five
/// characters is roughly a 5km x 5km box at the equator.
const PRECISION: usize = 5;

/// Encodes `(latitude, longitude)` to a [`PRECISION`]-character geohash.
/// Falls back to the empty string for coordinates that can't be converted
/// to `f64` (e.g. a `Decimal` wider than an `f64` can represent).
#[must_use]
pub fn encode(latitude: Decimal, longitude: Decimal) -> String {
    let (Some(lat), Some(lon)) = (latitude.to_f64(), longitude.to_f64()) else {
        return String::new();
    };
    encode_f64(lat, lon)
}

fn encode_f64(latitude: f64, longitude: f64) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut geohash = String::with_capacity(PRECISION);
    let mut bit = 0u8;
    let mut even = true;
    let mut ch = 0u8;

    while geohash.len() < PRECISION {
        if even {
            let mid = (lon_range.0 + lon_range.1) / 2.0;
            if longitude > mid {
                ch |= 1 << (4 - bit);
                lon_range.0 = mid;
            } else {
                lon_range.1 = mid;
            }
        } else {
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            if latitude > mid {
                ch |= 1 << (4 - bit);
                lat_range.0 = mid;
            } else {
                lat_range.1 = mid;
            }
        }
        even = !even;

        if bit < 4 {
            bit += 1;
        } else {
            geohash.push(BASE32[ch as usize] as char);
            bit = 0;
            ch = 0;
        }
    }

    geohash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn san_francisco_matches_known_geohash_prefix() {
        let hash = encode(Decimal::new(377_749, 4), Decimal::new(-1_224_194, 4));
        assert_eq!(hash, "9q8yy");
    }

    #[test]
    fn nearby_coordinates_share_a_cell() {
        let a = encode(Decimal::new(377_749, 4), Decimal::new(-1_224_194, 4));
        let b = encode(Decimal::new(377_750, 4), Decimal::new(-1_224_195, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn distant_coordinates_differ() {
        let sf = encode(Decimal::new(377_749, 4), Decimal::new(-1_224_194, 4));
        let nyc = encode(Decimal::new(407_128, 4), Decimal::new(-740_060, 4));
        assert_ne!(sf, nyc);
    }
}
