//! Local geodetic helpers
//!
//! These are the small numeric routines the drivers and the averaging
//! engine share: meters-per-degree scaling at a latitude, the roll/pitch to
//! takeoff angle transform and longitude normalisation.

const C1: f64 = 111412.84;
const C2: f64 = -93.5;
const C3: f64 = 0.118;
const C4: f64 = 111132.92;
const C5: f64 = -559.82;
const C6: f64 = 1.175;
const C7: f64 = 0.0023;

/// Degrees per meter of easting and northing at a latitude
///
/// Returns `(mtodeglon, mtodeglat)`.
///
/// ```
/// # use swathio::geodesy::coor_scale;
/// let (mtodeglon, mtodeglat) = coor_scale(0.0);
/// assert!((1.0 / mtodeglon - 111319.49).abs() < 0.1);
/// assert!((1.0 / mtodeglat - 110574.27).abs() < 0.1);
/// ```
pub fn coor_scale(latitude: f64) -> (f64, f64) {
    let radlat = latitude.to_radians();
    let mtodeglon =
        1.0 / (C1 * radlat.cos() + C2 * (3.0 * radlat).cos() + C3 * (5.0 * radlat).cos()).abs();
    let mtodeglat = 1.0
        / (C4 + C5 * (2.0 * radlat).cos() + C6 * (4.0 * radlat).cos() + C7 * (6.0 * radlat).cos())
            .abs();
    (mtodeglon, mtodeglat)
}

/// Convert an alpha/beta angle pair to takeoff angles
///
/// `alpha` is the angle of the ray forward of the across-track plane and
/// `beta` the angle from the port horizontal in that plane, both in degrees.
/// Returns `(theta, phi)` where `theta` is the angle from vertical and `phi`
/// the azimuth from starboard towards forward.
pub fn rollpitch_to_takeoff(alpha: f64, beta: f64) -> (f64, f64) {
    let (sa, ca) = alpha.to_radians().sin_cos();
    let (sb, cb) = beta.to_radians().sin_cos();
    let x = sa;
    let y = ca * cb;
    let z = ca * sb;

    let theta = z.clamp(-1.0, 1.0).acos().to_degrees();
    let phi = if x == 0.0 && y == 0.0 {
        0.0
    } else {
        x.atan2(y).to_degrees()
    };
    (theta, phi)
}

/// Fold a longitude into the range selected by `lonflip`
///
/// `-1` selects [-360, 0], `0` selects [-180, 180] and `1` selects [0, 360].
/// Values already in range are returned unchanged and values above the
/// range land on its upper edge rather than its lower one. A non-finite
/// longitude stays non-finite.
pub fn apply_lonflip(lonflip: i32, longitude: f64) -> f64 {
    let (lo, hi) = match lonflip {
        l if l < 0 => (-360.0, 0.0),
        0 => (-180.0, 180.0),
        _ => (0.0, 360.0),
    };
    if (lo..=hi).contains(&longitude) || !longitude.is_finite() {
        return longitude;
    }
    let lon = lo + (longitude - lo).rem_euclid(360.0);
    if lon == lo && longitude > hi {
        hi
    } else {
        lon
    }
}

/// Fold an angle into [0, 360)
pub fn fold_heading(heading: f64) -> f64 {
    let h = heading.rem_euclid(360.0);
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}
