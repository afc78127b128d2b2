//! Spherical Web Mercator (EPSG:3857) and the slippy-map zoom ladder.

/// WGS84 semi-major axis (meters). Web Mercator uses it as the sphere radius.
pub const WGS84_A: f64 = 6_378_137.0;

/// Latitude at which the Mercator world becomes square.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

/// Circumference of the projected world (meters).
pub const WORLD_WIDTH_M: f64 = 2.0 * std::f64::consts::PI * WGS84_A;

/// Tile edge length the zoom ladder is defined against.
pub const TILE_SIZE_PX: f64 = 256.0;

pub fn mercator_x_m(lon_deg: f64) -> f64 {
    WGS84_A * lon_deg.to_radians()
}

pub fn mercator_y_m(lat_deg: f64) -> f64 {
    let lat = lat_deg
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    WGS84_A * (0.5 * (std::f64::consts::FRAC_PI_2 + lat)).tan().ln()
}

pub fn inverse_mercator_lon_deg(x_m: f64) -> f64 {
    (x_m / WGS84_A).to_degrees()
}

pub fn inverse_mercator_lat_deg(y_m: f64) -> f64 {
    let lat = 2.0 * (y_m / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2;
    lat.to_degrees()
}

/// `[lon, lat]` degrees to `[x, y]` meters.
pub fn lon_lat_to_mercator(lon_lat: [f64; 2]) -> [f64; 2] {
    [mercator_x_m(lon_lat[0]), mercator_y_m(lon_lat[1])]
}

/// `[x, y]` meters to `[lon, lat]` degrees.
pub fn mercator_to_lon_lat(xy: [f64; 2]) -> [f64; 2] {
    [inverse_mercator_lon_deg(xy[0]), inverse_mercator_lat_deg(xy[1])]
}

/// Meters per pixel at `zoom` (fractional zooms allowed).
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    WORLD_WIDTH_M / TILE_SIZE_PX / 2f64.powf(zoom)
}

pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (WORLD_WIDTH_M / TILE_SIZE_PX / resolution).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_origin() {
        let xy = lon_lat_to_mercator([0.0, 0.0]);
        assert_close(xy[0], 0.0, 1e-9);
        assert_close(xy[1], 0.0, 1e-9);
    }

    #[test]
    fn antimeridian_is_half_world() {
        assert_close(mercator_x_m(180.0), 0.5 * WORLD_WIDTH_M, 1e-6);
        assert_close(mercator_y_m(MERCATOR_MAX_LAT_DEG), 0.5 * WORLD_WIDTH_M, 1.0);
    }

    #[test]
    fn round_trip_lon_lat() {
        let ll = [-122.4194, 37.7749];
        let back = mercator_to_lon_lat(lon_lat_to_mercator(ll));
        assert_close(back[0], ll[0], 1e-9);
        assert_close(back[1], ll[1], 1e-9);
    }

    #[test]
    fn zoom_ladder_halves_resolution() {
        assert_close(resolution_for_zoom(0.0), 156_543.033_928_040_97, 1e-6);
        assert_close(resolution_for_zoom(1.0) * 2.0, resolution_for_zoom(0.0), 1e-9);
        assert_close(zoom_for_resolution(resolution_for_zoom(13.0)), 13.0, 1e-9);
    }
}
