//! 地理计算
//!
//! 球面距离、方位角和近似坐标偏移

use serde::{Deserialize, Serialize};

/// 地球平均半径（米）
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// 纬度每度对应的近似米数
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// 经纬度坐标（十进制度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// 纬度在 [-90, 90]、经度在 [-180, 180] 之内
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Haversine 大圆距离（米）
///
/// 参数顺序无关：`haversine_distance_meters(a, b) == haversine_distance_meters(b, a)`。
pub fn haversine_distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// 从 `from` 指向 `to` 的初始方位角，范围 [0, 360)
pub fn bearing_degrees(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// 按平面近似把坐标沿方位角移动 `distance_meters`
///
/// 只适合几百米内的小位移，模拟器用它摆放标签位置。
pub fn offset_by_meters(origin: GeoPoint, distance_meters: f64, bearing_deg: f64) -> GeoPoint {
    let bearing = bearing_deg.to_radians();
    let lat_offset = distance_meters * bearing.cos() / METERS_PER_DEGREE;
    let lon_offset =
        distance_meters * bearing.sin() / (METERS_PER_DEGREE * origin.lat.to_radians().cos());

    GeoPoint::new(origin.lat + lat_offset, origin.lon + lon_offset)
}
