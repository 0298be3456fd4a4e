//! Spatial Index
//!
//! Resolves reported coordinates to an administrative zone. Zones are
//! read-mostly reference data, so the whole table is cached in memory and
//! refreshed on a TTL; `invalidate` forces a reload after zone edits.
//!
//! Resolution order:
//! 1. point-in-polygon against each zone that carries a boundary ring
//! 2. nearest centroid as an explicit, logged fallback
//!
//! The fallback is never an error: a point inside the service envelope but
//! outside every polygon (boundary gaps, zones without rings) still gets the
//! most plausible zone. Resolution only fails when the zone table is empty.

use std::time::{Duration, Instant};

use shared::models::Zone;
use shared::types::Coordinates;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::core::error::{AppError, AppResult};
use crate::db::repository::zone;

struct ZoneCache {
    zones: Vec<Zone>,
    loaded_at: Option<Instant>,
}

pub struct SpatialIndex {
    pool: SqlitePool,
    ttl: Duration,
    cache: RwLock<ZoneCache>,
}

impl SpatialIndex {
    pub fn new(pool: SqlitePool, ttl_secs: u64) -> Self {
        Self {
            pool,
            ttl: Duration::from_secs(ttl_secs),
            cache: RwLock::new(ZoneCache {
                zones: Vec::new(),
                loaded_at: None,
            }),
        }
    }

    /// Resolve a point to its zone
    pub async fn resolve(&self, point: Coordinates) -> AppResult<Zone> {
        point.validate()?;

        let zones = self.zones().await?;
        if zones.is_empty() {
            return Err(AppError::OutsideServiceArea);
        }

        for zone in &zones {
            if let Some(boundary) = &zone.boundary {
                match parse_ring(boundary) {
                    Ok(ring) => {
                        if point_in_ring(point.latitude, point.longitude, &ring) {
                            debug!(zone_id = zone.id, ward = zone.ward_number, "Zone resolved by boundary");
                            return Ok(zone.clone());
                        }
                    }
                    Err(e) => {
                        warn!(zone_id = zone.id, error = %e, "Malformed zone boundary, skipping polygon test");
                    }
                }
            }
        }

        // 多边形都未命中, 退回最近质心
        let nearest = zones
            .iter()
            .min_by(|a, b| {
                let da = centroid_distance_sq(&point, a);
                let db = centroid_distance_sq(&point, b);
                da.total_cmp(&db)
            })
            .cloned()
            .ok_or(AppError::OutsideServiceArea)?;

        warn!(
            zone_id = nearest.id,
            ward = nearest.ward_number,
            lat = point.latitude,
            lon = point.longitude,
            "No boundary match, falling back to nearest centroid"
        );
        Ok(nearest)
    }

    /// All zones, cached
    pub async fn zones(&self) -> AppResult<Vec<Zone>> {
        {
            let cache = self.cache.read().await;
            if let Some(loaded_at) = cache.loaded_at
                && loaded_at.elapsed() < self.ttl
            {
                return Ok(cache.zones.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // 双重检查: 另一个任务可能已刷新
        if let Some(loaded_at) = cache.loaded_at
            && loaded_at.elapsed() < self.ttl
        {
            return Ok(cache.zones.clone());
        }

        let zones = zone::find_all(&self.pool).await?;
        debug!(count = zones.len(), "Zone cache refreshed");
        cache.zones = zones.clone();
        cache.loaded_at = Some(Instant::now());
        Ok(zones)
    }

    /// Drop the cache so the next lookup reloads from the database
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.loaded_at = None;
    }
}

fn centroid_distance_sq(point: &Coordinates, zone: &Zone) -> f64 {
    // Squared degree distance is enough for ranking at city scale
    let d_lat = point.latitude - zone.centroid_lat;
    let d_lon = point.longitude - zone.centroid_lon;
    d_lat * d_lat + d_lon * d_lon
}

fn parse_ring(boundary: &str) -> Result<Vec<[f64; 2]>, serde_json::Error> {
    serde_json::from_str::<Vec<[f64; 2]>>(boundary)
}

/// Ray-cast point-in-polygon over a `[lat, lon]` ring
///
/// Degenerate rings (< 3 vertices) never contain anything.
fn point_in_ring(lat: f64, lon: f64, ring: &[[f64; 2]]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (yi, xi) = (ring[i][0], ring[i][1]);
        let (yj, xj) = (ring[j][0], ring[j][1]);
        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}
