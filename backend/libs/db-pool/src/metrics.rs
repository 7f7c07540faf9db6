//! Prometheus gauges for the database connection pool

use prometheus::{register_int_gauge_vec, IntGaugeVec};
use sqlx::PgPool;

lazy_static::lazy_static! {
    /// Database connection pool size by state (idle/active/max)
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connection count by state",
        &["service", "state"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOccupancy {
    pub idle: i64,
    pub active: i64,
    pub max: i64,
}

impl PoolOccupancy {
    pub fn of(pool: &PgPool) -> Self {
        let size = pool.size() as i64;
        let idle = pool.num_idle() as i64;
        Self {
            idle,
            active: size - idle,
            max: pool.options().get_max_connections() as i64,
        }
    }
}

/// Publish the current pool occupancy (called periodically)
pub fn update_pool_metrics(pool: &PgPool, service: &str) {
    set_pool_gauges(service, PoolOccupancy::of(pool));
}

fn set_pool_gauges(service: &str, occupancy: PoolOccupancy) {
    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "idle"])
        .set(occupancy.idle);
    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "active"])
        .set(occupancy.active);
    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "max"])
        .set(occupancy.max);
}
