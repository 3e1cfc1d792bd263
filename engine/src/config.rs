//! Engine configuration.
//!
//! The TOML file is read into raw structs with durations as strings, then
//! validated into `Config`. Any problem with a route is reported here, at
//! load time, never while packets are flowing.

use crate::error::ConfigError;
use pacer_buffer::{DEFAULT_CAPACITY, OverflowPolicy, RouteId};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_secs(1);
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

const MIN_TICK: Duration = Duration::from_millis(1);
const MAX_TICK: Duration = Duration::from_secs(1);

/// Occupancy at which a route flushes, either a share of capacity or an
/// absolute packet count.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Count(usize),
    Fraction(f64),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Fraction(1.0)
    }
}

impl Threshold {
    /// Resolve to a packet count for a ring of `capacity` slots.
    pub fn resolve(&self, route: &RouteId, capacity: usize) -> Result<usize, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidThreshold {
            route: route.clone(),
            reason,
        };
        match *self {
            Threshold::Count(n) if n == 0 || n > capacity => Err(invalid(format!(
                "count {} must be within 1..={}",
                n, capacity
            ))),
            Threshold::Count(n) => Ok(n),
            Threshold::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(invalid(format!("fraction {} must be within (0, 1]", f)))
            }
            Threshold::Fraction(f) => {
                let n = (f * capacity as f64).ceil() as usize;
                Ok(n.clamp(1, capacity))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    tick_interval: Option<String>,
    control: Option<SocketAddr>,
    stats_interval: Option<String>,
    #[serde(default)]
    routes: Vec<RawRoute>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    name: String,
    capacity: Option<usize>,
    occupancy_threshold: Option<Threshold>,
    max_latency: Option<String>,
    #[serde(default)]
    overflow: OverflowPolicy,
    tick_interval: Option<String>,
    listen: Option<SocketAddr>,
    forward: Option<SocketAddr>,
}

/// Validated per-route settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub name: RouteId,
    pub capacity: usize,
    /// Resolved packet count.
    pub occupancy_threshold: usize,
    pub max_latency: Duration,
    pub overflow: OverflowPolicy,
    pub tick_interval: Option<Duration>,
    /// Where the daemon receives this route's packets.
    pub listen: Option<SocketAddr>,
    /// Where the daemon sends this route's batches.
    pub forward: Option<SocketAddr>,
}

impl RouteConfig {
    /// A route with default sizing: 400 slots, flush when full or after 1s.
    pub fn new(name: impl Into<RouteId>) -> Self {
        Self {
            name: name.into(),
            capacity: DEFAULT_CAPACITY,
            occupancy_threshold: DEFAULT_CAPACITY,
            max_latency: DEFAULT_MAX_LATENCY,
            overflow: OverflowPolicy::default(),
            tick_interval: None,
            listen: None,
            forward: None,
        }
    }

    /// Sets capacity and resets the threshold to a full ring.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.occupancy_threshold = capacity;
        self
    }

    pub fn with_threshold(mut self, occupancy_threshold: usize) -> Self {
        self.occupancy_threshold = occupancy_threshold;
        self
    }

    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                route: self.name.clone(),
                capacity: self.capacity,
            });
        }
        Threshold::Count(self.occupancy_threshold).resolve(&self.name, self.capacity)?;
        if let Some(tick) = self.tick_interval {
            check_tick(tick)?;
        }
        Ok(())
    }
}

/// Top-level configuration, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tick_interval: Duration,
    /// Control socket for the daemon.
    pub control: Option<SocketAddr>,
    pub stats_interval: Duration,
    pub routes: Vec<RouteConfig>,
}

impl Config {
    pub fn new(routes: Vec<RouteConfig>) -> Result<Self, ConfigError> {
        let config = Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            control: None,
            stats_interval: DEFAULT_STATS_INTERVAL,
            routes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!("Reading config from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(routes = config.routes.len(), "Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        let routes = raw
            .routes
            .into_iter()
            .map(RawRoute::into_route_config)
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self {
            tick_interval: parse_duration_or(raw.tick_interval, DEFAULT_TICK_INTERVAL)?,
            control: raw.control,
            stats_interval: parse_duration_or(raw.stats_interval, DEFAULT_STATS_INTERVAL)?,
            routes,
        };
        config.validate()?;
        Ok(config)
    }

    /// The tick the host should drive: the shortest interval any route asks for.
    pub fn effective_tick(&self) -> Duration {
        self.routes
            .iter()
            .filter_map(|r| r.tick_interval)
            .fold(self.tick_interval, std::cmp::min)
    }

    pub fn route(&self, name: &RouteId) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| &r.name == name)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.routes.is_empty() {
            return Err(ConfigError::NoRoutes);
        }
        check_tick(self.tick_interval)?;
        if self.stats_interval.is_zero() {
            return Err(ConfigError::ZeroStatsInterval);
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(&route.name) {
                return Err(ConfigError::DuplicateRoute(route.name.clone()));
            }
            route.validate()?;
        }
        Ok(())
    }
}

impl RawRoute {
    fn into_route_config(self) -> Result<RouteConfig, ConfigError> {
        let raw = self;
        let name = RouteId::new(raw.name);
        let capacity = raw.capacity.unwrap_or(DEFAULT_CAPACITY);
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                route: name,
                capacity,
            });
        }
        let occupancy_threshold = raw
            .occupancy_threshold
            .unwrap_or_default()
            .resolve(&name, capacity)?;

        Ok(RouteConfig {
            name,
            capacity,
            occupancy_threshold,
            max_latency: parse_duration_or(raw.max_latency, DEFAULT_MAX_LATENCY)?,
            overflow: raw.overflow,
            tick_interval: raw.tick_interval.map(|s| parse_duration(&s)).transpose()?,
            listen: raw.listen,
            forward: raw.forward,
        })
    }
}

fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(s).map_err(|e| ConfigError::InvalidDuration(s.to_string(), e))
}

fn parse_duration_or(s: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    s.map(|s| parse_duration(&s))
        .transpose()
        .map(|d| d.unwrap_or(default))
}

fn check_tick(tick: Duration) -> Result<(), ConfigError> {
    if tick < MIN_TICK || tick > MAX_TICK {
        return Err(ConfigError::TickOutOfRange(tick));
    }
    Ok(())
}
