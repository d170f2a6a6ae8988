//! Planner configuration.

/// Per-day load difference (hours) below which a day counts as balanced.
pub const DEFAULT_IMBALANCE_THRESHOLD_HOURS: f64 = 1.0;

/// Safety cap on balancing passes per day.
///
/// A heuristic bound on work, not a convergence guarantee: a day may stop
/// with residual imbalance when the cap is reached.
pub const DEFAULT_MAX_BALANCE_ITERATIONS: usize = 20;

/// Capacity assumed for an editor whose own capacity is unknown.
pub const DEFAULT_WEEKLY_CAPACITY_HOURS: f64 = 40.0;

/// Buffered planner events per subscriber before lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tuning for the workload balancer.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancerConfig {
    pub threshold_hours: f64,
    pub max_iterations: usize,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            threshold_hours: DEFAULT_IMBALANCE_THRESHOLD_HOURS,
            max_iterations: DEFAULT_MAX_BALANCE_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub balancer: BalancerConfig,
    pub default_weekly_capacity: f64,
    pub event_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            balancer: BalancerConfig::default(),
            default_weekly_capacity: DEFAULT_WEEKLY_CAPACITY_HOURS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PlannerConfig {
    pub fn with_balancer(mut self, balancer: BalancerConfig) -> Self {
        self.balancer = balancer;
        self
    }

    pub fn with_default_weekly_capacity(mut self, hours: f64) -> Self {
        self.default_weekly_capacity = hours;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
