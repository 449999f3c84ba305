use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Decision path labels
pub const PATH_HEAVY_HITTER: &str = "heavy_hitter";
pub const PATH_POWER_OF_CHOICES: &str = "power_of_choices";
pub const PATH_COLD: &str = "cold";
pub const PATH_HOT_BALANCED: &str = "hot_balanced";
pub const PATH_HOT_SPREAD: &str = "hot_spread";

/// Register metric descriptions with the installed recorder
pub fn init_metrics() {
    describe_counter!(
        "skew_router_decisions_total",
        "Total routing decisions by policy and decision path"
    );
    describe_counter!(
        "skew_router_estimator_overflows_total",
        "Frequency estimator updates rejected for exceeding their bounds"
    );
    describe_counter!(
        "skew_router_sticky_spread_total",
        "Servers added to a hot key's sticky assignment set"
    );
    describe_gauge!(
        "skew_router_server_load",
        "Locally tracked load of each server by policy"
    );
    describe_gauge!(
        "skew_router_total_cardinality",
        "Approximate distinct keys routed by policy"
    );
}

pub struct RouterMetrics;

impl RouterMetrics {
    pub fn record_decision(policy: &'static str, path: &'static str) {
        counter!("skew_router_decisions_total",
            "policy" => policy,
            "path" => path
        )
        .increment(1);
    }

    pub fn record_estimator_overflow(policy: &'static str) {
        counter!("skew_router_estimator_overflows_total",
            "policy" => policy
        )
        .increment(1);
    }

    pub fn record_sticky_spread(policy: &'static str) {
        counter!("skew_router_sticky_spread_total",
            "policy" => policy
        )
        .increment(1);
    }

    pub fn set_server_load(policy: &'static str, server: usize, load: u64) {
        gauge!("skew_router_server_load",
            "policy" => policy,
            "server" => server.to_string()
        )
        .set(load as f64);
    }

    pub fn set_total_cardinality(policy: &'static str, cardinality: u64) {
        gauge!("skew_router_total_cardinality",
            "policy" => policy
        )
        .set(cardinality as f64);
    }
}
