//! Default ICE configuration populated by the transport factory at
//! start-up (§4.J).

use std::time::Duration;

/// ICE nomination strategy. This core only ever runs non-aggressive
/// nomination, matching the distilled spec's "default ICE configuration
/// (IPv4 default, non-aggressive nomination)"; the variant exists so the
/// config type documents the choice rather than leaving it implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nomination {
    /// The controlling agent nominates only the final, best pair.
    NonAggressive,
    /// The controlling agent nominates every pair it checks as it goes.
    Aggressive,
}

/// Process-wide default ICE configuration, populated once by
/// [`crate::IceTransportFactory::new`].
#[derive(Debug, Clone)]
pub struct IceConfig {
    /// Prefer IPv4 host candidates when both families are available.
    pub prefer_ipv4: bool,
    /// Nomination strategy.
    pub nomination: Nomination,
    /// Upper bound on a single event-pump iteration's blocking wait,
    /// regardless of the next timer deadline (§4.J: "cap single-iteration
    /// timeout to 999 ms").
    pub max_iteration_timeout: Duration,
    /// How long to sleep after a multiplexer failure before retrying, to
    /// avoid busy-looping the event pump.
    pub multiplexer_failure_backoff: Duration,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            prefer_ipv4: true,
            nomination: Nomination::NonAggressive,
            max_iteration_timeout: Duration::from_millis(999),
            multiplexer_failure_backoff: Duration::from_millis(50),
        }
    }
}
