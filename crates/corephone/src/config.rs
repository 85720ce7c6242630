//! `CoreConfig`: the facade's builder-style configuration, mirroring the
//! teacher's `ClientConfig`/`RegistrationConfig` builder pattern (§9A).

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level configuration for a running core instance: where it binds
/// media sockets, how long ICE gathering is allowed to take, whether
/// UPnP augmentation is attempted, and the default codec preference
/// seed handed to new accounts.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Local address new ICE transports bind their host candidates to.
    pub bind_addr: SocketAddr,
    /// Upper bound on how long ICE candidate gathering (including an
    /// optional UPnP mapping request) may take before the caller gives
    /// up and fails the owning call into `Failure`.
    pub ice_gathering_timeout: Duration,
    /// Attempt UPnP IGD port mapping to augment host candidates with a
    /// server-reflexive one.
    pub upnp_enabled: bool,
    /// STUN server used when an account doesn't set its own
    /// `STUN.server` detail.
    pub default_stun_server: Option<String>,
    /// Codec ids, most preferred first, seeded onto a brand-new
    /// account's `AccountCodecList` before the caller customises it.
    pub codec_preference_seed: Vec<String>,
}

impl CoreConfig {
    /// Sensible defaults: bind to `127.0.0.1:0`, a five-second ICE
    /// gathering budget, UPnP on, no default STUN server, and the
    /// catalog's built-in codec order.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().expect("valid literal socket addr"),
            ice_gathering_timeout: Duration::from_secs(5),
            upnp_enabled: true,
            default_stun_server: None,
            codec_preference_seed: vec!["opus".to_string(), "PCMU".to_string(), "PCMA".to_string()],
        }
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_ice_gathering_timeout(mut self, timeout: Duration) -> Self {
        self.ice_gathering_timeout = timeout;
        self
    }

    pub fn with_upnp_enabled(mut self, enabled: bool) -> Self {
        self.upnp_enabled = enabled;
        self
    }

    pub fn with_default_stun_server(mut self, server: impl Into<String>) -> Self {
        self.default_stun_server = Some(server.into());
        self
    }

    pub fn with_codec_preference_seed(mut self, codecs: Vec<String>) -> Self {
        self.codec_preference_seed = codecs;
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_customisation() {
        let config = CoreConfig::new();
        assert!(config.upnp_enabled);
        assert!(config.default_stun_server.is_none());
        assert!(!config.codec_preference_seed.is_empty());
    }

    #[test]
    fn builder_methods_chain_and_override() {
        let config = CoreConfig::new()
            .with_upnp_enabled(false)
            .with_default_stun_server("stun.example.com:3478")
            .with_ice_gathering_timeout(Duration::from_secs(10))
            .with_codec_preference_seed(vec!["PCMU".to_string()]);

        assert!(!config.upnp_enabled);
        assert_eq!(config.default_stun_server.as_deref(), Some("stun.example.com:3478"));
        assert_eq!(config.ice_gathering_timeout, Duration::from_secs(10));
        assert_eq!(config.codec_preference_seed, vec!["PCMU".to_string()]);
    }
}
