//! Dispatch-layer configuration.

/// Environment variable toggling development-mode error detail.
pub const DEV_MODE_ENV: &str = "PORTICO_DEV_MODE";

/// Configuration for the dispatch engine, fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchConfig {
    /// When true, error envelopes include internal failure detail
    /// (handler error chains, panic renderings). Validation issues are
    /// included regardless.
    pub dev_mode: bool,
}

impl DispatchConfig {
    /// Reads the configuration from the environment. `PORTICO_DEV_MODE`
    /// set to `1` or `true` (any case) enables dev mode; anything else,
    /// including an unset variable, is production.
    #[must_use]
    pub fn from_env() -> Self {
        let dev_mode = std::env::var(DEV_MODE_ENV)
            .map(|value| {
                let value = value.trim();
                value == "1" || value.eq_ignore_ascii_case("true")
            })
            .unwrap_or(false);
        Self { dev_mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_recognizes_truthy_values_and_defaults_to_production() {
        // Single test so the process-global variable is touched sequentially.
        std::env::remove_var(DEV_MODE_ENV);
        assert!(!DispatchConfig::from_env().dev_mode);

        std::env::set_var(DEV_MODE_ENV, "1");
        assert!(DispatchConfig::from_env().dev_mode);

        std::env::set_var(DEV_MODE_ENV, "True");
        assert!(DispatchConfig::from_env().dev_mode);

        std::env::set_var(DEV_MODE_ENV, "production");
        assert!(!DispatchConfig::from_env().dev_mode);

        std::env::remove_var(DEV_MODE_ENV);
    }
}
