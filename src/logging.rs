//! Log backend setup.
//!
//! Everything in the crate logs through the `log` facade. On Android the
//! facade is routed to logcat via `android_logger`; elsewhere nothing is
//! installed and the macros are no-ops unless the host sets up a logger.

use crate::config::LogConfig;

/// Install the logcat backend once per process. Safe to call repeatedly.
#[cfg(target_os = "android")]
pub fn init(config: &LogConfig) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(config.max_level)
            .with_tag(config.tag),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init(config: &LogConfig) {
    log::set_max_level(config.max_level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_is_idempotent() {
        let cfg = LogConfig::default();
        init(&cfg);
        init(&cfg);
        assert_eq!(cfg.tag, "sphunter");
    }
}
