//! Logging setup.
//!
//! The library only emits `tracing` events; binaries and tests decide where
//! they go.

use tracing::Level;

/// Install a global fmt subscriber at `level`.
///
/// Returns false when a global subscriber was already installed, so calling
/// this from several tests is harmless.
pub fn init(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init(Level::DEBUG);
        assert!(!init(Level::DEBUG));
    }
}
