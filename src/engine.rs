use std::sync::Once;

use tracing::info;

static INIT: Once = Once::new();

/// Handle passed to every verification entry point.
///
/// Holds no state of its own: it only proves that the one-time setup has run. Create one at
/// startup and share it by reference; it is `Send + Sync` and cheap to copy.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    _private: (),
}

impl Engine {
    /// Run the process-wide setup. Later calls return a handle without repeating it.
    pub fn init() -> Self {
        INIT.call_once(|| {
            info!(version = Self::version(), "DCAP quote verification engine initialized");
        });
        Engine { _private: () }
    }

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
