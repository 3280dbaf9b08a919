//! Logging configuration for the lowering pass
//!
//! Thin wrapper over `log` and `env_logger`.
//!
//! # Log Levels
//!
//! - `warn!` - Every reference that lowered to an error node
//! - `info!` - One line per lowered file and module
//! - `debug!` - One line per lowered declaration, tree dumps
//! - `trace!` - Expression kinds and registry allocations
//!
//! # Environment Variable
//!
//! ```bash
//! RUST_LOG=compiler::lower=debug cargo test
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging at Warn level; later calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging with a specific level; later calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from RUST_LOG, defaulting to Warn.
pub fn init_from_env() {
    INIT.call_once(|| {
        Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initialize logging for tests.
///
/// Output goes through the test harness capture; safe to call from every test.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .is_test(true)
        .try_init();
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}
