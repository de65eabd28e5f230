//! Logger setup for the demo binary and host integrations

/// Initialize `env_logger` for terminal use.
///
/// Defaults to INFO; `RUST_LOG` overrides it. Safe to call more than once,
/// later calls are ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "\r[{} {:5} {}] {}",
                buf.timestamp(),
                record.level(),
                record.module_path().unwrap_or("buildup"),
                record.args()
            )
        })
        .try_init();
}
