//! Logger setup for the preview binary.
//!
//! The library only talks to the `log` facade. Whoever hosts the player decides
//! where records go; the `vr180` binary calls [`init_logger`] once at startup.

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Install an `env_logger` backend.
///
/// `RUST_LOG` overrides the default `vr180=info` filter. The graphics stack is
/// clamped to warnings because wgpu and naga are extremely chatty at info.
/// Calling this twice is harmless.
pub fn init_logger() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("vr180=info"));
    builder.filter_module("naga", LevelFilter::Warn);
    builder.filter_module("wgpu", LevelFilter::Warn);
    builder.filter_module("wgpu_core", LevelFilter::Warn);
    builder.filter_module("wgpu_hal", LevelFilter::Warn);

    builder.format(|buf, record| {
        let style = buf.default_level_style(record.level());
        let module_path = record.module_path().unwrap_or("<unknown>");
        writeln!(
            buf,
            "{style}[{}]{style:#}[{}] {}",
            record.level(),
            module_path,
            record.args()
        )
    });

    let _ = builder.try_init();
}
