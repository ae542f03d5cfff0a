pub mod config;
pub mod game_loop;
pub mod peer;
pub mod relay;
pub mod scenes;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `PONG_LOG_FORMAT=json` switches to JSON
/// lines; the filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("PONG_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
