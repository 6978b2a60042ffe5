use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Initialise the global logger once.
///
/// `RUST_LOG` wins when set. Otherwise this crate logs at `Info` (`Debug`
/// when verbose) and every other crate is silenced.
pub fn init(verbose: bool) {
    let mut builder = Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
        builder.filter(None, LevelFilter::Off);
        builder.filter(Some("voclabel"), level);
    }

    builder.format(|buf, record| {
        if record.level() <= log::Level::Warn {
            writeln!(buf, "[!] {}", record.args())
        } else {
            writeln!(buf, "[*] {}", record.args())
        }
    });

    // A second init (e.g. from tests) keeps the first logger
    let _ = builder.try_init();
}
