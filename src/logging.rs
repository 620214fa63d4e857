/*!
logging - `log` facade wiring: `env_logger` in the foreground, `syslog` when
daemonised. The rest of the crate only ever calls `log::{error,warn,info,
debug,trace}!`; this module is the only place that picks a backend.
*/

use log::LevelFilter;
use syslog::Facility;

use crate::cli::Cli;
use crate::error::Error;

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn parse_facility(name: &str) -> Result<Facility, Error> {
    match name {
        "daemon" => Ok(Facility::LOG_DAEMON),
        "user" => Ok(Facility::LOG_USER),
        "local0" => Ok(Facility::LOG_LOCAL0),
        "local1" => Ok(Facility::LOG_LOCAL1),
        "local2" => Ok(Facility::LOG_LOCAL2),
        "local3" => Ok(Facility::LOG_LOCAL3),
        "local4" => Ok(Facility::LOG_LOCAL4),
        "local5" => Ok(Facility::LOG_LOCAL5),
        "local6" => Ok(Facility::LOG_LOCAL6),
        "local7" => Ok(Facility::LOG_LOCAL7),
        other => Err(Error::Config(format!("unknown syslog facility '{other}'"))),
    }
}

/// Initialise the global `log` backend. In `-d` (foreground) mode, logs go
/// to stderr via `env_logger`; otherwise they go to syslog at the
/// configured facility, matching the daemon's usual deployment (spec §6's
/// `-O` flag).
pub fn init_logging(cli: &Cli) -> Result<(), Error> {
    let level = level_for(cli.verbose);

    if cli.debug {
        env_logger::Builder::new().filter_level(level).init();
        return Ok(());
    }

    let facility = parse_facility(&cli.syslog_facility)?;
    let formatter = syslog::Formatter3164 {
        facility,
        hostname: None,
        process: "irqd".into(),
        pid: std::process::id(),
    };
    let logger = syslog::unix(formatter).map_err(|e| Error::Config(format!("connecting to syslog: {e}")))?;
    log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
        .map_err(|e| Error::Config(format!("installing syslog logger: {e}")))?;
    log::set_max_level(level);
    Ok(())
}
