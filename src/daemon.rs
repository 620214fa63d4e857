/*!
daemon - Daemonisation and pidfile management.

Skipped entirely in `-d`/debug mode. An unwritable pidfile is a startup
error, matching spec §6's non-zero exit policy.
*/

use daemonize::Daemonize;

use crate::cli::Cli;
use crate::error::Error;

pub fn daemonize(cli: &Cli) -> Result<(), Error> {
    if cli.debug {
        return Ok(());
    }

    Daemonize::new()
        .pid_file(&cli.pidfile)
        .working_directory("/")
        .start()
        .map_err(|e| Error::Config(format!("daemonizing: {e}")))
}
