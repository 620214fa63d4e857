/*!
cli - Command-line flags, the authoritative subset from spec §6.
*/

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "irqd", about = "Balances IRQ affinity across CPU cores under sustained load")]
pub struct Cli {
    /// Run in the foreground; do not daemonise.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Increase log verbosity. Repeatable (-v, -vv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Pidfile path, used only when daemonising.
    #[arg(short = 'p', long, default_value = "/var/run/irqd.pid")]
    pub pidfile: PathBuf,

    /// Config file path.
    #[arg(short = 'c', long, default_value = "/etc/irqd.conf")]
    pub config: PathBuf,

    /// Proximity override file path.
    #[arg(short = 'x', long)]
    pub proximity: Option<PathBuf>,

    /// Syslog facility used when daemonised.
    #[arg(short = 'O', long = "facility", default_value = "daemon")]
    pub syslog_facility: String,

    /// Obsolete: honour hyper-thread siblings. Accepted for compatibility
    /// but ignored; the config file's `ht` key is authoritative (spec §9).
    #[arg(long = "ht")]
    pub ht: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::parse_from(["irqd", "-d", "-v", "-v", "-p", "/tmp/p.pid", "-c", "/tmp/c.conf"]);
        assert!(cli.debug);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.pidfile, PathBuf::from("/tmp/p.pid"));
        assert_eq!(cli.config, PathBuf::from("/tmp/c.conf"));
    }

    #[test]
    fn defaults_are_sensible() {
        let cli = Cli::parse_from(["irqd"]);
        assert!(!cli.debug);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.pidfile, PathBuf::from("/var/run/irqd.pid"));
        assert_eq!(cli.config, PathBuf::from("/etc/irqd.conf"));
        assert_eq!(cli.syslog_facility, "daemon");
    }

    #[test]
    fn ht_flag_is_accepted_but_parsed_separately_from_config() {
        let cli = Cli::parse_from(["irqd", "--ht", "n"]);
        assert_eq!(cli.ht.as_deref(), Some("n"));
    }
}
