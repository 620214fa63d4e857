/*!
config - INI-style config file loading and validation (spec §6, §4.11).

`key = value` lines, `#` comments, blank lines ignored. A missing file at
the *default* path is tolerated (all defaults apply); a missing file at an
explicitly passed `-c` path is a hard `Config` error.
*/

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::cpumask::CpuMask;
use crate::error::Error;
use crate::irq::ProximityOverrides;
use crate::policy::Strategy;
use crate::sysfs::FsView;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/irqd.conf";
pub const DEFAULT_PIDFILE: &str = "/var/run/irqd.pid";

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: Strategy,
    pub threshold: f64,
    pub load_limit: f64,
    pub short_interval: u64,
    pub long_interval: u64,
    pub exclude_cpus: CpuMask,
    pub use_cpus: CpuMask,
    pub ht: bool,
    pub non_local_cpus: bool,

    // Boundary-only fields, not part of the balancing engine's own
    // invariants, but part of the one config snapshot the engine swaps
    // atomically at reconfig (spec §9's "single Engine value" note).
    pub debug: bool,
    pub verbose: u8,
    pub pidfile: PathBuf,
    pub config_path: PathBuf,
    pub proximity_path: Option<PathBuf>,
    pub syslog_facility: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strategy: Strategy::Rnd,
            threshold: 99.0,
            load_limit: 99.0,
            short_interval: 2,
            long_interval: 5,
            exclude_cpus: CpuMask::init(),
            use_cpus: all_bits(),
            ht: true,
            non_local_cpus: false,
            debug: false,
            verbose: 0,
            pidfile: PathBuf::from(DEFAULT_PIDFILE),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            proximity_path: None,
            syslog_facility: "daemon".to_string(),
        }
    }
}

// "use-cpus" defaults to every bit in the fixed-width mask rather than a
// runtime CPU count, since `Default` has no topology to narrow it down to;
// `effective_exclude` intersects it against the real CPU count once the
// engine has scanned the topology.
fn all_bits() -> CpuMask {
    let mut m = CpuMask::init();
    m.set_all();
    m
}

impl Config {
    /// Effective exclusion mask the engine reads: `exclude_cpus ∪ ¬use_cpus`
    /// (spec §6).
    pub fn effective_exclude(&self, nr_cpus: usize) -> CpuMask {
        self.exclude_cpus.or(&self.use_cpus.complement(nr_cpus))
    }

    pub fn load(fs: &dyn FsView, cli: &Cli) -> Result<Config, Error> {
        let mut config = Config::default();
        config.config_path = cli.config.clone();
        config.pidfile = cli.pidfile.clone();
        config.debug = cli.debug;
        config.verbose = cli.verbose;
        config.syslog_facility = cli.syslog_facility.clone();
        config.proximity_path = cli.proximity.clone();

        let is_default_path = cli.config == Path::new(DEFAULT_CONFIG_PATH);
        match fs.read_to_string(&cli.config) {
            Ok(text) => apply_file(&mut config, &cli.config, &text)?,
            Err(e) if is_default_path && e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Config(format!("reading config file {}: {e}", cli.config.display())));
            }
        }

        if !(0.0..=100.0).contains(&config.threshold) {
            return Err(Error::Config(format!("threshold {} out of range [0,100]", config.threshold)));
        }
        if !(0.0..=100.0).contains(&config.load_limit) {
            return Err(Error::Config(format!("load-limit {} out of range [0,100]", config.load_limit)));
        }
        if config.short_interval == 0 || config.long_interval == 0 {
            return Err(Error::Config("short-interval and long-interval must be positive".to_string()));
        }

        Ok(config)
    }

    pub fn load_proximity(&self, fs: &dyn FsView) -> Result<ProximityOverrides, Error> {
        match &self.proximity_path {
            Some(path) => ProximityOverrides::load(fs, path),
            None => Ok(ProximityOverrides::empty()),
        }
    }
}

fn apply_file(config: &mut Config, path: &Path, text: &str) -> Result<(), Error> {
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::ConfigLine {
                path: path.to_path_buf(),
                line: idx + 1,
                message: format!("expected 'key = value', got: {raw}"),
            });
        };
        let key = key.trim();
        let value = value.trim();
        apply_key(config, path, idx + 1, key, value)?;
    }
    Ok(())
}

fn apply_key(config: &mut Config, path: &Path, line: usize, key: &str, value: &str) -> Result<(), Error> {
    let bad = |message: String| Error::ConfigLine {
        path: path.to_path_buf(),
        line,
        message,
    };

    match key {
        "strategy" => {
            config.strategy = value.parse().map_err(bad)?;
        }
        "threshold" => {
            config.threshold = value.parse::<f64>().map_err(|_| bad(format!("invalid float: {value}")))?;
        }
        "load-limit" => {
            config.load_limit = value.parse::<f64>().map_err(|_| bad(format!("invalid float: {value}")))?;
        }
        "short-interval" => {
            config.short_interval = value
                .parse::<u64>()
                .map_err(|_| bad(format!("invalid integer: {value}")))?;
        }
        "long-interval" => {
            config.long_interval = value
                .parse::<u64>()
                .map_err(|_| bad(format!("invalid integer: {value}")))?;
        }
        "exclude-cpus" => {
            config.exclude_cpus = CpuMask::parse_kernel_hex(value).map_err(|_| bad(format!("invalid mask: {value}")))?;
        }
        "use-cpus" => {
            config.use_cpus = CpuMask::parse_kernel_hex(value).map_err(|_| bad(format!("invalid mask: {value}")))?;
        }
        "ht" => {
            config.ht = parse_bool(value).map_err(bad)?;
        }
        "non-local-cpus" => {
            config.non_local_cpus = parse_bool(value).map_err(bad)?;
        }
        other => return Err(bad(format!("unknown config key '{other}'"))),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(format!("expected y/n, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::FakeFs;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["irqd"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn missing_default_config_yields_defaults() {
        let fs = FakeFs::new();
        let config = Config::load(&fs, &cli(&[])).unwrap();
        assert_eq!(config.threshold, 99.0);
        assert_eq!(config.strategy, Strategy::Rnd);
    }

    #[test]
    fn missing_explicit_config_is_fatal() {
        let fs = FakeFs::new();
        let err = Config::load(&fs, &cli(&["-c", "/tmp/missing.conf"])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn parses_recognised_keys() {
        let fs = FakeFs::new().with_file(
            "/etc/irqd.conf",
            "strategy = max\nthreshold = 80\nload-limit = 70\nshort-interval = 1\nlong-interval = 10\nht = n\nnon-local-cpus = y\n",
        );
        let config = Config::load(&fs, &cli(&[])).unwrap();
        assert_eq!(config.strategy, Strategy::Max);
        assert_eq!(config.threshold, 80.0);
        assert_eq!(config.load_limit, 70.0);
        assert_eq!(config.short_interval, 1);
        assert_eq!(config.long_interval, 10);
        assert!(!config.ht);
        assert!(config.non_local_cpus);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let fs = FakeFs::new().with_file("/etc/irqd.conf", "bogus = 1\n");
        let err = Config::load(&fs, &cli(&[])).unwrap_err();
        assert!(matches!(err, Error::ConfigLine { .. }));
    }

    #[test]
    fn out_of_range_threshold_is_an_error() {
        let fs = FakeFs::new().with_file("/etc/irqd.conf", "threshold = 150\n");
        let err = Config::load(&fs, &cli(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let fs = FakeFs::new().with_file("/etc/irqd.conf", "# comment\n\nthreshold = 50\n");
        let config = Config::load(&fs, &cli(&[])).unwrap();
        assert_eq!(config.threshold, 50.0);
    }

    #[test]
    fn effective_exclude_unions_exclude_and_not_use() {
        let mut config = Config::default();
        config.exclude_cpus = CpuMask::single(0);
        let mut use_cpus = CpuMask::init();
        use_cpus.set(1);
        use_cpus.set(2);
        config.use_cpus = use_cpus;
        let effective = config.effective_exclude(3);
        assert!(effective.test(0));
        assert!(!effective.test(1));
        assert!(!effective.test(2));
    }
}
