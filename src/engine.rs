/*!
engine - Owns topology, IRQ registry, config, and the balance queue: the one
value spec §9 models the source's global mutable state as. `Engine::tick`
is the closed loop of spec §4.9: rescan -> relink -> sample -> select ->
place/write.
*/

use std::time::Duration;

use rand::RngCore;

use crate::affinity::apply_affinity;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::Error;
use crate::irq::{scan_irqs, IrqRegistry, ProximityOverrides};
use crate::policy::{balance, choose_irqs_to_move};
use crate::stats::{relink_ownership, sample_cpu_load, sample_irq_deltas};
use crate::sysfs::FsView;
use crate::topology::{detect_nr_cpus, Topology};

/// Which interval the caller should sleep for after a tick (spec §4.9):
/// `Short` after an active balance, `Long` when nothing moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Short,
    Long,
}

pub struct Engine<F: FsView> {
    fs: F,
    config: Config,
    proximity: ProximityOverrides,
    topology: Topology,
    registry: IrqRegistry,
    balance_irqs: Vec<u32>,
    rng: Box<dyn RngCore>,
}

impl<F: FsView> Engine<F> {
    pub fn new(fs: F, config: Config) -> Result<Engine<F>, Error> {
        Self::new_with_rng(fs, config, Box::new(rand::thread_rng()))
    }

    /// Construct with an explicit RNG source, so selection's `rnd` strategy
    /// can be driven deterministically in tests.
    pub fn new_with_rng(fs: F, config: Config, rng: Box<dyn RngCore>) -> Result<Engine<F>, Error> {
        let proximity = config.load_proximity(&fs)?;
        let nr_cpus = detect_nr_cpus(&fs)?;
        let topology = Topology::scan(&fs, nr_cpus, config.ht)?;
        proximity.validate(&topology)?;

        // Every IRQ observed for the first time is queued for an initial
        // balance pass (spec §4.3); at startup that means the whole
        // registry, which is the daemon's usual cold-start behaviour.
        let (registry, balance_irqs) = scan_irqs(&fs, &topology, &proximity, None)?;

        Ok(Engine {
            fs,
            config,
            proximity,
            topology,
            registry,
            balance_irqs,
            rng,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn registry(&self) -> &IrqRegistry {
        &self.registry
    }

    /// Reparse the config file (and proximity file, if configured). On
    /// failure the previous config is retained and the error is logged;
    /// reconfig is never fatal (spec §7, §4.9).
    pub fn reconfigure(&mut self, cli: &Cli) {
        let new_config = match Config::load(&self.fs, cli) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("reconfigure: {e}, retaining previous configuration");
                return;
            }
        };
        let new_proximity = match new_config.load_proximity(&self.fs) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("reconfigure: {e}, retaining previous configuration");
                return;
            }
        };
        if let Err(e) = new_proximity.validate(&self.topology) {
            log::warn!("reconfigure: {e}, retaining previous configuration");
            return;
        }

        self.config = new_config;
        self.proximity = new_proximity;
        log::info!("reconfigure: applied new configuration");
    }

    /// Run one tick of the closed loop, returning which interval the caller
    /// should sleep for next.
    pub fn tick(&mut self) -> TickOutcome {
        if let Err(e) = self.rescan() {
            log::error!("topology/irq rescan failed, retaining previous state: {e}");
        }

        relink_ownership(&mut self.topology, &self.registry);

        if let Err(e) = sample_cpu_load(&self.fs, &mut self.topology) {
            log::error!("cpu load sampling failed: {e}");
        }
        if let Err(e) = sample_irq_deltas(&self.fs, &mut self.registry) {
            log::error!("irq delta sampling failed: {e}");
        }

        let nr_cpus = self.topology.nr_cpus;
        let exclude = self.config.effective_exclude(nr_cpus);
        choose_irqs_to_move(
            &self.topology,
            &self.registry,
            &exclude,
            self.config.threshold,
            self.config.strategy,
            &mut self.balance_irqs,
            &mut *self.rng,
        );

        if self.balance_irqs.is_empty() {
            return TickOutcome::Long;
        }

        let result = balance(
            &mut self.topology,
            &mut self.registry,
            &exclude,
            self.config.load_limit,
            self.config.non_local_cpus,
            &self.balance_irqs,
        );
        apply_affinity(&self.fs, &self.registry, &result.placed);
        self.balance_irqs.clear();
        TickOutcome::Short
    }

    /// Rescan topology and the IRQ registry so device hot-add is handled
    /// (spec §2). Per-tick mutable CPU state is carried forward across the
    /// topology replacement; the registry scan itself retains prior
    /// counters for any IRQ it already knew about.
    fn rescan(&mut self) -> Result<(), Error> {
        let nr_cpus = detect_nr_cpus(&self.fs)?;
        let mut topology = Topology::scan(&self.fs, nr_cpus, self.config.ht)?;
        topology.carry_forward(&self.topology);

        let (registry, new_ids) = scan_irqs(&self.fs, &topology, &self.proximity, Some(&self.registry))?;
        self.topology = topology;
        self.registry = registry;
        self.balance_irqs.extend(new_ids);
        Ok(())
    }

    pub fn next_sleep(&self, outcome: TickOutcome) -> Duration {
        match outcome {
            TickOutcome::Short => Duration::from_secs(self.config.short_interval),
            TickOutcome::Long => Duration::from_secs(self.config.long_interval),
        }
    }
}
