/*!
topology - NUMA nodes, CPUs, hyper-thread siblings, package/core ids.

Mirrors the bus façade's split between a thin public surface (`Topology`)
and focused submodules that do the actual scanning and data-holding:

    cpu.rs   - `Cpu` and its raw jiffy counters.
    numa.rs  - `NumaNode`.
    scan.rs  - `scan_cpus` / `scan_numas`, the only code that touches `/sys`.

The intrusive linked lists the upstream tool threads through CPUs and NUMA
nodes are modelled here as ordered maps keyed by numeric id, which is the
only ordering the spec actually requires (reproducible tie-breaks).
*/

pub mod cpu;
pub mod numa;
pub mod scan;

use std::collections::BTreeMap;

pub use cpu::{Cpu, JiffyCounters};
pub use numa::NumaNode;
pub use scan::detect_nr_cpus;

use crate::cpumask::CpuMask;
use crate::error::Error;
use crate::sysfs::FsView;

#[derive(Debug, Clone)]
pub struct Topology {
    pub cpus: BTreeMap<usize, Cpu>,
    pub numas: BTreeMap<i32, NumaNode>,
    pub nr_cpus: usize,
}

impl Topology {
    /// Re-reads NUMA nodes then CPUs from the filesystem view, replacing any
    /// prior topology. Called at the top of every tick so device hot-add is
    /// handled (spec §2).
    pub fn scan(fs: &dyn FsView, nr_cpus: usize, ht: bool) -> Result<Topology, Error> {
        let numa_list = scan::scan_numas(fs, nr_cpus)?;
        let cpu_list = scan::scan_cpus(fs, &numa_list, ht)?;

        let mut numas = BTreeMap::new();
        for n in numa_list {
            numas.insert(n.id, n);
        }
        let mut cpus = BTreeMap::new();
        for c in cpu_list {
            cpus.insert(c.id, c);
        }

        Ok(Topology { cpus, numas, nr_cpus })
    }

    pub fn cpu(&self, id: usize) -> Option<&Cpu> {
        self.cpus.get(&id)
    }

    pub fn cpu_mut(&mut self, id: usize) -> Option<&mut Cpu> {
        self.cpus.get_mut(&id)
    }

    /// Resolve the modeled CPU that owns an IRQ given its raw kernel
    /// affinity mask: the lowest-numbered set bit if that CPU is itself
    /// modeled, or whichever modeled CPU absorbed it as an HT sibling when
    /// `ht = n` dropped it from the topology (spec §4.2, §8 scenario 6).
    pub fn resolve_owner(&self, affinity: &CpuMask) -> Option<usize> {
        let bit = affinity.lowest()?;
        if self.cpus.contains_key(&bit) {
            return Some(bit);
        }
        self.cpus.values().find(|c| c.sibling_mask.test(bit)).map(|c| c.id)
    }

    /// Preserve per-tick mutable state (`irqs`, `load`, counters) that a
    /// fresh scan would otherwise reset, for CPUs that still exist.
    pub fn carry_forward(&mut self, previous: &Topology) {
        for (id, cpu) in self.cpus.iter_mut() {
            if let Some(old) = previous.cpus.get(id) {
                cpu.irqs = old.irqs.clone();
                cpu.load = old.load;
                cpu.prev_jiffies = old.prev_jiffies;
                cpu.curr_jiffies = old.curr_jiffies;
            }
        }
    }
}
