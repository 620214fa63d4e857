/*!
stats - Per-tick sampling: CPU load from `/proc/stat`, IRQ deltas from
`/proc/interrupts`, and per-CPU IRQ attribution.

Runs in the fixed order spec §4.5 demands: CPU load first, then IRQ deltas,
then attribution -- a later step never observes a partially-updated earlier
one because there are no suspension points between them (§5).
*/

use std::path::Path;

use crate::error::Error;
use crate::irq::registry::parse_proc_interrupts;
use crate::irq::IrqRegistry;
use crate::sysfs::FsView;
use crate::topology::cpu::JiffyCounters;
use crate::topology::Topology;

const PROC_STAT: &str = "/proc/stat";
const PROC_INTERRUPTS: &str = "/proc/interrupts";

/// Parse one `/proc/stat` `cpuN` line's columns into jiffy counters. The
/// kernel's column order is `user nice system idle iowait irq softirq
/// steal guest guest_nice`; only the first eight are used.
fn parse_stat_line(cols: &[u64]) -> JiffyCounters {
    JiffyCounters {
        user: cols.first().copied().unwrap_or(0),
        nice: cols.get(1).copied().unwrap_or(0),
        system: cols.get(2).copied().unwrap_or(0),
        idle: cols.get(3).copied().unwrap_or(0),
        iowait: cols.get(4).copied().unwrap_or(0),
        irq: cols.get(5).copied().unwrap_or(0),
        softirq: cols.get(6).copied().unwrap_or(0),
        steal: cols.get(7).copied().unwrap_or(0),
    }
}

/// Read `/proc/stat` and update every known CPU's `load`, shifting
/// `curr_jiffies` into `prev_jiffies`. Load stays `0.0` until a second
/// sample exists for that CPU (first tick after a topology rescan).
pub fn sample_cpu_load(fs: &dyn FsView, topology: &mut Topology) -> Result<(), Error> {
    let text = fs
        .read_to_string(Path::new(PROC_STAT))
        .map_err(|e| Error::Topology(format!("reading {PROC_STAT}: {e}")))?;

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let Some(label) = tokens.next() else { continue };
        let Some(id_str) = label.strip_prefix("cpu") else { continue };
        if id_str.is_empty() {
            continue; // the aggregate "cpu" line, not a per-CPU line
        }
        let Ok(id) = id_str.parse::<usize>() else { continue };
        let Some(cpu) = topology.cpu_mut(id) else { continue };

        let cols: Vec<u64> = tokens.filter_map(|t| t.parse::<u64>().ok()).collect();
        let sample = parse_stat_line(&cols);

        cpu.prev_jiffies = cpu.curr_jiffies;
        cpu.curr_jiffies = Some(sample);

        cpu.load = match cpu.prev_jiffies {
            Some(prev) => {
                let busy_delta = sample.busy().saturating_sub(prev.busy());
                let total_delta = sample.total().saturating_sub(prev.total());
                100.0 * busy_delta as f64 / (total_delta.max(1)) as f64
            }
            None => 0.0,
        };
    }
    Ok(())
}

/// Read `/proc/interrupts` and update each known IRQ's `intr` (delta since
/// last sample) and smoothed `weight`. A brand new IRQ has no prior sum to
/// diff against, so its `intr` is the whole observed count and its weight
/// is initialised directly to that value rather than blended with a prior
/// one (spec §4.5: "new IRQs initialised to intr"). This differs from the
/// CPU-load first-sample policy, which is explicitly zero rather than the
/// raw counter.
pub fn sample_irq_deltas(fs: &dyn FsView, registry: &mut IrqRegistry) -> Result<(), Error> {
    let text = fs
        .read_to_string(Path::new(PROC_INTERRUPTS))
        .map_err(|e| Error::Topology(format!("reading {PROC_INTERRUPTS}: {e}")))?;
    let rows = parse_proc_interrupts(&text);

    for (num, irq) in registry.irqs.iter_mut() {
        let Some(row) = rows.get(num) else { continue };
        let new_sum: u64 = row.per_cpu.iter().sum();

        let delta = match irq.prev_count {
            Some(prev) => new_sum.saturating_sub(prev),
            None => new_sum,
        };
        irq.intr = delta;
        irq.weight = match irq.prev_count {
            Some(_) => 0.5 * irq.weight + 0.5 * delta as f64,
            None => delta as f64,
        };
        irq.prev_count = Some(new_sum);
        irq.curr_count = new_sum;
    }
    Ok(())
}

/// Credit each IRQ's `intr` to the CPU that currently owns it (the lowest
/// CPU id in its `affinity` mask, remapped to its HT-sibling representative
/// when that CPU was dropped from the model), rebuilding every CPU's `irqs`
/// set from scratch. Run at the top of each tick, before sampling, so
/// accounting always reflects the latest committed placement (spec §4.3,
/// §4.5.3).
pub fn relink_ownership(topology: &mut Topology, registry: &IrqRegistry) {
    for cpu in topology.cpus.values_mut() {
        cpu.irqs.clear();
    }
    for irq in registry.irqs.values() {
        if let Some(owner) = topology.resolve_owner(&irq.affinity) {
            if let Some(cpu) = topology.cpu_mut(owner) {
                cpu.irqs.insert(irq.num);
            }
        }
    }
}
