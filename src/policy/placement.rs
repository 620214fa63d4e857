use std::collections::HashMap;

use log::warn;

use crate::cpumask::CpuMask;
use crate::irq::IrqRegistry;
use crate::topology::Topology;

/// Outcome of placing every queued IRQ. `placed` lists IRQs whose affinity
/// changed this tick (to be committed by the writer); `failed` lists IRQs
/// whose prior affinity was retained because no candidate CPU existed.
#[derive(Debug, Default)]
pub struct PlacementResult {
    pub placed: Vec<u32>,
    pub failed: Vec<u32>,
}

/// Assign a destination CPU to every IRQ in `balance_irqs`, mutating
/// `registry` and `topology` in place (spec §4.7).
pub fn balance(
    topology: &mut Topology,
    registry: &mut IrqRegistry,
    exclude_cpus: &CpuMask,
    load_limit: f64,
    non_local_cpus: bool,
    balance_irqs: &[u32],
) -> PlacementResult {
    let mut result = PlacementResult::default();
    let mut tick_load_overrides: HashMap<usize, f64> = HashMap::new();

    for &num in balance_irqs {
        let Some(irq) = registry.irqs.get(&num) else { continue };
        let local_cpus = irq.local_cpus;
        let universal_local = is_universal(&local_cpus, topology.nr_cpus);

        let base: Vec<usize> = topology
            .cpus
            .values()
            .filter(|c| !exclude_cpus.test(c.id) && c.load < load_limit)
            .map(|c| c.id)
            .collect();

        let candidates: Vec<usize> = if universal_local {
            base.clone()
        } else {
            let intersected: Vec<usize> = base.iter().copied().filter(|id| local_cpus.test(*id)).collect();
            if !intersected.is_empty() {
                intersected
            } else if non_local_cpus {
                base.clone()
            } else {
                Vec::new()
            }
        };

        if candidates.is_empty() {
            warn!("irq {num}: no placement candidate this tick, retaining prior affinity");
            result.failed.push(num);
            continue;
        }

        let destination = *candidates
            .iter()
            .min_by(|&&a, &&b| {
                let la = effective_load(topology, &tick_load_overrides, a);
                let lb = effective_load(topology, &tick_load_overrides, b);
                la.partial_cmp(&lb).unwrap().then(a.cmp(&b))
            })
            .expect("candidates non-empty");

        let dest_load = topology.cpu(destination).map(|c| c.load).unwrap_or(0.0);
        if let Some(dest_cpu) = topology.cpu(destination) {
            for sibling in dest_cpu.sibling_mask.iter() {
                let entry = tick_load_overrides.entry(sibling).or_insert(dest_load);
                if dest_load > *entry {
                    *entry = dest_load;
                }
            }
        }

        if let Some(previous_owner) = topology.resolve_owner(&irq.affinity) {
            if let Some(old_cpu) = topology.cpu_mut(previous_owner) {
                old_cpu.irqs.remove(&num);
            }
        }
        if let Some(new_cpu) = topology.cpu_mut(destination) {
            new_cpu.irqs.insert(num);
        }
        if let Some(irq) = registry.irqs.get_mut(&num) {
            irq.affinity = CpuMask::single(destination);
        }
        result.placed.push(num);
    }

    result
}

fn is_universal(mask: &CpuMask, nr_cpus: usize) -> bool {
    (0..nr_cpus).all(|id| mask.test(id))
}

/// The load used for tie-breaking: a CPU whose hyper-thread sibling was
/// already chosen as a destination this tick is treated as at least as
/// loaded as that sibling, so two IRQs don't pile onto the same physical
/// core's free-looking twin (spec §4.7).
fn effective_load(topology: &Topology, overrides: &HashMap<usize, f64>, id: usize) -> f64 {
    let actual = topology.cpu(id).map(|c| c.load).unwrap_or(f64::MAX);
    match overrides.get(&id) {
        Some(&over) => actual.max(over),
        None => actual,
    }
}
