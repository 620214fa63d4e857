use rand::Rng;

use crate::cpumask::CpuMask;
use crate::irq::IrqRegistry;
use crate::topology::Topology;

use super::Strategy;

/// For each CPU at or above `threshold` and not excluded, evict exactly one
/// balanceable, not-yet-queued IRQ from its owned set and append it to
/// `balance_irqs`. CPUs with no eligible IRQ are skipped (spec §4.6).
pub fn choose_irqs_to_move<R: Rng + ?Sized>(
    topology: &Topology,
    registry: &IrqRegistry,
    exclude_cpus: &CpuMask,
    threshold: f64,
    strategy: Strategy,
    balance_irqs: &mut Vec<u32>,
    rng: &mut R,
) {
    for cpu in topology.cpus.values() {
        if exclude_cpus.test(cpu.id) {
            continue;
        }
        if cpu.load < threshold {
            continue;
        }

        let candidates: Vec<_> = cpu
            .irqs
            .iter()
            .filter_map(|num| registry.get(*num))
            .filter(|irq| irq.is_balanceable() && !balance_irqs.contains(&irq.num))
            .collect();

        if candidates.is_empty() {
            continue;
        }

        let chosen = match strategy {
            Strategy::Max => pick_extreme(&candidates, true),
            Strategy::Min => pick_extreme(&candidates, false),
            Strategy::Rnd => candidates[rng.gen_range(0..candidates.len())],
        };

        balance_irqs.push(chosen.num);
    }
}

/// Pick the candidate with the greatest (`maximize = true`) or least
/// (`maximize = false`) smoothed weight; ties favour the lowest IRQ number.
/// Candidates are iterated in ascending-num order (they come from a
/// `BTreeSet`), so the running `best` already holds the lowest num among
/// equal-weight entries seen so far.
fn pick_extreme<'a>(candidates: &[&'a crate::irq::Irq], maximize: bool) -> &'a crate::irq::Irq {
    let mut best = candidates[0];
    for &c in &candidates[1..] {
        let strictly_better = if maximize { c.weight > best.weight } else { c.weight < best.weight };
        if strictly_better {
            best = c;
        }
    }
    best
}
