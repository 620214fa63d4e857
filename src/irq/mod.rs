/*!
irq - Known IRQs, their smp_affinity, description, and PCI/NUMA proximity.

Split the same way the topology façade is: this module holds the `Irq`
value and the registry map; `registry.rs` does the actual `/proc` scanning
and `/proc/interrupts` parsing; `proximity.rs` holds the operator override
file.
*/

pub mod proximity;
pub mod registry;

use crate::cpumask::CpuMask;

pub use proximity::ProximityOverrides;
pub use registry::{scan_irqs, IrqRegistry};

/// Kernel-internal IRQ names that are tracked (for per-CPU accounting) but
/// never offered up for balancing.
pub const NEVER_BALANCE: &[&str] = &[
    "timer",
    "ipi",
    "resched",
    "reschedule",
    "tlb",
    "threshold",
    "localtimer",
    "local timer",
];

/// One interrupt line, retained across ticks until the kernel stops
/// listing it.
#[derive(Debug, Clone)]
pub struct Irq {
    pub num: u32,
    pub desc: String,
    pub refined_desc: String,
    pub affinity: CpuMask,
    pub local_cpus: CpuMask,
    pub weight: f64,
    pub prev_count: Option<u64>,
    pub curr_count: u64,
    pub intr: u64,
    pub pxm_numa: Option<i32>,
}

impl Irq {
    pub fn is_balanceable(&self) -> bool {
        let lower = self.desc.to_lowercase();
        !NEVER_BALANCE.iter().any(|name| lower.contains(name))
    }
}

/// Extract a short device token from a free-form kernel description, e.g.
/// `"IO-APIC-edge   eth0"` -> `"eth0"`, `"PCI-MSI 32768-edge nvme0q12"` ->
/// `"nvme0q12"`. Falls back to the whole (lowercased) description when no
/// clear tail token is present.
pub fn refine_description(desc: &str) -> String {
    desc.split_whitespace()
        .last()
        .unwrap_or(desc)
        .to_lowercase()
}
