use std::collections::BTreeMap;
use std::path::Path;

use crate::cpumask::CpuMask;
use crate::error::Error;
use crate::sysfs::FsView;
use crate::topology::Topology;

use super::proximity::ProximityOverrides;
use super::{refine_description, Irq};

const PROC_IRQ: &str = "/proc/irq";
const PROC_INTERRUPTS: &str = "/proc/interrupts";

const NON_DEVICE_ENTRIES: &[&str] = &["smp_affinity", "smp_affinity_list", "affinity_hint", "node", "spurious", "actions"];

#[derive(Debug, Default, Clone)]
pub struct IrqRegistry {
    pub irqs: BTreeMap<u32, Irq>,
}

impl IrqRegistry {
    pub fn get(&self, num: u32) -> Option<&Irq> {
        self.irqs.get(&num)
    }
}

/// One row of `/proc/interrupts`: the per-CPU service counts and the
/// description tail after them.
#[derive(Debug, Clone)]
pub struct ProcInterruptsRow {
    pub per_cpu: Vec<u64>,
    pub desc: String,
}

/// Parse `/proc/interrupts`. The header row is ignored beyond establishing
/// that data rows begin with `<N>:`; each data row's leading integers (one
/// per column the kernel printed) are the per-CPU counts, and everything
/// after the last integer is the free-form description.
pub fn parse_proc_interrupts(text: &str) -> BTreeMap<u32, ProcInterruptsRow> {
    let mut rows = BTreeMap::new();
    for line in text.lines().skip(1) {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else { continue };
        let Some(num_str) = first.strip_suffix(':') else { continue };
        let Some(num) = num_str.parse::<u32>().ok() else { continue };

        let rest: Vec<&str> = tokens.collect();
        let mut per_cpu = Vec::new();
        let mut split_at = 0;
        for tok in &rest {
            match tok.parse::<u64>() {
                Ok(v) => {
                    per_cpu.push(v);
                    split_at += 1;
                }
                Err(_) => break,
            }
        }
        let desc = rest[split_at..].join(" ");
        rows.insert(num, ProcInterruptsRow { per_cpu, desc });
    }
    rows
}

fn all_ones(nr_cpus: usize) -> CpuMask {
    CpuMask::init().complement(nr_cpus)
}

/// Refresh the IRQ registry from `/proc/irq/` and `/proc/interrupts`.
/// Returns the new registry and the numbers of newly observed, balanceable
/// IRQs to append to `balance_irqs` (spec §4.3).
pub fn scan_irqs(
    fs: &dyn FsView,
    topology: &Topology,
    proximity: &ProximityOverrides,
    previous: Option<&IrqRegistry>,
) -> Result<(IrqRegistry, Vec<u32>), Error> {
    let interrupts_text = fs
        .read_to_string(Path::new(PROC_INTERRUPTS))
        .map_err(|e| Error::Topology(format!("reading {PROC_INTERRUPTS}: {e}")))?;
    let interrupts = parse_proc_interrupts(&interrupts_text);

    let root = Path::new(PROC_IRQ);
    let entries = fs
        .read_dir_names(root)
        .map_err(|e| Error::Topology(format!("reading {}: {e}", root.display())))?;

    let mut ids: Vec<u32> = entries.iter().filter_map(|n| n.parse::<u32>().ok()).collect();
    ids.sort_unstable();

    let mut registry = IrqRegistry::default();
    let mut newly_balanceable = Vec::new();

    for num in ids {
        let irq_dir = root.join(num.to_string());
        let affinity_path = irq_dir.join("smp_affinity");

        // A single IRQ's smp_affinity becoming unreadable (hot-remove mid
        // scan, EIO, ...) is an IoTransient: log it and drop that one IRQ
        // from this scan rather than failing the whole registry refresh
        // (spec §7, §4.3's hot-remove clause).
        let affinity_text = match fs.read_to_string(&affinity_path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{}, dropping irq {num} from this scan", Error::io(affinity_path.clone(), e));
                continue;
            }
        };
        let affinity = match CpuMask::parse_kernel_hex(affinity_text.trim()) {
            Ok(mask) => mask,
            Err(_) => {
                log::warn!(
                    "{}, dropping irq {num} from this scan",
                    Error::InvalidMask(format!("{} at {}", affinity_text.trim(), affinity_path.display()))
                );
                continue;
            }
        };

        let desc = match interrupts.get(&num) {
            Some(row) if !row.desc.is_empty() => row.desc.clone(),
            _ => device_tokens(fs, &irq_dir).unwrap_or_default(),
        };
        let refined_desc = refine_description(&desc);

        let pxm_numa = proximity.resolve(&refined_desc).or_else(|| {
            let node_path = irq_dir.join("node");
            fs.read_to_string(&node_path)
                .ok()
                .and_then(|s| s.trim().parse::<i32>().ok())
        });

        let local_cpus = match pxm_numa {
            Some(numa_id) => topology
                .numas
                .get(&numa_id)
                .map(|n| n.cpu_mask)
                .unwrap_or_else(|| all_ones(topology.nr_cpus)),
            None => all_ones(topology.nr_cpus),
        };

        let irq = match previous.and_then(|p| p.get(num)) {
            Some(old) => Irq {
                num,
                desc,
                refined_desc,
                affinity,
                local_cpus,
                weight: old.weight,
                prev_count: old.prev_count,
                curr_count: old.curr_count,
                intr: old.intr,
                pxm_numa,
            },
            None => {
                let irq = Irq {
                    num,
                    desc,
                    refined_desc,
                    affinity,
                    local_cpus,
                    weight: 0.0,
                    prev_count: None,
                    curr_count: 0,
                    intr: 0,
                    pxm_numa,
                };
                if irq.is_balanceable() {
                    newly_balanceable.push(num);
                }
                irq
            }
        };
        registry.irqs.insert(num, irq);
    }

    Ok((registry, newly_balanceable))
}

fn device_tokens(fs: &dyn FsView, irq_dir: &Path) -> Option<String> {
    let names = fs.read_dir_names(irq_dir).ok()?;
    let tokens: Vec<String> = names
        .into_iter()
        .filter(|n| !NON_DEVICE_ENTRIES.contains(&n.as_str()))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(","))
    }
}
