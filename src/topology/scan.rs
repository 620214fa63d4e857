use std::collections::HashMap;
use std::path::Path;

use crate::cpumask::CpuMask;
use crate::error::Error;
use crate::sysfs::FsView;

use super::cpu::Cpu;
use super::numa::NumaNode;

const NODE_ROOT: &str = "/sys/devices/system/node";
const CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Reads `/sys/devices/system/node/` and returns every real NUMA node plus a
/// synthetic `id == -1` node absorbing any CPU not claimed by a real one.
pub fn scan_numas(fs: &dyn FsView, nr_cpus: usize) -> Result<Vec<NumaNode>, Error> {
    let root = Path::new(NODE_ROOT);
    let mut nodes = Vec::new();
    let mut union = CpuMask::init();

    if fs.exists(root) {
        let entries = fs
            .read_dir_names(root)
            .map_err(|e| Error::Topology(format!("reading {}: {e}", root.display())))?;
        let mut ids: Vec<i32> = entries
            .iter()
            .filter_map(|name| name.strip_prefix("node"))
            .filter_map(|n| n.parse::<i32>().ok())
            .collect();
        ids.sort_unstable();

        for id in ids {
            let cpumap_path = root.join(format!("node{id}")).join("cpumap");
            let text = fs
                .read_to_string(&cpumap_path)
                .map_err(|e| Error::Topology(format!("reading {}: {e}", cpumap_path.display())))?;
            let mask = CpuMask::parse_kernel_hex(text.trim())
                .map_err(|_| Error::Topology(format!("invalid cpumap at {}", cpumap_path.display())))?;
            union = union.or(&mask);
            nodes.push(NumaNode::new(id, mask));
        }
    }

    let synthetic = union.complement(nr_cpus);
    nodes.push(NumaNode::new(-1, synthetic));
    Ok(nodes)
}

/// Reads `/sys/devices/system/cpu/` and builds the `Cpu` model, deduplicating
/// hyper-thread siblings down to the lowest-id sibling when `ht` is false.
pub fn scan_cpus(fs: &dyn FsView, numas: &[NumaNode], ht: bool) -> Result<Vec<Cpu>, Error> {
    let root = Path::new(CPU_ROOT);
    let entries = fs
        .read_dir_names(root)
        .map_err(|e| Error::Topology(format!("reading {}: {e}", root.display())))?;

    let mut ids: Vec<usize> = entries
        .iter()
        .filter_map(|name| name.strip_prefix("cpu"))
        .filter_map(|n| n.parse::<usize>().ok())
        .collect();
    ids.sort_unstable();

    struct Raw {
        id: usize,
        package_id: u32,
        core_id: u32,
    }

    let mut raw = Vec::with_capacity(ids.len());
    for id in &ids {
        let base = root.join(format!("cpu{id}")).join("topology");
        let package_id = read_decimal(fs, &base.join("physical_package_id"))?;
        let core_id = read_decimal(fs, &base.join("core_id"))?;
        raw.push(Raw {
            id: *id,
            package_id,
            core_id,
        });
    }

    let mut groups: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for r in &raw {
        groups.entry((r.package_id, r.core_id)).or_default().push(r.id);
    }
    for ids in groups.values_mut() {
        ids.sort_unstable();
    }

    let mut cpus = Vec::with_capacity(raw.len());
    for r in &raw {
        let siblings = &groups[&(r.package_id, r.core_id)];
        let lowest_sibling = siblings[0];
        if !ht && r.id != lowest_sibling {
            continue;
        }
        let mut sibling_mask = CpuMask::init();
        for &s in siblings {
            sibling_mask.set(s);
        }
        let numa_id = numa_for_cpu(numas, r.id);
        cpus.push(Cpu::new(r.id, r.package_id, r.core_id, numa_id, sibling_mask));
    }

    Ok(cpus)
}

/// Determine the runtime CPU-id upper bound from `/sys/devices/system/cpu/`
/// directory entries, used to size masks before the first topology scan.
pub fn detect_nr_cpus(fs: &dyn FsView) -> Result<usize, Error> {
    let root = Path::new(CPU_ROOT);
    let entries = fs
        .read_dir_names(root)
        .map_err(|e| Error::Topology(format!("reading {}: {e}", root.display())))?;
    entries
        .iter()
        .filter_map(|name| name.strip_prefix("cpu"))
        .filter_map(|n| n.parse::<usize>().ok())
        .max()
        .map(|max_id| max_id + 1)
        .ok_or_else(|| Error::Topology(format!("no cpu entries found under {}", root.display())))
}

fn numa_for_cpu(numas: &[NumaNode], cpu_id: usize) -> i32 {
    numas
        .iter()
        .find(|n| n.id != -1 && n.contains(cpu_id))
        .map(|n| n.id)
        .unwrap_or(-1)
}

fn read_decimal(fs: &dyn FsView, path: &Path) -> Result<u32, Error> {
    let text = fs
        .read_to_string(path)
        .map_err(|e| Error::Topology(format!("reading {}: {e}", path.display())))?;
    text.trim()
        .parse::<u32>()
        .map_err(|_| Error::Topology(format!("invalid decimal value in {}", path.display())))
}
