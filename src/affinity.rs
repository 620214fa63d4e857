/*!
affinity - Commits chosen masks to the kernel.

Writes are best-effort per IRQ: a failure is logged and that IRQ is simply
dropped from this tick's commit, never aborting the tick (spec §4.8, §7).
*/

use std::path::PathBuf;

use log::warn;

use crate::irq::IrqRegistry;
use crate::sysfs::FsView;

/// Write `registry[num].affinity` to `/proc/irq/<num>/smp_affinity` for
/// every IRQ in `placed`. Returns the subset that were written
/// successfully.
pub fn apply_affinity(fs: &dyn FsView, registry: &IrqRegistry, placed: &[u32]) -> Vec<u32> {
    let mut committed = Vec::with_capacity(placed.len());
    for &num in placed {
        let Some(irq) = registry.get(num) else { continue };
        let path = PathBuf::from(format!("/proc/irq/{num}/smp_affinity"));
        let text = irq.affinity.format_kernel_hex();
        match fs.write(&path, &text) {
            Ok(()) => committed.push(num),
            Err(e) => warn!("irq {num}: failed to write smp_affinity to {}: {e}", path.display()),
        }
    }
    committed
}
