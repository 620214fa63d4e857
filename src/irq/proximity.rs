/*!
proximity - Operator-supplied IRQ-description to NUMA-node overrides.

Format: one `<token> <numa-id>` pair per non-blank, non-comment line.
Tokens are substring-matched against `Irq::refined_desc` at scan time;
first match in file order wins, so file order is priority order.
*/

use std::path::Path;

use crate::error::Error;
use crate::sysfs::FsView;
use crate::topology::Topology;

#[derive(Debug, Clone, Default)]
pub struct ProximityOverrides {
    entries: Vec<(String, i32)>,
}

impl ProximityOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the proximity file. Malformed lines are skipped with a
    /// warning; the file itself being unreadable is a `Config` error.
    pub fn load(fs: &dyn FsView, path: &Path) -> Result<ProximityOverrides, Error> {
        let text = fs
            .read_to_string(path)
            .map_err(|e| Error::Config(format!("reading proximity file {}: {e}", path.display())))?;

        let mut entries = Vec::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(token), Some(numa_str), None) = (parts.next(), parts.next(), parts.next()) else {
                log::warn!("{}:{}: malformed proximity line, skipping: {raw}", path.display(), lineno + 1);
                continue;
            };
            match numa_str.parse::<i32>() {
                Ok(numa_id) => entries.push((token.to_string(), numa_id)),
                Err(_) => {
                    log::warn!("{}:{}: non-numeric numa id, skipping: {raw}", path.display(), lineno + 1);
                }
            }
        }
        Ok(ProximityOverrides { entries })
    }

    /// Resolve the NUMA id a device's refined description overrides to, by
    /// first-match-wins substring search.
    pub fn resolve(&self, refined_desc: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(token, _)| refined_desc.contains(token.as_str()))
            .map(|(_, id)| *id)
    }

    /// Confirm every referenced NUMA id is known to the topology. Unknown
    /// ids abort config load per spec.
    pub fn validate(&self, topology: &Topology) -> Result<(), Error> {
        for (token, numa_id) in &self.entries {
            if !topology.numas.contains_key(numa_id) {
                return Err(Error::Config(format!(
                    "proximity override '{token}' references unknown numa id {numa_id}"
                )));
            }
        }
        Ok(())
    }
}
