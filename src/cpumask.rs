/*!
cpumask - Fixed-width CPU id bitset.

A `CpuMask` is a total function over `[0, NR_CPUS)`: every bit beyond the
runtime CPU count is always zero, and every operation treats the mask as a
value of that fixed width rather than a growable set. This mirrors the
kernel's own `cpumask_t`, which the daemon must read and write byte-for-byte
in its `smp_affinity` hex format.

`NR_CPUS` is a build-time upper bound (1024), documented here rather than
derived, per the topology note that a fixed compile-time width is the
source's own choice; callers validate parsed masks against the runtime CPU
count returned by topology scanning.
*/

use std::fmt;

use crate::error::Error;

/// Upper bound on CPU ids this build supports. Bits at or beyond this index
/// are never set by any operation.
pub const NR_CPUS: usize = 1024;

const WORD_BITS: usize = 32;
const WORDS: usize = NR_CPUS / WORD_BITS;

/// Fixed-width bitset of CPU ids, stored as little-endian 32-bit groups to
/// mirror the kernel's own on-the-wire representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuMask {
    words: [u32; WORDS],
}

impl CpuMask {
    /// An empty mask (no bits set).
    pub fn init() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Clear every bit.
    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    /// Set every bit in `[0, NR_CPUS)`.
    pub fn set_all(&mut self) {
        self.words = [u32::MAX; WORDS];
    }

    /// Set a single CPU id. Out-of-range ids are silently ignored, since a
    /// mask is a total function and there is no valid bit to set.
    pub fn set(&mut self, id: usize) {
        if let Some((word, bit)) = Self::locate(id) {
            self.words[word] |= 1 << bit;
        }
    }

    /// Clear a single CPU id.
    pub fn clear_bit(&mut self, id: usize) {
        if let Some((word, bit)) = Self::locate(id) {
            self.words[word] &= !(1 << bit);
        }
    }

    /// Test whether a CPU id is set.
    pub fn test(&self, id: usize) -> bool {
        match Self::locate(id) {
            Some((word, bit)) => self.words[word] & (1 << bit) != 0,
            None => false,
        }
    }

    /// Number of set bits (population count).
    pub fn weight(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Bitwise OR, consuming neither operand.
    pub fn or(&self, other: &CpuMask) -> CpuMask {
        let mut out = *self;
        for (a, b) in out.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
        out
    }

    /// Bitwise AND.
    pub fn and(&self, other: &CpuMask) -> CpuMask {
        let mut out = *self;
        for (a, b) in out.words.iter_mut().zip(other.words.iter()) {
            *a &= b;
        }
        out
    }

    /// Bitwise complement, restricted to `[0, nr_cpus)` so bits beyond the
    /// runtime CPU count stay zero.
    pub fn complement(&self, nr_cpus: usize) -> CpuMask {
        let mut out = CpuMask::init();
        for id in 0..nr_cpus.min(NR_CPUS) {
            if !self.test(id) {
                out.set(id);
            }
        }
        out
    }

    /// The lowest-numbered set CPU id, if any. Used for the "lowest CPU in
    /// the mask owns the IRQ" accounting invariant.
    pub fn lowest(&self) -> Option<usize> {
        (0..NR_CPUS).find(|&id| self.test(id))
    }

    /// Iterate set CPU ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NR_CPUS).filter(move |&id| self.test(id))
    }

    /// Single-bit mask for one CPU id.
    pub fn single(id: usize) -> CpuMask {
        let mut m = CpuMask::init();
        m.set(id);
        m
    }

    fn locate(id: usize) -> Option<(usize, u32)> {
        if id >= NR_CPUS {
            return None;
        }
        Some((id / WORD_BITS, (id % WORD_BITS) as u32))
    }

    /// Parse the kernel's `smp_affinity`-style text: comma-separated 32-bit
    /// hex groups, case-insensitive, rightmost group holds bits 0..31.
    pub fn parse_kernel_hex(s: &str) -> Result<CpuMask, Error> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidMask(s.to_string()));
        }
        let groups: Vec<&str> = s.split(',').collect();
        if groups.len() > WORDS || groups.iter().any(|g| g.is_empty()) {
            return Err(Error::InvalidMask(s.to_string()));
        }
        let mut words = [0u32; WORDS];
        // groups[0] is the highest-numbered word; the last group is word 0.
        let n = groups.len();
        for (i, g) in groups.iter().enumerate() {
            if !g.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::InvalidMask(s.to_string()));
            }
            let word_idx = n - 1 - i;
            if word_idx >= WORDS {
                return Err(Error::InvalidMask(s.to_string()));
            }
            words[word_idx] = u32::from_str_radix(g, 16).map_err(|_| Error::InvalidMask(s.to_string()))?;
        }
        Ok(CpuMask { words })
    }

    /// Render in the kernel's own format: lowercase hex, minimum necessary
    /// groups (no leading all-zero groups beyond the first), comma
    /// separated, no `0x` prefix.
    pub fn format_kernel_hex(&self) -> String {
        let mut highest = 0;
        for (i, &w) in self.words.iter().enumerate() {
            if w != 0 {
                highest = i;
            }
        }
        let mut groups = Vec::with_capacity(highest + 1);
        for i in (0..=highest).rev() {
            groups.push(format!("{:08x}", self.words[i]));
        }
        groups.join(",")
    }
}

impl Default for CpuMask {
    fn default() -> Self {
        CpuMask::init()
    }
}

impl fmt::Debug for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuMask")
            .field("mask", &self.format_kernel_hex())
            .finish()
    }
}
