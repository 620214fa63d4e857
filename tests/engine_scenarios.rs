//! Black-box scenario tests driving `Engine` purely through its public API
//! and a shared `FakeFs` handle, mirroring the walkthroughs enumerated for
//! the balancing engine: idle system, hot-CPU eviction under each
//! strategy, load-limit backpressure, NUMA-local placement with and
//! without the non-local fallback, and HT-sibling dedup.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use irqd::cli::Cli;
use irqd::config::Config;
use irqd::cpumask::CpuMask;
use irqd::engine::{Engine, TickOutcome};
use irqd::policy::Strategy;
use irqd::sysfs::FakeFs;

fn two_cpu_fs() -> FakeFs {
    FakeFs::new()
        .with_dir("/sys/devices/system/node", vec![])
        .with_dir("/sys/devices/system/cpu", vec!["cpu0", "cpu1"])
        .with_file("/sys/devices/system/cpu/cpu0/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu0/topology/core_id", "0")
        .with_file("/sys/devices/system/cpu/cpu1/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu1/topology/core_id", "1")
        .with_dir("/proc/irq", vec!["24", "25", "26"])
        .with_file("/proc/irq/24/smp_affinity", "00000001")
        .with_file("/proc/irq/25/smp_affinity", "00000001")
        .with_file("/proc/irq/26/smp_affinity", "00000001")
        .with_file(
            "/proc/interrupts",
            "           CPU0       CPU1\n\
              24:        100          0   IO-APIC-edge      eth0\n\
              25:        100          0   IO-APIC-edge      eth1\n\
              26:        100          0   IO-APIC-edge      eth2\n",
        )
        .with_file(
            "/proc/stat",
            "cpu  0 0 0 0 0 0 0 0\ncpu0 0 0 0 0 0 0 0 0\ncpu1 0 0 0 0 0 0 0 0\n",
        )
}

fn engine(fs: FakeFs, config: Config) -> Engine<FakeFs> {
    Engine::new_with_rng(fs, config, Box::new(StdRng::seed_from_u64(7))).unwrap()
}

/// Scenario: an idle system (no CPU ever crosses `threshold`) settles after
/// its cold-start pass and keeps sleeping at the long interval indefinitely.
#[test]
fn idle_system_stays_on_long_interval() {
    let fs = two_cpu_fs();
    let mut config = Config::default();
    config.threshold = 90.0;
    let mut eng = engine(fs, config);

    eng.tick(); // settle the cold-start full-registry pass

    for _ in 0..5 {
        assert_eq!(eng.tick(), TickOutcome::Long);
    }
}

/// Scenario: one CPU runs hot while its peer stays idle. With
/// `strategy = max` the heaviest IRQ owned by the hot CPU is evicted and
/// lands on the idle one, and the kernel is told via a smp_affinity write.
#[test]
fn hot_cpu_max_strategy_moves_heaviest_irq() {
    let fs = two_cpu_fs();
    let shared = fs.clone();
    let mut config = Config::default();
    config.strategy = Strategy::Max;
    config.threshold = 90.0;
    config.load_limit = 80.0;
    let mut eng = engine(fs, config);

    eng.tick(); // settle: first stat/interrupt sample, no deltas yet

    shared.set_file(
        "/proc/stat",
        "cpu  0 0 0 0 0 0 0 0\ncpu0 95 0 0 5 0 0 0 0\ncpu1 10 0 0 90 0 0 0 0\n",
    );
    shared.set_file(
        "/proc/interrupts",
        "           CPU0       CPU1\n\
          24:       5000          0   IO-APIC-edge      eth0\n\
          25:        150          0   IO-APIC-edge      eth1\n\
          26:        110          0   IO-APIC-edge      eth2\n",
    );
    let outcome = eng.tick();

    assert_eq!(outcome, TickOutcome::Short);
    assert_eq!(eng.registry().get(24).unwrap().affinity, CpuMask::single(1));
    assert_eq!(shared.written("/proc/irq/24/smp_affinity").as_deref(), Some("00000002"));
    // The other two IRQs on the hot CPU were left alone this tick.
    assert_eq!(eng.registry().get(25).unwrap().affinity, CpuMask::single(0));
    assert_eq!(eng.registry().get(26).unwrap().affinity, CpuMask::single(0));
}

/// Scenario: `strategy = min` evicts the *lightest* balanceable IRQ on the
/// hot CPU; when two IRQs tie on weight the lower IRQ number wins.
#[test]
fn min_strategy_tie_picks_lowest_irq_number() {
    let fs = two_cpu_fs();
    let shared = fs.clone();
    let mut config = Config::default();
    config.strategy = Strategy::Min;
    config.threshold = 90.0;
    config.load_limit = 80.0;
    let mut eng = engine(fs, config);

    eng.tick(); // settle

    shared.set_file(
        "/proc/stat",
        "cpu  0 0 0 0 0 0 0 0\ncpu0 95 0 0 5 0 0 0 0\ncpu1 10 0 0 90 0 0 0 0\n",
    );
    // 25 and 26 tie on delta (50 each); 24 is far heavier and excluded from
    // the tie. Min strategy must choose between 25 and 26, landing on 25.
    shared.set_file(
        "/proc/interrupts",
        "           CPU0       CPU1\n\
          24:       5000          0   IO-APIC-edge      eth0\n\
          25:        150          0   IO-APIC-edge      eth1\n\
          26:        150          0   IO-APIC-edge      eth2\n",
    );
    eng.tick();

    assert_eq!(eng.registry().get(25).unwrap().affinity, CpuMask::single(1));
    assert_eq!(eng.registry().get(24).unwrap().affinity, CpuMask::single(0));
    assert_eq!(eng.registry().get(26).unwrap().affinity, CpuMask::single(0));
}

/// Scenario: every candidate CPU is at or above `load_limit`, so the evicted
/// IRQ has nowhere to land. Its affinity is retained and no smp_affinity
/// write is issued, even though the tick still counts as "active" because a
/// CPU crossed `threshold`.
#[test]
fn load_limit_blocks_placement_and_retains_affinity() {
    let fs = two_cpu_fs();
    let shared = fs.clone();
    let mut config = Config::default();
    config.strategy = Strategy::Max;
    config.threshold = 90.0;
    config.load_limit = 80.0;
    let mut eng = engine(fs, config);

    eng.tick(); // settle

    // Both CPUs are pinned above the load limit this time.
    shared.set_file(
        "/proc/stat",
        "cpu  0 0 0 0 0 0 0 0\ncpu0 95 0 0 5 0 0 0 0\ncpu1 85 0 0 15 0 0 0 0\n",
    );
    shared.set_file(
        "/proc/interrupts",
        "           CPU0       CPU1\n\
          24:       5000          0   IO-APIC-edge      eth0\n\
          25:        150          0   IO-APIC-edge      eth1\n\
          26:        110          0   IO-APIC-edge      eth2\n",
    );
    eng.tick();

    assert_eq!(eng.registry().get(24).unwrap().affinity, CpuMask::single(0));
    assert!(shared.written("/proc/irq/24/smp_affinity").is_none());
}

fn four_cpu_two_node_fs() -> FakeFs {
    FakeFs::new()
        .with_dir("/sys/devices/system/node", vec!["node0", "node1"])
        .with_file("/sys/devices/system/node/node0/cpumap", "00000003")
        .with_file("/sys/devices/system/node/node1/cpumap", "0000000c")
        .with_dir("/sys/devices/system/cpu", vec!["cpu0", "cpu1", "cpu2", "cpu3"])
        .with_file("/sys/devices/system/cpu/cpu0/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu0/topology/core_id", "0")
        .with_file("/sys/devices/system/cpu/cpu1/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu1/topology/core_id", "1")
        .with_file("/sys/devices/system/cpu/cpu2/topology/physical_package_id", "1")
        .with_file("/sys/devices/system/cpu/cpu2/topology/core_id", "0")
        .with_file("/sys/devices/system/cpu/cpu3/topology/physical_package_id", "1")
        .with_file("/sys/devices/system/cpu/cpu3/topology/core_id", "1")
        .with_dir("/proc/irq", vec!["42"])
        .with_file("/proc/irq/42/smp_affinity", "00000001")
        .with_file("/proc/irq/42/node", "0")
        .with_file(
            "/proc/interrupts",
            "           CPU0       CPU1       CPU2       CPU3\n\
              42:        100          0          0          0   PCI-MSI-edge      eth0\n",
        )
        .with_file(
            "/proc/stat",
            "cpu  0 0 0 0 0 0 0 0\ncpu0 0 0 0 0 0 0 0 0\ncpu1 0 0 0 0 0 0 0 0\ncpu2 0 0 0 0 0 0 0 0\ncpu3 0 0 0 0 0 0 0 0\n",
        )
}

/// Scenario: an IRQ local to node0 (CPUs 0-1) sits on an overloaded CPU 0
/// while its only same-node peer is also overloaded. With
/// `non_local_cpus = false` it is blocked from moving off-node and stays
/// put; after a reconfigure flips `non-local-cpus = y` it falls back to the
/// idle, cross-node CPUs.
#[test]
fn numa_local_preference_then_falls_back_after_reconfigure() {
    let fs = four_cpu_two_node_fs();
    let shared = fs.clone();
    let mut config = Config::default();
    config.strategy = Strategy::Max;
    config.threshold = 90.0;
    config.load_limit = 80.0;
    config.non_local_cpus = false;
    let mut eng = engine(fs, config);

    eng.tick(); // settle

    shared.set_file(
        "/proc/stat",
        "cpu  0 0 0 0 0 0 0 0\n\
         cpu0 95 0 0 5 0 0 0 0\n\
         cpu1 90 0 0 10 0 0 0 0\n\
         cpu2 10 0 0 90 0 0 0 0\n\
         cpu3 10 0 0 90 0 0 0 0\n",
    );
    shared.set_file(
        "/proc/interrupts",
        "           CPU0       CPU1       CPU2       CPU3\n\
          42:       5000          0          0          0   PCI-MSI-edge      eth0\n",
    );
    eng.tick();
    assert_eq!(eng.registry().get(42).unwrap().affinity, CpuMask::single(0));
    assert!(shared.written("/proc/irq/42/smp_affinity").is_none());

    shared.set_file("/etc/irqd.conf", "non-local-cpus = y\n");
    let cli = Cli::try_parse_from(["irqd"]).unwrap();
    eng.reconfigure(&cli);
    assert!(eng.config().non_local_cpus);

    // Hold the same overload pattern and let the queued eviction retry.
    shared.set_file(
        "/proc/stat",
        "cpu  0 0 0 0 0 0 0 0\n\
         cpu0 190 0 0 10 0 0 0 0\n\
         cpu1 180 0 0 20 0 0 0 0\n\
         cpu2 20 0 0 180 0 0 0 0\n\
         cpu3 20 0 0 180 0 0 0 0\n",
    );
    eng.tick();

    let owner = eng.registry().get(42).unwrap().affinity.lowest().unwrap();
    assert!(owner == 2 || owner == 3, "expected cross-node placement, got cpu{owner}");
    assert!(shared.written("/proc/irq/42/smp_affinity").is_some());
}

/// Scenario: with `ht = n` the topology collapses each physical core's
/// sibling threads into a single modeled CPU, keyed on the lowest sibling
/// id, halving the CPU count a four-thread, two-core box reports.
#[test]
fn ht_disabled_collapses_sibling_threads() {
    let fs = FakeFs::new()
        .with_dir("/sys/devices/system/node", vec![])
        .with_dir("/sys/devices/system/cpu", vec!["cpu0", "cpu1", "cpu2", "cpu3"])
        .with_file("/sys/devices/system/cpu/cpu0/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu0/topology/core_id", "0")
        .with_file("/sys/devices/system/cpu/cpu1/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu1/topology/core_id", "1")
        .with_file("/sys/devices/system/cpu/cpu2/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu2/topology/core_id", "0")
        .with_file("/sys/devices/system/cpu/cpu3/topology/physical_package_id", "0")
        .with_file("/sys/devices/system/cpu/cpu3/topology/core_id", "1")
        .with_dir("/proc/irq", vec!["50"])
        .with_file("/proc/irq/50/smp_affinity", "00000004") // raw bit for cpu2, a dropped sibling
        .with_file(
            "/proc/interrupts",
            "           CPU0       CPU1       CPU2       CPU3\n\
              50:        100          0          0          0   PCI-MSI-edge      nvme0q1\n",
        )
        .with_file(
            "/proc/stat",
            "cpu  0 0 0 0 0 0 0 0\ncpu0 0 0 0 0 0 0 0 0\ncpu1 0 0 0 0 0 0 0 0\ncpu2 0 0 0 0 0 0 0 0\ncpu3 0 0 0 0 0 0 0 0\n",
        );

    let mut config = Config::default();
    config.ht = false;
    let mut eng = engine(fs, config);
    eng.tick();

    assert_eq!(eng.topology().cpus.len(), 2);
    // The IRQ pinned to dropped sibling cpu2 is attributed to modeled cpu0.
    assert!(eng.topology().cpu(0).unwrap().irqs.contains(&50));
}
