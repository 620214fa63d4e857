/*!
main - process entry point: parse flags, load config, wire up logging,
signals, and daemonisation, then hand off to the tick loop (spec §4.9,
§6).
*/

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use irqd::cli::Cli;
use irqd::config::Config;
use irqd::daemon;
use irqd::engine::{Engine, TickOutcome};
use irqd::logging;
use irqd::signals::Signals;
use irqd::sysfs::RealFs;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli) {
        eprintln!("irqd: failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(&RealFs, &cli) {
        Ok(c) => c,
        Err(e) => {
            log::error!("startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = daemon::daemonize(&cli) {
        log::error!("startup: {e}");
        return ExitCode::FAILURE;
    }

    let signals = match Signals::install() {
        Ok(s) => s,
        Err(e) => {
            log::error!("startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = match Engine::new(RealFs, config) {
        Ok(e) => e,
        Err(e) => {
            log::error!("startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    run(&mut engine, &signals, &cli);
    ExitCode::SUCCESS
}

/// The outer loop of spec §4.9: check termination, check reconfig, tick,
/// sleep for whichever interval the tick returned. Exits cleanly on a
/// termination signal.
fn run(engine: &mut Engine<RealFs>, signals: &Signals, cli: &Cli) {
    loop {
        if signals.should_terminate() {
            log::info!("received termination signal, shutting down");
            break;
        }
        if signals.take_reconfigure() {
            log::info!("received reconfig signal, reloading configuration");
            engine.reconfigure(cli);
        }

        let outcome = engine.tick();
        sleep_cancellable(engine.next_sleep(outcome), signals);
    }
}

/// Sleep for `duration`, waking early at a coarse poll granularity if a
/// signal arrives, since the sleep is the loop's only suspension point and
/// spec §5 requires it to be cancellable.
fn sleep_cancellable(duration: Duration, signals: &Signals) {
    const POLL: Duration = Duration::from_millis(200);
    let deadline = Instant::now() + duration;

    loop {
        if signals.should_terminate() || signals.reconfigure_pending() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(POLL.min(deadline - now));
    }
}
