/*!
signals - Edge-triggered termination and reconfig flags.

Per spec §5/§9, signal handlers never do real work: they only flip an
`AtomicBool`, and the tick loop samples both flags once per iteration. No
locking is needed anywhere else in the engine because of this.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

use crate::error::Error;

#[derive(Clone)]
pub struct Signals {
    terminate: Arc<AtomicBool>,
    reconfigure: Arc<AtomicBool>,
}

impl Signals {
    /// Register SIGTERM/SIGINT to request termination and SIGHUP to request
    /// a config reload.
    pub fn install() -> Result<Signals, Error> {
        let terminate = Arc::new(AtomicBool::new(false));
        let reconfigure = Arc::new(AtomicBool::new(false));

        signal_hook::flag::register(SIGTERM, Arc::clone(&terminate))
            .map_err(|e| Error::Config(format!("installing SIGTERM handler: {e}")))?;
        signal_hook::flag::register(SIGINT, Arc::clone(&terminate))
            .map_err(|e| Error::Config(format!("installing SIGINT handler: {e}")))?;
        signal_hook::flag::register(SIGHUP, Arc::clone(&reconfigure))
            .map_err(|e| Error::Config(format!("installing SIGHUP handler: {e}")))?;

        Ok(Signals { terminate, reconfigure })
    }

    pub fn should_terminate(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    pub fn reconfigure_pending(&self) -> bool {
        self.reconfigure.load(Ordering::Relaxed)
    }

    /// Consume the reconfig flag, returning whether it was set.
    pub fn take_reconfigure(&self) -> bool {
        self.reconfigure.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_reconfigure_clears_flag() {
        let signals = Signals {
            terminate: Arc::new(AtomicBool::new(false)),
            reconfigure: Arc::new(AtomicBool::new(true)),
        };
        assert!(signals.reconfigure_pending());
        assert!(signals.take_reconfigure());
        assert!(!signals.reconfigure_pending());
    }
}
