//! Bootstrap and teardown of the region plus its semaphore triplet.
//!
//! An [`Exchange`] owns every kernel resource a role acquired. Teardown is a
//! single idempotent routine: unmap the region, close the three semaphore
//! handles, and, if this process created them, unlink all four names. It
//! runs from [`Exchange::teardown`] on the normal path and from `Drop` on
//! every other one.

use crate::error::{ShmError, ShmResult};
use crate::platform::is_process_alive;
use crate::region::{RingStatus, SharedRegion};
use crate::semaphore::{NamedSemaphore, SemaphoreTriplet};
use arcset::config::ExchangeConfig;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which side of the ring a process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Single consumer; creates and unlinks the resources.
    Coordinator,
    /// Producer; attaches to existing resources.
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => f.write_str("coordinator"),
            Role::Worker => f.write_str("worker"),
        }
    }
}

/// Region and semaphores of one run, as seen from one process.
pub struct Exchange<const N: usize> {
    role: Role,
    config: ExchangeConfig,
    region: SharedRegion<N>,
    semaphores: SemaphoreTriplet,
    torn_down: bool,
}

impl<const N: usize> Exchange<N> {
    /// Owner bootstrap: exclusively create the region and all three
    /// semaphores. Anything created before a failure is released on return.
    ///
    /// # Errors
    ///
    /// `Config` for invalid names, `AlreadyExists` if another coordinator
    /// (or a crashed one) holds any of the names.
    pub fn create(config: &ExchangeConfig) -> ShmResult<Self> {
        config.validate()?;
        let region = SharedRegion::<N>::create(&config.region)?;
        let semaphores = SemaphoreTriplet::create(config, N as u32)?;
        info!(
            "Exchange created: region {} with {} slots",
            config.region, N
        );
        Ok(Self {
            role: Role::Coordinator,
            config: config.clone(),
            region,
            semaphores,
            torn_down: false,
        })
    }

    /// Attacher bootstrap: open and validate the existing region and open the
    /// three existing semaphores. Never creates anything.
    ///
    /// # Errors
    ///
    /// `NotFound` if no coordinator is running, `LayoutMismatch` if it was
    /// built for another ring layout.
    pub fn attach(config: &ExchangeConfig) -> ShmResult<Self> {
        config.validate()?;
        let region = SharedRegion::<N>::attach(&config.region)?;
        let semaphores = SemaphoreTriplet::open(config)?;
        debug!("Exchange attached: region {}", config.region);
        Ok(Self {
            role: Role::Worker,
            config: config.clone(),
            region,
            semaphores,
            torn_down: false,
        })
    }

    /// Remove names left behind by a coordinator that died without teardown.
    ///
    /// Returns `false` if there was no region to reclaim. Semaphore names are
    /// unlinked either way; missing ones are ignored.
    ///
    /// # Errors
    ///
    /// `OwnerAlive` if the recorded owner process still exists,
    /// `OwnerUnknown` if the header never shows a valid owner (a coordinator
    /// may be between `shm_open` and its header write).
    pub fn reclaim_stale(config: &ExchangeConfig) -> ShmResult<bool> {
        config.validate()?;
        let found = match peek_owner_settled::<N>(&config.region) {
            Ok(Some(pid)) if is_process_alive(pid) => {
                return Err(ShmError::OwnerAlive {
                    name: config.region.clone(),
                    pid,
                });
            }
            Ok(Some(pid)) => {
                warn!("Reclaiming stale region {} (owner {})", config.region, pid);
                ignore_missing(SharedRegion::<N>::unlink_name(&config.region))?;
                true
            }
            Ok(None) => {
                return Err(ShmError::OwnerUnknown {
                    name: config.region.clone(),
                });
            }
            Err(ShmError::NotFound { .. }) => false,
            Err(e) => return Err(e),
        };

        for name in [
            &config.used_semaphore,
            &config.free_semaphore,
            &config.mutex_semaphore,
        ] {
            ignore_missing(NamedSemaphore::unlink_name(name))?;
        }
        Ok(found)
    }

    /// Role this exchange was bootstrapped for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Names in use.
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Mapped region.
    pub fn region(&self) -> &SharedRegion<N> {
        &self.region
    }

    /// Semaphore triplet.
    pub fn semaphores(&self) -> &SemaphoreTriplet {
        &self.semaphores
    }

    /// Shared run status.
    pub fn status(&self) -> ShmResult<RingStatus> {
        self.region.status()
    }

    /// Publish `Terminating` to every worker.
    pub fn set_terminating(&self) -> ShmResult<()> {
        self.region.set_terminating()
    }

    /// `true` once [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Release everything this process holds. Safe to call any number of
    /// times; failures are logged and never stop the remaining steps.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.region.unmap();
        self.semaphores.close_all();
        if let Err(e) = self.region.unlink() {
            warn!("Failed to unlink region {}: {}", self.config.region, e);
        }
        self.semaphores.unlink_all();
        debug!("Exchange torn down ({})", self.role);
    }
}

impl<const N: usize> Drop for Exchange<N> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Header reads before a region without a valid owner is refused.
const OWNER_PEEK_ATTEMPTS: u32 = 5;
const OWNER_PEEK_BACKOFF: Duration = Duration::from_millis(20);

/// `peek_owner`, retried briefly while the header is not yet written.
fn peek_owner_settled<const N: usize>(name: &str) -> ShmResult<Option<u32>> {
    for attempt in 1..=OWNER_PEEK_ATTEMPTS {
        if let Some(pid) = SharedRegion::<N>::peek_owner(name)? {
            return Ok(Some(pid));
        }
        if attempt < OWNER_PEEK_ATTEMPTS {
            std::thread::sleep(OWNER_PEEK_BACKOFF);
        }
    }
    debug!("Region {} has no valid header", name);
    Ok(None)
}

fn ignore_missing(result: ShmResult<()>) -> ShmResult<()> {
    match result {
        Err(ShmError::NotFound { .. }) => Ok(()),
        other => other,
    }
}
