//! Process lifecycle: cooperative cancellation and signal handling.
//!
//! Termination signals (`SIGINT`, `SIGTERM`) only flip a process-wide
//! [`CancelToken`] and move the phase to [`ProcessPhase::ShuttingDown`].
//! The handlers are installed without `SA_RESTART`, so a blocked
//! `sem_timedwait` returns `EINTR` and surfaces as an interrupted wait.
//! The regular teardown then runs on the normal return path.
//!
//! Fault signals (`SIGSEGV`, `SIGBUS`) take a separate emergency path that
//! only calls `write`, `shm_unlink`, `sem_unlink` and `_exit`. Everything it
//! needs is prepared at install time. A worker's emergency path releases
//! nothing; the kernel drops its mapping and handles on exit.

use crate::error::{ShmError, ShmResult};
use crate::exchange::Role;
use arcset::config::ExchangeConfig;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Cloneable cancellation flag shared by the signal handler and role loops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Async-signal-safe.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-process lifecycle phase. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ProcessPhase {
    /// Role loop active.
    Running = 0,
    /// Cancellation requested; leaving the loop.
    ShuttingDown = 1,
    /// Teardown finished.
    Terminated = 2,
}

impl ProcessPhase {
    const fn from_raw(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::ShuttingDown,
            _ => Self::Terminated,
        }
    }
}

static PHASE: AtomicU8 = AtomicU8::new(ProcessPhase::Running as u8);
static TERMINATION_TOKEN: OnceLock<CancelToken> = OnceLock::new();
static EMERGENCY_PLAN: OnceLock<EmergencyPlan> = OnceLock::new();

fn advance_phase(to: ProcessPhase) {
    PHASE.fetch_max(to as u8, Ordering::SeqCst);
}

/// Everything the fault handler touches, allocated up front.
struct EmergencyPlan {
    message: Vec<u8>,
    region: Option<CString>,
    semaphores: Vec<CString>,
}

impl EmergencyPlan {
    fn new(role: Role, config: &ExchangeConfig) -> ShmResult<Self> {
        let message = format!("{role}: fatal fault, emergency teardown\n").into_bytes();
        if role != Role::Coordinator {
            return Ok(Self {
                message,
                region: None,
                semaphores: Vec::new(),
            });
        }

        let c_string = |name: &str| {
            CString::new(name).map_err(|_| ShmError::InvalidName {
                name: name.to_string(),
            })
        };
        Ok(Self {
            message,
            region: Some(c_string(&config.region)?),
            semaphores: vec![
                c_string(&config.used_semaphore)?,
                c_string(&config.free_semaphore)?,
                c_string(&config.mutex_semaphore)?,
            ],
        })
    }
}

extern "C" fn on_termination_signal(_signal: libc::c_int) {
    if let Some(token) = TERMINATION_TOKEN.get() {
        token.cancel();
    }
    advance_phase(ProcessPhase::ShuttingDown);
}

extern "C" fn on_fault_signal(_signal: libc::c_int) {
    // SAFETY: only async-signal-safe calls on memory prepared before the
    // handler was installed.
    unsafe {
        if let Some(plan) = EMERGENCY_PLAN.get() {
            libc::write(
                libc::STDERR_FILENO,
                plan.message.as_ptr().cast(),
                plan.message.len(),
            );
            if let Some(region) = &plan.region {
                libc::shm_unlink(region.as_ptr());
            }
            for sem in &plan.semaphores {
                libc::sem_unlink(sem.as_ptr());
            }
        }
        libc::_exit(1);
    }
}

/// Installed signal handlers plus the token they cancel.
#[derive(Debug, Clone)]
pub struct SignalManager {
    token: CancelToken,
}

impl SignalManager {
    /// Install the termination and fault handlers for `role`.
    ///
    /// Equivalent to [`install_termination`](Self::install_termination)
    /// followed by [`arm_fault_handlers`](Self::arm_fault_handlers).
    ///
    /// # Errors
    ///
    /// `Nix` if `sigaction` fails, `InvalidName` if a configured name cannot
    /// be passed to the kernel.
    pub fn install(role: Role, config: &ExchangeConfig) -> ShmResult<Self> {
        let signals = Self::install_termination()?;
        signals.arm_fault_handlers(role, config)?;
        Ok(signals)
    }

    /// Route `SIGINT` / `SIGTERM` to the process-wide token.
    ///
    /// Safe to call before any shared object exists; a signal that arrives
    /// early is kept in the token until the role loop checks it.
    ///
    /// # Errors
    ///
    /// `Nix` if `sigaction` fails.
    pub fn install_termination() -> ShmResult<Self> {
        let token = TERMINATION_TOKEN.get_or_init(CancelToken::new).clone();

        let termination = SigAction::new(
            SigHandler::Handler(on_termination_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only touches atomics.
        unsafe {
            sigaction(Signal::SIGINT, &termination)?;
            sigaction(Signal::SIGTERM, &termination)?;
        }

        debug!("Termination handlers installed");
        Ok(Self { token })
    }

    /// Prepare the emergency plan for `role` and install the `SIGSEGV` /
    /// `SIGBUS` handlers.
    ///
    /// A coordinator must call this only after it has created its objects
    /// exclusively, since the plan unlinks them by name. The plan is fixed by
    /// the first call in a process; later calls keep it.
    ///
    /// # Errors
    ///
    /// `Nix` if `sigaction` fails, `InvalidName` if a configured name cannot
    /// be passed to the kernel.
    pub fn arm_fault_handlers(&self, role: Role, config: &ExchangeConfig) -> ShmResult<()> {
        if EMERGENCY_PLAN.get().is_some() {
            warn!("Fault handlers already armed, keeping the first plan");
            return Ok(());
        }
        let _ = EMERGENCY_PLAN.set(EmergencyPlan::new(role, config)?);

        let fault = SigAction::new(
            SigHandler::Handler(on_fault_signal),
            SaFlags::SA_RESETHAND,
            SigSet::empty(),
        );
        // SAFETY: write, unlink and _exit on data built before this point.
        unsafe {
            sigaction(Signal::SIGSEGV, &fault)?;
            sigaction(Signal::SIGBUS, &fault)?;
        }

        debug!("Fault handlers armed for {}", role);
        Ok(())
    }

    /// Token cancelled by `SIGINT` / `SIGTERM`.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Current phase of this process.
    pub fn phase(&self) -> ProcessPhase {
        ProcessPhase::from_raw(PHASE.load(Ordering::SeqCst))
    }

    /// Enter `ShuttingDown` without a signal (e.g. the role loop finished).
    pub fn begin_shutdown(&self) {
        advance_phase(ProcessPhase::ShuttingDown);
    }

    /// Record that teardown has completed.
    pub fn mark_terminated(&self) {
        advance_phase(ProcessPhase::Terminated);
    }
}
