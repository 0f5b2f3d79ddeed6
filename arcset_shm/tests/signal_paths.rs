//! Signal handling across process boundaries.
//!
//! Each scenario runs the coordinator in a forked child so the handlers are
//! installed in that child only:
//! - `SIGTERM` interrupts a blocked drain and the normal teardown runs
//! - `SIGTERM` delivered before the region exists is held until the drain
//! - `SIGSEGV` takes the emergency path, which unlinks the names and exits 1

use arcset::config::ExchangeConfig;
use arcset_shm::{Consumer, Exchange, Outcome, ProcessPhase, Role, SignalManager};
use std::time::{Duration, Instant};

const CAPACITY: usize = 4;

fn config(tag: &str) -> ExchangeConfig {
    // Long poll slices: only a signal can end the wait early.
    let mut config =
        ExchangeConfig::namespaced(&format!("arcset_sig_{}_{}", tag, std::process::id()));
    config.wait_poll_ms = 5_000;
    config
}

/// Wait until a region appears in /dev/shm or timeout.
fn wait_for_region(config: &ExchangeConfig, timeout: Duration) -> bool {
    let path = format!("/dev/shm{}", config.region);
    let start = Instant::now();
    while start.elapsed() < timeout {
        if std::path::Path::new(&path).exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

fn wait_exit_code(pid: libc::pid_t) -> Option<i32> {
    let mut status: libc::c_int = 0;
    // SAFETY: plain waitpid on our own child.
    let waited = unsafe { libc::waitpid(pid, &mut status, 0) };
    if waited == pid && libc::WIFEXITED(status) {
        Some(libc::WEXITSTATUS(status))
    } else {
        None
    }
}

fn region_gone(config: &ExchangeConfig) -> bool {
    !std::path::Path::new(&format!("/dev/shm{}", config.region)).exists()
}

/// Child body for the termination scenario. Exit codes: 0 ok, 1 setup,
/// 2 drain did not report an interruption, 3 phase not advanced.
fn coordinator_until_terminated(config: &ExchangeConfig) -> i32 {
    // Termination handlers first: once the region is visible the parent
    // may signal.
    let Ok(signals) = SignalManager::install_termination() else {
        return 1;
    };
    let Ok(mut consumer) = Consumer::<CAPACITY>::create(config) else {
        return 1;
    };
    if signals.arm_fault_handlers(Role::Coordinator, config).is_err() {
        return 1;
    }
    let token = signals.token();

    match consumer.drain(&token) {
        Ok(Outcome::Interrupted) => {}
        _ => return 2,
    }
    if !token.is_cancelled() || signals.phase() != ProcessPhase::ShuttingDown {
        return 3;
    }

    let _ = consumer.set_terminating();
    consumer.teardown();
    signals.mark_terminated();
    0
}

#[test]
fn termination_signal_interrupts_drain_and_tears_down() {
    let config = config("term");

    // Safety: fork() is unsafe but this is a controlled test environment.
    let pid = unsafe { libc::fork() };
    if pid == 0 {
        let code = coordinator_until_terminated(&config);
        // SAFETY: leave without running the parent's destructors.
        unsafe { libc::_exit(code) };
    }
    assert!(pid > 0, "fork failed");

    assert!(
        wait_for_region(&config, Duration::from_secs(5)),
        "timeout waiting for child to create region"
    );
    // Let the child reach its blocking wait.
    std::thread::sleep(Duration::from_millis(100));
    // SAFETY: signalling our own child.
    unsafe { libc::kill(pid, libc::SIGTERM) };

    assert_eq!(wait_exit_code(pid), Some(0));
    assert!(region_gone(&config), "coordinator teardown must unlink region");
    assert!(!Exchange::<CAPACITY>::reclaim_stale(&config).expect("reclaim"));
}

/// Child body for a signal that lands between handler install and creation.
/// Exit codes: 0 ok, 1 setup, 2 drain blocked or failed.
fn coordinator_signalled_before_create(config: &ExchangeConfig) -> i32 {
    let Ok(signals) = SignalManager::install_termination() else {
        return 1;
    };
    // SAFETY: the termination handler is installed and only sets atomics.
    unsafe { libc::raise(libc::SIGTERM) };

    let Ok(mut consumer) = Consumer::<CAPACITY>::create(config) else {
        return 1;
    };
    if signals.arm_fault_handlers(Role::Coordinator, config).is_err() {
        return 1;
    }
    let started = Instant::now();
    match consumer.drain(&signals.token()) {
        Ok(Outcome::Interrupted) if started.elapsed() < Duration::from_secs(1) => {}
        _ => return 2,
    }

    let _ = consumer.set_terminating();
    consumer.teardown();
    0
}

#[test]
fn early_termination_signal_still_releases_objects() {
    let config = config("early");

    // Safety: fork() is unsafe but this is a controlled test environment.
    let pid = unsafe { libc::fork() };
    if pid == 0 {
        let code = coordinator_signalled_before_create(&config);
        // SAFETY: leave without running the parent's destructors.
        unsafe { libc::_exit(code) };
    }
    assert!(pid > 0, "fork failed");

    assert_eq!(wait_exit_code(pid), Some(0));
    assert!(region_gone(&config), "early signal must not leak the region");
    assert!(!Exchange::<CAPACITY>::reclaim_stale(&config).expect("reclaim"));
}

#[test]
fn fault_signal_takes_emergency_path() {
    let config = config("fault");

    // Safety: fork() is unsafe but this is a controlled test environment.
    let pid = unsafe { libc::fork() };
    if pid == 0 {
        let exchange = Exchange::<CAPACITY>::create(&config);
        let signals = SignalManager::install(Role::Coordinator, &config);
        if exchange.is_err() || signals.is_err() {
            // SAFETY: exit without running destructors.
            unsafe { libc::_exit(7) };
        }
        // SAFETY: deliver a fault to ourselves; the handler never returns.
        unsafe {
            libc::raise(libc::SIGSEGV);
            libc::_exit(8);
        }
    }
    assert!(pid > 0, "fork failed");

    assert_eq!(wait_exit_code(pid), Some(1));
    assert!(region_gone(&config), "emergency path must unlink region");
    assert!(matches!(
        Exchange::<CAPACITY>::attach(&config),
        Err(arcset_shm::ShmError::NotFound { .. })
    ));
}
