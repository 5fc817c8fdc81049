//! Console plumbing: stdin, Ctrl+C and the readiness signal as one event stream.
//!
//! Three producers feed a single `std::sync::mpsc` channel of
//! [`ConsoleEvent`]s:
//!
//! - a stdin reader thread (`Line`, then `Closed` at end of input),
//! - a Tokio task listening for Ctrl+C (`Interrupt`),
//! - a Tokio task watching the lifecycle (`RendererReady`).
//!
//! The control loop consumes them on its own OS thread through
//! [`ChannelInput`].  Neither the reader nor the console thread is joined, so
//! neither can keep the process alive after the window closes.
//!
//! When the loop ends with Quit or Ctrl+C, the console thread asks for the
//! ordered shutdown and, if the process is still alive after the grace period,
//! exits it unconditionally.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::application::content_bridge::DocumentBridge;
use crate::application::control_loop::{ConsoleEvent, ConsoleInput, ControlLoop, LoopExit};
use crate::application::lifecycle::{LifecycleHandle, ShutdownController, ShutdownReason};

/// [`ConsoleInput`] over a channel of events.
pub struct ChannelInput {
    rx: Receiver<ConsoleEvent>,
    /// Events pulled off the channel by `discard_interrupts`.
    held: VecDeque<ConsoleEvent>,
}

impl ChannelInput {
    pub fn new(rx: Receiver<ConsoleEvent>) -> Self {
        Self {
            rx,
            held: VecDeque::new(),
        }
    }
}

impl ConsoleInput for ChannelInput {
    fn next_event(&mut self, timeout: Option<Duration>) -> ConsoleEvent {
        if let Some(event) = self.held.pop_front() {
            return event;
        }
        match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => ConsoleEvent::TimedOut,
                Err(RecvTimeoutError::Disconnected) => ConsoleEvent::Closed,
            },
            None => self.rx.recv().unwrap_or(ConsoleEvent::Closed),
        }
    }

    fn discard_interrupts(&mut self) -> bool {
        self.held.extend(self.rx.try_iter());
        let before = self.held.len();
        self.held.retain(|event| *event != ConsoleEvent::Interrupt);
        self.held.len() != before
    }
}

/// Everything the console thread needs.
pub struct ConsoleSettings {
    pub ready_timeout: Duration,
    pub quit_grace: Duration,
}

/// Starts the stdin reader, the Ctrl+C and readiness forwarders, and the
/// console thread running the control loop.
///
/// # Errors
///
/// Returns an error if an OS thread cannot be spawned.
pub fn spawn_console(
    runtime: &Handle,
    bridge: Arc<dyn DocumentBridge>,
    lifecycle: LifecycleHandle,
    shutdown: ShutdownController,
    settings: ConsoleSettings,
) -> io::Result<()> {
    let (tx, rx) = mpsc::channel();

    spawn_stdin_reader(tx.clone())?;
    runtime.spawn(forward_interrupts(tx.clone(), shutdown.clone()));
    runtime.spawn(forward_readiness(tx, lifecycle));

    let control = ControlLoop::new(bridge, settings.ready_timeout);
    thread::Builder::new()
        .name("mdshell-console".to_string())
        .spawn(move || {
            let mut input = ChannelInput::new(rx);
            let mut stdout = io::stdout();
            let exit = match control.run(&mut input, &mut stdout) {
                Ok(exit) => exit,
                Err(e) => {
                    error!("console output failed: {e}");
                    LoopExit::InputClosed
                }
            };
            finish(exit, &shutdown, settings.quit_grace, || std::process::exit(0));
        })?;

    Ok(())
}

/// Acts on how the control loop ended.  After Quit or Ctrl+C, `terminate`
/// runs once `grace` has passed, whether or not the ordered shutdown is done.
fn finish(
    exit: LoopExit,
    shutdown: &ShutdownController,
    grace: Duration,
    terminate: impl FnOnce(),
) {
    let reason = match exit {
        LoopExit::Quit => ShutdownReason::Quit,
        LoopExit::Interrupted => ShutdownReason::Interrupted,
        LoopExit::InputClosed => {
            info!("console input closed; the editor window stays open");
            return;
        }
    };

    shutdown.request(reason);
    thread::sleep(grace);
    warn!("shutdown did not finish within {grace:?}; exiting now");
    terminate();
}

fn spawn_stdin_reader(tx: Sender<ConsoleEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("mdshell-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let event = match line {
                    Ok(line) => ConsoleEvent::Line(line),
                    Err(e) => {
                        debug!("stdin read failed: {e}");
                        break;
                    }
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(ConsoleEvent::Closed);
        })?;
    Ok(())
}

/// Turns every Ctrl+C into an `Interrupt` event.  Once the control loop is
/// gone, Ctrl+C requests the shutdown directly.
async fn forward_interrupts(tx: Sender<ConsoleEvent>, shutdown: ShutdownController) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            return;
        }
        debug!("Ctrl+C received");
        if tx.send(ConsoleEvent::Interrupt).is_err() {
            shutdown.request(ShutdownReason::Interrupted);
        }
    }
}

/// Sends `RendererReady` each time the lifecycle enters `Ready`.
async fn forward_readiness(tx: Sender<ConsoleEvent>, lifecycle: LifecycleHandle) {
    let mut rx = lifecycle.subscribe();
    loop {
        if rx.wait_for(|s| s.is_ready()).await.is_err() {
            return;
        }
        if tx.send(ConsoleEvent::RendererReady).is_err() {
            return;
        }
        if rx.wait_for(|s| !s.is_ready()).await.is_err() {
            return;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
