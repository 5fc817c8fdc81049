//! Interactive console: Read / Write / Quit against the live document.
//!
//! The loop has three phases:
//!
//! ```text
//! WaitingForReady ──(Ready event or ready_timeout)──► MenuLoop ──(Quit / Ctrl+C / stdin closed)──► Terminated
//! ```
//!
//! While waiting for the page, lines the operator types are kept and replayed
//! once the menu starts, and no bridge call is made.  In the menu:
//!
//! | Input | Action |
//! |-------|--------|
//! | `1`   | pull the document and print it |
//! | `2`   | capture lines until `EOF`, then push them |
//! | `0`   | print a closing notice and return [`LoopExit::Quit`] |
//!
//! Bridge failures are printed and the menu comes back; nothing a bridge call
//! returns can end the loop.
//!
//! The loop is pure with respect to I/O: input arrives as [`ConsoleEvent`]s
//! from a [`ConsoleInput`] and output goes to any [`Write`].  The stdin-backed
//! input lives in `infrastructure::console`.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::application::content_bridge::DocumentBridge;

/// Terminates a multi-line Write capture (compared trimmed, case-insensitive).
pub const WRITE_SENTINEL: &str = "EOF";

const RULE: &str = "--------------------------------------------------";

// ── Input events ──────────────────────────────────────────────────────────────

/// Everything the control loop can be woken up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// One line of operator input, without the line terminator.
    Line(String),
    /// Ctrl+C.
    Interrupt,
    /// The editor page reported that its entry points are available.
    RendererReady,
    /// The timeout passed to [`ConsoleInput::next_event`] elapsed.
    TimedOut,
    /// Operator input is exhausted (stdin reached end of file).
    Closed,
}

/// Source of console events.
pub trait ConsoleInput {
    /// Blocks for the next event.  With `Some(timeout)`, returns
    /// [`ConsoleEvent::TimedOut`] if nothing arrives in time.
    fn next_event(&mut self, timeout: Option<Duration>) -> ConsoleEvent;

    /// Drops every Ctrl+C that queued up while a bridge call was blocking
    /// and returns `true` if there was one.  Other events keep their order.
    fn discard_interrupts(&mut self) -> bool;
}

/// Why [`ControlLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The operator chose `0`.
    Quit,
    /// Ctrl+C at the menu or while waiting for the editor.
    Interrupted,
    /// Input closed; the window keeps running.
    InputClosed,
}

/// Result of one Write capture.
enum Capture {
    Text(String),
    Cancelled,
    InputClosed,
}

// ── Replay buffer ─────────────────────────────────────────────────────────────

/// Serves lines typed during the ready wait before reading new input.
struct ReplayInput<'a> {
    stash: VecDeque<String>,
    inner: &'a mut dyn ConsoleInput,
}

impl ConsoleInput for ReplayInput<'_> {
    fn next_event(&mut self, timeout: Option<Duration>) -> ConsoleEvent {
        match self.stash.pop_front() {
            Some(line) => ConsoleEvent::Line(line),
            None => self.inner.next_event(timeout),
        }
    }

    fn discard_interrupts(&mut self) -> bool {
        self.inner.discard_interrupts()
    }
}

// ── Control loop ──────────────────────────────────────────────────────────────

/// The console command loop.
pub struct ControlLoop {
    bridge: Arc<dyn DocumentBridge>,
    ready_timeout: Duration,
}

impl ControlLoop {
    pub fn new(bridge: Arc<dyn DocumentBridge>, ready_timeout: Duration) -> Self {
        Self {
            bridge,
            ready_timeout,
        }
    }

    /// Runs the loop to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing to `out` fails.
    pub fn run(&self, input: &mut dyn ConsoleInput, out: &mut dyn Write) -> io::Result<LoopExit> {
        let stash = match self.wait_for_ready(input, out)? {
            Ok(stash) => stash,
            Err(exit) => return Ok(exit),
        };

        let mut input = ReplayInput {
            stash,
            inner: input,
        };
        self.menu_loop(&mut input, out)
    }

    /// `WaitingForReady`.  Returns the stashed lines, or the exit reason if
    /// the loop ends before the menu is shown.
    fn wait_for_ready(
        &self,
        input: &mut dyn ConsoleInput,
        out: &mut dyn Write,
    ) -> io::Result<Result<VecDeque<String>, LoopExit>> {
        writeln!(out, "Waiting for the editor to be ready...")?;
        out.flush()?;

        let deadline = Instant::now() + self.ready_timeout;
        let mut stash = VecDeque::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match input.next_event(Some(remaining)) {
                ConsoleEvent::RendererReady => {
                    info!("editor ready; starting console menu");
                    break;
                }
                ConsoleEvent::TimedOut => {
                    warn!(
                        "editor not ready after {:?}; showing the menu anyway",
                        self.ready_timeout
                    );
                    writeln!(
                        out,
                        "The editor has not reported ready yet; commands may fail until it does."
                    )?;
                    break;
                }
                ConsoleEvent::Line(line) => {
                    debug!("stashing input typed before the editor was ready");
                    stash.push_back(line);
                }
                ConsoleEvent::Interrupt => {
                    writeln!(out)?;
                    writeln!(out, "Goodbye!")?;
                    return Ok(Err(LoopExit::Interrupted));
                }
                ConsoleEvent::Closed => return Ok(Err(LoopExit::InputClosed)),
            }
        }

        Ok(Ok(stash))
    }

    /// `MenuLoop`.
    fn menu_loop(&self, input: &mut dyn ConsoleInput, out: &mut dyn Write) -> io::Result<LoopExit> {
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(RULE.len()))?;
        writeln!(out, "MARKDOWN EDITOR - CONSOLE")?;
        writeln!(out, "{}", "=".repeat(RULE.len()))?;

        loop {
            print_menu(out)?;

            let choice = loop {
                match input.next_event(None) {
                    ConsoleEvent::Line(line) => break line,
                    ConsoleEvent::Interrupt => {
                        writeln!(out)?;
                        writeln!(out, "Goodbye!")?;
                        return Ok(LoopExit::Interrupted);
                    }
                    ConsoleEvent::Closed => {
                        debug!("console input closed");
                        return Ok(LoopExit::InputClosed);
                    }
                    // A reconnecting page reports ready again; nothing to do.
                    ConsoleEvent::RendererReady | ConsoleEvent::TimedOut => {}
                }
            };

            match choice.trim() {
                "1" => self.read_document(input, out)?,
                "2" => {
                    if let Some(exit) = self.write_document(input, out)? {
                        return Ok(exit);
                    }
                }
                "0" => {
                    writeln!(out)?;
                    writeln!(out, "Closing...")?;
                    out.flush()?;
                    return Ok(LoopExit::Quit);
                }
                _ => writeln!(out, "Invalid choice. Use 1, 2 or 0")?,
            }
        }
    }

    /// Command `1`.  A Ctrl+C pressed while the pull was blocking cancels
    /// the read: the result is dropped and the menu comes back.
    fn read_document(&self, input: &mut dyn ConsoleInput, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "Reading the current content...")?;
        out.flush()?;

        let result = self.bridge.pull();
        if input.discard_interrupts() {
            debug!("read interrupted; dropping the result");
            writeln!(out)?;
            writeln!(out, "Read cancelled")?;
            return Ok(());
        }

        match result {
            Ok(content) if content.is_empty() => writeln!(out, "The editor is empty")?,
            Ok(content) => {
                let chars = content.chars().count();
                info!("read {chars} characters from the editor");
                writeln!(out, "Content retrieved ({chars} characters):")?;
                writeln!(out, "{RULE}")?;
                writeln!(out, "{content}")?;
                writeln!(out, "{RULE}")?;
            }
            Err(e) => {
                warn!("read failed: {e}");
                writeln!(out, "Read failed: {e}")?;
            }
        }
        Ok(())
    }

    /// Command `2`.  Returns `Some` only if input closed mid-capture.
    fn write_document(
        &self,
        input: &mut dyn ConsoleInput,
        out: &mut dyn Write,
    ) -> io::Result<Option<LoopExit>> {
        writeln!(out)?;
        writeln!(out, "Writing into the editor...")?;
        writeln!(out, "Type your Markdown content (several lines allowed).")?;
        writeln!(out, "Type '{WRITE_SENTINEL}' on its own line to finish.")?;
        writeln!(out, "{RULE}")?;
        out.flush()?;

        let content = match capture_until_sentinel(input) {
            Capture::Text(content) => content,
            Capture::Cancelled => {
                writeln!(out)?;
                writeln!(out, "Input cancelled")?;
                return Ok(None);
            }
            Capture::InputClosed => return Ok(Some(LoopExit::InputClosed)),
        };

        if content.trim().is_empty() {
            writeln!(out, "Nothing to write: the content is empty")?;
            return Ok(None);
        }

        let chars = content.chars().count();
        let result = self.bridge.push(&content);
        if input.discard_interrupts() {
            // The push has already reached the page.
            writeln!(out)?;
            writeln!(out, "Ctrl+C arrived after the content was sent; the result follows")?;
        }
        match result {
            Ok(()) => {
                info!("wrote {chars} characters to the editor");
                writeln!(out, "Content written ({chars} characters)")?;
            }
            Err(e) => {
                warn!("write failed: {e}");
                writeln!(out, "Write failed: {e}")?;
            }
        }
        Ok(None)
    }
}

fn print_menu(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Options:")?;
    writeln!(out, "  1 - Read the editor content")?;
    writeln!(out, "  2 - Write into the editor")?;
    writeln!(out, "  0 - Quit")?;
    writeln!(out, "{}", &RULE[..30])?;
    write!(out, "Your choice (1/2/0): ")?;
    out.flush()
}

/// Collects lines until the sentinel, joined with `\n`.
fn capture_until_sentinel(input: &mut dyn ConsoleInput) -> Capture {
    let mut lines = Vec::new();
    loop {
        match input.next_event(None) {
            ConsoleEvent::Line(line) if is_sentinel(&line) => break,
            ConsoleEvent::Line(line) => lines.push(line),
            ConsoleEvent::Interrupt => return Capture::Cancelled,
            ConsoleEvent::Closed => return Capture::InputClosed,
            ConsoleEvent::RendererReady | ConsoleEvent::TimedOut => {}
        }
    }
    Capture::Text(lines.join("\n"))
}

fn is_sentinel(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(WRITE_SENTINEL)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::application::content_bridge::{BridgeError, MockDocumentBridge};

    /// Replays a fixed script of events; `Closed` once exhausted.
    struct ScriptedInput {
        events: VecDeque<ConsoleEvent>,
        timeouts_seen: Vec<Option<Duration>>,
        /// Ctrl+C presses that arrive while a bridge call blocks.
        interrupts_during_call: Arc<AtomicUsize>,
    }

    impl ScriptedInput {
        fn new(events: Vec<ConsoleEvent>) -> Self {
            Self {
                events: events.into(),
                timeouts_seen: Vec::new(),
                interrupts_during_call: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn ready_then_lines(lines: &[&str]) -> Self {
            let mut events = vec![ConsoleEvent::RendererReady];
            events.extend(lines.iter().map(|l| ConsoleEvent::Line(l.to_string())));
            Self::new(events)
        }
    }

    impl ConsoleInput for ScriptedInput {
        fn next_event(&mut self, timeout: Option<Duration>) -> ConsoleEvent {
            self.timeouts_seen.push(timeout);
            self.events.pop_front().unwrap_or(ConsoleEvent::Closed)
        }

        fn discard_interrupts(&mut self) -> bool {
            self.interrupts_during_call.swap(0, Ordering::SeqCst) > 0
        }
    }

    fn run_loop(bridge: MockDocumentBridge, input: &mut ScriptedInput) -> (LoopExit, String) {
        let control = ControlLoop::new(Arc::new(bridge), Duration::from_secs(30));
        let mut out = Vec::new();
        let exit = control.run(input, &mut out).unwrap();
        (exit, String::from_utf8(out).unwrap())
    }

    // ── WaitingForReady ───────────────────────────────────────────────────────

    #[test]
    fn test_no_bridge_call_before_ready() {
        // Arrange: the operator types "1" before the page is ready, then
        // input closes while still waiting. A mock with no expectations
        // panics on any call.
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::new(vec![
            ConsoleEvent::Line("1".to_string()),
            ConsoleEvent::Closed,
        ]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::InputClosed);
        assert!(!output.contains("Options:"));
    }

    #[test]
    fn test_lines_typed_while_waiting_are_replayed_after_ready() {
        // Arrange
        let mut bridge = MockDocumentBridge::new();
        bridge
            .expect_pull()
            .times(1)
            .returning(|| Ok("# hello".to_string()));
        let mut input = ScriptedInput::new(vec![
            ConsoleEvent::Line("1".to_string()),
            ConsoleEvent::RendererReady,
            ConsoleEvent::Line("0".to_string()),
        ]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("# hello"));
    }

    #[test]
    fn test_ready_wait_is_bounded_by_timeout() {
        // Arrange
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::new(vec![ConsoleEvent::TimedOut]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert: the menu is shown with a warning, then input closes
        assert_eq!(exit, LoopExit::InputClosed);
        assert!(output.contains("has not reported ready"));
        assert!(output.contains("Options:"));
        let first_timeout = input.timeouts_seen[0].expect("ready wait must pass a timeout");
        assert!(first_timeout <= Duration::from_secs(30));
    }

    #[test]
    fn test_interrupt_while_waiting_exits() {
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::new(vec![ConsoleEvent::Interrupt]);

        let (exit, _) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::Interrupted);
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_read_prints_content_and_character_count() {
        // Arrange
        let mut bridge = MockDocumentBridge::new();
        bridge
            .expect_pull()
            .times(1)
            .returning(|| Ok("é\nb".to_string()));
        let mut input = ScriptedInput::ready_then_lines(&["1", "0"]);

        // Act
        let (_, output) = run_loop(bridge, &mut input);

        // Assert
        assert!(output.contains("Content retrieved (3 characters):"));
        assert!(output.contains(&format!("{RULE}\né\nb\n{RULE}")));
    }

    #[test]
    fn test_read_of_empty_document_prints_empty_notice() {
        let mut bridge = MockDocumentBridge::new();
        bridge.expect_pull().returning(|| Ok(String::new()));
        let mut input = ScriptedInput::ready_then_lines(&["1", "0"]);

        let (_, output) = run_loop(bridge, &mut input);

        assert!(output.contains("The editor is empty"));
    }

    #[test]
    fn test_bridge_error_is_reported_and_loop_continues() {
        // Arrange
        let mut bridge = MockDocumentBridge::new();
        bridge
            .expect_pull()
            .times(2)
            .returning(|| Err(BridgeError::NotConnected));
        let mut input = ScriptedInput::ready_then_lines(&["1", "1", "0"]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::Quit);
        assert_eq!(output.matches("Read failed").count(), 2);
    }

    // ── Write ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_write_joins_lines_until_sentinel() {
        // Arrange
        let mut bridge = MockDocumentBridge::new();
        bridge
            .expect_push()
            .withf(|content| content == "# Title\n\nbody")
            .times(1)
            .returning(|_| Ok(()));
        let mut input = ScriptedInput::ready_then_lines(&["2", "# Title", "", "body", "EOF", "0"]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("Content written (13 characters)"));
    }

    #[test]
    fn test_sentinel_is_trimmed_and_case_insensitive() {
        let mut bridge = MockDocumentBridge::new();
        bridge
            .expect_push()
            .withf(|content| content == "text")
            .times(1)
            .returning(|_| Ok(()));
        let mut input = ScriptedInput::ready_then_lines(&["2", "text", "  eof ", "0"]);

        let (exit, _) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::Quit);
    }

    #[test]
    fn test_write_rejects_whitespace_only_without_push() {
        // Arrange: push has no expectation, so any call panics
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::ready_then_lines(&["2", "   ", "\t", "EOF", "0"]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("the content is empty"));
    }

    #[test]
    fn test_write_rejects_empty_capture_without_push() {
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::ready_then_lines(&["2", "EOF", "0"]);

        let (_, output) = run_loop(bridge, &mut input);

        assert!(output.contains("the content is empty"));
    }

    #[test]
    fn test_interrupt_during_write_returns_to_menu() {
        // Arrange
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::new(vec![
            ConsoleEvent::RendererReady,
            ConsoleEvent::Line("2".to_string()),
            ConsoleEvent::Line("draft".to_string()),
            ConsoleEvent::Interrupt,
            ConsoleEvent::Line("0".to_string()),
        ]);

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("Input cancelled"));
    }

    #[test]
    fn test_push_failure_is_reported() {
        let mut bridge = MockDocumentBridge::new();
        bridge.expect_push().returning(|_| {
            Err(BridgeError::Rejected {
                message: "read-only".to_string(),
            })
        });
        let mut input = ScriptedInput::ready_then_lines(&["2", "x", "EOF", "0"]);

        let (exit, output) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("Write failed"));
        assert!(output.contains("read-only"));
    }

    // ── Menu ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_invalid_choice_reprompts() {
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::ready_then_lines(&["9", "", "0"]);

        let (exit, output) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::Quit);
        assert_eq!(output.matches("Invalid choice. Use 1, 2 or 0").count(), 2);
        assert_eq!(output.matches("Your choice (1/2/0): ").count(), 3);
    }

    #[test]
    fn test_choice_is_trimmed() {
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::ready_then_lines(&["  0  "]);

        let (exit, output) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("Closing..."));
    }

    #[test]
    fn test_interrupt_at_menu_exits() {
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::new(vec![ConsoleEvent::RendererReady, ConsoleEvent::Interrupt]);

        let (exit, _) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::Interrupted);
    }

    #[test]
    fn test_input_closed_at_menu_ends_quietly() {
        let bridge = MockDocumentBridge::new();
        let mut input = ScriptedInput::ready_then_lines(&[]);

        let (exit, _) = run_loop(bridge, &mut input);

        assert_eq!(exit, LoopExit::InputClosed);
    }

    // ── Ctrl+C during a bridge call ───────────────────────────────────────────

    #[test]
    fn test_interrupt_during_read_cancels_only_the_read() {
        // Arrange: Ctrl+C is pressed while the pull is still waiting
        let mut input = ScriptedInput::ready_then_lines(&["1", "0"]);
        let pressed = Arc::clone(&input.interrupts_during_call);
        let mut bridge = MockDocumentBridge::new();
        bridge.expect_pull().times(1).returning(move || {
            pressed.fetch_add(1, Ordering::SeqCst);
            Ok("# late".to_string())
        });

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert: the menu came back and Quit ended the loop
        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("Read cancelled"));
        assert!(!output.contains("# late"));
        assert!(output.contains("Closing..."));
    }

    #[test]
    fn test_interrupt_during_write_keeps_the_loop_running() {
        // Arrange
        let mut input = ScriptedInput::ready_then_lines(&["2", "text", "EOF", "0"]);
        let pressed = Arc::clone(&input.interrupts_during_call);
        let mut bridge = MockDocumentBridge::new();
        bridge.expect_push().times(1).returning(move |_| {
            pressed.fetch_add(2, Ordering::SeqCst);
            Ok(())
        });

        // Act
        let (exit, output) = run_loop(bridge, &mut input);

        // Assert
        assert_eq!(exit, LoopExit::Quit);
        assert!(output.contains("Ctrl+C arrived after the content was sent"));
        assert!(output.contains("Content written (4 characters)"));
    }
}
