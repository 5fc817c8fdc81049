//! Domain types for mdshell.
//!
//! Pure rules with no I/O beyond the single file-existence check the asset
//! locator needs:
//!
//! - **`lifecycle`** – the process-wide `NotStarted → … → Closed` state machine.
//! - **`assets`**    – ordered search for the directory holding the web bundle.
//! - **`launch`**    – window geometry, the local URL and the ordered list of
//!   browser launch strategies.

pub mod assets;
pub mod launch;
pub mod lifecycle;
