//! # Flowwatch Engine
//!
//! The Flowwatch Engine follows workflow runs on a remote workflow server. It
//! turns each run's NDJSON event stream into an ordered log of rendered
//! entries and keeps a live view pointed at one run at a time.
//!
//! ## Key Features
//!
//! - **Chunk-safe decoding**: Lines survive any chunking of the byte stream,
//!   including splits inside UTF-8 characters and `\r\n` terminators
//! - **Tolerant parsing**: Malformed lines are logged and skipped
//! - **Multi-run sessions**: Any number of runs stream at once without
//!   touching each other's logs
//! - **Replayable focus**: Switching focus replays the stored log, which equals
//!   what was shown live
//!
//! ## Usage
//!
//! ```rust
//! use flowwatch_engine::{RunController, Session};
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! let (view_tx, _view_rx) = unbounded_channel();
//! let session = Session::new(view_tx);
//! let mut controller = RunController::new(session.clone(), "abc123".into(), "research");
//! controller.begin()?;
//! controller.ingest_chunk(b"{\"qualified_name\":\"StepDone\",\"value\":{\"msg\":\"ok\"}}\n")?;
//! assert_eq!(session.entries(&"abc123".into()).len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`stream`**: Chunk decoding and NDJSON line parsing
//! - **`render`**: Event records to display-ready entries
//! - **`store`**: Per-run entry logs
//! - **`session`**: Store, focus pointer and view channel behind one lock
//! - **`controller`**: Per-run state machine and streaming task
//! - **`selector`**: Focus switching and replay
//! - **`console`**: Starting runs and wiring everything together

pub mod console;
pub mod controller;
pub mod render;
pub mod selector;
pub mod session;
pub mod store;
pub mod stream;
pub mod view;

pub use console::{ConsoleError, WorkflowConsole};
pub use controller::{ControllerError, RunController, RunPhase};
pub use render::render_event;
pub use selector::RunSelector;
pub use session::{Session, SessionState};
pub use store::{RunLogStore, StoreError};
pub use stream::{ChunkDecoder, LineOutcome, parse_event_line};
pub use view::{ConsoleEvent, ViewReceiver, ViewSender};
