//! PDF Markup Scheduler Library
//!
//! Timer abstractions for the single-threaded annotation session.
//!
//! The session never owns a real timer. Hosts ask the [`Debouncer`] for its
//! deadline, arm whatever timer their event loop offers, and call
//! [`Debouncer::poll`] when it fires. This keeps the coalescing policy
//! testable without sleeping.
//!
//! # Example
//!
//! ```
//! use pdf_markup_scheduler::Debouncer;
//! use std::time::{Duration, Instant};
//!
//! let mut debouncer = Debouncer::new(Duration::from_millis(200));
//! let start = Instant::now();
//!
//! debouncer.schedule(start, "first");
//! debouncer.schedule(start + Duration::from_millis(50), "second");
//!
//! // Nothing fires inside the window
//! assert_eq!(debouncer.poll(start + Duration::from_millis(200)), None);
//!
//! // The latest payload fires once the window after the last call elapses
//! assert_eq!(debouncer.poll(start + Duration::from_millis(250)), Some("second"));
//! assert!(!debouncer.is_pending());
//! ```

mod debounce;

pub use debounce::Debouncer;
