//! Marginalia Scheduler Library
//!
//! Cooperative relevance tokens and deadline timers for a single event loop.
//!
//! Nothing here spawns threads or sleeps. Timers hold deadlines and the owner
//! polls them with the current [`Instant`](std::time::Instant); tokens tell an
//! async continuation whether the view that started it still cares about the
//! result.
//!
//! # Example
//!
//! ```
//! use marginalia_scheduler::{CancellationRegistry, DebounceTimer};
//! use std::time::{Duration, Instant};
//!
//! let registry = CancellationRegistry::new();
//! let token = registry.issue("DocumentElements/5");
//!
//! // Paragraph unmounted while its fetch was in flight
//! registry.cancel(&"DocumentElements/5");
//! assert!(token.is_cancelled());
//!
//! let start = Instant::now();
//! let mut timer = DebounceTimer::new(Duration::from_millis(30));
//! timer.schedule(start);
//! assert!(!timer.poll(start + Duration::from_millis(10)));
//! assert!(timer.poll(start + Duration::from_millis(30)));
//! ```

mod cancel;
mod timer;

pub use cancel::{CancellationRegistry, CancellationToken};
pub use timer::{earliest, DebounceTimer};
