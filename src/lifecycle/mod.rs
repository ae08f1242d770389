//! Process lifecycle: bring-up, signals, drain.
//!
//! ```text
//! main
//!   ├─ startup::build_registry   rules file → Registry (built-in set if none)
//!   ├─ startup::prepare          metrics exporter, bind, HttpServer
//!   ├─ signals::spawn_reload_on_hangup
//!   │                            SIGHUP → Registry::reload_from_file
//!   └─ signals::wait_for_termination
//!                                SIGINT/SIGTERM → Shutdown::trigger → server drains
//! ```
//!
//! Rules must be installed before the listener accepts traffic, so a
//! request is never screened against an empty registry by accident.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
