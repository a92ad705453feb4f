//! Backend module
//!
//! Event-loop integration. The engine is single threaded: protocol
//! traffic, input and per-output frame ticks all dispatch through one
//! calloop loop.

pub mod event_loop;

pub use event_loop::EventLoop;
