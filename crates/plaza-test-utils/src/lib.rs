//! Shared test utilities for Plaza layout tests.
//!
//! This crate provides:
//! - [`SimulatedClock`]: Simulated time that can be advanced manually
//! - [`LayoutFixture`]: Pre-wired store + engines over a simulated clock
//! - [`RecordingReindex`]: Reindex hook that records every notification
//!
//! # Example
//!
//! ```rust
//! use plaza_test_utils::LayoutFixture;
//! use plaza_layout::record::LayoutKind;
//!
//! let fixture = LayoutFixture::new();
//! let tab = fixture.tab_with_gadgets("Home", LayoutKind::TwoColumn, &[0, 0]);
//! fixture.placement.delete_gadget(tab.gadgets[0]).unwrap();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod simulation;

pub use fixtures::{LayoutFixture, RecordingReindex, SeededTab};
pub use simulation::SimulatedClock;
