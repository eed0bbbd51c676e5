//! Real-world scenario benchmarks.
//!
//! These model a complete voice as the demo binary drives it: oscillator,
//! envelope and smoothers together, reading from either a fixed table or a
//! table published by a running wave computer.

mod voices;

pub use voices::bench_voices;
