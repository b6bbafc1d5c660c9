//! Binary backend: bit-accurate scalar reads over a fixed-layout, bit-sized
//! type graph.

pub mod cursor;
