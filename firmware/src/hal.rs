//! Hardware-facing traits
//!
//! The board layer implements these for the real nRF24L01+ front-ends and
//! the target timer. This module isolates every hardware assumption the
//! jammer core makes, so the core runs unchanged on the host under test.

pub mod clock;
pub mod radio;
