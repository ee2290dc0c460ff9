//! Logging shims
//!
//! Forwards to `defmt` on the target and to the `log` facade on the host,
//! so core modules log the same way in both builds. Arguments must implement
//! both `defmt::Format` and `core::fmt::Debug`, so format them with `{:?}`
//! unless they are plain integers.

#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "embedded")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(not(feature = "embedded"))]
            ::log::trace!($s $(, $x)*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "embedded")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(not(feature = "embedded"))]
            ::log::debug!($s $(, $x)*);
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "embedded")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(not(feature = "embedded"))]
            ::log::info!($s $(, $x)*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "embedded")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(not(feature = "embedded"))]
            ::log::warn!($s $(, $x)*);
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "embedded")]
            ::defmt::error!($s $(, $x)*);
            #[cfg(not(feature = "embedded"))]
            ::log::error!($s $(, $x)*);
        }
    };
}
