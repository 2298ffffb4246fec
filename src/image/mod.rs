//! Image generation adapters (synchronous providers).

pub mod providers;
