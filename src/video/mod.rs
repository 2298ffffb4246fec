//! Video generation adapters (asynchronous job-queue providers).

pub mod providers;
