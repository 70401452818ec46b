#[cfg(feature = "elapsed")]
pub mod elapsed;

#[cfg(feature = "progress")]
pub mod progress;

#[cfg(feature = "progress")]
pub use progress::Progress;
