//! Image listing, pulling, removal and pruning

pub mod manager;
pub mod state;
pub mod throttle;

pub use manager::ImageManager;
