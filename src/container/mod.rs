pub mod lifecycle;
pub mod power;
pub mod state;
