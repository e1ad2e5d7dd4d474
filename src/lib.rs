//! Keep Immigration - candidate lifecycle engine for colony simulations

pub mod collective;
pub mod core;
pub mod immigration;
