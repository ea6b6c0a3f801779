//! Domain layer

pub mod relay;
