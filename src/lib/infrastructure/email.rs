//! Email delivery backends

pub mod smtp;
