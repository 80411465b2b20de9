//! Ride Dispatch - trip-offer dispatch and acceptance engine
//!
//! When a trip needs a driver, this crate finds eligible drivers near the
//! trip's origin, pushes each of them a time-boxed offer, and makes sure
//! exactly one driver wins when several accept at once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
