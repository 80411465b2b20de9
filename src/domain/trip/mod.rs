//! Trip domain module.
//!
//! The booking subsystem owns trips; this module holds the snapshot the
//! dispatch core reads when building offers.

mod aggregate;

pub use aggregate::{Place, Trip, TripStatus, TripType};
