//! Zones: where card instances live.
//!
//! ## Key Types
//!
//! - `Zone`: a deck, hand, location side, discard pile, destroyed pile or the
//!   banished pile
//! - `ZoneManager`: ordered card tracking and movement
//! - `ZonePosition`: insertion point within a zone

pub mod manager;

pub use manager::{Zone, ZoneManager, ZonePosition};
