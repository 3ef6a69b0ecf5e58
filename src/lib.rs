//! cinematic-camera library crate.
//!
//! Camera viewfinder core: device session, capture coordination, state store,
//! composition overlays, artifact delivery and the offline shell cache.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod event_loop;
pub mod hud;
pub mod input;
pub mod overlay;
pub mod session;
pub mod shell_cache;
pub mod store;
