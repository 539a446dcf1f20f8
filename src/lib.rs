//! Cloud chamber particle effect
//!
//! Charged particles shed by pointer movement curl through a magnetic field
//! and leave fading ionization trails on a software pixel surface.
//! [`ParticleChamber`] is the whole simulation; the `cloudchamber` binary
//! hosts it in an SDL2 window.

pub mod chamber;
pub mod config;
pub mod display;
pub mod error;
pub mod math;
pub mod particles;
pub mod pointer;
pub mod preferences;
pub mod theme;
pub mod toggle;
pub mod util;

pub use chamber::ParticleChamber;
pub use config::{ChamberConfig, ConnectionConfig};
pub use display::PixelBuffer;
pub use error::{ChamberError, Result};
pub use math::Vec2;
pub use particles::{Charge, Particle, Trail, TrailPoint};
pub use pointer::PointerState;
pub use preferences::{JsonFileStore, MemoryStore, PreferenceStore, ENABLED_KEY};
pub use theme::{Theme, ThemeSource};
pub use toggle::ToggleButton;
