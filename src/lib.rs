#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use error::SnapshotError;
pub use ir::{Connection, Device, DeviceId, DeviceType, Filters, PersistedPositions, Snapshot};
pub use layout::{Diagnostic, Layout, compute_layout};
pub use render::render_svg;
pub use theme::Theme;
