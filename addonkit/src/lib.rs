//! addonkit - non-blocking add-on download and install
//!
//! This library drives one add-on at a time through download, validation
//! and placement on a background thread while a foreground frame loop polls
//! a UI snapshot once per frame.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use addonkit::addon::AddonRef;
//! use addonkit::catalog::JsonCatalog;
//! use addonkit::config::InstallerConfig;
//! use addonkit::install::{Collaborators, InstallController};
//! use addonkit::placement::DirectoryPlacement;
//! use addonkit::transport::transport_for;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InstallerConfig::new("/games/kart/addons".into());
//! let addon = AddonRef::new("snow-track", "https://example.com/snow-track.tar.gz");
//!
//! let collaborators = Collaborators {
//!     transport: transport_for(&addon.source, config.request_timeout)?,
//!     catalog: Arc::new(JsonCatalog::open(config.catalog_path())?),
//!     placement: Arc::new(DirectoryPlacement::new(
//!         config.install_dir.clone(),
//!         config.staging_dir.clone(),
//!     )),
//! };
//!
//! let mut controller = InstallController::new(addon, collaborators, &config);
//! controller.start()?;
//! loop {
//!     let ui = controller.poll();
//!     println!("{}", ui.status_text);
//!     if ui.is_finished() {
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(33));
//! }
//! # Ok(())
//! # }
//! ```

pub mod addon;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod install;
pub mod logging;
pub mod placement;
pub mod transport;
