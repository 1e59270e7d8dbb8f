//! Rive Player Assets
//!
//! The default [`ByteFetcher`](rive_player_core::ByteFetcher) for the Rive
//! player. Supported sources:
//!
//! - Filesystem paths and `file://` URIs
//! - `ms-appx:///` paths, resolved against a configurable asset root
//! - `data:...;base64,` URIs
//! - `http://` and `https://` URLs (`network` feature, on by default)

pub mod fetcher;
pub mod source;

pub use fetcher::AssetFetcher;
pub use source::AssetSource;
