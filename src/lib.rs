//! `renderware-rs` provides parsing and serialization for the asset
//! containers used by the RenderWare-era GTA games (III, Vice City,
//! San Andreas and their console and handheld ports).
//!
//! With renderware-rs, you can:
//!
//! - Parse TXD texture dictionaries from any of the supported platforms,
//!   keeping every texture's original encoded bytes so an unedited
//!   dictionary writes back byte-identically.
//! - Decode DXT1/3/5, paletted and uncompressed rasters to RGBA for
//!   display, and re-encode edited pixels on write.
//! - Parse and write COL collision archives across the COL1 through
//!   COL4 on-disk versions, including repair of the garbage face counts
//!   found in real-world files.
//! - Import textures from common 8-bit indexed interchange formats
//!   (BMP, PCX, GIF, PNG, TGA, IFF ILBM), all normalized to RGBA.
//! - Identify which game and platform wrote a file from its version and
//!   device ids.
//!
//! Every codec is a pure function over byte buffers: no callbacks, no
//! shared state, safe to call from any thread the host chooses. Fatal
//! problems surface as [RwError]; recoverable ones are collected as
//! [Warning]s on the parsed model.

pub mod collision;
pub mod error;
pub mod image;
pub mod rw;
pub mod texture;
pub mod utils;

pub use error::{RwError, Warning};
pub use rw::{Game, Platform, RwVersion};
