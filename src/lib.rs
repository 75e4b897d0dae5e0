//! Bridge between a layered image editor and a generative image pipeline.
//!
//! Extracts selection masks and pixels from the editor's document, writes
//! generated pixels back into layers, and keeps pose (skeleton) vector
//! layers in sync by polling. The editor itself is abstracted behind the
//! traits in [`host`].
//!
//! # Modules
//!
//! - [`geometry`] — `Extent`, `Bounds`, padding to an alignment, clamping
//! - [`image`] — ARGB8 images and single-channel masks
//! - [`host`] — traits the editor implements, layer kinds
//! - [`document`] — layer read/write facade and mask extraction
//! - [`pose`] — periodic pose-layer reconciliation
//! - [`error`] — error types
//!
//! # Crate features
//!
//! - `std` (default): `std` support in dependencies. Without it the crate is
//!   `no_std` + `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod document;
pub mod error;
pub mod geometry;
pub mod host;
pub mod image;
pub mod pose;

pub use document::{Document, Layer, VisibilityGuard};
pub use error::{DocumentError, IncompatibleColorMode};
pub use geometry::{Bounds, Extent};
pub use host::{
    DocumentId, Host, HostDocument, HostSelection, LayerId, LayerKind, RawLayer, Shape,
};
pub use image::{Image, ImageError, Mask};
pub use pose::{PoseLayers, PoseModel, PoseSyncConfig, PoseTimer, TickOutcome};
