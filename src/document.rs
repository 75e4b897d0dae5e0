//! Reading from and writing back into a host document.
//!
//! [`Document`] wraps a borrowed [`HostDocument`] and adds the few pieces
//! of real logic on top of plain delegation:
//!
//! - mask extraction from the user's selection, with grow/feather scaled by
//!   the selection's diagonal and bounds padded to the encoder's alignment
//! - reading the composited image with one layer temporarily hidden
//!   ([`VisibilityGuard`])
//! - clearing stale pixels when a layer's content moves or resizes
//! - inserting new layers directly above a reference layer
//! - post-order enumeration of image layers
//!
//! # Example
//!
//! ```
//! use docbridge::{Document, HostDocument, Image, Layer, Mask};
//!
//! fn inpaint<D: HostDocument>(
//!     host_doc: &mut D,
//!     pipeline: impl Fn(&Image, &Mask) -> Image,
//! ) -> Result<Option<Layer>, Box<dyn std::error::Error>> {
//!     let mut doc = Document::new(host_doc);
//!     doc.check_color_mode()?;
//!     let Some(mask) = doc.create_mask_from_selection(0.05, 0.1) else {
//!         return Ok(None);
//!     };
//!     let image = doc.get_image(Some(mask.bounds()), None);
//!     let result = pipeline(&image, &mask);
//!     Ok(Some(doc.insert_layer("result", &result, mask.bounds(), None)?))
//! }
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Deref;

use num_traits::Float;
use whereat::{At, ErrorAtExt};

use crate::error::{DocumentError, IncompatibleColorMode};
use crate::geometry::{Bounds, Extent};
use crate::host::{
    DocumentId, HostDocument, HostSelection, LayerId, LayerKind, RawLayer, Shape,
};
use crate::image::{Image, ImageError, Mask};

/// Mask bounds are padded to a multiple of this many pixels.
pub const MASK_ALIGNMENT: u32 = 8;

/// Points per inch; vector shapes are laid out in points.
const POINTS_PER_INCH: f64 = 72.0;

const REQUIRED_COLOR_MODEL: &str = "RGBA";
const REQUIRED_COLOR_DEPTH: &str = "U8";

/// A validated layer handle.
///
/// Two handles are equal when they refer to the same host layer, whatever
/// their name.
#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
}

impl Layer {
    /// Validate a host node. Fails on kind tags this crate does not know.
    pub fn from_raw(raw: RawLayer) -> Result<Self, At<DocumentError>> {
        let kind = LayerKind::from_tag(&raw.kind)?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            kind,
        })
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Layer {}

/// Layer access on top of a host document.
#[derive(Debug)]
pub struct Document<'d, D: HostDocument> {
    doc: &'d mut D,
}

impl<'d, D: HostDocument> Document<'d, D> {
    pub fn new(doc: &'d mut D) -> Self {
        Self { doc }
    }

    pub fn id(&self) -> DocumentId {
        self.doc.id()
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.doc.width(), self.doc.height())
    }

    /// Scale from points to pixels, as applied to vector shapes.
    pub fn resolution(&self) -> f64 {
        self.doc.resolution() / POINTS_PER_INCH
    }

    /// Whether this is the document `active` names.
    pub fn is_active(&self, active: Option<DocumentId>) -> bool {
        active == Some(self.id())
    }

    /// Whether this document is still among the host's `open` documents.
    pub fn is_valid(&self, open: &[DocumentId]) -> bool {
        open.contains(&self.id())
    }

    /// Check that the document stores 8-bit RGBA, the only format the
    /// pipeline exchanges.
    pub fn check_color_mode(&self) -> Result<(), IncompatibleColorMode> {
        let model = self.doc.color_model();
        if model != REQUIRED_COLOR_MODEL {
            return Err(IncompatibleColorMode {
                attribute: "model",
                required: "RGB/Alpha",
                actual: model,
            });
        }
        let depth = self.doc.color_depth();
        if depth != REQUIRED_COLOR_DEPTH {
            return Err(IncompatibleColorMode {
                attribute: "depth",
                required: "8-bit integer",
                actual: depth,
            });
        }
        Ok(())
    }

    /// Build a mask from the user's selection.
    ///
    /// `grow` and `feather` are fractions of the selection's diagonal. The
    /// result is padded by the feather radius, aligned to
    /// [`MASK_ALIGNMENT`], and clamped to the document.
    ///
    /// Returns `None` when there is no selection, or when the selection is
    /// the whole document at full opacity: no mask means "use the whole
    /// image". The document's own selection is never modified.
    pub fn create_mask_from_selection(&self, grow: f64, feather: f64) -> Option<Mask> {
        let user_selection = self.doc.selection()?;
        let extent = self.extent();
        if selection_is_entire_document(&user_selection, extent) {
            log::debug!("selection covers the whole document, no mask");
            return None;
        }

        let mut selection = user_selection.duplicate();
        let size_factor = selection.bounds().extent().diagonal();
        let grow_pixels = fraction_to_pixels(grow, size_factor);
        let feather_radius = fraction_to_pixels(feather, size_factor);

        if grow_pixels > 0 {
            selection.grow(grow_pixels, grow_pixels);
        }
        if feather_radius > 0 {
            selection.feather(feather_radius);
        }

        let bounds = Bounds::pad(selection.bounds(), feather_radius, MASK_ALIGNMENT);
        let bounds = Bounds::clamp(bounds, extent);
        log::debug!(
            "mask from selection: grow {grow_pixels}px, feather {feather_radius}px, bounds {bounds:?}"
        );
        let data = if bounds.is_empty() {
            Vec::new()
        } else {
            selection.pixel_data(bounds)
        };
        Some(Mask::from_host(bounds, data))
    }

    /// Read the composited image.
    ///
    /// Defaults to the whole document. With `exclude_layer`, that layer is
    /// hidden for the duration of the read and restored afterwards.
    pub fn get_image(&mut self, bounds: Option<Bounds>, exclude_layer: Option<&Layer>) -> Image {
        let bounds = bounds.unwrap_or_else(|| Bounds::from_extent(self.extent()));
        match exclude_layer {
            Some(layer) => {
                let guard = VisibilityGuard::hide(&mut *self.doc, layer.id);
                read_composite(&*guard, bounds)
            }
            None => read_composite(&*self.doc, bounds),
        }
    }

    /// Read a single layer's pixels, defaulting to the layer's own bounds.
    pub fn get_layer_image(&self, layer: &Layer, bounds: Option<Bounds>) -> Image {
        let bounds = bounds.unwrap_or_else(|| self.doc.layer_bounds(layer.id));
        Image::from_host(bounds.extent(), self.doc.layer_pixel_data(layer.id, bounds))
    }

    /// Add a paint layer holding `image` at `bounds`, directly above `below`
    /// (or on top of the stack).
    pub fn insert_layer(
        &mut self,
        name: &str,
        image: &Image,
        bounds: Bounds,
        below: Option<&Layer>,
    ) -> Result<Layer, At<ImageError>> {
        check_image_fits(image, bounds)?;
        let layer = self.insert_node(name, LayerKind::Paint, below);
        self.doc.set_pixel_data(layer.id, image.data(), bounds);
        self.doc.refresh_projection();
        Ok(layer)
    }

    /// Add a vector layer built from an SVG fragment, directly above `below`
    /// (or on top of the stack).
    pub fn insert_vector_layer(&mut self, name: &str, svg: &str, below: Option<&Layer>) -> Layer {
        let layer = self.insert_node(name, LayerKind::Vector, below);
        self.doc.add_shapes_from_svg(layer.id, svg);
        self.doc.refresh_projection();
        layer
    }

    /// Replace a layer's pixels with `image` at `bounds` and make it visible.
    ///
    /// When `bounds` differs from the layer's current bounds, the old area
    /// is cleared first so nothing from a previous write survives outside
    /// the new region.
    pub fn set_layer_content(
        &mut self,
        layer: &Layer,
        image: &Image,
        bounds: Bounds,
    ) -> Result<Layer, At<ImageError>> {
        check_image_fits(image, bounds)?;
        let layer_bounds = self.doc.layer_bounds(layer.id);
        if layer_bounds != bounds && !layer_bounds.is_empty() {
            // Cropping the node would be cheaper but leaves an undo step.
            let blank = Image::create(layer_bounds.extent(), 0);
            self.doc.set_pixel_data(layer.id, blank.data(), layer_bounds);
        }
        self.doc.set_pixel_data(layer.id, image.data(), bounds);
        self.doc.set_visible(layer.id, true);
        self.doc.refresh_projection();
        Ok(layer.clone())
    }

    pub fn hide_layer(&mut self, layer: &Layer) -> Layer {
        self.doc.set_visible(layer.id, false);
        self.doc.refresh_projection();
        layer.clone()
    }

    /// Paint, vector and group layers, depth-first with children before
    /// their parent.
    pub fn image_layers(&self) -> Vec<Layer> {
        let mut layers = Vec::new();
        collect_layers(&*self.doc, None, &mut layers);
        layers
    }

    pub fn find_layer(&self, id: LayerId) -> Option<Layer> {
        self.image_layers().into_iter().find(|layer| layer.id == id)
    }

    /// The layer selected in the UI. `None` if there is none or the host
    /// reports a kind this crate does not know.
    pub fn active_layer(&self) -> Option<Layer> {
        let raw = self.doc.active_layer()?;
        match Layer::from_raw(raw) {
            Ok(layer) => Some(layer),
            Err(e) => {
                log::warn!("ignoring active layer: {e:?}");
                None
            }
        }
    }

    /// Shapes on a vector layer.
    pub fn shapes(&self, layer: &Layer) -> Vec<Shape> {
        self.doc.shapes(layer.id)
    }

    /// Merge shapes parsed from `svg` into a vector layer.
    pub fn add_shapes(&mut self, layer: &Layer, svg: &str) {
        self.doc.add_shapes_from_svg(layer.id, svg);
    }

    fn insert_node(&mut self, name: &str, kind: LayerKind, below: Option<&Layer>) -> Layer {
        let id = self.doc.create_layer(name, kind);
        let above = below.and_then(|below| self.find_layer_above(below));
        self.doc.add_child_layer(id, above);
        Layer {
            id,
            name: name.into(),
            kind,
        }
    }

    /// The top-level sibling directly above `below`, which the new layer
    /// goes under. `None` puts the new layer on top.
    fn find_layer_above(&self, below: &Layer) -> Option<LayerId> {
        let siblings = self.doc.child_layers(None);
        match siblings.iter().position(|raw| raw.id == below.id) {
            Some(index) if index >= 1 => Some(siblings[index - 1].id),
            Some(_) => None,
            None => {
                log::warn!(
                    "layer {} is not a top-level layer, inserting on top",
                    below.id
                );
                None
            }
        }
    }
}

/// Hides a layer and recomposites; restores visibility and recomposites
/// again when dropped.
///
/// Dereferences to the document so reads can go through the guard. A layer
/// that was already hidden is left untouched and nothing is recomposited.
#[derive(Debug)]
pub struct VisibilityGuard<'d, D: HostDocument> {
    doc: &'d mut D,
    hidden: Option<LayerId>,
}

impl<'d, D: HostDocument> VisibilityGuard<'d, D> {
    pub fn hide(doc: &'d mut D, layer: LayerId) -> Self {
        let hidden = if doc.is_visible(layer) {
            doc.set_visible(layer, false);
            // Synchronous and slow on large documents.
            doc.refresh_projection();
            Some(layer)
        } else {
            None
        };
        Self { doc, hidden }
    }
}

impl<D: HostDocument> Deref for VisibilityGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.doc
    }
}

impl<D: HostDocument> Drop for VisibilityGuard<'_, D> {
    fn drop(&mut self) {
        if let Some(layer) = self.hidden.take() {
            self.doc.set_visible(layer, true);
            self.doc.refresh_projection();
        }
    }
}

fn read_composite<D: HostDocument>(doc: &D, bounds: Bounds) -> Image {
    Image::from_host(bounds.extent(), doc.pixel_data(bounds))
}

fn check_image_fits(image: &Image, bounds: Bounds) -> Result<(), At<ImageError>> {
    if image.extent() != bounds.extent() {
        let expected = bounds.extent().pixel_count() * crate::image::BYTES_PER_PIXEL;
        return Err(ImageError::SizeMismatch {
            expected,
            actual: image.data().len(),
        }
        .start_at());
    }
    Ok(())
}

/// Post-order walk. Unknown kinds are skipped with a warning; their
/// children are still visited.
fn collect_layers<D: HostDocument>(doc: &D, parent: Option<LayerId>, out: &mut Vec<Layer>) {
    for raw in doc.child_layers(parent) {
        collect_layers(doc, Some(raw.id), out);
        match Layer::from_raw(raw) {
            Ok(layer) if layer.kind.is_image_layer() => out.push(layer),
            Ok(_) => {}
            Err(e) => log::warn!("skipping layer: {e:?}"),
        }
    }
}

fn selection_is_entire_document<S: HostSelection>(selection: &S, extent: Extent) -> bool {
    let bounds = selection.bounds();
    if !bounds.covers(extent) {
        return false;
    }
    selection.pixel_data(bounds).iter().all(|&v| v == 0xff)
}

/// `floor(fraction * size)`, saturating at 0 for negative or NaN input.
fn fraction_to_pixels(fraction: f64, size: f64) -> u32 {
    Float::floor(fraction * size) as u32
}
