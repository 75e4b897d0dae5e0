//! The editing application, seen from this crate.
//!
//! Everything here is implemented by the embedding application: opening
//! documents, walking the layer tree, reading and writing raw pixels. The
//! rest of the crate only talks to the host through these traits.
//!
//! Host calls are assumed synchronous and infallible. Pixel reads return
//! owned buffers; a buffer shorter than the requested bounds is a broken
//! host and panics where it is consumed.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use whereat::{At, ErrorAtExt};

use crate::error::DocumentError;
use crate::geometry::Bounds;

/// Unique, stable identity of a layer, assigned by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u128);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:032x}}}", self.0)
    }
}

/// Identity of an open document, assigned by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

/// Kind of a layer node.
///
/// Hosts report kinds as string tags; [`LayerKind::from_tag`] is the only
/// way in, so unknown tags are caught where the host's data is wrapped.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Raster layer holding its own pixels.
    Paint,
    /// Layer made of vector shapes.
    Vector,
    /// Container for other layers.
    Group,
    /// Layer whose content is linked from an external file.
    File,
    /// Adjustment applied to the layers below.
    Filter,
    /// Generated fill (color, pattern, gradient).
    Fill,
    /// Live copy of another layer.
    Instance,
    /// Mask node attached to a layer (transparency, filter, selection, ...).
    Mask,
}

impl LayerKind {
    /// Parse the host's tag.
    pub fn from_tag(tag: &str) -> Result<Self, At<DocumentError>> {
        let kind = match tag {
            "paintlayer" => Self::Paint,
            "vectorlayer" => Self::Vector,
            "grouplayer" => Self::Group,
            "filelayer" => Self::File,
            "filterlayer" => Self::Filter,
            "filllayer" => Self::Fill,
            "clonelayer" => Self::Instance,
            "transparencymask" | "filtermask" | "transformmask" | "selectionmask"
            | "colorizemask" => Self::Mask,
            _ => return Err(DocumentError::UnknownLayerKind(tag.into()).start_at()),
        };
        Ok(kind)
    }

    /// Tag used when asking the host to create a node of this kind.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Paint => "paintlayer",
            Self::Vector => "vectorlayer",
            Self::Group => "grouplayer",
            Self::File => "filelayer",
            Self::Filter => "filterlayer",
            Self::Fill => "filllayer",
            Self::Instance => "clonelayer",
            Self::Mask => "transparencymask",
        }
    }

    /// Whether layers of this kind carry image content the pipeline can use.
    pub fn is_image_layer(self) -> bool {
        matches!(self, Self::Paint | Self::Vector | Self::Group)
    }
}

/// A layer node as the host reports it, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLayer {
    pub id: LayerId,
    pub name: String,
    /// Host kind tag, e.g. `"paintlayer"`.
    pub kind: String,
}

/// A vector shape on a vector layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    /// Shape name; pose models use it to recognize their own shapes.
    pub name: String,
    /// Host shape type, e.g. `"path"` or `"ellipse"`.
    pub kind: String,
    /// Top-left position in points.
    pub position: (f64, f64),
    /// The shape serialized as an SVG fragment.
    pub svg: String,
}

/// The editing application.
pub trait Host {
    type Document: HostDocument;

    /// The document currently focused in the UI, if any.
    fn active_document(&mut self) -> Option<&mut Self::Document>;

    /// Identities of every open document.
    fn documents(&self) -> Vec<DocumentId>;
}

/// One open document in the host.
///
/// Layer arguments are ids previously reported by this document. Sibling
/// order is top to bottom: index 0 is the topmost layer.
pub trait HostDocument {
    type Selection: HostSelection;

    fn id(&self) -> DocumentId;

    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Color model name, e.g. `"RGBA"`, `"CMYKA"`, `"GRAYA"`.
    fn color_model(&self) -> String;
    /// Channel depth name, e.g. `"U8"`, `"U16"`, `"F32"`.
    fn color_depth(&self) -> String;
    /// Resolution in pixels per inch.
    fn resolution(&self) -> f64;

    /// The user's current selection, if any.
    fn selection(&self) -> Option<Self::Selection>;

    fn active_layer(&self) -> Option<RawLayer>;
    /// Children of `parent`, or of the root when `parent` is `None`.
    fn child_layers(&self, parent: Option<LayerId>) -> Vec<RawLayer>;

    fn layer_bounds(&self, layer: LayerId) -> Bounds;
    fn is_visible(&self, layer: LayerId) -> bool;
    fn set_visible(&mut self, layer: LayerId, visible: bool);

    /// Composited pixels of the whole document, ARGB8.
    fn pixel_data(&self, bounds: Bounds) -> Vec<u8>;
    /// Pixels of a single layer including its masks and children, ARGB8.
    fn layer_pixel_data(&self, layer: LayerId, bounds: Bounds) -> Vec<u8>;
    fn set_pixel_data(&mut self, layer: LayerId, data: &[u8], bounds: Bounds);

    /// Create a detached node. It is not part of the tree until
    /// [`add_child_layer`](Self::add_child_layer) is called.
    fn create_layer(&mut self, name: &str, kind: LayerKind) -> LayerId;
    /// Insert `layer` at the root, directly below `above`, or at the very
    /// top when `above` is `None`.
    fn add_child_layer(&mut self, layer: LayerId, above: Option<LayerId>);

    fn shapes(&self, layer: LayerId) -> Vec<Shape>;
    /// Parse `svg` and add the resulting shapes to the vector layer.
    fn add_shapes_from_svg(&mut self, layer: LayerId, svg: &str);

    /// Recompute the composited image from all visible layers.
    fn refresh_projection(&mut self);
}

/// A selection channel. Values are per-pixel coverage, one byte each.
pub trait HostSelection {
    /// Detached copy; operations on it leave the document's selection alone.
    fn duplicate(&self) -> Self;

    /// Bounding rectangle of the selected pixels.
    fn bounds(&self) -> Bounds;
    fn pixel_data(&self, bounds: Bounds) -> Vec<u8>;

    /// Dilate by `x` pixels horizontally and `y` vertically.
    fn grow(&mut self, x: u32, y: u32);
    /// Soften the edge with the given radius.
    fn feather(&mut self, radius: u32);
}
