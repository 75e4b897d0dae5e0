//! In-memory editor used by the integration tests.
//!
//! Every layer keeps a full-document ARGB canvas; layer bounds are the
//! bounding box of its non-zero bytes. Mutations are recorded in
//! [`FakeDoc::calls`] so tests can check what was sent to the host and in
//! which order.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use docbridge::{Bounds, DocumentId, Host, HostDocument, HostSelection, LayerId, LayerKind};
use docbridge::{RawLayer, Shape};

/// A recorded host call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetPixelData { layer: LayerId, bounds: Bounds, len: usize },
    SetVisible { layer: LayerId, visible: bool },
    Refresh,
    ReadComposite { bounds: Bounds, visible: Vec<LayerId> },
    CreateLayer { layer: LayerId, kind: LayerKind },
    AddChild { layer: LayerId, above: Option<LayerId> },
    AddShapes { layer: LayerId, svg: String },
}

#[derive(Clone, Debug)]
pub struct FakeLayer {
    pub name: String,
    pub tag: String,
    pub visible: bool,
    pub canvas: Vec<u8>,
    pub shapes: Vec<Shape>,
    pub children: Vec<LayerId>,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    pub bounds: Bounds,
    pub data: Vec<u8>,
    pub grown_by: Vec<(u32, u32)>,
    pub feathered_by: Vec<u32>,
}

/// A selection handle. Clones share state like a live host selection;
/// [`HostSelection::duplicate`] makes an independent copy.
#[derive(Clone, Debug)]
pub struct FakeSelection(pub Rc<RefCell<SelectionState>>);

impl FakeSelection {
    pub fn new(bounds: Bounds, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), bounds.extent().pixel_count());
        Self(Rc::new(RefCell::new(SelectionState {
            bounds,
            data,
            ..Default::default()
        })))
    }

    pub fn opaque(bounds: Bounds) -> Self {
        Self::new(bounds, vec![0xff; bounds.extent().pixel_count()])
    }

    pub fn state(&self) -> SelectionState {
        self.0.borrow().clone()
    }
}

impl HostSelection for FakeSelection {
    fn duplicate(&self) -> Self {
        Self(Rc::new(RefCell::new(self.state())))
    }

    fn bounds(&self) -> Bounds {
        self.0.borrow().bounds
    }

    fn pixel_data(&self, bounds: Bounds) -> Vec<u8> {
        let s = self.0.borrow();
        let mut out = Vec::with_capacity(bounds.extent().pixel_count());
        for y in 0..bounds.height as i32 {
            for x in 0..bounds.width as i32 {
                out.push(sample(&s, bounds.x + x, bounds.y + y));
            }
        }
        out
    }

    /// Square dilation.
    fn grow(&mut self, gx: u32, gy: u32) {
        let mut s = self.0.borrow_mut();
        let old = s.bounds;
        let new = Bounds::new(
            old.x - gx as i32,
            old.y - gy as i32,
            old.width + 2 * gx,
            old.height + 2 * gy,
        );
        let mut data = Vec::with_capacity(new.extent().pixel_count());
        for y in new.y..new.y + new.height as i32 {
            for x in new.x..new.x + new.width as i32 {
                let mut v = 0;
                for dy in -(gy as i32)..=gy as i32 {
                    for dx in -(gx as i32)..=gx as i32 {
                        v = v.max(sample(&s, x + dx, y + dy));
                    }
                }
                data.push(v);
            }
        }
        s.bounds = new;
        s.data = data;
        s.grown_by.push((gx, gy));
    }

    /// Records the radius; coverage is left as is.
    fn feather(&mut self, radius: u32) {
        self.0.borrow_mut().feathered_by.push(radius);
    }
}

fn sample(s: &SelectionState, x: i32, y: i32) -> u8 {
    let b = s.bounds;
    if x < b.x || y < b.y || x >= b.x + b.width as i32 || y >= b.y + b.height as i32 {
        return 0;
    }
    let i = (y - b.y) as usize * b.width as usize + (x - b.x) as usize;
    s.data[i]
}

#[derive(Debug)]
pub struct FakeDoc {
    pub id: DocumentId,
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub depth: String,
    pub dpi: f64,
    /// Top-level layers, topmost first.
    pub root: Vec<LayerId>,
    pub layers: HashMap<LayerId, FakeLayer>,
    pub active: Option<LayerId>,
    pub selection: Option<FakeSelection>,
    pub calls: RefCell<Vec<Call>>,
    /// Composite reads come back one byte short, like a broken host.
    pub short_read: bool,
    next_id: u128,
}

impl FakeDoc {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: DocumentId(1),
            width,
            height,
            model: "RGBA".into(),
            depth: "U8".into(),
            dpi: 72.0,
            root: Vec::new(),
            layers: HashMap::new(),
            active: None,
            selection: None,
            calls: RefCell::new(Vec::new()),
            short_read: false,
            next_id: 100,
        }
    }

    /// Another open document; its layer ids don't collide with the
    /// default document's.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = DocumentId(id);
        self.next_id = u128::from(id) * 1000;
        self
    }

    /// Add a layer under `parent` (root when `None`) at the bottom of its
    /// siblings.
    pub fn push_layer(&mut self, parent: Option<LayerId>, name: &str, tag: &str) -> LayerId {
        let id = self.alloc(name, tag);
        match parent {
            Some(p) => self.layers.get_mut(&p).unwrap().children.push(id),
            None => self.root.push(id),
        }
        id
    }

    /// Fill a layer's canvas at `bounds` with `value`, bypassing the call log.
    pub fn paint(&mut self, layer: LayerId, bounds: Bounds, value: u8) {
        let data = vec![value; bounds.extent().pixel_count() * 4];
        self.write(layer, &data, bounds);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn pixel_writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SetPixelData { .. }))
            .collect()
    }

    pub fn layer(&self, id: LayerId) -> &FakeLayer {
        &self.layers[&id]
    }

    fn alloc(&mut self, name: &str, tag: &str) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        self.layers.insert(
            id,
            FakeLayer {
                name: name.into(),
                tag: tag.into(),
                visible: true,
                canvas: vec![0; self.width as usize * self.height as usize * 4],
                shapes: Vec::new(),
                children: Vec::new(),
            },
        );
        id
    }

    fn raw(&self, id: LayerId) -> RawLayer {
        let l = &self.layers[&id];
        RawLayer {
            id,
            name: l.name.clone(),
            kind: l.tag.clone(),
        }
    }

    fn write(&mut self, layer: LayerId, data: &[u8], bounds: Bounds) {
        let (w, h) = (self.width as i32, self.height as i32);
        let canvas = &mut self.layers.get_mut(&layer).unwrap().canvas;
        for row in 0..bounds.height as i32 {
            for col in 0..bounds.width as i32 {
                let (x, y) = (bounds.x + col, bounds.y + row);
                if x < 0 || y < 0 || x >= w || y >= h {
                    continue;
                }
                let src = (row as usize * bounds.width as usize + col as usize) * 4;
                let dst = (y as usize * w as usize + x as usize) * 4;
                canvas[dst..dst + 4].copy_from_slice(&data[src..src + 4]);
            }
        }
    }

    fn read(&self, canvas: &[u8], bounds: Bounds) -> Vec<u8> {
        let (w, h) = (self.width as i32, self.height as i32);
        let mut out = Vec::with_capacity(bounds.extent().pixel_count() * 4);
        for row in 0..bounds.height as i32 {
            for col in 0..bounds.width as i32 {
                let (x, y) = (bounds.x + col, bounds.y + row);
                if x < 0 || y < 0 || x >= w || y >= h {
                    out.extend_from_slice(&[0; 4]);
                } else {
                    let i = (y as usize * w as usize + x as usize) * 4;
                    out.extend_from_slice(&canvas[i..i + 4]);
                }
            }
        }
        out
    }

    fn visible_root_layers(&self) -> Vec<LayerId> {
        self.root
            .iter()
            .copied()
            .filter(|id| self.layers[id].visible)
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl HostDocument for FakeDoc {
    type Selection = FakeSelection;

    fn id(&self) -> DocumentId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_model(&self) -> String {
        self.model.clone()
    }

    fn color_depth(&self) -> String {
        self.depth.clone()
    }

    fn resolution(&self) -> f64 {
        self.dpi
    }

    fn selection(&self) -> Option<FakeSelection> {
        self.selection.clone()
    }

    fn active_layer(&self) -> Option<RawLayer> {
        self.active.map(|id| self.raw(id))
    }

    fn child_layers(&self, parent: Option<LayerId>) -> Vec<RawLayer> {
        let ids = match parent {
            Some(p) => self.layers[&p].children.clone(),
            None => self.root.clone(),
        };
        ids.into_iter().map(|id| self.raw(id)).collect()
    }

    fn layer_bounds(&self, layer: LayerId) -> Bounds {
        let canvas = &self.layers[&layer].canvas;
        let w = self.width as usize;
        let (mut x0, mut y0, mut x1, mut y1) = (usize::MAX, usize::MAX, 0, 0);
        for (i, px) in canvas.chunks(4).enumerate() {
            if px.iter().any(|&b| b != 0) {
                let (x, y) = (i % w, i / w);
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x + 1);
                y1 = y1.max(y + 1);
            }
        }
        if x0 == usize::MAX {
            return Bounds::default();
        }
        Bounds::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    fn is_visible(&self, layer: LayerId) -> bool {
        self.layers[&layer].visible
    }

    fn set_visible(&mut self, layer: LayerId, visible: bool) {
        self.record(Call::SetVisible { layer, visible });
        self.layers.get_mut(&layer).unwrap().visible = visible;
    }

    /// Every byte holds the number of visible top-level layers.
    fn pixel_data(&self, bounds: Bounds) -> Vec<u8> {
        let visible = self.visible_root_layers();
        self.record(Call::ReadComposite {
            bounds,
            visible: visible.clone(),
        });
        let mut data = vec![visible.len() as u8; bounds.extent().pixel_count() * 4];
        if self.short_read {
            data.pop();
        }
        data
    }

    fn layer_pixel_data(&self, layer: LayerId, bounds: Bounds) -> Vec<u8> {
        self.read(&self.layers[&layer].canvas, bounds)
    }

    fn set_pixel_data(&mut self, layer: LayerId, data: &[u8], bounds: Bounds) {
        self.record(Call::SetPixelData {
            layer,
            bounds,
            len: data.len(),
        });
        self.write(layer, data, bounds);
    }

    fn create_layer(&mut self, name: &str, kind: LayerKind) -> LayerId {
        let id = self.alloc(name, kind.tag());
        self.record(Call::CreateLayer { layer: id, kind });
        id
    }

    fn add_child_layer(&mut self, layer: LayerId, above: Option<LayerId>) {
        self.record(Call::AddChild { layer, above });
        let index = match above {
            Some(a) => self.root.iter().position(|&id| id == a).unwrap() + 1,
            None => 0,
        };
        self.root.insert(index, layer);
    }

    fn shapes(&self, layer: LayerId) -> Vec<Shape> {
        self.layers[&layer].shapes.clone()
    }

    fn add_shapes_from_svg(&mut self, layer: LayerId, svg: &str) {
        self.record(Call::AddShapes {
            layer,
            svg: svg.into(),
        });
        self.layers.get_mut(&layer).unwrap().shapes.push(Shape {
            name: "bone".into(),
            kind: "path".into(),
            position: (0.0, 0.0),
            svg: svg.into(),
        });
    }

    fn refresh_projection(&mut self) {
        self.record(Call::Refresh);
    }
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pub docs: Vec<FakeDoc>,
    pub active: Option<usize>,
}

impl FakeHost {
    pub fn with_active(doc: FakeDoc) -> Self {
        Self {
            docs: vec![doc],
            active: Some(0),
        }
    }

    pub fn doc(&self) -> &FakeDoc {
        &self.docs[self.active.unwrap()]
    }

    pub fn doc_mut(&mut self) -> &mut FakeDoc {
        let i = self.active.unwrap();
        &mut self.docs[i]
    }
}

impl Host for FakeHost {
    type Document = FakeDoc;

    fn active_document(&mut self) -> Option<&mut FakeDoc> {
        let i = self.active?;
        self.docs.get_mut(i)
    }

    fn documents(&self) -> Vec<DocumentId> {
        self.docs.iter().map(|d| d.id).collect()
    }
}

/// A shape the pose fakes treat as a keypoint.
pub fn joint(name: &str, x: f64, y: f64) -> Shape {
    Shape {
        name: format!("joint-{name}"),
        kind: "ellipse".into(),
        position: (x, y),
        svg: format!("<ellipse id=\"joint-{name}\" cx=\"{x}\" cy=\"{y}\"/>"),
    }
}
