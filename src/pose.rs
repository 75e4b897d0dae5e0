//! Keeping pose layers in sync with their skeleton models.
//!
//! The host has no notification for shape edits, so the active vector
//! layer is polled on a fixed period. Each tick asks the layer's
//! [`PoseModel`] to reconcile itself against the layer's current shapes;
//! if the model answers with an SVG fragment, that fragment is merged into
//! the layer.
//!
//! ```text
//!   host event loop ──► PoseTimer::poll(now) ──► PoseLayers::update()
//!                                                      │
//!                          active vector layer? ◄──────┘
//!                                   │
//!                  model.update(shapes, resolution) ──► Some(svg) ──► add_shapes_from_svg
//! ```
//!
//! Models are kept per layer id for as long as the [`PoseLayers`] lives,
//! each remembering the document it belongs to. Entries are only dropped
//! through [`PoseLayers::forget`], or by the reconciliation pass when
//! [`PoseSyncConfig::evict_deleted_layers`] is set. That pass only looks at
//! the document being ticked, plus any documents the host has closed.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

use crate::document::Document;
use crate::geometry::Extent;
use crate::host::{DocumentId, Host, HostDocument, LayerId, LayerKind, Shape};

/// Default polling period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(500);

/// A skeleton model backing one pose layer.
pub trait PoseModel {
    /// Reconcile with the layer's current `shapes`. `resolution` converts
    /// points to pixels.
    ///
    /// Returns an SVG fragment to add to the layer, or `None` when nothing
    /// changed. Fragments are merged, never used to replace the layer, so
    /// they must make sense when applied on top of the existing shapes.
    fn update(&mut self, shapes: &[Shape], resolution: f64) -> Option<String>;
}

/// Settings for the pose sync loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoseSyncConfig {
    /// Time between ticks.
    pub period: Duration,
    /// Drop models of layers that no longer exist, checked every tick.
    pub evict_deleted_layers: bool,
}

impl Default for PoseSyncConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            evict_deleted_layers: false,
        }
    }
}

impl PoseSyncConfig {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_eviction(mut self, evict: bool) -> Self {
        self.evict_deleted_layers = evict;
        self
    }
}

/// What a single tick did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No document is open or focused.
    NoDocument,
    /// The document has no active layer.
    NoActiveLayer,
    /// The active layer is not a vector layer.
    NotVectorLayer,
    /// The model found nothing to correct.
    Unchanged,
    /// A correction of `bytes` bytes of SVG was merged into the layer.
    Merged { bytes: usize },
}

/// A model and the document its layer lives in.
struct Tracked<M> {
    document: DocumentId,
    model: M,
}

/// Skeleton models by layer id, plus the factory that seeds new ones from
/// the document extent.
pub struct PoseLayers<M, F> {
    models: BTreeMap<LayerId, Tracked<M>>,
    factory: F,
    evict_deleted_layers: bool,
}

impl<M, F> fmt::Debug for PoseLayers<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseLayers")
            .field("tracked", &self.models.keys().collect::<Vec<_>>())
            .field("evict_deleted_layers", &self.evict_deleted_layers)
            .finish_non_exhaustive()
    }
}

impl<M, F> PoseLayers<M, F>
where
    M: PoseModel,
    F: FnMut(Extent) -> M,
{
    pub fn new(factory: F) -> Self {
        Self {
            models: BTreeMap::new(),
            factory,
            evict_deleted_layers: false,
        }
    }

    pub fn with_eviction(mut self, evict: bool) -> Self {
        self.evict_deleted_layers = evict;
        self
    }

    /// Run one tick against the host's active document.
    pub fn update<H: Host>(&mut self, host: &mut H) -> TickOutcome {
        if self.evict_deleted_layers {
            let open = host.documents();
            self.retain_open(&open);
        }
        let Some(doc) = host.active_document() else {
            log::trace!("pose tick: no active document");
            return TickOutcome::NoDocument;
        };
        self.update_document(&mut Document::new(doc))
    }

    /// Run one tick against a specific document.
    pub fn update_document<D: HostDocument>(&mut self, doc: &mut Document<'_, D>) -> TickOutcome {
        if self.evict_deleted_layers {
            self.retain_present(doc);
        }
        let Some(layer) = doc.active_layer() else {
            log::trace!("pose tick: no active layer");
            return TickOutcome::NoActiveLayer;
        };
        if layer.kind != LayerKind::Vector {
            return TickOutcome::NotVectorLayer;
        }

        let extent = doc.extent();
        let document = doc.id();
        let factory = &mut self.factory;
        let tracked = self.models.entry(layer.id).or_insert_with(|| {
            log::debug!("tracking pose layer {} ({})", layer.id, layer.name);
            Tracked {
                document,
                model: factory(extent),
            }
        });
        let model = &mut tracked.model;

        let shapes = doc.shapes(&layer);
        match model.update(&shapes, doc.resolution()) {
            Some(svg) => {
                log::debug!("merging {} bytes of pose svg into {}", svg.len(), layer.id);
                doc.add_shapes(&layer, &svg);
                TickOutcome::Merged { bytes: svg.len() }
            }
            None => TickOutcome::Unchanged,
        }
    }

    /// Stop tracking a layer. Returns whether it was tracked.
    pub fn forget(&mut self, id: LayerId) -> bool {
        self.models.remove(&id).is_some()
    }

    /// Drop models of `doc` whose layer is no longer in it. Models of other
    /// documents are left alone. Returns how many were dropped.
    pub fn retain_present<D: HostDocument>(&mut self, doc: &Document<'_, D>) -> usize {
        let document = doc.id();
        if !self.models.values().any(|t| t.document == document) {
            return 0;
        }
        let present: Vec<LayerId> = doc.image_layers().into_iter().map(|l| l.id).collect();
        let before = self.models.len();
        self.models.retain(|id, t| t.document != document || present.contains(id));
        let removed = before - self.models.len();
        if removed > 0 {
            log::debug!("dropped {removed} pose models for deleted layers");
        }
        removed
    }

    /// Drop models of documents not in `open`. Returns how many were
    /// dropped.
    pub fn retain_open(&mut self, open: &[DocumentId]) -> usize {
        let before = self.models.len();
        self.models.retain(|_, t| open.contains(&t.document));
        let removed = before - self.models.len();
        if removed > 0 {
            log::debug!("dropped {removed} pose models for closed documents");
        }
        removed
    }

    pub fn is_tracked(&self, id: LayerId) -> bool {
        self.models.contains_key(&id)
    }

    pub fn model(&self, id: LayerId) -> Option<&M> {
        self.models.get(&id).map(|t| &t.model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Fixed-period driver for [`PoseLayers`].
///
/// The host's event loop calls [`poll`](Self::poll) with its clock as often
/// as it likes; a tick runs only once a period has elapsed. If several
/// periods were missed, a single tick runs and the schedule stays on its
/// original grid.
///
/// ```
/// use std::time::Instant;
/// use docbridge::{Extent, Host, PoseModel, PoseSyncConfig, PoseTimer, Shape};
///
/// struct Skeleton(Extent);
///
/// impl PoseModel for Skeleton {
///     fn update(&mut self, _shapes: &[Shape], _resolution: f64) -> Option<String> {
///         None
///     }
/// }
///
/// fn ui_loop<H: Host>(host: &mut H, frames: usize) {
///     let epoch = Instant::now();
///     let mut timer = PoseTimer::start(PoseSyncConfig::default(), Skeleton, epoch.elapsed());
///     for _ in 0..frames {
///         timer.poll(epoch.elapsed(), host);
///     }
/// }
/// ```
pub struct PoseTimer<M, F> {
    period: Duration,
    next_due: Duration,
    layers: PoseLayers<M, F>,
}

impl<M, F> fmt::Debug for PoseTimer<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseTimer")
            .field("period", &self.period)
            .field("next_due", &self.next_due)
            .field("layers", &self.layers)
            .finish()
    }
}

impl<M, F> PoseTimer<M, F>
where
    M: PoseModel,
    F: FnMut(Extent) -> M,
{
    /// Start the schedule at `now`. The first tick is due one period later.
    pub fn start(config: PoseSyncConfig, factory: F, now: Duration) -> Self {
        log::debug!("pose sync started, period {:?}", config.period);
        Self {
            period: config.period,
            next_due: now + config.period,
            layers: PoseLayers::new(factory).with_eviction(config.evict_deleted_layers),
        }
    }

    /// Run a tick if one is due. Returns `None` when it was too early.
    pub fn poll<H: Host>(&mut self, now: Duration, host: &mut H) -> Option<TickOutcome> {
        if now < self.next_due {
            return None;
        }
        self.next_due = next_deadline(self.next_due, now, self.period);
        Some(self.layers.update(host))
    }

    /// When the next tick is due.
    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    pub fn layers(&self) -> &PoseLayers<M, F> {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut PoseLayers<M, F> {
        &mut self.layers
    }
}

/// First grid point `due + k * period` strictly after `now`, given
/// `due <= now`. A zero period makes every poll due.
fn next_deadline(due: Duration, now: Duration, period: Duration) -> Duration {
    let period_ns = period.as_nanos();
    if period_ns == 0 {
        return now;
    }
    let behind = (now - due).as_nanos() % period_ns;
    now + nanos(period_ns - behind)
}

fn nanos(n: u128) -> Duration {
    let secs = (n / 1_000_000_000) as u64;
    let sub = (n % 1_000_000_000) as u32;
    Duration::new(secs, sub)
}
