//! Progressive page rendering engine.
//!
//! Leaves first:
//! - [`page_renderer`] rasterizes one page and inserts it into the [`flow::PageFlow`]
//! - [`visibility`] tracks which pages intersect the viewport
//! - [`scheduler`] sizes render passes (initial fill, scroll continuation, navigation)
//! - [`outline`] indexes and filters the table of contents
//! - [`navigation`] validates targets and resets the flow
//! - [`controller`] ties them together and owns the document

pub mod controller;
pub mod events;
pub mod executor;
pub mod flow;
pub mod navigation;
pub mod outline;
pub mod page_renderer;
pub mod scheduler;
pub mod state;
pub mod surface;
pub mod visibility;

pub use controller::{PreviewConfig, PreviewController};
pub use events::{DocumentInfo, ErrorKind, ErrorReport, PreviewCallbacks, PreviewResult};
pub use executor::{InlineExecutor, RenderExecutor, WorkerExecutor};
pub use outline::{NodeId, OutlineIndex, VisibleNodes};
pub use scheduler::SchedulerConfig;
pub use state::{Epoch, RenderStatus};
pub use surface::{DisplayProfile, HostEngine, RasterSurfaces, SurfaceFactory};
