//! Core workflow engine for Draftwright.
//!
//! The pipeline graph, the artifact store, selection state with cascade
//! invalidation, document assembly, and the [`pipeline::Workspace`] that
//! drives generation and persists every change.

pub mod assembler;
pub mod context;
pub mod drafts;
pub mod generation;
pub mod graph;
pub mod pipeline;
pub mod selection;
pub mod state;
pub mod store;

pub use assembler::{ArticleDraft, AssemblyContext, Part, PublishedBody};
pub use drafts::DraftStore;
pub use generation::{BridgeGenerator, Generator, PartRequest, StageRequest};
pub use pipeline::{ProgressReporter, SilentProgress, Workspace};
pub use selection::{Selection, SelectionState};
pub use state::{Command, Outcome, WorkspaceState};
pub use store::{ArtifactStore, Lookup};
