// src/lib.rs - Library interface for the MLI measurement engine

pub mod config;
pub mod errors;
pub mod grid;
pub mod image_io;
pub mod intercepts;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod preprocessing;
pub mod preview;
pub mod segmentation;
pub mod statistics;
pub mod storage;
pub mod validation;
pub mod wire;

// Re-export commonly used types and functions
pub use config::{AppConfig, TissuePolarity};
pub use errors::{ErrorKind, MliError, Result};
pub use image_io::{ImageInput, load_input, get_image_files_in_dir};
pub use validation::{AnalysisConfig, RawAnalysisConfig, RawValue};

pub use pipeline::{
    analyze_batch,
    analyze_image,
    full_analysis,
    AnalysisImage,
    AnalysisOptions,
    AnalysisResult,
    BatchOutcome,
    ImageFailure,
};

pub use preview::{run_preview, PreviewOutcome, PreviewScheduler, PreviewTicket};

pub use grid::{plan_grid, Grid, GridLine, Orientation};
pub use intercepts::{count_grid, count_intercepts, LineIntercepts};
pub use segmentation::{segment, Segmentation, TissueMask};
pub use statistics::{average_mli, LineResult};
pub use overlay::{render_overlays, Overlays};

pub use storage::ResultStore;
pub use wire::{AnalysisImageRecord, AnalysisResultRecord, BatchRecord};
