//! 🫐欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, TriIdx, Vec3d};

pub use crate::data::phantom;
pub use crate::data::VolumeGrid;

pub use crate::surface::{
    extract_label_surface, sanitize, SanitizeParams, SanitizeReport, TriMesh,
};

pub use crate::distro::{
    compare_descriptors, sample_distribution, ComparisonResult, DistroModel, Metric, NormBasis,
    SampleParams, ShapeDescriptor,
};

pub use crate::error::{
    ConfigurationError, GeometryError, IncompatibleDescriptorError, PipelineError, PipelineResult,
};

pub use crate::pipeline::{PipelineConfig, ShapePipeline};

pub use crate::consts::{
    label::BACKGROUND, DEFAULT_BIN_COUNT, DEFAULT_SAMPLE_PAIRS,
};
