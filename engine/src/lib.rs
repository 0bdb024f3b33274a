//! Describes procedural asset parameters from live sources and compiled descriptors, and applies
//! submitted values back onto them.

pub mod apply;
mod archive;
pub mod cache;
mod described;
pub mod descriptor;
mod digest;
mod error;
pub mod execute;
pub mod live;
#[cfg(test)]
mod testutil;
mod tool;
pub mod workspace;

pub use apply::{
    ApplyOptions, ApplyReport, ApplyTarget, ArgumentLine, OutputSynthesis, ParmScalar, ParmValue,
    Submission, ValueEngine,
};
pub use cache::{CachedDescriptor, DescriptorCache};
pub use described::{Described, SkippedParm};
pub use descriptor::DescriptorAdapter;
pub use digest::HashDigest;
pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use execute::{DescriptorExecutor, ExecuteOptions, Execution, LiveExecutor};
pub use live::{LiveAdapter, LiveInstance, LiveSource, ManifestLiveSource};
pub use tool::{ExternalTool, ToolInvoker, ToolOutput};
pub use workspace::{RequestIdentity, RequestWorkspace};
