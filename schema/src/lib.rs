//! Uniform, serializable description of procedural asset parameters.
//!
//! Parameter definitions are read from two structurally different sources (live asset definitions
//! and compiled descriptor files) and normalised into the [ParmTemplate] model defined here. The
//! JSON projection produced by `serde` is the wire format returned to callers.

mod definition;
mod enum_conversion;
mod error;
mod group;
mod template;

pub use definition::{HdaDefinition, NodeTypeInfo};
pub use error::SchemaError;
pub use group::ParmTemplateGroup;
pub use template::{
    FloatParmTemplate, IntParmTemplate, MenuParmTemplate, ParmCommon, ParmDataType, ParmTemplate,
    ParmTemplateType, StringParmTemplate, StringParmType, ToggleParmTemplate,
};
