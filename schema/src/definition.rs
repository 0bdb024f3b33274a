use serde::{Deserialize, Serialize};

use crate::ParmTemplateGroup;

/// Identity of the node type that a digital asset defines.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeInfo {
    pub name: String,
    pub description: String,
    pub source_path: String,
    pub source_network: Option<String>,
}

/// Description of one procedural node type ("digital asset") read from a live source.
///
/// Constructed on every request for the asset, as the live source may change between requests.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HdaDefinition {
    pub node_type: NodeTypeInfo,
    pub node_type_category: String,
    pub node_type_name: String,
    pub library_file_path: String,
    pub is_installed: bool,
    pub version: String,
    pub comment: String,
    pub description: String,
    pub icon: String,
    /// Seconds since the UNIX epoch.
    pub modification_time: i64,
    pub embedded_help: String,
    pub user_info: String,
    pub extra_info: String,
    pub min_num_inputs: u32,
    pub max_num_inputs: u32,
    pub max_num_outputs: u32,
    pub parm_template_group: ParmTemplateGroup,
}
