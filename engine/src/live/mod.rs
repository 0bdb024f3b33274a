//! Live asset sources: node type definitions introspected at request time, and working instances
//! of them that accept parameter values and cook outputs.

pub mod manifest;
#[cfg(test)]
mod tests;

use std::{path::Path, str::FromStr};

use schema::{
    FloatParmTemplate, HdaDefinition, IntParmTemplate, MenuParmTemplate, NodeTypeInfo,
    ParmCommon, ParmDataType, ParmTemplate, ParmTemplateGroup, ParmTemplateType, SchemaError,
    StringParmTemplate, StringParmType, ToggleParmTemplate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Described,
    apply::{ParmValue, integral_float},
    described::SkipLog,
    error::{Error, Result},
};

pub use manifest::ManifestLiveSource;

/// Required trait for a host that holds procedural node type definitions.
///
/// Failures are opaque to this crate, and are reported as [Error::LiveSource].
pub trait LiveSource {
    /// Reads the current definition. Called on every request, as it may change between them.
    fn definition(&self) -> anyhow::Result<LiveDefinition>;

    fn is_installed(&self) -> bool;

    fn install(&self) -> anyhow::Result<()>;

    /// Re-reads an installed definition from its library.
    fn reload(&self) -> anyhow::Result<()>;

    /// Creates a scratch instance of the node type, which is discarded when dropped.
    fn create_working_instance(&self) -> anyhow::Result<Box<dyn LiveInstance>>;
}

/// A scratch instance of a live node type.
pub trait LiveInstance {
    fn set_parameter_value(&mut self, name: &str, value: &ParmValue) -> anyhow::Result<()>;

    fn set_parameter_file(&mut self, name: &str, path: &Path) -> anyhow::Result<()>;

    /// Evaluates the instance, writing its outputs into `output_dir`.
    fn cook(&mut self, output_dir: &Path) -> anyhow::Result<()>;
}

/// Node type definition as reported by a live source, before normalisation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveDefinition {
    pub node_type: NodeTypeInfo,
    pub node_type_category: String,
    pub node_type_name: String,
    pub library_file_path: String,
    pub version: String,
    pub comment: String,
    pub description: String,
    pub icon: String,
    pub modification_time: i64,
    pub embedded_help: String,
    pub user_info: String,
    pub extra_info: String,
    pub min_num_inputs: u32,
    pub max_num_inputs: u32,
    pub max_num_outputs: u32,
    pub parm_template_group: LiveParmGroup,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveParmGroup {
    pub name: String,
    pub label: String,
    pub entries: Vec<LiveParmEntry>,
}

/// One loosely typed parameter entry. Which fields are meaningful depends on `kind`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveParmEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub label: String,
    pub data_type: Option<String>,
    pub num_components: Option<usize>,
    pub look: Option<String>,
    pub help: String,
    pub is_hidden: bool,
    pub is_label_hidden: bool,
    pub joins_with_next: bool,
    pub default_value: Value,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    pub min_is_strict: bool,
    pub max_is_strict: bool,
    pub menu_items: Vec<Value>,
    pub menu_labels: Vec<String>,
    pub string_type: Option<String>,
    pub file_type: String,
    pub default_value_as_string: String,
    pub menu_type: Option<String>,
    pub is_menu: Option<bool>,
    pub is_button_strip: bool,
    pub is_icon_strip: bool,
}

/// Maps live definitions onto [HdaDefinition]s.
pub struct LiveAdapter;

impl LiveAdapter {
    /// Describes the current definition of `source`.
    ///
    /// Entries of kinds the model cannot represent are logged and skipped. Malformed entries fail
    /// the whole call.
    pub fn describe(source: &dyn LiveSource) -> Result<Described<HdaDefinition>> {
        let definition = source.definition().map_err(Error::LiveSource)?;
        let is_installed = source.is_installed();

        let mut skip_log = SkipLog::default();
        let mut templates = Vec::with_capacity(definition.parm_template_group.entries.len());
        let source_desc = format!("asset {:?}", definition.node_type_name);
        for entry in &definition.parm_template_group.entries {
            match entry.to_template() {
                Ok(template) => templates.push(template),
                Err(err) => skip_log.recover(&source_desc, err)?,
            }
        }

        let LiveDefinition {
            node_type,
            node_type_category,
            node_type_name,
            library_file_path,
            version,
            comment,
            description,
            icon,
            modification_time,
            embedded_help,
            user_info,
            extra_info,
            min_num_inputs,
            max_num_inputs,
            max_num_outputs,
            parm_template_group,
        } = definition;

        Ok(skip_log.finish(HdaDefinition {
            node_type,
            node_type_category,
            node_type_name,
            library_file_path,
            is_installed,
            version,
            comment,
            description,
            icon,
            modification_time,
            embedded_help,
            user_info,
            extra_info,
            min_num_inputs,
            max_num_inputs,
            max_num_outputs,
            parm_template_group: ParmTemplateGroup::new(
                parm_template_group.name,
                parm_template_group.label,
                templates,
            )?,
        }))
    }
}

impl LiveParmEntry {
    fn to_template(&self) -> Result<ParmTemplate> {
        let template_type = ParmTemplateType::from_str(&self.kind)
            .map_err(|_| Error::unsupported(&self.name, &self.kind))?;

        use ParmTemplateType::*;
        let template: ParmTemplate = match template_type {
            Int => {
                let mut t = IntParmTemplate::new(self.common(ParmDataType::Int)?);
                t.default_value = self.defaults("defaultValue", as_int)?;
                t.min_value = self.bound("minValue", &self.min_value, as_int)?;
                t.max_value = self.bound("maxValue", &self.max_value, as_int)?;
                t.min_is_strict = self.min_is_strict;
                t.max_is_strict = self.max_is_strict;
                t.menu_items = self.items("menuItems", as_int)?;
                t.menu_labels = self.menu_labels.clone();
                t.into()
            }
            Float => {
                let mut t = FloatParmTemplate::new(self.common(ParmDataType::Float)?);
                t.default_value = self.defaults("defaultValue", as_float)?;
                t.min_value = self.bound("minValue", &self.min_value, as_float)?;
                t.max_value = self.bound("maxValue", &self.max_value, as_float)?;
                t.min_is_strict = self.min_is_strict;
                t.max_is_strict = self.max_is_strict;
                t.into()
            }
            String => {
                let mut t = StringParmTemplate::new(self.common(ParmDataType::String)?);
                t.default_value = self.defaults("defaultValue", as_string)?;
                t.string_type = match &self.string_type {
                    Some(s) => StringParmType::from_str(s)
                        .map_err(|_| self.invalid("stringType", s, "a string parameter type"))?,
                    None => StringParmType::Regular,
                };
                t.file_type = self.file_type.clone();
                t.menu_items = self.items("menuItems", as_string)?;
                t.menu_labels = self.menu_labels.clone();
                t.into()
            }
            Toggle => {
                let mut t = ToggleParmTemplate::new(self.common(ParmDataType::Toggle)?);
                t.default_value = self.defaults("defaultValue", as_bool)?;
                t.into()
            }
            Menu => {
                let mut t = MenuParmTemplate::new(self.common(ParmDataType::Int)?);
                t.default_value = match &self.default_value {
                    Value::Null => 0,
                    value => as_int(value).ok_or_else(|| {
                        self.invalid("defaultValue", value, "a menu item index")
                    })?,
                };
                t.default_value_as_string = self.default_value_as_string.clone();
                t.menu_items = self.items("menuItems", as_string)?;
                t.menu_labels = self.menu_labels.clone();
                if let Some(menu_type) = &self.menu_type {
                    t.menu_type = menu_type.clone();
                }
                t.is_menu = self.is_menu.unwrap_or(true);
                t.is_button_strip = self.is_button_strip;
                t.is_icon_strip = self.is_icon_strip;
                t.into()
            }
            FolderSet | Folder | Separator | Label => {
                ParmTemplate::layout(template_type, self.common(ParmDataType::Int)?)
                    .ok_or_else(|| Error::unsupported_type(&self.name, template_type))?
            }
            Button | Ramp => return Err(Error::unsupported_type(&self.name, template_type)),
        };
        Ok(template)
    }

    fn common(&self, default_data_type: ParmDataType) -> Result<ParmCommon, SchemaError> {
        let data_type = match &self.data_type {
            Some(s) => ParmDataType::from_str(s)
                .map_err(|_| self.invalid("dataType", s, "a parameter data type"))?,
            None => default_data_type,
        };
        let mut common = ParmCommon::new(&self.name, &self.label, data_type);
        common.num_components = self.num_components.unwrap_or(1);
        if let Some(look) = &self.look {
            common.look = look.clone();
        }
        common.help = self.help.clone();
        common.is_hidden = self.is_hidden;
        common.is_label_hidden = self.is_label_hidden;
        common.joins_with_next = self.joins_with_next;
        Ok(common)
    }

    /// Reads the per-component default values. A bare scalar is a single component, and an
    /// absent default is zero for every component.
    fn defaults<T>(
        &self,
        field: &'static str,
        convert: fn(&Value) -> Option<T>,
    ) -> Result<Vec<T>, SchemaError>
    where
        T: Default + Clone,
    {
        match &self.default_value {
            Value::Null => Ok(vec![T::default(); self.num_components.unwrap_or(1)]),
            Value::Array(values) => values
                .iter()
                .map(|value| convert(value).ok_or_else(|| self.invalid(field, value, "a default")))
                .collect(),
            value => Ok(vec![
                convert(value).ok_or_else(|| self.invalid(field, value, "a default"))?,
            ]),
        }
    }

    fn bound<T>(
        &self,
        field: &'static str,
        value: &Option<Value>,
        convert: fn(&Value) -> Option<T>,
    ) -> Result<T, SchemaError>
    where
        T: Default,
    {
        match value {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => convert(value).ok_or_else(|| self.invalid(field, value, "a number")),
        }
    }

    fn items<T>(
        &self,
        field: &'static str,
        convert: fn(&Value) -> Option<T>,
    ) -> Result<Vec<T>, SchemaError> {
        self.menu_items
            .iter()
            .map(|value| convert(value).ok_or_else(|| self.invalid(field, value, "a menu item")))
            .collect()
    }

    fn invalid(
        &self,
        field: &'static str,
        value: impl std::fmt::Display,
        expected: &'static str,
    ) -> SchemaError {
        SchemaError::InvalidField {
            parm: self.name.clone(),
            field,
            value: value.to_string(),
            expected,
        }
    }
}

fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().and_then(integral_float))
}

fn as_float(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}
