//! Parameter templates: typed descriptions of a single configurable input slot (not its value).

#[cfg(any(test, feature = "testing"))]
mod test_defaults;

use serde::{Deserialize, Serialize};

use crate::{SchemaError, impl_enum_conversions};

/// Presentation kind of a parameter template, as reported in the `type` field.
///
/// [ParmTemplateType::Button] and [ParmTemplateType::Ramp] are recognised kinds, but have no
/// [ParmTemplate] variant.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum ParmTemplateType {
    Int,
    Float,
    String,
    Toggle,
    Menu,
    Button,
    FolderSet,
    Folder,
    Separator,
    Label,
    Ramp,
}

/// Wire-level data type of a parameter's values, distinct from its presentation kind.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum ParmDataType {
    #[default]
    Int,
    Float,
    String,
    Toggle,
    Ramp,
}

/// Semantics of a string parameter's value.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum StringParmType {
    #[default]
    Regular,
    FileReference,
}

/// Fields shared by every kind of parameter template.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParmCommon {
    /// Unique name within the owning [crate::ParmTemplateGroup].
    pub name: String,
    pub label: String,
    pub data_type: ParmDataType,
    /// Number of scalar values that one entry of this parameter carries.
    pub num_components: usize,
    pub look: String,
    pub help: String,
    pub is_hidden: bool,
    pub is_label_hidden: bool,
    pub joins_with_next: bool,
}

impl ParmCommon {
    pub const DEFAULT_LOOK: &str = "Regular";

    /// Creates visible, single component common fields.
    pub fn new(name: impl Into<String>, label: impl Into<String>, data_type: ParmDataType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            data_type,
            num_components: 1,
            look: Self::DEFAULT_LOOK.to_owned(),
            help: String::new(),
            is_hidden: false,
            is_label_hidden: false,
            joins_with_next: false,
        }
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::MissingField {
                parm: self.label.clone(),
                field: "name",
            });
        }
        if self.num_components < 1 {
            return Err(SchemaError::invalid(
                &self.name,
                "numComponents",
                self.num_components,
                "at least 1",
            ));
        }
        Ok(())
    }

    fn validate_defaults<T>(&self, defaults: &[T]) -> Result<(), SchemaError>
    where
        T: std::fmt::Debug,
    {
        if defaults.len() != self.num_components {
            return Err(SchemaError::invalid(
                &self.name,
                "defaultValue",
                defaults,
                "a value per component",
            ));
        }
        Ok(())
    }

    fn validate_menu<T>(&self, items: &[T], labels: &[String]) -> Result<(), SchemaError> {
        if items.len() != labels.len() {
            return Err(SchemaError::invalid(
                &self.name,
                "menuLabels",
                labels,
                "a label per menu item",
            ));
        }
        Ok(())
    }
}

/// Integer parameter, optionally presented as an enumeration of `(index, label)` choices.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntParmTemplate {
    #[serde(flatten)]
    pub common: ParmCommon,
    pub default_value: Vec<i64>,
    pub min_value: i64,
    pub max_value: i64,
    pub min_is_strict: bool,
    pub max_is_strict: bool,
    pub menu_items: Vec<i64>,
    pub menu_labels: Vec<String>,
}

impl IntParmTemplate {
    /// Creates a template with a single zero default and no bounds.
    pub fn new(common: ParmCommon) -> Self {
        let default_value = vec![0; common.num_components];
        Self {
            common,
            default_value,
            min_value: 0,
            max_value: 0,
            min_is_strict: false,
            max_is_strict: false,
            menu_items: Vec::new(),
            menu_labels: Vec::new(),
        }
    }

    /// Returns the enumeration choices as `(index, label)` pairs. Empty when the parameter is not
    /// an enumeration.
    pub fn choices(&self) -> impl Iterator<Item = (i64, &str)> {
        self.menu_items
            .iter()
            .copied()
            .zip(self.menu_labels.iter().map(String::as_str))
    }

    fn validate(&self) -> Result<(), SchemaError> {
        self.common.validate()?;
        self.common.validate_defaults(&self.default_value)?;
        self.common
            .validate_menu(&self.menu_items, &self.menu_labels)?;
        if self.min_is_strict && self.max_is_strict && self.min_value > self.max_value {
            return Err(SchemaError::invalid(
                &self.common.name,
                "maxValue",
                self.max_value,
                "greater than or equal to minValue",
            ));
        }
        Ok(())
    }
}

/// Floating point parameter.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatParmTemplate {
    #[serde(flatten)]
    pub common: ParmCommon,
    pub default_value: Vec<f64>,
    pub min_value: f64,
    pub max_value: f64,
    pub min_is_strict: bool,
    pub max_is_strict: bool,
}

impl FloatParmTemplate {
    pub fn new(common: ParmCommon) -> Self {
        let default_value = vec![0.0; common.num_components];
        Self {
            common,
            default_value,
            min_value: 0.0,
            max_value: 0.0,
            min_is_strict: false,
            max_is_strict: false,
        }
    }

    fn validate(&self) -> Result<(), SchemaError> {
        self.common.validate()?;
        self.common.validate_defaults(&self.default_value)?;
        if self.min_is_strict && self.max_is_strict && self.min_value > self.max_value {
            return Err(SchemaError::invalid(
                &self.common.name,
                "maxValue",
                self.max_value,
                "greater than or equal to minValue",
            ));
        }
        Ok(())
    }
}

/// String parameter, which may refer to a file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringParmTemplate {
    #[serde(flatten)]
    pub common: ParmCommon,
    pub default_value: Vec<String>,
    pub string_type: StringParmType,
    /// Free-form file category, e.g. "Image". Empty for regular strings.
    pub file_type: String,
    pub menu_items: Vec<String>,
    pub menu_labels: Vec<String>,
}

impl StringParmTemplate {
    pub fn new(common: ParmCommon) -> Self {
        let default_value = vec![String::new(); common.num_components];
        Self {
            common,
            default_value,
            string_type: StringParmType::Regular,
            file_type: String::new(),
            menu_items: Vec::new(),
            menu_labels: Vec::new(),
        }
    }

    pub fn is_file_reference(&self) -> bool {
        self.string_type == StringParmType::FileReference
    }

    fn validate(&self) -> Result<(), SchemaError> {
        self.common.validate()?;
        self.common.validate_defaults(&self.default_value)?;
        self.common
            .validate_menu(&self.menu_items, &self.menu_labels)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleParmTemplate {
    #[serde(flatten)]
    pub common: ParmCommon,
    pub default_value: Vec<bool>,
}

impl ToggleParmTemplate {
    pub fn new(common: ParmCommon) -> Self {
        let default_value = vec![false; common.num_components];
        Self {
            common,
            default_value,
        }
    }

    fn validate(&self) -> Result<(), SchemaError> {
        self.common.validate()?;
        self.common.validate_defaults(&self.default_value)
    }
}

/// Menu of string tokens, selected by index.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuParmTemplate {
    #[serde(flatten)]
    pub common: ParmCommon,
    pub default_value: i64,
    pub default_value_as_string: String,
    pub menu_items: Vec<String>,
    pub menu_labels: Vec<String>,
    pub menu_type: String,
    /// Exclusive menu, as opposed to a mini menu of suggestions.
    pub is_menu: bool,
    pub is_button_strip: bool,
    pub is_icon_strip: bool,
}

impl MenuParmTemplate {
    pub fn new(common: ParmCommon) -> Self {
        Self {
            common,
            default_value: 0,
            default_value_as_string: String::new(),
            menu_items: Vec::new(),
            menu_labels: Vec::new(),
            menu_type: "Normal".to_owned(),
            is_menu: true,
            is_button_strip: false,
            is_icon_strip: false,
        }
    }

    /// Returns the menu choices as `(index, token, label)`.
    pub fn choices(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.menu_items
            .iter()
            .zip(self.menu_labels.iter())
            .enumerate()
            .map(|(index, (item, label))| (index, item.as_str(), label.as_str()))
    }

    fn validate(&self) -> Result<(), SchemaError> {
        self.common.validate()?;
        self.common
            .validate_menu(&self.menu_items, &self.menu_labels)?;
        let in_range = usize::try_from(self.default_value)
            .map(|index| index < self.menu_items.len())
            .unwrap_or(false);
        if !self.menu_items.is_empty() && !in_range {
            return Err(SchemaError::invalid(
                &self.common.name,
                "defaultValue",
                self.default_value,
                "the index of a menu item",
            ));
        }
        Ok(())
    }
}

/// A parameter template of any supported kind.
///
/// Serialises to a flat JSON object: the `type` discriminant, the [ParmCommon] fields and the
/// variant's own fields.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ParmTemplate {
    Int(IntParmTemplate),
    Float(FloatParmTemplate),
    String(StringParmTemplate),
    Toggle(ToggleParmTemplate),
    Menu(MenuParmTemplate),
    FolderSet(ParmCommon),
    Folder(ParmCommon),
    Separator(ParmCommon),
    Label(ParmCommon),
}

impl_enum_conversions!(ParmTemplate, Int, IntParmTemplate);
impl_enum_conversions!(ParmTemplate, Float, FloatParmTemplate);
impl_enum_conversions!(ParmTemplate, String, StringParmTemplate);
impl_enum_conversions!(ParmTemplate, Toggle, ToggleParmTemplate);
impl_enum_conversions!(ParmTemplate, Menu, MenuParmTemplate);

impl ParmTemplate {
    /// Creates a layout entry (folder, separator, label) that carries no values.
    ///
    /// Returns [None] if `template_type` is not a layout kind.
    pub fn layout(template_type: ParmTemplateType, common: ParmCommon) -> Option<Self> {
        use ParmTemplateType::*;
        match template_type {
            FolderSet => Some(ParmTemplate::FolderSet(common)),
            Folder => Some(ParmTemplate::Folder(common)),
            Separator => Some(ParmTemplate::Separator(common)),
            Label => Some(ParmTemplate::Label(common)),
            Int | Float | String | Toggle | Menu | Button | Ramp => None,
        }
    }

    pub fn template_type(&self) -> ParmTemplateType {
        match self {
            ParmTemplate::Int(_) => ParmTemplateType::Int,
            ParmTemplate::Float(_) => ParmTemplateType::Float,
            ParmTemplate::String(_) => ParmTemplateType::String,
            ParmTemplate::Toggle(_) => ParmTemplateType::Toggle,
            ParmTemplate::Menu(_) => ParmTemplateType::Menu,
            ParmTemplate::FolderSet(_) => ParmTemplateType::FolderSet,
            ParmTemplate::Folder(_) => ParmTemplateType::Folder,
            ParmTemplate::Separator(_) => ParmTemplateType::Separator,
            ParmTemplate::Label(_) => ParmTemplateType::Label,
        }
    }

    pub fn common(&self) -> &ParmCommon {
        match self {
            ParmTemplate::Int(t) => &t.common,
            ParmTemplate::Float(t) => &t.common,
            ParmTemplate::String(t) => &t.common,
            ParmTemplate::Toggle(t) => &t.common,
            ParmTemplate::Menu(t) => &t.common,
            ParmTemplate::FolderSet(common)
            | ParmTemplate::Folder(common)
            | ParmTemplate::Separator(common)
            | ParmTemplate::Label(common) => common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn num_components(&self) -> usize {
        self.common().num_components
    }

    pub fn is_hidden(&self) -> bool {
        self.common().is_hidden
    }

    /// True for folder, separator and label entries, which take no values.
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            ParmTemplate::FolderSet(_)
                | ParmTemplate::Folder(_)
                | ParmTemplate::Separator(_)
                | ParmTemplate::Label(_)
        )
    }

    /// True for hidden file references, which name outputs of an external process rather than
    /// user-editable inputs.
    pub fn is_output_file(&self) -> bool {
        match self {
            ParmTemplate::String(t) => t.common.is_hidden && t.is_file_reference(),
            _ => false,
        }
    }

    /// Checks the internal consistency of the template.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            ParmTemplate::Int(t) => t.validate(),
            ParmTemplate::Float(t) => t.validate(),
            ParmTemplate::String(t) => t.validate(),
            ParmTemplate::Toggle(t) => t.validate(),
            ParmTemplate::Menu(t) => t.validate(),
            ParmTemplate::FolderSet(common)
            | ParmTemplate::Folder(common)
            | ParmTemplate::Separator(common)
            | ParmTemplate::Label(common) => common.validate(),
        }
    }
}
