//! Reads the XML parameter descriptors ("node maps") that the build tool emits for a graph file.
//!
//! Each `<Parameter>` element directly under the root element declares one exposed parameter:
//!
//! ```xml
//! <Parameter Owner="Mountain" Name="Seed" Variable="seed" Type="int" Default="3" Min="0" Max="9" />
//! ```


use std::path::Path;

use quick_xml::{Reader, events::BytesStart, events::Event};
use schema::{
    FloatParmTemplate, IntParmTemplate, ParmCommon, ParmDataType, ParmTemplate,
    ParmTemplateGroup, SchemaError, StringParmTemplate, StringParmType, ToggleParmTemplate,
};

use crate::{
    Described,
    apply::integral_float,
    described::SkipLog,
    error::{Error, IoContext, Result},
};

const PARAMETER_ELEMENT: &[u8] = b"Parameter";
const FILE_TYPE_IMAGE: &str = "Image";

/// Maps compiled descriptors onto [ParmTemplateGroup]s.
pub struct DescriptorAdapter;

impl DescriptorAdapter {
    /// Reads the descriptor at `path`. The group is named after the file stem.
    pub fn describe(path: &Path) -> Result<Described<ParmTemplateGroup>> {
        let xml = std::fs::read_to_string(path)
            .io_context(|| format!("reading descriptor {:?}", path))?;
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::describe_named(&stem, &xml)
    }

    /// Reads a descriptor from a string, producing an unnamed group.
    pub fn describe_str(xml: &str) -> Result<Described<ParmTemplateGroup>> {
        Self::describe_named("", xml)
    }

    fn describe_named(group_name: &str, xml: &str) -> Result<Described<ParmTemplateGroup>> {
        let mut skip_log = SkipLog::default();
        let mut templates = Vec::new();
        let source = format!("descriptor {group_name:?}");

        for parameter in read_parameters(xml)? {
            match parameter.to_template() {
                Ok(template) => templates.push(template),
                Err(err) => skip_log.recover(&source, err)?,
            }
        }

        let group = ParmTemplateGroup::new(group_name, group_name, templates)?;
        Ok(skip_log.finish(group))
    }
}

/// Attributes of one `<Parameter>` element.
#[derive(Debug, Default)]
struct RawParameter {
    owner: String,
    name: String,
    variable: Option<String>,
    type_: Option<String>,
    default: Option<String>,
    min: Option<String>,
    max: Option<String>,
    choices: Option<String>,
}

fn read_parameters(xml: &str) -> Result<Vec<RawParameter>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parameters = Vec::new();
    let mut depth: usize = 0;
    loop {
        let event = reader.read_event().map_err(|err| malformed(&reader, err))?;
        match event {
            Event::Start(element) => {
                if depth == 1 && element.name().as_ref() == PARAMETER_ELEMENT {
                    parameters.push(RawParameter::from_element(&element)?);
                }
                depth += 1;
            }
            Event::Empty(element) => {
                if depth == 1 && element.name().as_ref() == PARAMETER_ELEMENT {
                    parameters.push(RawParameter::from_element(&element)?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(SchemaError::Malformed {
            reason: "descriptor ended inside an element".into(),
        }
        .into());
    }
    Ok(parameters)
}

fn malformed(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> Error {
    SchemaError::Malformed {
        reason: format!("at byte {}: {err}", reader.buffer_position()),
    }
    .into()
}

impl RawParameter {
    fn from_element(element: &BytesStart) -> Result<Self> {
        let mut raw = RawParameter::default();
        for attr in element.attributes() {
            let attr = attr.map_err(|err| SchemaError::Malformed {
                reason: format!("bad Parameter attribute: {err}"),
            })?;
            let value = attr
                .unescape_value()
                .map_err(|err| SchemaError::Malformed {
                    reason: format!("bad Parameter attribute value: {err}"),
                })?
                .into_owned();
            match attr.key.as_ref() {
                b"Owner" => raw.owner = value,
                b"Name" => raw.name = value,
                b"Variable" => raw.variable = Some(value),
                b"Type" => raw.type_ = Some(value),
                b"Default" => raw.default = Some(value),
                b"Min" => raw.min = Some(value),
                b"Max" => raw.max = Some(value),
                b"Choices" => raw.choices = Some(value),
                _ => {}
            }
        }
        Ok(raw)
    }

    fn label(&self) -> String {
        format!("{}:{}", self.owner, self.name)
    }

    fn to_template(&self) -> Result<ParmTemplate> {
        let label = self.label();
        let name = self.variable.clone().ok_or(SchemaError::MissingField {
            parm: label.clone(),
            field: "Variable",
        })?;
        let type_ = self.type_.as_deref().unwrap_or_default();

        let template: ParmTemplate = match type_ {
            "int" => {
                let mut t = IntParmTemplate::new(ParmCommon::new(&name, label, ParmDataType::Int));
                t.default_value = vec![parse_int(&name, "Default", self.default.as_deref())?];
                (t.min_value, t.min_is_strict) = int_bound(&name, "Min", self.min.as_deref())?;
                (t.max_value, t.max_is_strict) = int_bound(&name, "Max", self.max.as_deref())?;
                t.into()
            }
            "choice" => {
                let mut t = IntParmTemplate::new(ParmCommon::new(&name, label, ParmDataType::Int));
                t.default_value = vec![parse_int(&name, "Default", self.default.as_deref())?];
                t.menu_labels = split_choices(self.choices.as_deref());
                t.menu_items = (0..t.menu_labels.len() as i64).collect();
                if let Some(&last) = t.menu_items.last() {
                    t.min_value = 0;
                    t.max_value = last;
                    t.min_is_strict = true;
                    t.max_is_strict = true;
                }
                t.into()
            }
            "double" => {
                let mut t =
                    FloatParmTemplate::new(ParmCommon::new(&name, label, ParmDataType::Float));
                t.default_value = vec![parse_float(&name, "Default", self.default.as_deref())?];
                (t.min_value, t.min_is_strict) = float_bound(&name, "Min", self.min.as_deref())?;
                (t.max_value, t.max_is_strict) = float_bound(&name, "Max", self.max.as_deref())?;
                t.into()
            }
            "bool" => {
                let mut t =
                    ToggleParmTemplate::new(ParmCommon::new(&name, label, ParmDataType::Toggle));
                t.default_value = vec![parse_bool(&name, self.default.as_deref())?];
                t.into()
            }
            "in" | "out" => {
                let mut common = ParmCommon::new(&name, label, ParmDataType::String);
                // Outputs are written by the build tool, never supplied by callers.
                common.is_hidden = type_ == "out";
                let mut t = StringParmTemplate::new(common);
                t.string_type = StringParmType::FileReference;
                t.file_type = FILE_TYPE_IMAGE.to_owned();
                t.default_value = vec![self.default.clone().unwrap_or_default()];
                t.into()
            }
            other => return Err(Error::unsupported(&name, other)),
        };
        Ok(template)
    }
}

/// Splits a comma separated list of choices, keeping empty entries so that indices line up with
/// the build tool's.
fn split_choices(choices: Option<&str>) -> Vec<String> {
    let Some(choices) = choices.filter(|choices| !choices.trim().is_empty()) else {
        return Vec::new();
    };
    choices
        .split(',')
        .map(|choice| choice.trim().to_owned())
        .collect()
}

fn invalid(name: &str, field: &'static str, value: &str, expected: &'static str) -> SchemaError {
    SchemaError::InvalidField {
        parm: name.to_owned(),
        field,
        value: value.to_owned(),
        expected,
    }
}

fn parse_int(name: &str, field: &'static str, value: Option<&str>) -> Result<i64, SchemaError> {
    let Some(value) = value.map(str::trim) else {
        return Ok(0);
    };
    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(parsed);
    }
    // The build tool sometimes writes integral values in floating point form.
    value
        .parse::<f64>()
        .ok()
        .and_then(integral_float)
        .ok_or_else(|| invalid(name, field, value, "an integer"))
}

fn parse_float(name: &str, field: &'static str, value: Option<&str>) -> Result<f64, SchemaError> {
    let Some(value) = value.map(str::trim) else {
        return Ok(0.0);
    };
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(invalid(name, field, value, "a number")),
    }
}

fn parse_bool(name: &str, value: Option<&str>) -> Result<bool, SchemaError> {
    let Some(value) = value.map(str::trim) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(name, "Default", value, "a boolean")),
    }
}

fn int_bound(
    name: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<(i64, bool), SchemaError> {
    Ok((parse_int(name, field, value)?, value.is_some()))
}

fn float_bound(
    name: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<(f64, bool), SchemaError> {
    Ok((parse_float(name, field, value)?, value.is_some()))
}
