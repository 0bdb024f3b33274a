
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{ParmTemplate, SchemaError};

/// Ordered, uniquely named set of [ParmTemplate]s.
///
/// Order is significant: it is display order, and for folders, nesting order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedGroup")]
pub struct ParmTemplateGroup {
    name: String,
    label: String,
    parm_templates: Vec<ParmTemplate>,
}

impl ParmTemplateGroup {
    /// Creates a group, validating each template and the uniqueness of their names.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        parm_templates: Vec<ParmTemplate>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();

        let mut seen: HashSet<&str> = HashSet::with_capacity(parm_templates.len());
        for template in &parm_templates {
            template.validate()?;
            if !seen.insert(template.name()) {
                return Err(SchemaError::DuplicateName {
                    group: name,
                    name: template.name().to_owned(),
                });
            }
        }

        Ok(Self {
            name,
            label: label.into(),
            parm_templates,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parm_templates(&self) -> &[ParmTemplate] {
        &self.parm_templates
    }

    pub fn len(&self) -> usize {
        self.parm_templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parm_templates.is_empty()
    }

    /// Finds the template with the given name.
    pub fn find(&self, name: &str) -> Option<&ParmTemplate> {
        self.parm_templates.iter().find(|t| t.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParmTemplate> {
        self.parm_templates.iter()
    }
}

impl<'a> IntoIterator for &'a ParmTemplateGroup {
    type Item = &'a ParmTemplate;
    type IntoIter = std::slice::Iter<'a, ParmTemplate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Deserialised form of [ParmTemplateGroup] prior to validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedGroup {
    name: String,
    label: String,
    parm_templates: Vec<ParmTemplate>,
}

impl TryFrom<UncheckedGroup> for ParmTemplateGroup {
    type Error = SchemaError;

    fn try_from(value: UncheckedGroup) -> Result<Self, Self::Error> {
        Self::new(value.name, value.label, value.parm_templates)
    }
}
