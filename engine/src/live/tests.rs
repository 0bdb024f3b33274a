use anyhow::Result;
use googletest::prelude::*;
use serde_json::json;

use super::*;
use crate::{ErrorKind, SkippedParm};

struct StaticSource {
    definition: serde_json::Value,
}

impl LiveSource for StaticSource {
    fn definition(&self) -> anyhow::Result<LiveDefinition> {
        Ok(serde_json::from_value(self.definition.clone())?)
    }

    fn is_installed(&self) -> bool {
        true
    }

    fn install(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn reload(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_working_instance(&self) -> anyhow::Result<Box<dyn LiveInstance>> {
        anyhow::bail!("not supported by StaticSource")
    }
}

fn source_with_entries(entries: serde_json::Value) -> StaticSource {
    StaticSource {
        definition: json!({
            "nodeType": {
                "name": "rocks",
                "description": "Rock Scatter",
                "sourcePath": "/library/rocks.hda",
            },
            "nodeTypeCategory": "Sop",
            "nodeTypeName": "rocks",
            "version": "2.1",
            "parmTemplateGroup": {"name": "rocks", "label": "Rocks", "entries": entries},
        }),
    }
}

#[gtest]
fn test_describes_metadata_and_entries_in_order() -> Result<()> {
    let source = source_with_entries(json!([
        {"type": "Folder", "name": "main", "label": "Main"},
        {"type": "Int", "name": "count", "label": "Count", "defaultValue": [10],
         "minValue": 1, "maxValue": 100, "minIsStrict": true},
        {"type": "Float", "name": "size", "label": "Size", "numComponents": 3,
         "defaultValue": [1.0, 1.0, 1.0]},
        {"type": "String", "name": "texture", "label": "Texture",
         "stringType": "FileReference", "fileType": "Image"},
        {"type": "Toggle", "name": "enable", "label": "Enable", "defaultValue": true},
        {"type": "Menu", "name": "shape", "label": "Shape", "defaultValue": 1,
         "menuItems": ["round", "sharp"], "menuLabels": ["Round", "Sharp"]},
        {"type": "Separator", "name": "sep1"},
    ]));

    let described = LiveAdapter::describe(&source)?;
    let definition = &described.value;

    expect_that!(definition.node_type_name, eq("rocks"));
    expect_that!(definition.node_type.description, eq("Rock Scatter"));
    expect_that!(definition.is_installed, eq(true));
    expect_that!(definition.version, eq("2.1"));
    expect_that!(
        definition
            .parm_template_group
            .iter()
            .map(|t| (t.name(), t.template_type()))
            .collect::<Vec<_>>(),
        eq(&vec![
            ("main", ParmTemplateType::Folder),
            ("count", ParmTemplateType::Int),
            ("size", ParmTemplateType::Float),
            ("texture", ParmTemplateType::String),
            ("enable", ParmTemplateType::Toggle),
            ("shape", ParmTemplateType::Menu),
            ("sep1", ParmTemplateType::Separator),
        ])
    );

    let count: &IntParmTemplate = definition
        .parm_template_group
        .find("count")
        .expect("count")
        .try_into()?;
    expect_that!(count.default_value, eq(&vec![10]));
    expect_that!((count.min_value, count.max_value), eq((1, 100)));
    expect_that!(count.min_is_strict, eq(true));

    let size: &FloatParmTemplate = definition
        .parm_template_group
        .find("size")
        .expect("size")
        .try_into()?;
    expect_that!(size.common.num_components, eq(3));

    let shape: &MenuParmTemplate = definition
        .parm_template_group
        .find("shape")
        .expect("shape")
        .try_into()?;
    expect_that!(
        shape.choices().collect::<Vec<_>>(),
        eq(&vec![(0, "round", "Round"), (1, "sharp", "Sharp")])
    );
    Ok(())
}

#[gtest]
#[test_log::test]
fn test_unsupported_kinds_are_skipped() -> Result<()> {
    let source = source_with_entries(json!([
        {"type": "Ramp", "name": "falloff"},
        {"type": "Int", "name": "count"},
        {"type": "Button", "name": "reset"},
        {"type": "Hologram", "name": "mystery"},
    ]));

    let described = LiveAdapter::describe(&source)?;

    expect_that!(described.value.parm_template_group.len(), eq(1));
    expect_that!(
        described.skipped,
        eq(&vec![
            SkippedParm {
                name: "falloff".into(),
                kind: "Ramp".into()
            },
            SkippedParm {
                name: "reset".into(),
                kind: "Button".into()
            },
            SkippedParm {
                name: "mystery".into(),
                kind: "Hologram".into()
            },
        ])
    );
    Ok(())
}

#[gtest]
fn test_wrong_default_arity_is_schema_error() {
    let source = source_with_entries(json!([
        {"type": "Float", "name": "size", "numComponents": 3, "defaultValue": [1.0]},
    ]));

    let err = LiveAdapter::describe(&source).unwrap_err();

    expect_that!(err.kind(), eq(ErrorKind::Schema));
    expect_that!(err.subject(), some(eq("size.defaultValue")));
}

#[gtest]
fn test_non_numeric_bound_is_schema_error() {
    let source = source_with_entries(json!([
        {"type": "Int", "name": "count", "maxValue": "lots"},
    ]));

    let err = LiveAdapter::describe(&source).unwrap_err();

    expect_that!(err.kind(), eq(ErrorKind::Schema));
    expect_that!(err.subject(), some(eq("count.maxValue")));
}

#[gtest]
fn test_integer_bound_out_of_range_is_schema_error() {
    let source = source_with_entries(json!([
        {"type": "Int", "name": "count", "maxValue": 1e300},
    ]));

    let err = LiveAdapter::describe(&source).unwrap_err();

    expect_that!(err.kind(), eq(ErrorKind::Schema));
    expect_that!(err.subject(), some(eq("count.maxValue")));
}

#[gtest]
fn test_toggle_data_type_defaults_to_toggle() -> Result<()> {
    let source = source_with_entries(json!([
        {"type": "Toggle", "name": "enable"},
        {"type": "Toggle", "name": "legacy", "dataType": "Int"},
    ]));

    let group = LiveAdapter::describe(&source)?.value.parm_template_group;

    expect_that!(
        group
            .iter()
            .map(|t| (t.name(), t.common().data_type))
            .collect::<Vec<_>>(),
        eq(&vec![
            ("enable", ParmDataType::Toggle),
            ("legacy", ParmDataType::Int),
        ])
    );
    Ok(())
}

#[gtest]
fn test_bad_data_type_is_schema_error() {
    let source = source_with_entries(json!([
        {"type": "Int", "name": "count", "dataType": "Quaternion"},
    ]));

    let err = LiveAdapter::describe(&source).unwrap_err();

    expect_that!(err.subject(), some(eq("count.dataType")));
}

#[gtest]
fn test_source_failure_is_live_source_error() {
    let source = StaticSource {
        definition: json!("not a definition"),
    };

    let err = LiveAdapter::describe(&source).unwrap_err();

    expect_that!(err.kind(), eq(ErrorKind::LiveSource));
}

#[gtest]
fn test_described_definition_wire_shape() -> Result<()> {
    let source = source_with_entries(json!([]));

    let wire = serde_json::to_value(LiveAdapter::describe(&source)?.value)?;

    expect_that!(
        wire,
        eq(&json!({
            "nodeType": {
                "name": "rocks",
                "description": "Rock Scatter",
                "sourcePath": "/library/rocks.hda",
                "sourceNetwork": null,
            },
            "nodeTypeCategory": "Sop",
            "nodeTypeName": "rocks",
            "libraryFilePath": "",
            "isInstalled": true,
            "version": "2.1",
            "comment": "",
            "description": "",
            "icon": "",
            "modificationTime": 0,
            "embeddedHelp": "",
            "userInfo": "",
            "extraInfo": "",
            "minNumInputs": 0,
            "maxNumInputs": 0,
            "maxNumOutputs": 0,
            "parmTemplateGroup": {"name": "rocks", "label": "Rocks", "parmTemplates": []},
        }))
    );
    Ok(())
}
