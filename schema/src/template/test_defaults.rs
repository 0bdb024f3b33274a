use testutils::DefaultForTest;

use super::*;

impl DefaultForTest for ParmCommon {
    fn default_for_test() -> Self {
        Self::new("test_parm", "Test Parm", ParmDataType::Int)
    }
}

impl DefaultForTest for IntParmTemplate {
    fn default_for_test() -> Self {
        Self::new(ParmCommon::default_for_test())
    }
}

impl DefaultForTest for FloatParmTemplate {
    fn default_for_test() -> Self {
        Self::new(ParmCommon {
            data_type: ParmDataType::Float,
            ..ParmCommon::default_for_test()
        })
    }
}

impl DefaultForTest for StringParmTemplate {
    fn default_for_test() -> Self {
        Self::new(ParmCommon {
            data_type: ParmDataType::String,
            ..ParmCommon::default_for_test()
        })
    }
}

impl DefaultForTest for ToggleParmTemplate {
    fn default_for_test() -> Self {
        Self::new(ParmCommon {
            data_type: ParmDataType::Toggle,
            ..ParmCommon::default_for_test()
        })
    }
}

impl DefaultForTest for MenuParmTemplate {
    fn default_for_test() -> Self {
        Self {
            menu_items: vec!["low".into(), "high".into()],
            menu_labels: vec!["Low".into(), "High".into()],
            default_value_as_string: "low".into(),
            ..Self::new(ParmCommon::default_for_test())
        }
    }
}
