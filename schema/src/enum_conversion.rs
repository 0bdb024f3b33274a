#[macro_export(local_inner_macros)]
macro_rules! impl_enum_conversions {
    ($enum_type:ident, $variant:ident, $variant_type:ident) => {
        impl<'a> TryFrom<&'a $enum_type> for &'a $variant_type {
            type Error = $crate::SchemaError;

            fn try_from(value: &'a $enum_type) -> ::std::result::Result<Self, Self::Error> {
                match value {
                    $enum_type::$variant(variant_value) => Ok(variant_value),
                    _ => Err($crate::SchemaError::WrongType {
                        parm: value.name().to_owned(),
                        got: value.template_type(),
                        expected: std::stringify!($variant_type),
                    }),
                }
            }
        }

        impl std::convert::From<$variant_type> for $enum_type {
            fn from(value: $variant_type) -> $enum_type {
                $enum_type::$variant(value)
            }
        }
    };
}
