macro_rules! runtime_type_impls {
    (
        simple_types: {
            $( $variant:ident => $name:literal ),* $(,)?
        },
        complex_types: {
            $(
                $complex_variant:ident
                $( ( $($tuple_arg:tt)* ) )?
            ),* $(,)?
        },
        get_name: {
            $( $name_pat:pat => $name_expr:expr ),* $(,)?
        },
        full_name: {
            $( $full_pat:pat => $full_expr:expr ),* $(,)?
        }
    ) => {
        #[derive(Clone, PartialEq, Eq, Hash, Debug)]
        pub enum RuntimeType {
            $( $variant, )*
            $(
                $complex_variant
                $( ( $($tuple_arg)* ) )?,
            )*
        }

        impl RuntimeType {
            /// Short name, as written in a reverse-method argument list.
            pub fn get_name(&self) -> String {
                use RuntimeType::*;
                match self {
                    $( $variant => $name.to_string(), )*
                    $( $name_pat => $name_expr, )*
                }
            }

            /// Namespace-qualified name, as written in explicit parameter type lists.
            pub fn full_name(&self) -> String {
                use RuntimeType::*;
                match self {
                    $( $variant => concat!("System.", $name).to_string(), )*
                    $( $full_pat => $full_expr, )*
                }
            }

            /// Maps a core library type name onto the built-in runtime type, if it is one.
            pub fn from_core_name(name: &str) -> Option<RuntimeType> {
                match name {
                    $( concat!("System.", $name) => Some(RuntimeType::$variant), )*
                    "System.Void" => Some(RuntimeType::Void),
                    _ => None,
                }
            }
        }
    };
}
