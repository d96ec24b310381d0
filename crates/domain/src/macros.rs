//! Macro for implementing Display and FromStr for small domain enums
//!
//! Generates both conversions from one variant/string table so the two never
//! drift apart. Parsing is case-insensitive; output is the table string.
//!
//! # Example
//!
//! ```rust
//! use carelink_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum StoreKind {
//!     Memory,
//!     File,
//! }
//!
//! impl_domain_status_conversions!(StoreKind {
//!     Memory => "memory",
//!     File => "file",
//! });
//!
//! assert_eq!("FILE".parse::<StoreKind>().unwrap(), StoreKind::File);
//! ```

/// Implements Display and FromStr traits for unit-only enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase string
///   representations
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestKind {
        Alpha,
        BetaGamma,
    }

    impl_domain_status_conversions!(TestKind {
        Alpha => "alpha",
        BetaGamma => "beta_gamma",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(TestKind::Alpha.to_string(), "alpha");
        assert_eq!(TestKind::BetaGamma.to_string(), "beta_gamma");
    }

    #[test]
    fn test_fromstr_mixed_case() {
        assert_eq!(TestKind::from_str("ALPHA").unwrap(), TestKind::Alpha);
        assert_eq!(TestKind::from_str("Beta_Gamma").unwrap(), TestKind::BetaGamma);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestKind::from_str("delta");
        assert!(result.unwrap_err().contains("Invalid TestKind: delta"));
        assert!(TestKind::from_str("").is_err());
    }

    mod with_result_alias {
        use std::str::FromStr;

        #[allow(dead_code)]
        type Result<T> = std::result::Result<T, String>;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Shade {
            Light,
            Dark,
        }

        impl_domain_status_conversions!(Shade {
            Light => "light",
            Dark => "dark",
        });

        #[test]
        fn test_conversions_with_local_result_alias() {
            assert_eq!(Shade::from_str("Dark").unwrap(), Shade::Dark);
            assert_eq!(Shade::Light.to_string(), "light");
            assert!(Shade::from_str("dim").is_err());
        }
    }
}
