#[doc(hidden)]
#[macro_export]
/// A macro which defines a string-backed enum type.
///
/// Unlike HTTP-style tokens, identifiers registered with IANA for JOSE
/// are case-sensitive, so matching is exact. Values which do not match
/// any known variant are kept as `Unknown(String)`.
macro_rules! __enum_builder {
    (
        $(#[$m:meta])*
        @String
        $enum_vis:vis enum $enum_name:ident
        { $( $(#[$enum_meta:meta])* $enum_var:ident => $enum_val:literal $(| $enum_val_alt:literal)* ),* $(,)? }
    ) => {
        $(#[$m])*
        #[derive(Debug, PartialEq, Eq, Clone, Hash)]
        $enum_vis enum $enum_name {
            $(
                $(#[$enum_meta])*
                $enum_var
            ),*
            ,Unknown(String)
        }

        impl $enum_name {
            /// Registered name of this value, or the raw name if it is unknown.
            $enum_vis fn as_str(&self) -> &str {
                match self {
                    $( $enum_name::$enum_var => $enum_val),*
                    ,$enum_name::Unknown(v) => v,
                }
            }

            /// `true` when this value is not one of the registered variants.
            $enum_vis fn is_unknown(&self) -> bool {
                matches!(self, $enum_name::Unknown(_))
            }

            /// Same as `FromStr` or `From<&str>` but returning
            /// `None` for unknown values
            $enum_vis fn strict_parse(s: &str) -> Option<Self> {
                match s {
                    $($enum_val $(| $enum_val_alt)* => Some($enum_name::$enum_var)),*
                    , _ => None,
                }
            }
        }

        impl<'a> From<&'a str> for $enum_name {
            fn from(s: &'a str) -> Self {
                Self::strict_parse(s).unwrap_or_else(|| $enum_name::Unknown(s.to_owned()))
            }
        }

        impl From<String> for $enum_name {
            fn from(s: String) -> Self {
                match Self::strict_parse(&s) {
                    Some(known) => known,
                    None => $enum_name::Unknown(s),
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(s.into())
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::macros::enums::__SerdeSerialize for $enum_name {
            #[inline]
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: $crate::macros::enums::__SerdeSerializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> $crate::macros::enums::__SerdeDeserialize<'de> for $enum_name {
            #[inline]
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: $crate::macros::enums::__SerdeDeserializer<'de>,
            {
                let s = <::std::borrow::Cow<'de, str> as $crate::macros::enums::__SerdeDeserialize<'de>>::deserialize(
                    deserializer,
                )?;
                Ok(s.as_ref().into())
            }
        }
    };
}

#[doc(inline)]
pub use crate::__enum_builder as enum_builder;

#[doc(hidden)]
pub use serde::{
    Deserialize as __SerdeDeserialize, Deserializer as __SerdeDeserializer,
    Serialize as __SerdeSerialize, Serializer as __SerdeSerializer,
};

#[cfg(test)]
mod tests {
    use super::enum_builder;

    enum_builder! {
        @String
        enum Curve {
            P256 => "P-256",
            X25519 => "X25519" | "x25519",
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(Curve::from("P-256"), Curve::P256);
        assert_eq!(Curve::from("p-256"), Curve::Unknown("p-256".to_owned()));
        assert!(Curve::from("p-256").is_unknown());
        assert_eq!(Curve::strict_parse("x25519"), Some(Curve::X25519));
        assert_eq!(Curve::strict_parse("P-384"), None);
    }

    #[test]
    fn serde_keeps_unknown_values() {
        let curve: Curve = serde_json::from_str(r#""secp256k1""#).unwrap();
        assert_eq!(curve.as_str(), "secp256k1");
        assert_eq!(serde_json::to_string(&curve).unwrap(), r#""secp256k1""#);
        assert_eq!(serde_json::to_string(&Curve::P256).unwrap(), r#""P-256""#);
        assert_eq!(Curve::X25519.to_string(), "X25519");
    }
}
