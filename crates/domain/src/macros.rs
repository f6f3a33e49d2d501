//! Code tables for enums that travel as short strings.
//!
//! The store names product types `subs`/`inapp`; connection and purchase
//! states show up as lowercase codes in logs and config.

/// Generates `Display` (writes the code) and `FromStr` (ASCII
/// case-insensitive) for a fieldless enum from a `Variant => "code"` table.
///
/// ```rust
/// use storelink_domain::impl_store_codes;
///
/// #[derive(Debug, PartialEq)]
/// enum Channel {
///     Stable,
///     Beta,
/// }
///
/// impl_store_codes!(Channel {
///     Stable => "stable",
///     Beta => "beta",
/// });
///
/// assert_eq!(Channel::Beta.to_string(), "beta");
/// assert_eq!("STABLE".parse::<Channel>(), Ok(Channel::Stable));
/// ```
#[macro_export]
macro_rules! impl_store_codes {
    ($ty:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            /// Store code for this value
            pub fn code(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($code) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {} code '{}'", stringify!($ty), s))
            }
        }
    };
}
