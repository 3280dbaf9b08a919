//! Identifier newtypes shared by the typed tree and the lowered tree
//!
//! Every identifier is a `u32` wrapper. `u32::MAX` is reserved as the
//! invalid sentinel so that identifiers can be defaulted without wrapping
//! them in `Option` at every use site.

use serde::Serialize;
use std::fmt;

/// Defines a `u32`-backed identifier with sentinel, ordering and display support.
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> u32 {
                self.0
            }

            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            pub const fn invalid() -> Self {
                Self(u32::MAX)
            }

            /// The identifier that follows this one in allocation order
            pub const fn next(self) -> Self {
                Self(self.0.wrapping_add(1))
            }

            /// Index into a dense arena
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(<invalid>)", stringify!($name))
                }
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self::from_raw(raw)
            }
        }
    };
}

pub(crate) use define_id_type;

define_id_type! {
    /// Identity of a resolved source declaration (class, function, property,
    /// parameter, local variable, ...).
    ///
    /// Resolution assigns one per declaration; every resolved reference in the
    /// typed tree points at one of these.
    SymbolId
}

define_id_type! {
    /// Identity of a source loop, used by `break`/`continue` to name their target
    LoopId
}
