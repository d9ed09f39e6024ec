//! Generational handles shared across the bridge.
//!
//! A handle packs a slot index (low half) and the slot's generation (high
//! half) into one `u64`, which is also what crosses the C boundary. Index 0 is
//! never allocated, so the all-zero handle means "none".

use std::fmt;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// FNV-1a over the name's bytes. Usable in `const` context.
pub const fn hash_name(name: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let bytes = name.as_bytes();
    let mut hash = OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

macro_rules! generational_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// First generation of slot `index`.
            pub const fn new(index: u32) -> Self {
                Self::from_parts(index, 0)
            }

            pub const fn nil() -> Self {
                Self(0)
            }

            pub const fn from_parts(index: u32, generation: u32) -> Self {
                Self((generation as u64) << INDEX_BITS | index as u64)
            }

            pub const fn index(self) -> u32 {
                (self.0 & INDEX_MASK) as u32
            }

            pub const fn generation(self) -> u32 {
                (self.0 >> INDEX_BITS) as u32
            }

            pub const fn is_nil(self) -> bool {
                self.index() == 0
            }

            /// Raw form handed across the C boundary.
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            pub const fn from_u64(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}v{}", self.index(), self.generation())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }
    };
}

generational_handle!(
    /// A node slot in a scene arena.
    NodeID
);
generational_handle!(
    /// A background task tracked by the task system.
    TaskID
);
generational_handle!(
    /// A listener registered with the asset monitor.
    CallbackID
);

/// Hashed signal name in the signal table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SlotKey(pub u64);

impl SlotKey {
    pub const fn from_string(name: &str) -> Self {
        Self(hash_name(name))
    }
}
