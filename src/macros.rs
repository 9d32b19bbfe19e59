//! # Internal Macros
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy header fields stored as
//! little-endian wrapper types (`U16`, `U32`). Row headers are read from
//! arbitrary byte offsets, so every multi-byte field is an unaligned wrapper
//! and callers should never touch the wrappers directly.
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::{U16, U32};
//!
//! #[repr(C)]
//! struct Header {
//!     xmin: U32,
//!     infomask: U16,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         xmin: u32,
//!         infomask: u16,
//!     }
//! }
//!
//! // Generates:
//! // pub fn xmin(&self) -> u32 { self.xmin.get() }
//! // pub fn set_xmin(&mut self, val: u32) { self.xmin = U32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u16) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u16 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u16) {
                self.$field = ::zerocopy::little_endian::U16::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
