//! # Storage Collaborators
//!
//! The row codec does not own any storage. It only needs one capability from
//! the large-object subsystem: turning an out-of-line reference back into the
//! inline bytes it stands for. That capability and a reference in-memory
//! implementation live here.
//!
//! ## Module Organization
//!
//! - `toast`: Out-of-line reference format, `Detoaster`, `MemoryToastStore`

pub mod toast;

pub use toast::{is_toast_pointer, Detoaster, MemoryToastStore, ToastPointer, TOAST_POINTER_SIZE};
