//! # Column Values
//!
//! `Datum<'a>` is the in-memory form of one non-null column value. Decoded
//! values borrow from the row buffer; values built by callers are usually
//! owned. A row's values are passed around as `&[Option<Datum>]`, with `None`
//! marking a null column.
//!
//! ## Variants
//!
//! | Variant | Used for | Payload |
//! |---------|----------|---------|
//! | `ByVal` | pass-by-value fixed columns | scalar zero-extended to 64 bits |
//! | `Ref` | pass-by-reference fixed columns | exactly the column's length |
//! | `CString` | cstring columns | bytes without the terminator |
//! | `Varlena` | variable-length columns | complete image, header included |
//! | `Expanded` | variable-length columns | in-memory object flattened on store |
//!
//! Equality compares content: a short-header and a long-header image with the
//! same payload are equal, and an expanded object equals any image carrying
//! its flattened payload.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::varlena;

/// An in-memory value representation that must be flattened before storage.
pub trait ExpandedObject: fmt::Debug + Send + Sync {
    /// Size of the flattened image, header included.
    fn flat_size(&self) -> usize;

    /// Writes the flattened long-header image into `dest`, which is exactly
    /// `flat_size()` bytes long.
    fn flatten_into(&self, dest: &mut [u8]);
}

/// Expanded value assembled from separately owned segments.
#[derive(Debug, Clone, Default)]
pub struct ExpandedBytes {
    parts: Vec<Vec<u8>>,
}

impl ExpandedBytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: impl Into<Vec<u8>>) {
        self.parts.push(part.into());
    }

    pub fn from_parts(parts: Vec<Vec<u8>>) -> Self {
        Self { parts }
    }
}

impl ExpandedObject for ExpandedBytes {
    fn flat_size(&self) -> usize {
        crate::config::VARHDRSZ + self.parts.iter().map(Vec::len).sum::<usize>()
    }

    fn flatten_into(&self, dest: &mut [u8]) {
        let total = self.flat_size();
        varlena::write_long_header(dest, total);
        let mut off = crate::config::VARHDRSZ;
        for part in &self.parts {
            dest[off..off + part.len()].copy_from_slice(part);
            off += part.len();
        }
    }
}

/// Flattens an expanded object into an owned long-header image.
pub fn flatten_expanded(obj: &dyn ExpandedObject) -> Vec<u8> {
    let mut buf = vec![0u8; obj.flat_size()];
    obj.flatten_into(&mut buf);
    buf
}

#[derive(Clone)]
pub enum Datum<'a> {
    ByVal(u64),
    Ref(Cow<'a, [u8]>),
    CString(Cow<'a, [u8]>),
    Varlena(Cow<'a, [u8]>),
    Expanded(Arc<dyn ExpandedObject>),
}

impl<'a> Datum<'a> {
    pub fn bool(v: bool) -> Self {
        Datum::ByVal(v as u64)
    }

    pub fn int2(v: i16) -> Self {
        Datum::ByVal(v as u16 as u64)
    }

    pub fn int4(v: i32) -> Self {
        Datum::ByVal(v as u32 as u64)
    }

    pub fn int8(v: i64) -> Self {
        Datum::ByVal(v as u64)
    }

    pub fn float4(v: f32) -> Self {
        Datum::ByVal(v.to_bits() as u64)
    }

    pub fn float8(v: f64) -> Self {
        Datum::ByVal(v.to_bits())
    }

    pub fn oid(v: u32) -> Self {
        Datum::ByVal(v as u64)
    }

    /// Text value with a long header.
    pub fn text(s: &str) -> Datum<'static> {
        Datum::Varlena(Cow::Owned(varlena::long_from_payload(s.as_bytes())))
    }

    /// Binary value with a long header.
    pub fn bytea(bytes: &[u8]) -> Datum<'static> {
        Datum::Varlena(Cow::Owned(varlena::long_from_payload(bytes)))
    }

    /// Wraps a complete variable-length image, header included.
    pub fn varlena(image: &'a [u8]) -> Self {
        Datum::Varlena(Cow::Borrowed(image))
    }

    pub fn fixed(bytes: &'a [u8]) -> Self {
        Datum::Ref(Cow::Borrowed(bytes))
    }

    pub fn cstring(s: &str) -> Datum<'static> {
        Datum::CString(Cow::Owned(s.as_bytes().to_vec()))
    }

    pub fn expanded(obj: Arc<dyn ExpandedObject>) -> Self {
        Datum::Expanded(obj)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Datum::ByVal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_u64().map(|v| v != 0)
    }

    pub fn as_i16(&self) -> Option<i16> {
        self.as_u64().map(|v| v as u16 as i16)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_u64().map(|v| v as u32 as i32)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_u64().map(|v| v as i64)
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_u64().map(|v| f32::from_bits(v as u32))
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_u64().map(f64::from_bits)
    }

    /// Raw bytes of a fixed-length or cstring value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::Ref(b) | Datum::CString(b) => Some(b),
            _ => None,
        }
    }

    /// Complete variable-length image, header included.
    pub fn varlena_image(&self) -> Option<&[u8]> {
        match self {
            Datum::Varlena(b) => Some(b),
            _ => None,
        }
    }

    /// Payload of a variable-length value, flattening expanded objects.
    pub fn varlena_payload(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            Datum::Varlena(b) => Some(Cow::Borrowed(varlena::payload(b))),
            Datum::Expanded(obj) => {
                let flat = flatten_expanded(obj.as_ref());
                Some(Cow::Owned(varlena::payload(&flat).to_vec()))
            }
            _ => None,
        }
    }

    /// Text of a variable-length or cstring value, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Varlena(b) => std::str::from_utf8(varlena::payload(b)).ok(),
            Datum::CString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Datum::Varlena(b) if b.first().copied().is_some_and(varlena::is_external))
    }

    pub fn into_owned(self) -> Datum<'static> {
        match self {
            Datum::ByVal(v) => Datum::ByVal(v),
            Datum::Ref(b) => Datum::Ref(Cow::Owned(b.into_owned())),
            Datum::CString(b) => Datum::CString(Cow::Owned(b.into_owned())),
            Datum::Varlena(b) => Datum::Varlena(Cow::Owned(b.into_owned())),
            Datum::Expanded(obj) => Datum::Expanded(obj),
        }
    }

    /// Borrowing view of this value.
    pub fn reborrow(&self) -> Datum<'_> {
        match self {
            Datum::ByVal(v) => Datum::ByVal(*v),
            Datum::Ref(b) => Datum::Ref(Cow::Borrowed(b)),
            Datum::CString(b) => Datum::CString(Cow::Borrowed(b)),
            Datum::Varlena(b) => Datum::Varlena(Cow::Borrowed(b)),
            Datum::Expanded(obj) => Datum::Expanded(Arc::clone(obj)),
        }
    }
}

impl PartialEq for Datum<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::ByVal(a), Datum::ByVal(b)) => a == b,
            (Datum::Ref(a), Datum::Ref(b)) => a == b,
            (Datum::CString(a), Datum::CString(b)) => a == b,
            (Datum::Varlena(a), Datum::Varlena(b)) => {
                let external = |img: &[u8]| img.first().copied().is_some_and(varlena::is_external);
                if external(a) || external(b) {
                    a == b
                } else {
                    varlena::payload(a) == varlena::payload(b)
                }
            }
            (Datum::Expanded(_), Datum::Varlena(_))
            | (Datum::Varlena(_), Datum::Expanded(_))
            | (Datum::Expanded(_), Datum::Expanded(_)) => {
                !self.is_external()
                    && !other.is_external()
                    && self.varlena_payload() == other.varlena_payload()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Datum<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::ByVal(v) => write!(f, "ByVal({})", v),
            Datum::Ref(b) => write!(f, "Ref({:02x?})", b.as_ref()),
            Datum::CString(b) => write!(f, "CString({:?})", String::from_utf8_lossy(b)),
            Datum::Varlena(b) => match b.first() {
                Some(&first) if varlena::is_external(first) => {
                    write!(f, "External({:02x?})", b.as_ref())
                }
                _ => write!(f, "Varlena({:?})", String::from_utf8_lossy(varlena::payload(b))),
            },
            Datum::Expanded(obj) => write!(f, "Expanded({:?})", obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_zero_extended() {
        assert_eq!(Datum::int4(-1).as_u64(), Some(0xFFFF_FFFF));
        assert_eq!(Datum::int4(-1).as_i32(), Some(-1));
        assert_eq!(Datum::int2(-2).as_i16(), Some(-2));
        assert_eq!(Datum::float8(1.5).as_f64(), Some(1.5));
        assert_eq!(Datum::float4(-0.25).as_f32(), Some(-0.25));
        assert_eq!(Datum::bool(true).as_bool(), Some(true));
    }

    #[test]
    fn varlena_equality_ignores_header_form() {
        let long = Datum::text("abc");
        let short_img = varlena::short_from_payload(b"abc").unwrap();
        let short = Datum::varlena(&short_img);
        assert_eq!(long, short);
        assert_ne!(long, Datum::text("abd"));
        assert_eq!(short.as_str(), Some("abc"));
    }

    #[test]
    fn expanded_equals_its_flattened_image() {
        let obj = ExpandedBytes::from_parts(vec![b"ab".to_vec(), b"cd".to_vec()]);
        assert_eq!(obj.flat_size(), 8);
        let expanded = Datum::expanded(Arc::new(obj));
        assert_eq!(expanded, Datum::text("abcd"));
        assert_eq!(expanded.varlena_payload().unwrap().as_ref(), b"abcd");
    }

    #[test]
    fn into_owned_detaches_from_buffer() {
        let owned = {
            let buf = vec![1u8, 2, 3, 4];
            Datum::fixed(&buf).into_owned()
        };
        assert_eq!(owned.as_bytes(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn kinds_never_compare_equal_across_variants() {
        assert_ne!(Datum::ByVal(0), Datum::fixed(&[0]));
        assert_ne!(Datum::cstring("a"), Datum::text("a"));
    }
}
