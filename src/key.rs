//! Compact, self-delimiting serialization of element keys.
//!
//! Each fragment is written as `{length}{tag}{value}`, where `length` counts UTF-16 code units (the unit server-side renderers use)
//! and `tag` is `_` for absent values, `#` for numbers and `:` for everything else.
//! Fragments are prepended as templates nest, so the key of an ancestor context ends up as a suffix.
//! The same element keyed at a shallower call depth is then a prefix of its nested key, while the bare ancestor key is not:
//!
//! ```
//! use soy_idom::key::{is_matching_key_str, serialize_key};
//!
//! let outer = serialize_key("a".into());
//! let inner = serialize_key("b".into()) + &outer;
//! assert_eq!(inner, "1:b1:a");
//! assert!(is_matching_key_str(&inner, "1:b"));
//! assert!(!is_matching_key_str(&inner, &outer));
//! ```

use core::{fmt, iter::FusedIterator};
use num_traits::ToPrimitive;
use thiserror::Error;

/// A single key fragment, as passed to `{key}` commands and template calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyFragment<'a> {
	Absent,
	Number(f64),
	Str(&'a str),
}

impl<'a> KeyFragment<'a> {
	/// Converts any primitive number into a numeric fragment.
	///
	/// Values that can't be represented as [`f64`] become `NaN`.
	pub fn number<N: ToPrimitive>(n: N) -> Self {
		Self::Number(n.to_f64().unwrap_or(f64::NAN))
	}

	#[must_use]
	pub fn kind(&self) -> FragmentKind {
		match self {
			KeyFragment::Absent => FragmentKind::Absent,
			KeyFragment::Number(_) => FragmentKind::Number,
			KeyFragment::Str(_) => FragmentKind::Str,
		}
	}
}

impl<'a> From<&'a str> for KeyFragment<'a> {
	fn from(value: &'a str) -> Self {
		Self::Str(value)
	}
}

impl<'a> From<&'a String> for KeyFragment<'a> {
	fn from(value: &'a String) -> Self {
		Self::Str(value)
	}
}

impl<'a> From<Option<&'a str>> for KeyFragment<'a> {
	fn from(value: Option<&'a str>) -> Self {
		value.map_or(Self::Absent, Self::Str)
	}
}

macro_rules! number_fragment {
	($($ty:ty),*$(,)?) => {$(
		impl From<$ty> for KeyFragment<'_> {
			fn from(value: $ty) -> Self {
				Self::number(value)
			}
		}
	)*};
}
number_fragment!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl fmt::Display for KeyFragment<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			KeyFragment::Absent => f.write_str("null"),
			KeyFragment::Number(n) => f.write_str(&format_number(n)),
			KeyFragment::Str(s) => f.write_str(s),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
	Absent,
	Number,
	Str,
}

impl FragmentKind {
	#[must_use]
	pub fn tag(self) -> char {
		match self {
			FragmentKind::Absent => '_',
			FragmentKind::Number => '#',
			FragmentKind::Str => ':',
		}
	}

	#[must_use]
	pub fn from_tag(tag: char) -> Option<Self> {
		match tag {
			'_' => Some(FragmentKind::Absent),
			'#' => Some(FragmentKind::Number),
			':' => Some(FragmentKind::Str),
			_ => None,
		}
	}
}

/// Serializes one fragment into its `{length}{tag}{value}` form.
#[must_use]
pub fn serialize_key(fragment: KeyFragment<'_>) -> String {
	let stringified = fragment.to_string();
	format!("{}{}{}", stringified.encode_utf16().count(), fragment.kind().tag(), stringified)
}

/// Formats a number the way server-side key producers stringify it.
pub(crate) fn format_number(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_owned()
	} else if n.is_infinite() {
		(if n > 0.0 { "Infinity" } else { "-Infinity" }).to_owned()
	} else if n == 0.0 {
		// Also `-0`.
		"0".to_owned()
	} else if n.abs() >= 1e21 || n.abs() < 1e-6 {
		let exponential = format!("{:e}", n);
		match exponential.split_once('e') {
			Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
			_ => exponential,
		}
	} else {
		n.to_string()
	}
}

/// Converts a string to a number the way loose equality does, with `NaN` for anything unparseable.
fn string_to_number(s: &str) -> f64 {
	let s = s.trim();
	if s.is_empty() {
		return 0.0;
	}
	match s {
		"Infinity" | "+Infinity" => return f64::INFINITY,
		"-Infinity" => return f64::NEG_INFINITY,
		_ => (),
	}
	for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
		if let Some(digits) = s.strip_prefix(prefix) {
			return u64::from_str_radix(digits, radix).map_or(f64::NAN, |v| v as f64);
		}
	}
	if s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-')) {
		s.parse().unwrap_or(f64::NAN)
	} else {
		f64::NAN
	}
}

/// Loose equality between fragments of possibly different kinds.
///
/// Server-rendered markup carries keys as attribute strings, so `"0"` must equal `0`.
/// An absent key only equals another absent key.
#[must_use]
pub fn loosely_equal(a: &KeyFragment<'_>, b: &KeyFragment<'_>) -> bool {
	match (*a, *b) {
		(KeyFragment::Absent, KeyFragment::Absent) => true,
		(KeyFragment::Absent, _) | (_, KeyFragment::Absent) => false,
		(KeyFragment::Number(a), KeyFragment::Number(b)) => a == b,
		(KeyFragment::Str(a), KeyFragment::Str(b)) => a == b,
		(KeyFragment::Str(s), KeyFragment::Number(n)) | (KeyFragment::Number(n), KeyFragment::Str(s)) => string_to_number(s) == n,
	}
}

/// Returns whether the proposed key is a prefix of the current key or vice versa.
///
/// - proposed `1c1b`, current `1c1b1a` ⇒ `true`
/// - proposed `1c1b1a`, current `1c1b` ⇒ `true`
/// - proposed `1c1b`, current `1d1c1b1a` ⇒ `false`
///
/// Operands that aren't both strings fall back to [`loosely_equal`].
#[must_use]
pub fn is_matching_key(proposed: &KeyFragment<'_>, current: &KeyFragment<'_>) -> bool {
	match (*proposed, *current) {
		(KeyFragment::Str(proposed), KeyFragment::Str(current)) => is_matching_key_str(proposed, current),
		_ => loosely_equal(proposed, current),
	}
}

/// [`is_matching_key`] for two string keys.
#[must_use]
pub fn is_matching_key_str(proposed: &str, current: &str) -> bool {
	proposed.starts_with(current) || current.starts_with(proposed)
}

/// The node-matching predicate handed to the render target: tag names must be equal and keys must match.
#[must_use]
pub fn matches(name: &str, expected_name: &str, proposed_key: &KeyFragment<'_>, current_key: &KeyFragment<'_>) -> bool {
	name == expected_name && is_matching_key(proposed_key, current_key)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyDecodeError {
	#[error("Expected a length prefix at offset {offset}")]
	MissingLength { offset: usize },
	#[error("Length prefix at offset {offset} is too large")]
	LengthOverflow { offset: usize },
	#[error("Unknown key fragment tag {tag:?} at offset {offset}")]
	UnknownTag { tag: char, offset: usize },
	#[error("Key fragment at offset {offset} is missing its tag")]
	MissingTag { offset: usize },
	#[error("Key fragment at offset {offset} declares {expected} UTF-16 units but only {found} remain")]
	Truncated { offset: usize, expected: usize, found: usize },
	#[error("Key fragment at offset {offset} ends inside a surrogate pair")]
	SplitSurrogate { offset: usize },
}

/// One fragment read back from an encoded key, borrowing its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFragment<'a> {
	pub kind: FragmentKind,
	pub raw: &'a str,
}

impl<'a> DecodedFragment<'a> {
	/// Reconstructs the fragment.
	///
	/// Numbers are parsed back from their stringified form, so `NaN` and infinities survive.
	#[must_use]
	pub fn fragment(&self) -> KeyFragment<'a> {
		match self.kind {
			FragmentKind::Absent => KeyFragment::Absent,
			FragmentKind::Number => KeyFragment::Number(string_to_number(self.raw)),
			FragmentKind::Str => KeyFragment::Str(self.raw),
		}
	}
}

/// Iterates over the fragments of an encoded key, outermost call last.
///
/// The iterator stops after the first error.
#[must_use]
pub fn decode_key(encoded: &str) -> DecodeKey<'_> {
	DecodeKey { encoded, offset: 0 }
}

#[derive(Debug, Clone)]
pub struct DecodeKey<'a> {
	encoded: &'a str,
	offset: usize,
}

impl<'a> DecodeKey<'a> {
	fn fail(&mut self, error: KeyDecodeError) -> Option<Result<DecodedFragment<'a>, KeyDecodeError>> {
		self.offset = self.encoded.len();
		Some(Err(error))
	}
}

impl<'a> Iterator for DecodeKey<'a> {
	type Item = Result<DecodedFragment<'a>, KeyDecodeError>;

	fn next(&mut self) -> Option<Self::Item> {
		let start = self.offset;
		let rest = &self.encoded[start..];
		if rest.is_empty() {
			return None;
		}

		let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
		if digits == 0 {
			return self.fail(KeyDecodeError::MissingLength { offset: start });
		}
		let length: usize = match rest[..digits].parse() {
			Ok(length) => length,
			Err(_) => return self.fail(KeyDecodeError::LengthOverflow { offset: start }),
		};

		let kind = match rest[digits..].chars().next() {
			None => return self.fail(KeyDecodeError::MissingTag { offset: start }),
			Some(tag) => match FragmentKind::from_tag(tag) {
				Some(kind) => kind,
				None => return self.fail(KeyDecodeError::UnknownTag { tag, offset: start + digits }),
			},
		};

		let value = &rest[digits + 1..];
		let mut units = 0;
		let mut end = 0;
		for c in value.chars() {
			if units == length {
				break;
			}
			units += c.len_utf16();
			end += c.len_utf8();
		}
		if units > length {
			return self.fail(KeyDecodeError::SplitSurrogate { offset: start });
		}
		if units < length {
			return self.fail(KeyDecodeError::Truncated { offset: start, expected: length, found: units });
		}

		self.offset = start + digits + 1 + end;
		Some(Ok(DecodedFragment { kind, raw: &value[..end] }))
	}
}

impl FusedIterator for DecodeKey<'_> {}
