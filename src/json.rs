//! JSON body encoding.
//!
//! Bodies are written with a space after every `,` and `:` and with all
//! non-ASCII characters escaped as `\uXXXX`, so `{"a":1}` goes over the wire
//! as `{"a": 1}`. Object keys keep their insertion order.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

/// Serializes `value` to the spaced, ASCII-only JSON text described above.
pub(crate) fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut buf, SpacedAscii);
    value.serialize(&mut ser)?;
    // The formatter only ever writes ASCII.
    String::from_utf8(buf).map_err(|e| serde::ser::Error::custom(e.to_string()))
}

struct SpacedAscii;

impl Formatter for SpacedAscii {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { w.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { w.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, w: &mut W, fragment: &str) -> io::Result<()> {
        if fragment.is_ascii() {
            return w.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                w.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(w, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_and_arrays_are_spaced() {
        assert_eq!(to_string(&json!({"a": 1})).unwrap(), r#"{"a": 1}"#);
        assert_eq!(to_string(&json!([1, 2, 3])).unwrap(), "[1, 2, 3]");
        assert_eq!(
            to_string(&json!({"items": [null, "x"], "ok": true})).unwrap(),
            r#"{"items": [null, "x"], "ok": true}"#,
        );
    }

    #[test]
    fn object_keys_keep_insertion_order() {
        assert_eq!(
            to_string(&json!({"name": "alice", "age": 3, "city": "Oslo"})).unwrap(),
            r#"{"name": "alice", "age": 3, "city": "Oslo"}"#,
        );
    }

    #[test]
    fn scalars_are_plain() {
        assert_eq!(to_string(&true).unwrap(), "true");
        assert_eq!(to_string(&1.5).unwrap(), "1.5");
        assert_eq!(to_string(&Vec::<u8>::new()).unwrap(), "[]");
    }

    #[test]
    fn non_ascii_is_escaped() {
        assert_eq!(to_string("café").unwrap(), r#""caf\u00e9""#);
        assert_eq!(to_string("🦀").unwrap(), r#""\ud83e\udd80""#);
    }

    #[test]
    fn control_characters_keep_standard_escapes() {
        assert_eq!(to_string("a\"b\n").unwrap(), r#""a\"b\n""#);
    }
}
