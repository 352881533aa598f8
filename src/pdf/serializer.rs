//! PDF object serialization.
//!
//! Output is compact and deterministic: dictionary keys are written in
//! sorted order and reals are printed with at most five decimals.

use super::object::{Dict, Object};
use std::io::Write;

/// Serializer for PDF objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Create a serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj)?;
        Ok(buf)
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        writeln!(buf, "{} {} obj", id, gen)?;
        self.write_object(&mut buf, obj)?;
        write!(buf, "\nendobj\n")?;
        Ok(buf)
    }

    /// Write an object.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => write!(w, "{}", format_number(*r)),
            Object::String(s) => write_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => {
                write!(w, "[")?;
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(w, " ")?;
                    }
                    self.write_object(w, item)?;
                }
                write!(w, "]")
            },
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => {
                let mut dict = dict.clone();
                dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
                self.write_dictionary(w, &dict)?;
                write!(w, "\nstream\n")?;
                w.write_all(data)?;
                write!(w, "\nendstream")
            },
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dict) -> std::io::Result<()> {
        write!(w, "<<")?;
        let mut keys: Vec<&String> = dict.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(value) = dict.get(key) {
                write_name(w, key)?;
                write!(w, " ")?;
                self.write_object(w, value)?;
            }
        }
        write!(w, ">>")
    }
}

/// Format a number the way content streams and objects expect it:
/// integers without a fraction, otherwise at most five decimals with
/// trailing zeros removed.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100_000.0).round() / 100_000.0;
    if rounded.fract() == 0.0 {
        return format!("{}", rounded as i64);
    }
    let formatted = format!("{:.5}", rounded);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Write a string as a literal `(...)` when printable, hex `<...>` otherwise.
pub fn write_string<W: Write>(w: &mut W, data: &[u8]) -> std::io::Result<()> {
    let printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));
    if !printable {
        write!(w, "<")?;
        for byte in data {
            write!(w, "{:02X}", byte)?;
        }
        return write!(w, ">");
    }
    write!(w, "(")?;
    for &byte in data {
        match byte {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            b'\n' => write!(w, "\\n")?,
            b'\r' => write!(w, "\\r")?,
            b'\t' => write!(w, "\\t")?,
            _ => w.write_all(&[byte])?,
        }
    }
    write!(w, ")")
}

/// Write a name, escaping delimiters and non-regular bytes as `#xx`.
pub fn write_name<W: Write>(w: &mut W, name: &str) -> std::io::Result<()> {
    write!(w, "/")?;
    for byte in name.bytes() {
        match byte {
            b'!'
            | b'"'
            | b'$'
            | b'&'
            | b'\''
            | b'*'..=b'.'
            | b'0'..=b'9'
            | b';'
            | b'?'
            | b'@'
            | b'A'..=b'Z'
            | b'^'..=b'z'
            | b'|'
            | b'~' => w.write_all(&[byte])?,
            _ => write!(w, "#{:02X}", byte)?,
        }
    }
    Ok(())
}
