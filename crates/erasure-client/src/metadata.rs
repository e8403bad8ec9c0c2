//! Byte encoding of post metadata.
//!
//! Posts published by earlier erasure clients carry metadata produced by
//! Python's `json.dumps` with default settings, so the same layout is used
//! here: `", "` and `": "` separators and every non-ASCII character written
//! as a `\uXXXX` escape (surrogate pairs above the BMP).

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use crate::error::ClientError;

/// Serializes `metadata` to the JSON bytes stored as a post's static metadata.
///
/// Object keys keep the order the `Serialize` impl emits them in.
pub fn encode_metadata<M>(metadata: &M) -> Result<Vec<u8>, ClientError>
where
    M: Serialize + ?Sized,
{
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    metadata.serialize(&mut ser)?;
    Ok(out)
}

struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut rest = fragment;
        while let Some(pos) = rest.find(|c: char| !c.is_ascii()) {
            writer.write_all(rest[..pos].as_bytes())?;

            let mut chars = rest[pos..].chars();
            if let Some(c) = chars.next() {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
            rest = chars.as_str();
        }
        writer.write_all(rest.as_bytes())
    }
}
