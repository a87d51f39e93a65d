use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use crate::error::ParseError;
use crate::{Dictionary, Object, Result, Stream};

/// Cross-reference table: object number to location.
#[derive(Debug, Clone)]
pub struct Xref {
    pub entries: BTreeMap<u32, XrefEntry>,

    /// Total number of entries (including free entries), equal to the highest object number plus 1.
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free,
    Normal { offset: u32, generation: u16 },
    /// Object packed at `index` in the object stream numbered `container`.
    Compressed { container: u32, index: u16 },
}

impl Xref {
    pub fn new(size: u32) -> Xref {
        Xref {
            entries: BTreeMap::new(),
            size,
        }
    }

    pub fn get(&self, id: u32) -> Option<&XrefEntry> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: u32, entry: XrefEntry) {
        self.entries.insert(id, entry);
    }

    /// Add the entries of an older section. Entries already present take precedence.
    pub fn merge(&mut self, older: Xref) {
        for (id, entry) in older.entries {
            self.entries.entry(id).or_insert(entry);
        }
    }

    /// Add the entries of a hybrid file's `/XRefStm` stream. They replace free entries of the
    /// table, which is how such tables hide objects from readers without stream support.
    pub fn merge_hidden(&mut self, stream: Xref) {
        for (id, entry) in stream.entries {
            match self.entries.get(&id) {
                Some(XrefEntry::Normal { .. } | XrefEntry::Compressed { .. }) => {}
                _ => self.insert(id, entry),
            }
        }
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }
}

/// Decode a cross-reference stream into its table and its trailer dictionary.
pub fn decode_xref_stream(stream: &Stream) -> Result<(Xref, Dictionary)> {
    let content = stream.decompressed_content()?;
    let mut dict = stream.dict.clone();
    let mut reader = Cursor::new(content);

    let size = dict
        .get(b"Size")
        .and_then(Object::as_i64)
        .ok()
        .and_then(|size| u32::try_from(size).ok())
        .ok_or(ParseError::InvalidXref)?;
    let mut xref = Xref::new(size);

    let section_indice = dict
        .get(b"Index")
        .and_then(parse_integer_array)
        .unwrap_or_else(|_| vec![0, i64::from(size)]);
    let field_widths = dict
        .get(b"W")
        .and_then(parse_integer_array)
        .map_err(|_| ParseError::InvalidXref)?;

    // Fields wider than 4 bytes cannot hold a valid offset or object number here.
    let widths: Vec<usize> = field_widths
        .iter()
        .take(3)
        .map(|&width| usize::try_from(width).ok().filter(|&width| width <= 4))
        .collect::<Option<_>>()
        .ok_or(ParseError::InvalidXref)?;
    if widths.len() < 3 {
        return Err(ParseError::InvalidXref.into());
    }

    let mut bytes1 = vec![0_u8; widths[0]];
    let mut bytes2 = vec![0_u8; widths[1]];
    let mut bytes3 = vec![0_u8; widths[2]];

    for section in section_indice.chunks_exact(2) {
        let (start, count) = (section[0], section[1]);
        if start < 0 || count < 0 {
            return Err(ParseError::InvalidXref.into());
        }

        for j in 0..count {
            let id = u32::try_from(start + j).map_err(|_| ParseError::InvalidXref)?;
            // A missing type field means type 1.
            let entry_type = if bytes1.is_empty() {
                1
            } else {
                read_big_endian_integer(&mut reader, &mut bytes1)?
            };
            let field2 = read_big_endian_integer(&mut reader, &mut bytes2)?;
            let field3 = read_big_endian_integer(&mut reader, &mut bytes3)?;

            match entry_type {
                0 => xref.insert(id, XrefEntry::Free),
                1 => xref.insert(
                    id,
                    XrefEntry::Normal {
                        offset: field2,
                        generation: u16::try_from(field3).unwrap_or(u16::MAX),
                    },
                ),
                2 => xref.insert(
                    id,
                    XrefEntry::Compressed {
                        container: field2,
                        index: u16::try_from(field3).unwrap_or(u16::MAX),
                    },
                ),
                // Unknown types are references to the null object.
                _ => {}
            }
        }
    }

    dict.remove(b"Length");
    dict.remove(b"W");
    dict.remove(b"Index");
    Ok((xref, dict))
}

fn read_big_endian_integer(reader: &mut Cursor<Vec<u8>>, buffer: &mut [u8]) -> Result<u32> {
    reader.read_exact(buffer)?;
    Ok(buffer.iter().fold(0, |value, &byte| (value << 8) | u32::from(byte)))
}

fn parse_integer_array(array: &Object) -> Result<Vec<i64>> {
    array.as_array()?.iter().map(Object::as_i64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn newer_entries_win_merge() {
        let mut newer = Xref::new(3);
        newer.insert(1, XrefEntry::Normal { offset: 500, generation: 0 });

        let mut older = Xref::new(3);
        older.insert(1, XrefEntry::Normal { offset: 15, generation: 0 });
        older.insert(2, XrefEntry::Normal { offset: 80, generation: 0 });

        newer.merge(older);
        assert_eq!(newer.get(1), Some(&XrefEntry::Normal { offset: 500, generation: 0 }));
        assert_eq!(newer.get(2), Some(&XrefEntry::Normal { offset: 80, generation: 0 }));
        assert_eq!(newer.max_id(), 2);
    }

    #[test]
    fn hidden_entries_replace_free_ones() {
        let mut table = Xref::new(4);
        table.insert(1, XrefEntry::Free);
        table.insert(2, XrefEntry::Normal { offset: 40, generation: 0 });

        let mut stream = Xref::new(4);
        stream.insert(1, XrefEntry::Compressed { container: 3, index: 0 });
        stream.insert(2, XrefEntry::Normal { offset: 999, generation: 0 });
        stream.insert(3, XrefEntry::Normal { offset: 90, generation: 0 });

        table.merge_hidden(stream);
        assert_eq!(table.get(1), Some(&XrefEntry::Compressed { container: 3, index: 0 }));
        assert_eq!(table.get(2), Some(&XrefEntry::Normal { offset: 40, generation: 0 }));
        assert_eq!(table.get(3), Some(&XrefEntry::Normal { offset: 90, generation: 0 }));
    }

    #[test]
    fn decode_stream_entries() {
        #[rustfmt::skip]
        let content = vec![
            0, 0, 0, 0xFF,
            1, 0x01, 0x2C, 0,
            2, 0, 7, 3,
        ];
        let stream = Stream::new(
            dictionary! {
                "Type" => "XRef",
                "Size" => 8,
                "Index" => vec![0.into(), 1.into(), 5.into(), 2.into()],
                "W" => vec![1.into(), 2.into(), 1.into()],
                "Root" => Object::Reference((6, 0)),
            },
            content,
        );

        let (xref, trailer) = decode_xref_stream(&stream).unwrap();
        assert_eq!(xref.size, 8);
        assert_eq!(xref.get(0), Some(&XrefEntry::Free));
        assert_eq!(xref.get(5), Some(&XrefEntry::Normal { offset: 300, generation: 0 }));
        assert_eq!(xref.get(6), Some(&XrefEntry::Compressed { container: 7, index: 3 }));
        assert_eq!(xref.get(1), None);
        assert_eq!(trailer.get(b"Root").and_then(Object::as_reference).unwrap(), (6, 0));
        assert!(!trailer.has(b"W"));
        assert!(!trailer.has(b"Length"));
    }

    #[test]
    fn short_stream_is_an_error() {
        let stream = Stream::new(
            dictionary! { "Type" => "XRef", "Size" => 2, "W" => vec![1.into(), 2.into(), 1.into()] },
            vec![1, 0, 9, 0],
        );
        assert!(decode_xref_stream(&stream).is_err());
    }
}
