use crate::error::ParseError;
use crate::parser::{self, ParserInput};
use crate::{Object, ObjectId, Result, Stream};
use std::collections::BTreeMap;
use std::str::FromStr;

use log::warn;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Objects packed into a `/Type /ObjStm` stream.
#[derive(Debug)]
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    pub fn new(stream: &Stream) -> Result<ObjectStream> {
        let content = stream.decompressed_content()?;
        if content.is_empty() {
            return Ok(ObjectStream {
                objects: BTreeMap::new(),
            });
        }

        let first_offset = stream
            .dict
            .get(b"First")
            .and_then(Object::as_i64)
            .ok()
            .and_then(|first| usize::try_from(first).ok())
            .ok_or_else(|| ParseError::InvalidObjectStream("missing /First".to_string()))?;
        let index_block = content
            .get(..first_offset)
            .ok_or_else(|| ParseError::InvalidObjectStream(format!("/First {first_offset} past end of stream")))?;

        let numbers: Vec<Option<u32>> = String::from_utf8_lossy(index_block)
            .split_whitespace()
            .map(|number| u32::from_str(number).ok())
            .collect();
        // Only complete (number, offset) pairs.
        let len = numbers.len() / 2 * 2;

        if let Ok(n) = stream.dict.get(b"N").and_then(Object::as_i64) {
            if Some(numbers.len() as i64) != n.checked_mul(2) {
                warn!("object stream: /N is {n} but the index holds {} entries", numbers.len() / 2);
            }
        }

        let parse_entry = |chunk: &[Option<u32>]| {
            let id = chunk[0]?;
            let offset = first_offset.checked_add(chunk[1]? as usize)?;

            if offset >= content.len() {
                warn!("object stream: offset of object {id} is out of bounds");
                return None;
            }
            let object = parser::direct_object(ParserInput::new_extra(&content[offset..], "object stream"))?;

            Some(((id, 0), object))
        };
        #[cfg(feature = "rayon")]
        let objects = numbers[..len].par_chunks(2).filter_map(parse_entry).collect();
        #[cfg(not(feature = "rayon"))]
        let objects = numbers[..len].chunks(2).filter_map(parse_entry).collect();

        Ok(ObjectStream { objects })
    }
}
