use log::{debug, warn};
use std::cmp;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{ParseError, XrefError};
use crate::object_stream::ObjectStream;
use crate::parser::{self, ParserInput};
use crate::xref::{self, Xref, XrefEntry};
use crate::{Dictionary, Document, Error, Object, ObjectId, Result};

/// Trailer entries carried over from a cross-reference stream dictionary.
const TRAILER_KEYS: [&[u8]; 4] = [b"Root", b"Info", b"ID", b"Encrypt"];

impl Document {
    /// Load a PDF document from a specified file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::IO(err),
        })?;
        let capacity = file.metadata().map(|m| m.len() as usize).unwrap_or_default();

        let mut buffer = Vec::with_capacity(capacity);
        file.read_to_end(&mut buffer)?;
        Self::load_mem(&buffer)
    }

    /// Load a PDF document from a memory slice.
    pub fn load_mem(buffer: &[u8]) -> Result<Document> {
        Reader {
            buffer,
            document: Document::new(),
        }
        .read()
    }
}

pub struct Reader<'a> {
    pub buffer: &'a [u8],
    pub document: Document,
}

impl Reader<'_> {
    /// Read whole document.
    pub fn read(mut self) -> Result<Document> {
        let offset = self.buffer.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
        self.buffer = &self.buffer[offset..];

        let version =
            parser::header(ParserInput::new_extra(self.buffer, "header")).ok_or(ParseError::InvalidFileHeader)?;

        // The binary mark comment, when present, is on the line after the header.
        if let Some(pos) = self.buffer.iter().position(|&byte| byte == b'\n') {
            if let Some(binary_mark) =
                parser::binary_mark(ParserInput::new_extra(&self.buffer[pos + 1..], "binary_mark"))
            {
                if !binary_mark.is_empty() && binary_mark.iter().all(|&byte| byte >= 128) {
                    self.document.binary_mark = binary_mark;
                }
            }
        }
        self.document.version = version;

        let xref = match self.read_xref_chain() {
            Ok((xref, trailer)) => {
                self.document.max_id = xref.size.saturating_sub(1);
                self.document.trailer = trailer;
                self.load_objects(&xref);
                Some(xref)
            }
            Err(err) => {
                warn!("cross-reference table is unusable ({err}), scanning for objects");
                self.recover()?;
                None
            }
        };

        self.resolve_stream_contents();
        self.expand_object_streams(xref.as_ref());

        if let Some(max_id) = self.document.objects.keys().map(|id| id.0).max() {
            self.document.max_id = cmp::max(self.document.max_id, max_id);
        }

        Ok(self.document)
    }

    /// Follow `startxref` and every `/Prev` link, including the `/XRefStm` of hybrid files.
    fn read_xref_chain(&self) -> Result<(Xref, Dictionary)> {
        let xref_start = Self::get_xref_start(self.buffer)?;
        if xref_start > self.buffer.len() {
            return Err(Error::Xref(XrefError::Start));
        }

        let (mut xref, mut trailer) = self.read_xref_section(xref_start)?;

        let mut already_seen = HashSet::from([xref_start as i64]);
        let mut prev_xref_start = trailer.remove(b"Prev");
        while let Some(prev) = prev_xref_start.and_then(|offset| offset.as_i64().ok()) {
            if !already_seen.insert(prev) {
                break;
            }
            if prev < 0 || prev as usize > self.buffer.len() {
                return Err(Error::Xref(XrefError::PrevStart));
            }

            let (prev_xref, prev_trailer) = self.read_xref_section(prev as usize)?;
            xref.merge(prev_xref);
            prev_xref_start = prev_trailer.get(b"Prev").cloned().ok();
        }
        trailer.remove(b"XRefStm");

        let xref_entry_count = xref.max_id().checked_add(1).ok_or(ParseError::InvalidXref)?;
        if xref.size != xref_entry_count {
            warn!(
                "Size entry of trailer dictionary is {}, correct value is {}.",
                xref.size, xref_entry_count
            );
            xref.size = xref_entry_count;
        }

        Ok((xref, trailer))
    }

    /// A classic table with its trailer, or a cross-reference stream.
    ///
    /// A classic trailer carrying `/XRefStm` also gets the entries of that stream.
    fn read_xref_section(&self, offset: usize) -> Result<(Xref, Dictionary)> {
        if let Ok((mut xref, trailer)) = parser::xref_and_trailer(ParserInput::new_extra(&self.buffer[offset..], "xref"))
        {
            if let Some(stream_start) = trailer.get(b"XRefStm").ok().and_then(|start| start.as_i64().ok()) {
                let stream_start = usize::try_from(stream_start)
                    .ok()
                    .filter(|&start| start < self.buffer.len())
                    .ok_or(Error::Xref(XrefError::StreamStart))?;
                let (stream_xref, _) = self.read_xref_stream(stream_start)?;
                xref.merge_hidden(stream_xref);
            }
            return Ok((xref, trailer));
        }

        self.read_xref_stream(offset)
    }

    fn read_xref_stream(&self, offset: usize) -> Result<(Xref, Dictionary)> {
        let (_, object) = self.read_object(offset, None)?;
        let Object::Stream(mut stream) = object else {
            return Err(ParseError::InvalidXref.into());
        };
        if !stream.dict.has_type(b"XRef") {
            return Err(ParseError::InvalidXref.into());
        }
        // Cross-reference streams must have a direct length, but some writers get it wrong.
        if let Some(start) = stream.start_position.take() {
            let end = Self::find_endstream(self.buffer, start)
                .ok_or_else(|| ParseError::InvalidStream("stream has no end".to_string()))?;
            stream.set_content(self.buffer[start..end].to_vec());
        }
        debug!("cross-reference stream at byte {offset}");
        xref::decode_xref_stream(&stream)
    }

    fn load_objects(&mut self, xref: &Xref) {
        for (&number, entry) in &xref.entries {
            match *entry {
                XrefEntry::Normal { offset, generation } => {
                    match self.read_object(offset as usize, Some((number, generation))) {
                        Ok((id, object)) => {
                            self.document.objects.insert(id, object);
                        }
                        Err(err) => warn!("object {number} {generation} R at offset {offset}: {err}"),
                    }
                }
                // Compressed entries are picked up when their object streams are expanded.
                XrefEntry::Compressed { .. } | XrefEntry::Free => {}
            }
        }
    }

    /// Rebuild the object table by scanning for `N G obj` headers.
    fn recover(&mut self) -> Result<()> {
        let mut objects = BTreeMap::new();
        let mut xref_stream_dict = None;

        let mut pos = 0;
        while let Some(found) = Self::find(self.buffer, b"obj", pos) {
            pos = found + 3;
            if self.buffer.get(found + 3).is_some_and(|&c| !Self::ends_token(c)) {
                continue;
            }
            let Some(start) = Self::object_header_start(self.buffer, found) else {
                continue;
            };
            if let Ok((id, object)) = self.read_object(start, None) {
                if let Object::Stream(stream) = &object {
                    if stream.dict.has_type(b"XRef") {
                        xref_stream_dict = Some(stream.dict.clone());
                    }
                }
                // Later definitions belong to later incremental updates.
                objects.insert(id, object);
            }
        }

        if objects.is_empty() {
            return Err(Error::Xref(XrefError::Start));
        }
        debug!("recovered {} objects", objects.len());

        let mut trailer = Dictionary::new();
        let mut pos = 0;
        while let Some(found) = Self::find(self.buffer, b"trailer", pos) {
            pos = found + 7;
            if let Some(dict) = parser::trailer_dictionary(ParserInput::new_extra(&self.buffer[found..], "trailer")) {
                for (key, value) in &dict {
                    trailer.set(key.clone(), value.clone());
                }
            }
        }
        if !trailer.has(b"Root") {
            if let Some(dict) = xref_stream_dict {
                for key in TRAILER_KEYS {
                    if let Ok(value) = dict.get(key) {
                        trailer.set(key, value.clone());
                    }
                }
            }
        }
        trailer.remove(b"Prev");
        trailer.remove(b"XRefStm");

        self.document.objects = objects;
        self.document.trailer = trailer;
        Ok(())
    }

    /// Fill in streams whose /Length could not be used while parsing.
    fn resolve_stream_contents(&mut self) {
        let pending: Vec<ObjectId> = self
            .document
            .objects
            .iter()
            .filter_map(|(id, object)| match object {
                Object::Stream(stream) if stream.content.is_empty() && stream.start_position.is_some() => Some(*id),
                _ => None,
            })
            .collect();

        for object_id in pending {
            if let Err(err) = self.read_stream_content(object_id) {
                warn!("stream {} {} R: {err}", object_id.0, object_id.1);
            }
        }
    }

    fn read_stream_content(&mut self, object_id: ObjectId) -> Result<()> {
        let length = self.get_stream_length(object_id);
        let buffer = self.buffer;
        let stream = self
            .document
            .get_object_mut(object_id)
            .and_then(Object::as_stream_mut)?;
        let start = stream
            .start_position
            .ok_or_else(|| ParseError::InvalidStream("missing start position".to_string()))?;

        let end = length
            .and_then(|length| start.checked_add(length))
            .filter(|&end| end <= buffer.len() && Self::endstream_follows(buffer, end))
            .or_else(|| Self::find_endstream(buffer, start))
            .ok_or_else(|| ParseError::InvalidStream("stream has no end".to_string()))?;

        stream.set_content(buffer[start..end].to_vec());
        stream.start_position = None;
        Ok(())
    }

    fn get_stream_length(&self, object_id: ObjectId) -> Option<usize> {
        let stream = self.document.objects.get(&object_id)?.as_stream().ok()?;
        let length = stream.dict.get(b"Length").ok()?;
        let (_, length) = self.document.dereference(length).ok()?;
        length.as_i64().ok().and_then(|length| usize::try_from(length).ok())
    }

    fn endstream_follows(buffer: &[u8], end: usize) -> bool {
        let rest = &buffer[end..];
        let skip = rest.iter().take_while(|c| c.is_ascii_whitespace()).count();
        rest[skip..].starts_with(b"endstream")
    }

    /// End of the data before the next `endstream`, without the end of line that precedes it.
    fn find_endstream(buffer: &[u8], start: usize) -> Option<usize> {
        let mut end = Self::find(buffer, b"endstream", start)?;
        if end > start && buffer[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && buffer[end - 1] == b'\r' {
            end -= 1;
        }
        Some(end)
    }

    /// Unpack `/Type /ObjStm` streams.
    ///
    /// When the cross-reference data places an object in a given container, copies found in other
    /// containers are stale and skipped.
    fn expand_object_streams(&mut self, xref: Option<&Xref>) {
        if self.document.is_encrypted() {
            // Packed objects stay encrypted until the document is decrypted.
            return;
        }

        let mut expanded = BTreeMap::new();
        for (id, object) in &self.document.objects {
            let Object::Stream(stream) = object else {
                continue;
            };
            if !stream.dict.has_type(b"ObjStm") {
                continue;
            }
            match ObjectStream::new(stream) {
                Ok(object_stream) => {
                    for (packed_id, packed) in object_stream.objects {
                        let listed = xref.and_then(|xref| xref.get(packed_id.0));
                        if matches!(listed, Some(XrefEntry::Compressed { container, .. }) if *container != id.0) {
                            continue;
                        }
                        expanded.entry(packed_id).or_insert(packed);
                    }
                }
                Err(err) => warn!("object stream {} {} R: {err}", id.0, id.1),
            }
        }

        // Directly stored objects are never replaced by packed ones.
        for (id, object) in expanded {
            self.document.objects.entry(id).or_insert(object);
        }
    }

    fn read_object(&self, offset: usize, expected_id: Option<ObjectId>) -> Result<(ObjectId, Object)> {
        parser::indirect_object(ParserInput::new_extra(self.buffer, "indirect object"), offset, expected_id)
    }

    fn get_xref_start(buffer: &[u8]) -> Result<usize> {
        let seek_pos = buffer.len() - cmp::min(buffer.len(), 512);
        Self::search_substring(buffer, b"%%EOF", seek_pos)
            .and_then(|eof_pos| if eof_pos > 25 { Some(eof_pos) } else { None })
            .and_then(|eof_pos| Self::search_substring(buffer, b"startxref", eof_pos - 25))
            .and_then(|xref_pos| parser::xref_start(ParserInput::new_extra(&buffer[xref_pos..], "xref")))
            .and_then(|startxref| usize::try_from(startxref).ok())
            .ok_or(Error::Xref(XrefError::Start))
    }

    /// Last occurrence of `pattern` at or after `start_pos`.
    fn search_substring(buffer: &[u8], pattern: &[u8], start_pos: usize) -> Option<usize> {
        let tail = buffer.get(start_pos..)?;
        tail.windows(pattern.len())
            .rposition(|window| window == pattern)
            .map(|pos| start_pos + pos)
    }

    /// First occurrence of `pattern` at or after `start_pos`.
    fn find(buffer: &[u8], pattern: &[u8], start_pos: usize) -> Option<usize> {
        let tail = buffer.get(start_pos..)?;
        tail.windows(pattern.len())
            .position(|window| window == pattern)
            .map(|pos| start_pos + pos)
    }

    fn ends_token(c: u8) -> bool {
        c.is_ascii_whitespace() || b"<[(/%".contains(&c) || c == 0
    }

    /// Walk back from an `obj` keyword over `N G ` to the start of the header.
    fn object_header_start(buffer: &[u8], keyword: usize) -> Option<usize> {
        let mut pos = keyword;
        let skip_back = |pos: &mut usize, accept: fn(&u8) -> bool| {
            let end = *pos;
            while *pos > 0 && accept(&buffer[*pos - 1]) {
                *pos -= 1;
            }
            end - *pos
        };

        if skip_back(&mut pos, u8::is_ascii_whitespace) == 0 {
            return None;
        }
        if skip_back(&mut pos, u8::is_ascii_digit) == 0 {
            return None;
        }
        if skip_back(&mut pos, u8::is_ascii_whitespace) == 0 {
            return None;
        }
        if skip_back(&mut pos, u8::is_ascii_digit) == 0 {
            return None;
        }
        if pos > 0 && !Self::ends_token(buffer[pos - 1]) {
            return None;
        }
        Some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MAX_BRACKET;

    /// Lay out `objects` as a classic file, returning the bytes.
    fn build_file(objects: &[&str], trailer: &str) -> Vec<u8> {
        let mut file = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();
        for object in objects {
            offsets.push(file.len());
            file.extend_from_slice(object.as_bytes());
        }
        let xref_start = file.len();
        file.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            file.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        file.extend_from_slice(format!("trailer\n{trailer}\nstartxref\n{xref_start}\n%%EOF\n").as_bytes());
        file
    }

    fn simple_objects(content: &str) -> Vec<String> {
        vec![
            "1 0 obj<</Type/Pages/Kids[4 0 R]/Count 1/Resources 3 0 R/MediaBox[0 0 595 842]>>endobj\n".to_string(),
            "2 0 obj<</Type/Font/Subtype/Type1/BaseFont/Courier>>endobj\n".to_string(),
            "3 0 obj<</Font<</F1 2 0 R>>>>endobj\n".to_string(),
            "4 0 obj<</Type/Page/Parent 1 0 R/Contents 5 0 R>>endobj\n".to_string(),
            format!(
                "5 0 obj<</Length {}>>stream\nBT /F1 48 Tf 100 600 Td ({content}) Tj ET\nendstream endobj\n",
                content.len() + 32
            ),
            "6 0 obj<</Type/Catalog/Pages 1 0 R>>endobj\n".to_string(),
        ]
    }

    fn load(objects: &[String], trailer: &str) -> Result<Document> {
        let objects: Vec<&str> = objects.iter().map(String::as_str).collect();
        Document::load_mem(&build_file(&objects, trailer))
    }

    #[test]
    #[should_panic(expected = "Xref(Start)")]
    fn load_short_document() {
        let _doc = Document::load_mem(b"%PDF-1.5\n%%EOF\n").unwrap();
    }

    #[test]
    fn load_simple_document() {
        let doc = load(&simple_objects("Hello"), "<</Root 6 0 R/Size 7>>").unwrap();
        assert_eq!(doc.version, "1.5");
        assert_eq!(doc.binary_mark, b"\xE2\xE3\xCF\xD3");
        assert_eq!(doc.max_id, 6);
        assert_eq!(doc.get_pages().unwrap().len(), 1);

        let content = doc.get_object((5, 0)).and_then(Object::as_stream).unwrap();
        assert_eq!(content.content, b"BT /F1 48 Tf 100 600 Td (Hello) Tj ET");
    }

    #[test]
    fn load_document_with_preceding_bytes() {
        let objects = simple_objects("Hello");
        let objects: Vec<&str> = objects.iter().map(String::as_str).collect();
        let mut content = b"garbage".to_vec();
        content.extend(build_file(&objects, "<</Root 6 0 R/Size 7>>"));

        let doc = Document::load_mem(&content).unwrap();
        assert_eq!(doc.version, "1.5");
        assert_eq!(doc.objects.len(), 6);
    }

    #[test]
    fn load_many_shallow_brackets() {
        let content = "()".repeat(MAX_BRACKET * 10);
        let doc = load(&simple_objects(&content), "<</Root 6 0 R/Size 7>>").unwrap();
        let stream = doc.get_object((5, 0)).and_then(Object::as_stream).unwrap();
        assert!(stream.content.ends_with(b") Tj ET"));
    }

    #[test]
    fn load_too_deep_brackets() {
        let content = format!("{}{}", "(".repeat(MAX_BRACKET + 1), ")".repeat(MAX_BRACKET + 1));
        let doc = load(&simple_objects(&content), "<</Root 6 0 R/Size 7>>").unwrap();
        // Stream data is raw bytes, nesting only matters to string parsing.
        let stream = doc.get_object((5, 0)).and_then(Object::as_stream).unwrap();
        assert_eq!(stream.content.len(), content.len() + 32);
    }

    #[test]
    fn indirect_length_is_resolved() {
        let mut objects = simple_objects("Hello");
        objects[4] = "5 0 obj<</Length 7 0 R>>stream\nBT /F1 48 Tf 100 600 Td (Hello) Tj ET\nendstream endobj\n".to_string();
        objects.push("7 0 obj 37 endobj\n".to_string());

        let doc = load(&objects, "<</Root 6 0 R/Size 8>>").unwrap();
        let stream = doc.get_object((5, 0)).and_then(Object::as_stream).unwrap();
        assert_eq!(stream.content, b"BT /F1 48 Tf 100 600 Td (Hello) Tj ET");
        assert_eq!(stream.start_position, None);
    }

    #[test]
    fn wrong_length_falls_back_to_endstream() {
        let mut objects = simple_objects("Hello");
        objects[4] = "5 0 obj<</Length 400>>stream\nBT ET\nendstream endobj\n".to_string();

        let doc = load(&objects, "<</Root 6 0 R/Size 7>>").unwrap();
        let stream = doc.get_object((5, 0)).and_then(Object::as_stream).unwrap();
        assert_eq!(stream.content, b"BT ET");
    }

    #[test]
    fn broken_xref_is_recovered() {
        let objects = simple_objects("Hello");
        let objects: Vec<&str> = objects.iter().map(String::as_str).collect();
        let mut file = build_file(&objects, "<</Root 6 0 R/Size 7>>");
        let xref = Reader::find(&file, b"xref\n", 0).unwrap();
        file[xref..xref + 4].copy_from_slice(b"XXXX");

        let doc = Document::load_mem(&file).unwrap();
        assert_eq!(doc.objects.len(), 6);
        assert_eq!(doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap(), (6, 0));
        assert_eq!(doc.get_pages().unwrap().len(), 1);
    }

    #[test]
    fn object_stream_entries_do_not_override() {
        let mut objects = simple_objects("Hello");
        // Object 2 is stored directly and packed; object 8 only packed.
        objects.push("7 0 obj<</Type/ObjStm/N 2/First 8/Length 20>>stream\n2 0 8 5 null (eight)\nendstream endobj\n".to_string());

        let doc = load(&objects, "<</Root 6 0 R/Size 9>>").unwrap();
        assert!(doc.get_dictionary((2, 0)).unwrap().has_type(b"Font"));
        assert_eq!(doc.get_object((8, 0)).and_then(Object::as_str).unwrap(), b"eight");
        assert_eq!(doc.max_id, 8);
    }

    /// `id 0 obj` holding a cross-reference stream with `/W [1 4 2]`.
    fn xref_stream(id: u32, index: &str, entries: &[(u8, u32, u16)], extra: &str) -> Vec<u8> {
        let mut data = Vec::new();
        for &(kind, field2, field3) in entries {
            data.push(kind);
            data.extend_from_slice(&field2.to_be_bytes());
            data.extend_from_slice(&field3.to_be_bytes());
        }
        let mut object =
            format!("{id} 0 obj<</Type/XRef/W[1 4 2]/Index[{index}]/Length {}{extra}>>stream\n", data.len())
                .into_bytes();
        object.extend_from_slice(&data);
        object.extend_from_slice(b"\nendstream endobj\n");
        object
    }

    #[test]
    fn xref_stream_is_followed() {
        let mut file = b"%PDF-1.5\n".to_vec();
        let mut entries = vec![(0, 0, 65535)];
        for object in simple_objects("Hello") {
            entries.push((1, file.len() as u32, 0));
            file.extend_from_slice(object.as_bytes());
        }
        // Object 8 is packed twice. The cross-reference stream names container 9 as current.
        let old_container = file.len() as u32;
        file.extend_from_slice(b"7 0 obj<</Type/ObjStm/N 1/First 4/Length 9>>stream\n8 0 (old)\nendstream endobj\n");
        let new_container = file.len() as u32;
        file.extend_from_slice(b"9 0 obj<</Type/ObjStm/N 1/First 4/Length 9>>stream\n8 0 (new)\nendstream endobj\n");
        let xref_start = file.len();
        entries.extend([(1, old_container, 0), (2, 9, 0), (1, new_container, 0), (1, xref_start as u32, 0)]);
        file.extend(xref_stream(10, "0 11", &entries, "/Size 11/Root 6 0 R"));
        file.extend_from_slice(format!("startxref\n{xref_start}\n%%EOF\n").as_bytes());

        let doc = Document::load_mem(&file).unwrap();
        assert_eq!(doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap(), (6, 0));
        assert!(!doc.trailer.has(b"W"));
        assert_eq!(doc.get_pages().unwrap().len(), 1);
        assert_eq!(doc.get_object((8, 0)).and_then(Object::as_str).unwrap(), b"new");
        assert_eq!(doc.max_id, 10);
    }

    #[test]
    fn hybrid_file_reads_hidden_objects() {
        // The catalog, the page tree and their object stream are only listed in the /XRefStm stream.
        let packed = b"1 0 6 74 <</Type/Pages/Kids[4 0 R]/Count 1/Resources 3 0 R/MediaBox[0 0 595 842]>> <</Type/Catalog/Pages 1 0 R>>";
        let mut file = b"%PDF-1.5\n".to_vec();
        let mut table = "xref\n0 2\n0000000000 65535 f \n0000000000 65535 f \n2 4\n".to_string();
        for object in &simple_objects("Hello")[1..5] {
            table.push_str(&format!("{:010} 00000 n \n", file.len()));
            file.extend_from_slice(object.as_bytes());
        }

        let container = file.len() as u32;
        file.extend_from_slice(format!("7 0 obj<</Type/ObjStm/N 2/First 9/Length {}>>stream\n", packed.len()).as_bytes());
        file.extend_from_slice(packed);
        file.extend_from_slice(b"\nendstream endobj\n");

        let stream_start = file.len();
        let hidden = [(2, 7, 0), (2, 7, 1), (1, container, 0), (1, stream_start as u32, 0)];
        file.extend(xref_stream(8, "1 1 6 3", &hidden, "/Size 9"));

        let table_start = file.len();
        table.push_str(&format!(
            "trailer\n<</Size 9/Root 6 0 R/XRefStm {stream_start}>>\nstartxref\n{table_start}\n%%EOF\n"
        ));
        file.extend_from_slice(table.as_bytes());

        let doc = Document::load_mem(&file).unwrap();
        assert!(!doc.trailer.has(b"XRefStm"));
        assert!(doc.get_dictionary((6, 0)).unwrap().has_type(b"Catalog"));
        assert_eq!(doc.get_pages().unwrap().len(), 1);
        assert_eq!(doc.max_id, 8);
    }

    #[test]
    fn bad_xref_stream_offset_falls_back_to_scan() {
        let objects = simple_objects("Hello");
        let objects: Vec<&str> = objects.iter().map(String::as_str).collect();
        let file = build_file(&objects, "<</Root 6 0 R/Size 7/XRefStm 99999>>");

        let doc = Document::load_mem(&file).unwrap();
        assert_eq!(doc.objects.len(), 6);
        assert_eq!(doc.get_pages().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        assert!(matches!(Document::load(&path), Err(Error::InputNotFound { path: p }) if p == path));
    }

    #[test]
    fn header_is_required() {
        assert!(matches!(
            Document::load_mem(b"not a pdf"),
            Err(Error::Parse(ParseError::InvalidFileHeader))
        ));
    }
}
