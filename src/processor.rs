use std::collections::{BTreeMap, HashSet, VecDeque};

use log::{debug, info};

use crate::error::GraphError;
use crate::{Document, Object, ObjectId, Result};

/// Trailer entries whose references anchor the object graph.
const TRAILER_ROOTS: [&[u8]; 2] = [b"Root", b"Info"];

impl Document {
    /// Replace indirect stream /Length values with direct integers matching the content.
    pub fn inline_stream_lengths(&mut self) {
        for object in self.objects.values_mut() {
            if let Object::Stream(stream) = object {
                stream.dict.set("Length", stream.content.len() as i64);
            }
        }
    }

    /// Keep only the objects reachable from the trailer and number them densely from 1.
    ///
    /// Object streams and cross-reference streams are dropped; their contents were expanded on
    /// load and the writer emits a classic table. Every generation becomes 0.
    /// A reference to one of them from a kept object is an error.
    pub fn renumber_reachable(&mut self) -> Result<()> {
        let order = self.reachable_objects()?;

        let mapping: BTreeMap<ObjectId, ObjectId> = order
            .iter()
            .enumerate()
            .map(|(index, &old_id)| (old_id, (index as u32 + 1, 0)))
            .collect();

        let mut old_objects = std::mem::take(&mut self.objects);
        let mut rewrite = |id: ObjectId| mapping.get(&id).copied().unwrap_or(id);
        for old_id in &order {
            if let Some(mut object) = old_objects.remove(old_id) {
                Document::map_references(&mut object, &mut rewrite);
                self.objects.insert(mapping[old_id], object);
            }
        }
        for (_, value) in self.trailer.iter_mut() {
            Document::map_references(value, &mut rewrite);
        }

        let dropped = old_objects.len();
        if dropped > 0 {
            debug!("dropped {dropped} unreachable objects");
        }
        self.max_id = order.len() as u32;
        Ok(())
    }

    /// Breadth-first walk from the trailer, in discovery order.
    fn reachable_objects(&self) -> Result<Vec<ObjectId>> {
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();

        if !self.trailer.has(b"Root") {
            return Err(GraphError::MissingCatalog.into());
        }
        for key in TRAILER_ROOTS {
            let Ok(value) = self.trailer.get(key) else {
                continue;
            };
            let mut missing = None;
            Document::visit_references(value, &mut |id| {
                if !self.objects.contains_key(&id) {
                    missing.get_or_insert(id);
                } else if seen.insert(id) {
                    queue.push_back(id);
                }
            });
            if let Some(id) = missing {
                return Err(GraphError::DanglingTrailerReference(id).into());
            }
        }

        let mut order = Vec::new();
        while let Some(id) = queue.pop_front() {
            let Some(object) = self.objects.get(&id) else {
                continue;
            };
            if is_cross_reference_container(object) {
                return Err(GraphError::UnsupportedObject(format!(
                    "reference to object or cross-reference stream {} {} R",
                    id.0, id.1
                ))
                .into());
            }
            order.push(id);

            let mut missing = None;
            Document::visit_references(object, &mut |target| {
                if !self.objects.contains_key(&target) {
                    missing.get_or_insert(target);
                } else if seen.insert(target) {
                    queue.push_back(target);
                }
            });
            if let Some(to) = missing {
                return Err(GraphError::DanglingReference { from: id, to }.into());
            }
        }

        Ok(order)
    }

    /// Flate-compress every stream that has no filter yet and allows compression.
    pub fn compress(&mut self) -> Result<()> {
        let mut compressed = 0;
        for object in self.objects.values_mut() {
            if let Object::Stream(stream) = object {
                if stream.dict.has(b"Filter") || !stream.allows_compression {
                    continue;
                }
                stream.compress()?;
                if stream.dict.has(b"Filter") {
                    compressed += 1;
                }
            }
        }
        debug!("compressed {compressed} streams");
        Ok(())
    }

    /// Set /Producer in the document information dictionary, creating it when absent.
    pub fn set_producer(&mut self, producer: &str) -> Result<()> {
        let info_id = match self.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) if self.objects.contains_key(&id) => id,
            _ => {
                let id = self.add_object(crate::Dictionary::new());
                self.trailer.set("Info", id);
                id
            }
        };

        let info = self.get_object_mut(info_id).and_then(Object::as_dict_mut)?;
        info.set("Producer", Object::string_literal(producer));
        info!("producer set to {producer:?}");
        Ok(())
    }
}

fn is_cross_reference_container(object: &Object) -> bool {
    matches!(object, Object::Stream(stream) if stream.dict.has_type(b"ObjStm") || stream.dict.has_type(b"XRef"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::create_document;
    use crate::{Error, Stream, dictionary};

    #[test]
    fn unreachable_objects_are_dropped() {
        let mut doc = create_document();
        doc.add_object(Object::string_literal("orphan"));
        let before = doc.objects.len();

        doc.renumber_reachable().unwrap();
        assert_eq!(doc.objects.len(), before - 1);
        assert_eq!(doc.max_id, doc.objects.len() as u32);
        let ids: Vec<u32> = doc.objects.keys().map(|id| id.0).collect();
        assert_eq!(ids, (1..=doc.max_id).collect::<Vec<_>>());
        assert_eq!(doc.get_pages().unwrap().len(), 1);
    }

    #[test]
    fn references_follow_renumbering() {
        let mut doc = create_document();
        // Shift everything away from 1 and give one object a non-zero generation.
        let objects = std::mem::take(&mut doc.objects);
        for ((number, _), mut object) in objects {
            Document::map_references(&mut object, &mut |(n, _)| (n + 100, if n == 1 { 3 } else { 0 }));
            doc.objects.insert((number + 100, if number == 1 { 3 } else { 0 }), object);
        }
        for (_, value) in doc.trailer.iter_mut() {
            Document::map_references(value, &mut |(n, _)| (n + 100, 0));
        }

        doc.renumber_reachable().unwrap();
        assert!(doc.objects.keys().all(|&(number, generation)| number <= doc.max_id && generation == 0));
        let catalog = doc.catalog().unwrap();
        // Catalog and info come first, then the page tree.
        assert_eq!(catalog.get(b"Pages").unwrap(), &Object::Reference((3, 0)));
        assert_eq!(doc.get_pages().unwrap().len(), 1);
    }

    #[test]
    fn dangling_reference_is_reported() {
        let mut doc = create_document();
        let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
        doc.get_object_mut(catalog_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Outlines", Object::Reference((404, 0)));

        match doc.renumber_reachable() {
            Err(Error::MalformedObjectGraph(GraphError::DanglingReference { from, to })) => {
                assert_eq!(from, catalog_id);
                assert_eq!(to, (404, 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dangling_trailer_reference_is_reported() {
        let mut doc = create_document();
        doc.trailer.set("Info", Object::Reference((77, 0)));
        assert!(matches!(
            doc.renumber_reachable(),
            Err(Error::MalformedObjectGraph(GraphError::DanglingTrailerReference((77, 0))))
        ));
    }

    #[test]
    fn object_streams_are_not_kept() {
        let mut doc = create_document();
        let obj_stm = doc.add_object(Stream::new(dictionary! { "Type" => "ObjStm", "N" => 0, "First" => 0 }, vec![]));
        doc.add_object(Stream::new(dictionary! { "Type" => "XRef" }, vec![]));

        doc.renumber_reachable().unwrap();
        assert!(!doc.objects.values().any(is_cross_reference_container));

        let mut doc = create_document();
        let obj_stm_ref = doc.add_object(Stream::new(dictionary! { "Type" => "ObjStm" }, vec![]));
        let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
        doc.get_object_mut(catalog_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Extra", obj_stm_ref);
        assert!(matches!(
            doc.renumber_reachable(),
            Err(Error::MalformedObjectGraph(GraphError::UnsupportedObject(_)))
        ));
        assert_ne!(obj_stm, obj_stm_ref);
    }

    #[test]
    fn lengths_become_direct() {
        let mut doc = Document::new();
        let length_id = doc.add_object(Object::Integer(99));
        let mut stream = Stream::new(dictionary! {}, b"abc".to_vec());
        stream.dict.set("Length", length_id);
        let stream_id = doc.add_object(stream);

        doc.inline_stream_lengths();
        let stream = doc.get_object(stream_id).and_then(Object::as_stream).unwrap();
        assert_eq!(stream.dict.get(b"Length").unwrap(), &Object::Integer(3));
    }

    #[test]
    fn producer_creates_info() {
        let mut doc = create_document();
        doc.trailer.remove(b"Info");
        doc.set_producer("pdfseal").unwrap();

        let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(info.get(b"Producer").and_then(Object::as_str).unwrap(), b"pdfseal");
    }

    #[test]
    fn compress_skips_filtered_streams() {
        let mut doc = Document::new();
        let plain = doc.add_object(Stream::new(dictionary! {}, b"0 0 m 100 100 l S ".repeat(50)));
        let filtered = doc.add_object(Stream::new(dictionary! { "Filter" => "DCTDecode" }, vec![0xFF; 200]));
        let font = doc.add_object(Stream::new(dictionary! {}, vec![0u8; 500]).with_compression(false));

        doc.compress().unwrap();
        let plain = doc.get_object(plain).and_then(Object::as_stream).unwrap();
        assert_eq!(plain.filters().unwrap(), vec![&b"FlateDecode"[..]]);
        assert_eq!(plain.decompressed_content().unwrap(), b"0 0 m 100 100 l S ".repeat(50));
        let filtered = doc.get_object(filtered).and_then(Object::as_stream).unwrap();
        assert_eq!(filtered.content, vec![0xFF; 200]);
        let font = doc.get_object(font).and_then(Object::as_stream).unwrap();
        assert!(font.filters().unwrap().is_empty());
    }
}
