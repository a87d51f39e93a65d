use crate::error::GraphError;
use crate::{Dictionary, Error, Object, ObjectId, Result};
use std::collections::{BTreeMap, HashSet};

/// PDF document
#[derive(Debug, Clone)]
pub struct Document {
    /// The version of the PDF specification to which the file conforms.
    pub version: String,

    /// The binary mark written as a comment on the line after the header.
    pub binary_mark: Vec<u8>,

    /// The trailer gives the location of the cross-reference table and of certain special objects.
    pub trailer: Dictionary,

    /// The objects that make up the document contained in the file.
    pub objects: BTreeMap<ObjectId, Object>,

    /// Current maximum object id within the document.
    pub max_id: u32,
}

impl Document {
    /// Create new PDF document.
    pub fn new() -> Document {
        Document {
            version: "1.4".to_string(),
            binary_mark: b"\xE2\xE3\xCF\xD3".to_vec(),
            trailer: Dictionary::new(),
            objects: BTreeMap::new(),
            max_id: 0,
        }
    }

    /// Create a new PDF document with a specific version.
    pub fn with_version<S: Into<String>>(version: S) -> Document {
        let mut document = Self::new();
        document.version = version.into();
        document
    }

    /// Get object by object id, will iterate through reference chain.
    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        let object = self.objects.get(&id).ok_or(Error::ObjectNotFound(id))?;
        self.dereference(object).map(|(_, object)| object)
    }

    /// Get mutable reference to object by object id. Does not follow references.
    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::ObjectNotFound(id))
    }

    /// Follow references until a direct object is reached.
    ///
    /// Returns the id of the last reference followed, if any.
    pub fn dereference<'a>(&'a self, mut object: &'a Object) -> Result<(Option<ObjectId>, &'a Object)> {
        let mut nb_deref = 0;
        let mut id = None;

        while let Ok(ref_id) = object.as_reference() {
            id = Some(ref_id);
            object = self.objects.get(&ref_id).ok_or(Error::ObjectNotFound(ref_id))?;

            nb_deref += 1;
            if nb_deref > self.objects.len() {
                return Err(Error::ObjectNotFound(ref_id));
            }
        }

        Ok((id, object))
    }

    /// Get the dictionary for an object, following a reference if given one.
    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id).and_then(Object::as_dict)
    }

    /// Create a new object id.
    pub fn new_object_id(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    /// Add PDF object into document's object list.
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        let id = self.new_object_id();
        self.objects.insert(id, object.into());
        id
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.has(b"Encrypt")
    }

    /// Catalog dictionary referenced by the trailer's /Root.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self
            .trailer
            .get(b"Root")
            .map_err(|_| GraphError::MissingCatalog)?;
        let (_, catalog) = self.dereference(root).map_err(|_| GraphError::MissingCatalog)?;
        catalog.as_dict().map_err(|_| GraphError::MissingCatalog.into())
    }

    /// Collect all pages of the document, keyed by page number starting at 1.
    pub fn get_pages(&self) -> Result<BTreeMap<u32, ObjectId>> {
        let root = self
            .catalog()?
            .get(b"Pages")
            .and_then(Object::as_reference)
            .map_err(|_| GraphError::MissingPageTree)?;

        let mut pages = BTreeMap::new();
        let mut visited = HashSet::new();
        self.collect_pages(root, &mut pages, &mut visited)?;
        Ok(pages)
    }

    fn collect_pages(
        &self, node_id: ObjectId, pages: &mut BTreeMap<u32, ObjectId>, visited: &mut HashSet<ObjectId>,
    ) -> Result<()> {
        if !visited.insert(node_id) {
            return Err(GraphError::PageTreeCycle(node_id).into());
        }

        let node = self
            .get_dictionary(node_id)
            .map_err(|_| GraphError::UnsupportedObject(format!("page tree node {} {} R", node_id.0, node_id.1)))?;

        if node.has_type(b"Page") {
            let page_number = pages.len() as u32 + 1;
            pages.insert(page_number, node_id);
            return Ok(());
        }

        let kids = node.get(b"Kids").and_then(Object::as_array).map_err(|_| {
            GraphError::UnsupportedObject(format!("page tree node {} {} R has no /Kids", node_id.0, node_id.1))
        })?;
        for kid in kids {
            let kid_id = kid
                .as_reference()
                .map_err(|_| GraphError::UnsupportedObject(format!("direct object in /Kids of {} {} R", node_id.0, node_id.1)))?;
            self.collect_pages(kid_id, pages, visited)?;
        }

        Ok(())
    }

    /// Visit every reference inside `object`, depth first.
    pub(crate) fn visit_references<F>(object: &Object, visit: &mut F)
    where
        F: FnMut(ObjectId),
    {
        match object {
            Object::Reference(id) => visit(*id),
            Object::Array(array) => {
                for item in array {
                    Self::visit_references(item, visit);
                }
            }
            Object::Dictionary(dict) => {
                for (_, value) in dict {
                    Self::visit_references(value, visit);
                }
            }
            Object::Stream(stream) => {
                for (_, value) in &stream.dict {
                    Self::visit_references(value, visit);
                }
            }
            _ => {}
        }
    }

    /// Rewrite every reference inside `object`.
    pub(crate) fn map_references<F>(object: &mut Object, map: &mut F)
    where
        F: FnMut(ObjectId) -> ObjectId,
    {
        match object {
            Object::Reference(id) => *id = map(*id),
            Object::Array(array) => {
                for item in array {
                    Self::map_references(item, map);
                }
            }
            Object::Dictionary(dict) => {
                for (_, value) in dict.iter_mut() {
                    Self::map_references(value, map);
                }
            }
            Object::Stream(stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    Self::map_references(value, map);
                }
            }
            _ => {}
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Stream, dictionary};

    /// A one page document with an /Info dictionary.
    pub fn create_document() -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 48 Tf 100 600 Td (Hello) Tj ET".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Hello"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc
    }

    #[test]
    fn pages_are_numbered_in_order() {
        let doc = create_document();
        let pages = doc.get_pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert!(doc.get_dictionary(pages[&1]).unwrap().has_type(b"Page"));
    }

    #[test]
    fn missing_catalog_is_a_graph_error() {
        let mut doc = create_document();
        doc.trailer.remove(b"Root");
        assert!(matches!(
            doc.get_pages(),
            Err(Error::MalformedObjectGraph(GraphError::MissingCatalog))
        ));
    }

    #[test]
    fn page_tree_cycle_is_detected() {
        let mut doc = create_document();
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Kids", vec![Object::Reference(pages_id)]);

        assert!(matches!(
            doc.get_pages(),
            Err(Error::MalformedObjectGraph(GraphError::PageTreeCycle(id))) if id == pages_id
        ));
    }

    #[test]
    fn dereference_follows_chain() {
        let mut doc = Document::new();
        let target = doc.add_object(Object::Integer(7));
        let middle = doc.add_object(Object::Reference(target));
        let reference = Object::Reference(middle);
        let (id, object) = doc.dereference(&reference).unwrap();
        assert_eq!(id, Some(target));
        assert_eq!(object, &Object::Integer(7));

        assert!(matches!(doc.get_object((99, 0)), Err(Error::ObjectNotFound((99, 0)))));
    }
}
