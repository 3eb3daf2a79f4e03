//! Decoded documents and their binary format.
//!
//! The format is a bincode [`DocHeader`] followed by a bincode [`DocContent`]. Documents written by
//! a different format version are rejected rather than misread.

use crate::error::Error;
use crate::variables::VariableMap;
use crate::view::View;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Bump whenever any serialized type changes shape.
pub const CURRENT_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocHeader {
    pub version: u32,
}

impl DocHeader {
    pub fn current() -> DocHeader {
        DocHeader {
            version: CURRENT_VERSION,
        }
    }
}

/// A document or branch known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    pub id: String,
    pub name: String,
}

/// One encoding of an image at a given pixel density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub density: f32,
    pub bytes: Vec<u8>,
}

/// Image key -> encodings at various densities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageTable {
    images: HashMap<String, Vec<EncodedImage>>,
}

impl ImageTable {
    pub fn insert(&mut self, key: &str, image: EncodedImage) {
        self.images.entry(key.to_string()).or_default().push(image);
    }

    /// Picks the lowest density at or above `density`, or the highest available if none is
    /// dense enough.
    pub fn lookup(&self, key: &str, density: f32) -> Option<&EncodedImage> {
        let candidates = self.images.get(key)?;
        let dense_enough = candidates
            .iter()
            .filter(|img| img.density >= density)
            .min_by(|a, b| a.density.total_cmp(&b.density));
        dense_enough.or_else(|| {
            candidates
                .iter()
                .max_by(|a, b| a.density.total_cmp(&b.density))
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A decoded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocContent {
    pub doc_id: String,
    pub name: String,
    pub last_modified: String,
    /// Server-side version, changes on e.g. branch creation even when `last_modified` doesn't.
    pub version: String,
    /// Top-level node name -> view.
    pub views: HashMap<String, Arc<View>>,
    /// Component set name -> variant name -> view.
    pub component_sets: HashMap<String, BTreeMap<String, Arc<View>>>,
    pub variables: VariableMap,
    pub images: ImageTable,
    pub branches: Vec<DocInfo>,
    /// Non-fatal problems the server hit while converting the document.
    pub errors: Vec<String>,
}

impl DocContent {
    pub fn new(doc_id: &str) -> DocContent {
        DocContent {
            doc_id: doc_id.to_string(),
            name: String::new(),
            last_modified: String::new(),
            version: String::new(),
            views: HashMap::new(),
            component_sets: HashMap::new(),
            variables: VariableMap::default(),
            images: ImageTable::default(),
            branches: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn root(&self, name: &str) -> Option<&Arc<View>> {
        self.views.get(name)
    }

    /// Variant names of a component set, in sorted order.
    pub fn variant_names<'a>(
        &'a self,
        component_set: &str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.component_sets
            .get(component_set)
            .into_iter()
            .flat_map(|set| set.keys().map(|k| k.as_str()))
    }

    pub fn variant(&self, component_set: &str, variant_name: &str) -> Option<&Arc<View>> {
        self.component_sets.get(component_set)?.get(variant_name)
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = bincode::serialize(&DocHeader::current())?;
        bincode::serialize_into(&mut bytes, self)?;
        Ok(bytes)
    }

    /// Decodes a header-prefixed document.
    ///
    /// Decoding reads from the slice, so a length prefix longer than the remaining input is an
    /// error instead of an allocation.
    pub fn decode(bytes: &[u8]) -> Result<DocContent, Error> {
        let header: DocHeader = bincode::deserialize(bytes)?;
        if header.version != CURRENT_VERSION {
            return Err(Error::VersionMismatch {
                expected: CURRENT_VERSION,
                found: header.version,
            });
        }
        let body = bytes
            .get(bincode::serialized_size(&header)? as usize..)
            .unwrap_or_default();
        let doc: DocContent = bincode::deserialize(body)?;
        if doc.views.is_empty() {
            return Err(Error::MissingRoot);
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ViewShape, ViewStyle};

    fn sample() -> DocContent {
        let mut doc = DocContent::new("D1");
        let root = View::new_container(
            "1:1",
            "Main",
            ViewShape::Rect { is_mask: false },
            ViewStyle::default(),
        )
        .with_child(View::new_text(
            "1:2",
            "Label",
            "hello",
            ViewStyle::default(),
        ));
        doc.views.insert("Main".into(), Arc::new(root));
        doc
    }

    #[test]
    fn decodes_encoded_document() {
        let doc = sample();
        let decoded = DocContent::decode(&doc.encode().unwrap()).unwrap();
        assert_eq!(decoded.doc_id, "D1");
        assert_eq!(decoded.root("Main").unwrap().children().len(), 1);
    }

    #[test]
    fn rejects_truncated_and_wrong_version() {
        let bytes = sample().encode().unwrap();
        assert!(DocContent::decode(&bytes[..bytes.len() / 2]).is_err());

        let newer = DocHeader {
            version: CURRENT_VERSION + 1,
        };
        let mut wrong = bincode::serialize(&newer).unwrap();
        bincode::serialize_into(&mut wrong, &sample()).unwrap();
        match DocContent::decode(&wrong) {
            Err(Error::VersionMismatch { found, .. }) => assert_eq!(found, CURRENT_VERSION + 1),
            other => panic!(
                "expected version mismatch, got {:?}",
                other.map(|d| d.doc_id)
            ),
        }
    }

    #[test]
    fn oversized_length_prefix_is_an_error() {
        let mut bytes = bincode::serialize(&DocHeader::current()).unwrap();
        // doc_id claims far more bytes than follow
        bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        bytes.extend_from_slice(b"abc");
        assert!(matches!(DocContent::decode(&bytes), Err(Error::Bincode(_))));
    }

    #[test]
    fn empty_document_has_no_root() {
        let bytes = DocContent::new("D2").encode().unwrap();
        assert!(matches!(DocContent::decode(&bytes), Err(Error::MissingRoot)));
    }

    #[test]
    fn image_lookup_prefers_closest_higher_density() {
        let mut images = ImageTable::default();
        for density in [1., 2., 3.].iter() {
            let image = EncodedImage {
                density: *density,
                bytes: vec![*density as u8],
            };
            images.insert("logo", image);
        }
        assert_eq!(images.lookup("logo", 1.5).unwrap().density, 2.);
        assert_eq!(images.lookup("logo", 4.).unwrap().density, 3.);
        assert!(images.lookup("missing", 1.).is_none());
    }
}
