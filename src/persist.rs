//! Last-known-good documents on disk.

use crate::doc::DocContent;
use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// File name for a saved document: `<resource>_<doc id>.dcf` with anything that isn't
/// alphanumeric, `-` or `_` replaced.
pub fn file_name(resource: &str, doc_id: &str) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("{}_{}.dcf", sanitize(resource), sanitize(doc_id))
}

pub fn save_path(dir: &Path, resource: &str, doc_id: &str) -> PathBuf {
    dir.join(file_name(resource, doc_id))
}

/// Writes raw document bytes. The file is replaced atomically so a crash mid-write leaves the
/// previous copy intact.
pub fn save(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("dcf.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<DocContent, Error> {
    let bytes = fs::read(path)?;
    DocContent::decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{View, ViewShape, ViewStyle};
    use std::sync::Arc;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_name("main/doc", "ab:c d"), "main_doc_ab_c_d.dcf");
    }

    #[test]
    fn saves_and_loads() {
        let dir = std::env::temp_dir().join(format!("livedesign-{}", uuid::Uuid::new_v4()));
        let path = save_path(&dir, "home", "D1");

        let mut doc = DocContent::new("D1");
        let root = View::new_container(
            "1:1",
            "Main",
            ViewShape::Rect { is_mask: false },
            ViewStyle::default(),
        );
        doc.views.insert("Main".into(), Arc::new(root));
        save(&path, &doc.encode().unwrap()).unwrap();
        assert_eq!(load(&path).unwrap(), doc);
        assert!(load(&dir.join("missing.dcf")).is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
