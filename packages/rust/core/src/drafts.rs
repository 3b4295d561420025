//! Editable drafts of the three article parts, one file per part under
//! `<drafts_dir>/<outline id>/`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use draftwright_artifacts::write_export;
use draftwright_shared::{ArtifactId, DraftwrightError, Result};

use crate::assembler::{ArticleDraft, Part};

#[derive(Debug, Clone)]
pub struct DraftStore {
    root: PathBuf,
}

impl DraftStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the drafts written for one outline.
    pub fn dir(&self, outline_id: ArtifactId) -> PathBuf {
        self.root.join(outline_id.to_string())
    }

    pub fn path(&self, outline_id: ArtifactId, part: Part) -> PathBuf {
        self.dir(outline_id).join(format!("{part}.md"))
    }

    /// Read whatever part files exist. Missing files are simply absent parts.
    pub fn load(&self, outline_id: ArtifactId) -> Result<ArticleDraft> {
        let mut draft = ArticleDraft::new();
        for part in Part::ALL {
            let path = self.path(outline_id, part);
            match std::fs::read_to_string(&path) {
                Ok(text) => draft.set(part, text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "no draft yet");
                }
                Err(e) => return Err(DraftwrightError::io(path, e)),
            }
        }
        Ok(draft)
    }

    /// Write one part, replacing any previous text.
    pub fn save_part(&self, outline_id: ArtifactId, part: Part, text: &str) -> Result<PathBuf> {
        let dir = self.dir(outline_id);
        let filename = format!("{part}.md");
        let meta = write_export(&dir, &filename, text)?;
        info!(%outline_id, %part, size = meta.size_bytes, "saved draft");
        Ok(dir.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("dw-drafts-{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn save_then_load() {
        let root = temp_root();
        let store = DraftStore::new(&root);
        let outline = ArtifactId::new();

        let path = store.save_part(outline, Part::Part2, "second\n").unwrap();
        assert!(path.ends_with("part2.md"));

        let draft = store.load(outline).unwrap();
        assert_eq!(draft.get(Part::Part2), Some("second\n"));
        assert_eq!(draft.missing_parts(), vec![Part::Part1, Part::Part3]);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_directory_is_empty_draft() {
        let store = DraftStore::new(temp_root());
        let draft = store.load(ArtifactId::new()).unwrap();
        assert!(!draft.is_complete());
        assert_eq!(draft.missing_parts().len(), 3);
    }
}
