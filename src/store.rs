//! Template persistence over a string key-value backend.
//!
//! All templates live as one JSON array under [`TEMPLATES_KEY`]. Reads never
//! fail: missing or unreadable data is listed as empty. Writes never replace
//! a stored value they could not read, and only accept templates whose
//! widgets validate, so everything saved lists back unchanged.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::widget::Template;

/// Backend key holding the serialised template array.
pub const TEMPLATES_KEY: &str = "templates";

/// Minimal string key-value storage.
pub trait KeyValueBackend {
    /// `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// Volatile backend, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a store directory.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        // Atomic replace: write a sibling file, then rename over.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }
}

/// Template CRUD on top of a [`KeyValueBackend`].
#[derive(Debug, Clone)]
pub struct TemplateStore<B: KeyValueBackend> {
    backend: B,
}

impl TemplateStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: KeyValueBackend> TemplateStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All stored templates, in insertion order.
    pub fn list(&self) -> Vec<Template> {
        self.load().unwrap_or_else(|e| {
            log::warn!("{e}; treating as empty");
            Vec::new()
        })
    }

    /// Append `template` and return the updated list.
    ///
    /// Ids are not checked for uniqueness; [`TemplateStore::get_by_id`]
    /// returns the first match. Fails without writing when a widget does not
    /// validate or the stored list cannot be read.
    pub fn save(&mut self, template: Template) -> Result<Vec<Template>, StoreError> {
        for widget in &template.widgets {
            widget.validate().map_err(|source| {
                log::error!("refusing to save template {}: {source}", template.id);
                StoreError::InvalidTemplate {
                    id: template.id,
                    source,
                }
            })?;
        }
        let mut templates = self.load()?;
        templates.push(template);
        self.write(&templates)?;
        Ok(templates)
    }

    /// Remove every template with `id` and return the remaining list.
    pub fn delete(&mut self, id: u64) -> Result<Vec<Template>, StoreError> {
        let mut templates = self.load()?;
        templates.retain(|t| t.id != id);
        self.write(&templates)?;
        Ok(templates)
    }

    pub fn get_by_id(&self, id: u64) -> Option<Template> {
        self.list().into_iter().find(|t| t.id == id)
    }

    /// Missing data is an empty list; unparsable data is an error.
    fn load(&self) -> Result<Vec<Template>, StoreError> {
        match self.backend.get(TEMPLATES_KEY)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
        }
    }

    fn write(&mut self, templates: &[Template]) -> Result<(), StoreError> {
        let json = serde_json::to_string(templates)?;
        self.backend.set(TEMPLATES_KEY, &json)?;
        log::debug!("stored {} template(s)", templates.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{FontWeight, Widget, WidgetKind};

    fn template(id: u64, name: &str) -> Template {
        Template::new(id, name, vec![Widget::separator(1, 0.0, 0.0, 700.0)])
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("label-forge-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn empty_store_lists_nothing() {
        let store = TemplateStore::in_memory();
        assert!(store.list().is_empty());
        assert_eq!(store.get_by_id(1), None);
    }

    #[test]
    fn save_appends_in_order() {
        let mut store = TemplateStore::in_memory();
        store.save(template(1, "a")).unwrap();
        let all = store.save(template(2, "b")).unwrap();
        let ids: Vec<u64> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.list(), all);
    }

    #[test]
    fn delete_filters_by_id() {
        let mut store = TemplateStore::in_memory();
        store.save(template(1, "a")).unwrap();
        store.save(template(2, "b")).unwrap();
        let left = store.delete(1).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(store.get_by_id(1), None);
        assert_eq!(store.get_by_id(2).map(|t| t.name), Some("b".to_string()));
        // Deleting an unknown id is not an error.
        assert_eq!(store.delete(99).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_data_reads_as_empty_and_is_kept() {
        let mut backend = MemoryBackend::new();
        backend.set(TEMPLATES_KEY, "{not json").unwrap();
        let mut store = TemplateStore::new(backend);
        assert!(store.list().is_empty());
        assert!(store.get_by_id(3).is_none());

        assert!(matches!(store.save(template(3, "c")), Err(StoreError::Corrupt(_))));
        assert!(matches!(store.delete(3), Err(StoreError::Corrupt(_))));
        assert_eq!(
            store.backend().get(TEMPLATES_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn invalid_widget_is_not_saved() {
        let mut store = TemplateStore::in_memory();
        store.save(template(1, "a")).unwrap();

        let bad = Template::new(2, "b", vec![Widget::separator(1, -5.0, 0.0, 700.0)]);
        let err = store.save(bad).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTemplate { id: 2, .. }), "{err}");

        store.save(template(3, "c")).unwrap();
        let ids: Vec<u64> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn saved_template_lists_back_unchanged() {
        let mut store = TemplateStore::in_memory();
        let edges = Template::new(
            8,
            "edges",
            vec![
                Widget {
                    kind: WidgetKind::Image {
                        image_name: Some(String::new()),
                        image_data: None,
                    },
                    ..Widget::image(1, 0.0, 0.0, 150.0)
                },
                Widget {
                    kind: WidgetKind::Barcode {
                        product_id: Some(String::new()),
                        has_barcode: true,
                    },
                    ..Widget::barcode(2, 0.0, 200.0, 150.0)
                },
                Widget::content(3, 12.5, 0.0, 0.0, "x").with_font(1.5, FontWeight::Bold),
            ],
        );
        store.save(edges.clone()).unwrap();
        assert_eq!(store.list().last(), Some(&edges));

        let zero_font = Template::new(9, "z", vec![Widget::separator(1, 0.0, 0.0, 1.0).with_font(0.0, FontWeight::Normal)]);
        assert!(store.save(zero_font).is_err());
        assert_eq!(store.list(), vec![edges]);
    }

    #[test]
    fn file_backend_persists_across_instances() {
        let dir = scratch_dir("persist");
        {
            let mut store = TemplateStore::new(FileBackend::open(&dir).unwrap());
            store.save(template(5, "persisted")).unwrap();
        }
        let store = TemplateStore::new(FileBackend::open(&dir).unwrap());
        assert_eq!(store.get_by_id(5).map(|t| t.name), Some("persisted".to_string()));
        assert!(dir.join("templates.json").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_backend_missing_key_is_none() {
        let dir = scratch_dir("missing");
        let backend = FileBackend::open(&dir).unwrap();
        assert_eq!(backend.get("absent").unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }
}
