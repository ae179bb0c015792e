use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::Result;

/// Links that were successfully delivered in earlier runs.
///
/// Stored as a sorted JSON array of strings. A missing or unreadable file
/// loads as an empty cache.
#[derive(Debug)]
pub struct DeliveryCache {
    path: PathBuf,
    links: HashSet<String>,
}

impl DeliveryCache {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let links = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(links) => links.into_iter().collect(),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable delivery cache {:?}: {}", path, e);
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable delivery cache {:?}: {}", path, e);
                HashSet::new()
            }
        };
        Self { path, links }
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    pub fn add(&mut self, link: impl Into<String>) {
        self.links.insert(link.into());
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Write the cache as a sorted JSON array, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let mut links: Vec<&String> = self.links.iter().collect();
        links.sort();
        let content = serde_json::to_string_pretty(&links)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Save, logging instead of failing.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("Failed to save cache {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DeliveryCache::load(dir.path().join("posted_links.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted_links.json");
        std::fs::write(&path, "{not json").unwrap();
        let cache = DeliveryCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn saves_sorted_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("posted_links.json");

        let mut cache = DeliveryCache::load(&path);
        cache.add("https://x/b");
        cache.add("https://x/a");
        cache.add("https://x/b");
        cache.save().unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["https://x/a", "https://x/b"]);

        let reloaded = DeliveryCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("https://x/a"));
        assert!(!reloaded.contains("https://x/c"));
    }

    #[test]
    fn persist_swallows_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the target path makes the rename fail.
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        let mut cache = DeliveryCache::load(&path);
        cache.add("https://x/1");
        assert!(cache.save().is_err());
        cache.persist();
    }
}
