use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Texts {
    bytes: HashMap<String, Arc<[u8]>>,
    /// Names whose current bytes were part of at least one snapshot.
    seen:  HashSet<String>,
}

/// Holder of loaded text bytes, kept apart from the [`AssetRegistry`].
///
/// Loaders write into it; only [`StartupContext`] snapshots read from it.
/// The store remembers which texts a snapshot has already shown, so a
/// completed bundle can tell whether initialization still has to see them.
///
/// [`AssetRegistry`]: super::AssetRegistry
#[derive(Debug, Clone, Default)]
pub struct TextStore {
    inner: Arc<Mutex<Texts>>,
}

impl TextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` for `name`. Replaced text counts as unseen again.
    pub(crate) fn insert(&self, name: &str, bytes: Vec<u8>) {
        let mut texts = self.inner.lock();
        texts.seen.remove(name);
        texts.bytes.insert(name.to_string(), bytes.into());
    }

    /// Copies every loaded text into a context for `App::init` and marks
    /// them all as seen.
    pub(crate) fn snapshot(&self) -> StartupContext {
        let mut texts = self.inner.lock();
        let Texts { bytes, seen } = &mut *texts;
        seen.extend(bytes.keys().cloned());
        StartupContext { texts: bytes.clone() }
    }

    /// True when `name` is loaded but no snapshot has shown it yet.
    pub fn is_unseen(&self, name: &str) -> bool {
        let texts = self.inner.lock();
        texts.bytes.contains_key(name) && !texts.seen.contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().bytes.is_empty()
    }
}

/// Read context handed to [`App::init`] and nowhere else.
///
/// [`App::init`]: crate::core::App::init
#[derive(Debug, Default)]
pub struct StartupContext {
    texts: HashMap<String, Arc<[u8]>>,
}

impl StartupContext {
    /// Raw bytes of a text asset, or `None` if it is not loaded.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.texts.get(name).map(|b| &**b)
    }

    /// UTF-8 view of a text asset. `None` when absent or not valid UTF-8.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.texts.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_detached_from_store() {
        let store = TextStore::new();
        store.insert("intro", b"hello".to_vec());
        let ctx = store.snapshot();

        store.insert("later", b"late".to_vec());

        assert_eq!(ctx.get_str("intro"), Some("hello"));
        assert!(ctx.get("later").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_marks_texts_seen_until_replaced() {
        let store = TextStore::new();
        assert!(!store.is_unseen("intro"));

        store.insert("intro", b"v1".to_vec());
        assert!(store.is_unseen("intro"));

        store.snapshot();
        assert!(!store.is_unseen("intro"));

        store.insert("intro", b"v2".to_vec());
        assert!(store.is_unseen("intro"));
    }

    #[test]
    fn invalid_utf8_is_bytes_only() {
        let store = TextStore::new();
        store.insert("bin", vec![0xff, 0xfe]);
        let ctx = store.snapshot();
        assert_eq!(ctx.get("bin"), Some(&[0xff, 0xfe][..]));
        assert_eq!(ctx.get_str("bin"), None);
    }
}
