use std::fmt;

/// Kind of asset, which selects the decode and preparation path.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AssetKind {
    Image,
    Text,
    Audio,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetKind::Image => "image",
            AssetKind::Text  => "text",
            AssetKind::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// Declaration of a single asset.
///
/// `name` is the unique key used everywhere else (registry, handles, startup
/// context). `path` is a locator interpreted by the active [`Fetcher`].
///
/// [`Fetcher`]: super::Fetcher
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct AssetDescriptor {
    pub name: String,
    pub path: String,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: AssetKind) -> Self {
        Self { name: name.into(), path: path.into(), kind }
    }

    pub fn image(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, AssetKind::Image)
    }

    pub fn text(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, AssetKind::Text)
    }

    pub fn audio(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, AssetKind::Audio)
    }
}
