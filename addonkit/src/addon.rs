//! Add-on descriptors and downloaded package payloads.
//!
//! An [`AddonRef`] describes where an add-on comes from and where it goes.
//! A [`Package`] is the downloaded payload for one add-on; it is produced by
//! the downloader and moved into the installer, so only one side ever owns
//! the bytes.

use std::fmt;

use semver::Version;

/// Describes a single installable add-on.
///
/// # Example
///
/// ```
/// use addonkit::addon::AddonRef;
///
/// let addon = AddonRef::new("snow-track", "https://example.com/snow-track.tar.gz")
///     .with_name("Snow Track")
///     .with_expected_size(4096);
///
/// assert_eq!(addon.destination, "snow-track");
/// assert_eq!(addon.file_name(), "snow-track.tar.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonRef {
    /// Catalog identifier.
    pub id: String,

    /// Human-readable name shown in status text.
    pub name: String,

    /// Where the package bytes come from (URL or local path).
    pub source: String,

    /// Declared payload size in bytes, if the catalog knows it.
    pub expected_size: Option<u64>,

    /// Declared SHA-256 of the payload (hex), if the catalog knows it.
    pub sha256: Option<String>,

    /// Directory name below the install root.
    pub destination: String,

    /// Revision being installed.
    pub revision: Option<Version>,
}

impl AddonRef {
    /// Create a descriptor with the id doubling as name and destination.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            destination: id.clone(),
            id,
            source: source.into(),
            expected_size: None,
            sha256: None,
            revision: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the declared payload size.
    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    /// Set the declared SHA-256 checksum.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Set the destination directory name.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Set the revision.
    pub fn with_revision(mut self, revision: Version) -> Self {
        self.revision = Some(revision);
        self
    }

    /// File name of the payload, taken from the last segment of the source.
    ///
    /// Query strings and fragments are ignored. Falls back to the add-on id
    /// when the source has no usable final segment.
    pub fn file_name(&self) -> String {
        let trimmed = self
            .source
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');

        match trimmed.rsplit(['/', '\\']).next() {
            Some(segment) if !segment.is_empty() && !segment.contains(':') => segment.to_string(),
            _ => self.id.clone(),
        }
    }
}

impl fmt::Display for AddonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{} ({}) v{}", self.name, self.id, rev),
            None => write!(f, "{} ({})", self.name, self.id),
        }
    }
}

/// Downloaded payload plus the descriptor it was fetched for.
pub struct Package {
    addon: AddonRef,
    data: Vec<u8>,
}

impl Package {
    /// Wrap downloaded bytes.
    pub fn new(addon: AddonRef, data: Vec<u8>) -> Self {
        Self { addon, data }
    }

    /// The descriptor this payload belongs to.
    pub fn addon(&self) -> &AddonRef {
        &self.addon
    }

    /// Raw payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload size in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// True when nothing was downloaded.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Payloads can be large; keep them out of debug output.
impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("addon", &self.addon.id)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_name_and_destination_to_id() {
        let addon = AddonRef::new("kart-pack", "https://example.com/kart-pack.zip");
        assert_eq!(addon.name, "kart-pack");
        assert_eq!(addon.destination, "kart-pack");
        assert!(addon.expected_size.is_none());
        assert!(addon.sha256.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let addon = AddonRef::new("kart-pack", "https://example.com/kart-pack.zip")
            .with_name("Kart Pack")
            .with_expected_size(1024)
            .with_sha256("abc")
            .with_destination("karts/kart-pack")
            .with_revision(Version::new(1, 2, 0));

        assert_eq!(addon.name, "Kart Pack");
        assert_eq!(addon.expected_size, Some(1024));
        assert_eq!(addon.sha256.as_deref(), Some("abc"));
        assert_eq!(addon.destination, "karts/kart-pack");
        assert_eq!(addon.to_string(), "Kart Pack (kart-pack) v1.2.0");
    }

    #[test]
    fn test_file_name_from_url() {
        let addon = AddonRef::new("a", "https://cdn.example.com/addons/track.tar.gz?sig=1#x");
        assert_eq!(addon.file_name(), "track.tar.gz");
    }

    #[test]
    fn test_file_name_from_local_path() {
        let addon = AddonRef::new("a", "/srv/addons/arena.tar");
        assert_eq!(addon.file_name(), "arena.tar");
    }

    #[test]
    fn test_file_name_falls_back_to_id() {
        let addon = AddonRef::new("fallback", "https://example.com/");
        assert_eq!(addon.file_name(), "example.com");

        let addon = AddonRef::new("fallback", "https://");
        assert_eq!(addon.file_name(), "fallback");
    }

    #[test]
    fn test_package_debug_hides_payload() {
        let package = Package::new(AddonRef::new("a", "a.bin"), vec![7; 32]);
        let debug = format!("{:?}", package);
        assert!(debug.contains("len: 32"));
        assert!(!debug.contains("7, 7"));
        assert_eq!(package.len(), 32);
        assert!(!package.is_empty());
    }
}
