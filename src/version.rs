//! Kernel version extraction and comparison.
//!
//! Two parsers feed one ordering. Kernel version strings carry vendor
//! suffixes (`5.15.90.1-microsoft-standard-WSL2`), so the watch loop uses a
//! strict 4-part pattern that matches anywhere in the string. Release tags
//! for the watcher itself use the shorter `v3.1.0` convention, handled by a
//! lenient parser that trims the prefix and pads missing components with 0.

use regex::Regex;

/// A 4-component kernel version: `(major, minor, build, revision)`.
///
/// Ordering is lexicographic from most to least significant component.
/// A value is only ever constructed fully formed; parse failures yield
/// `None`, never a partial tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u64,
    pub minor: u64,
    pub build: u64,
    pub revision: u64,
}

impl KernelVersion {
    /// Create a version from explicit components.
    pub const fn new(major: u64, minor: u64, build: u64, revision: u64) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Lenient parser for release tags: trims leading `v`/`V` characters
    /// and accepts 2–4 dotted integer components, missing trailing
    /// components defaulting to 0.
    ///
    /// `"v3.1.0"` parses as `3.1.0.0`; `"v-next"` and `"3"` do not parse.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let trimmed = text.trim().trim_start_matches(['v', 'V']);
        let parts: Vec<&str> = trimmed.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return None;
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.parse().ok()?;
        }

        Some(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl std::fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Compiled 4-part version pattern for kernel strings.
///
/// An explicitly constructed value rather than a process-wide singleton so
/// tests and callers own their instance.
#[derive(Debug, Clone)]
pub struct VersionMatcher {
    pattern: Regex,
}

impl VersionMatcher {
    /// Compile the strict `\d+.\d+.\d+.\d+` matcher.
    pub fn new() -> Self {
        let pattern = Regex::new(r"(\d+)\.(\d+)\.(\d+)\.(\d+)").expect("valid version pattern");
        Self { pattern }
    }

    /// Extract the first 4-part dotted version found anywhere in `text`.
    ///
    /// Leading and trailing non-numeric text (vendor suffixes, prefixes) is
    /// ignored. Returns `None` when no qualifying tuple appears, including
    /// for 3-part strings like `v3.1.0`.
    pub fn extract(&self, text: &str) -> Option<KernelVersion> {
        let caps = self.pattern.captures(text)?;
        let component = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();
        Some(KernelVersion::new(
            component(1)?,
            component(2)?,
            component(3)?,
            component(4)?,
        ))
    }

    /// Returns true iff both strings yield a 4-tuple and `latest > current`.
    pub fn is_newer(&self, latest: &str, current: &str) -> bool {
        match (self.extract(latest), self.extract(current)) {
            (Some(latest), Some(current)) => latest > current,
            _ => false,
        }
    }
}

impl Default for VersionMatcher {
    fn default() -> Self {
        Self::new()
    }
}
