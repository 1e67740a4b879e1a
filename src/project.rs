//! Supported Firebase projects and history name filters.

use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Project {
    #[value(name = "moz-fenix")]
    MozFenix,
    #[value(name = "moz-focus-android")]
    MozFocusAndroid,
    #[value(name = "moz-reference-browser")]
    MozReferenceBrowser,
    #[value(name = "moz-android-components")]
    MozAndroidComponents,
}

impl Project {
    pub fn id(self) -> &'static str {
        match self {
            Project::MozFenix => "moz-fenix",
            Project::MozFocusAndroid => "moz-focus-android",
            Project::MozReferenceBrowser => "moz-reference-browser",
            Project::MozAndroidComponents => "moz-android-components",
        }
    }

    /// Environment variable holding this project's service-account JSON,
    /// e.g. `GCLOUD_AUTH_MOZ_FENIX`.
    pub fn credential_var(self) -> String {
        format!(
            "GCLOUD_AUTH_{}",
            self.id().to_ascii_uppercase().replace('-', "_")
        )
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Package names used to filter histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PackageFilter {
    #[value(name = "org.mozilla.fenix.debug")]
    FenixDebug,
    #[value(name = "org.mozilla.fenix")]
    Fenix,
    #[value(name = "org.mozilla.focus.debug")]
    FocusDebug,
    #[value(name = "org.mozilla.focus")]
    Focus,
}

impl PackageFilter {
    pub fn name(self) -> &'static str {
        match self {
            PackageFilter::FenixDebug => "org.mozilla.fenix.debug",
            PackageFilter::Fenix => "org.mozilla.fenix",
            PackageFilter::FocusDebug => "org.mozilla.focus.debug",
            PackageFilter::Focus => "org.mozilla.focus",
        }
    }
}

impl fmt::Display for PackageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
