use crate::config::RunConfig;
use std::path::Path;

/// Decides which files are handed to RePKG.
pub struct FileFilter {
    extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(config: &RunConfig) -> Self {
        Self::with_extensions(config.extensions.iter().map(String::as_str))
    }

    pub fn with_extensions<'a, I>(extensions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.trim().trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }

        Self {
            extensions: normalized,
        }
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    pub fn get_extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(&RunConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        let filter = FileFilter::default();

        assert!(filter.is_supported(Path::new("scene.pkg")));
        assert!(filter.is_supported(Path::new("materials/sky.tex")));
        assert!(filter.is_supported(Path::new("SCENE.PKG")));
        assert!(filter.is_supported(Path::new("Scene.Tex")));

        assert!(!filter.is_supported(Path::new("project.json")));
        assert!(!filter.is_supported(Path::new("preview.jpg")));
        assert!(!filter.is_supported(Path::new("pkg")));
        assert!(!filter.is_supported(Path::new("archive.pkg.bak")));
    }

    #[test]
    fn test_extension_normalization() {
        let filter = FileFilter::with_extensions([".PKG", "pkg", " tex ", ""]);
        assert_eq!(filter.get_extensions(), &["pkg".to_string(), "tex".to_string()]);
    }
}
