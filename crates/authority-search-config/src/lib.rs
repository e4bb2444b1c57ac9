use std::fs;
use std::path::{Path, PathBuf};

use authority_search_core::{OrderingError, SortPolicy};
use serde::{Deserialize, Serialize};

const LOOKUP_EXTENSIONS: [&str; 3] = ["json", "yml", "yaml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read authority config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON authority config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML authority config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported authority config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("authority config `{name}` not found in {}", .dir.display())]
    AuthorityNotFound { name: String, dir: PathBuf },
    #[error("invalid sort configuration: {0}")]
    Ordering(#[from] OrderingError),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// One predicate or an ordered list of predicates.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum PredicateList {
    One(String),
    Many(Vec<String>),
}

impl PredicateList {
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(predicate) => std::slice::from_ref(predicate),
            Self::Many(predicates) => predicates,
        }
    }
}

/// Predicates used to map an authority's graph onto search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ResultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altlabel_predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_predicate: Option<PredicateList>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct SearchConfig {
    #[serde(default)]
    pub results: ResultsConfig,
}

impl SearchConfig {
    #[must_use]
    pub fn sort_predicates(&self) -> &[String] {
        self.results.sort_predicate.as_ref().map(PredicateList::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn supports_sort(&self) -> bool {
        !self.sort_predicates().is_empty()
    }

    /// # Errors
    /// Returns [`ConfigError::Ordering`] when a configured predicate is blank.
    pub fn sort_policy(&self) -> Result<SortPolicy, ConfigError> {
        Ok(SortPolicy::new(self.sort_predicates())?)
    }
}

/// A linked-data authority configuration document. Only the parts that
/// influence result ordering are modelled; other keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct AuthorityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,
}

impl AuthorityConfig {
    /// # Errors
    /// Returns [`ConfigError::Json`] when `body` is not a valid configuration document.
    pub fn from_json_str(body: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(body)?)
    }

    /// # Errors
    /// Returns [`ConfigError::Yaml`] when `body` is not a valid configuration document.
    pub fn from_yaml_str(body: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(body)?)
    }

    /// Load a configuration file, choosing the parser from its extension.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedFormat`] for unknown extensions,
    /// [`ConfigError::Io`] when the file cannot be read, or a parse error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

        tracing::debug!("Loading authority config from {}", path.display());
        match format {
            ConfigFormat::Json => Self::from_json_str(&body),
            ConfigFormat::Yaml => Self::from_yaml_str(&body),
        }
    }

    /// Load the configuration named `name` from `dir`, trying `<name>.json`,
    /// `<name>.yml` and `<name>.yaml` in turn.
    ///
    /// # Errors
    /// Returns [`ConfigError::AuthorityNotFound`] when no candidate file exists,
    /// otherwise any error from [`AuthorityConfig::load`].
    pub fn load_authority(dir: &Path, name: &str) -> Result<Self, ConfigError> {
        for extension in LOOKUP_EXTENSIONS {
            let candidate = dir.join(format!("{name}.{extension}"));
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }

        Err(ConfigError::AuthorityNotFound { name: name.to_string(), dir: dir.to_path_buf() })
    }

    #[must_use]
    pub fn search(&self) -> Option<&SearchConfig> {
        self.search.as_ref()
    }

    #[must_use]
    pub fn supports_sort(&self) -> bool {
        self.search.as_ref().is_some_and(SearchConfig::supports_sort)
    }

    /// Sort policy for search results; disabled when the authority has no
    /// search section or declares no sort predicate.
    ///
    /// # Errors
    /// Returns [`ConfigError::Ordering`] when a configured predicate is blank.
    pub fn sort_policy(&self) -> Result<SortPolicy, ConfigError> {
        match &self.search {
            Some(search) => search.sort_policy(),
            None => Ok(SortPolicy::disabled()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
    const RANK: &str = "http://vivoweb.org/ontology/core#rank";

    fn parse_json(body: &str) -> AuthorityConfig {
        match AuthorityConfig::from_json_str(body) {
            Ok(config) => config,
            Err(err) => panic!("fixture config should parse: {err}"),
        }
    }

    fn predicate_strings(policy: &SortPolicy) -> Vec<&str> {
        policy.predicates().iter().map(|predicate| predicate.as_str()).collect()
    }

    #[test]
    fn single_sort_predicate_enables_sorting() {
        let config = parse_json(&format!(
            r#"{{ "search": {{ "results": {{ "label_predicate": "{PREF_LABEL}", "sort_predicate": "{PREF_LABEL}" }} }} }}"#
        ));

        let policy = match config.sort_policy() {
            Ok(policy) => policy,
            Err(err) => panic!("sort policy should build: {err}"),
        };

        assert!(config.supports_sort());
        assert_eq!(predicate_strings(&policy), vec![PREF_LABEL]);
    }

    #[test]
    fn sort_predicate_list_keeps_declaration_order() {
        let config = parse_json(&format!(
            r#"{{ "search": {{ "results": {{ "sort_predicate": ["{RANK}", "{PREF_LABEL}"] }} }} }}"#
        ));

        let policy = match config.sort_policy() {
            Ok(policy) => policy,
            Err(err) => panic!("sort policy should build: {err}"),
        };

        assert_eq!(predicate_strings(&policy), vec![RANK, PREF_LABEL]);
    }

    #[test]
    fn missing_sort_predicate_disables_sorting() {
        let config = parse_json(r#"{ "search": { "results": { "label_predicate": "urn:label" } } }"#);

        assert!(!config.supports_sort());
        assert_eq!(config.sort_policy().ok(), Some(SortPolicy::disabled()));
    }

    #[test]
    fn empty_sort_predicate_list_disables_sorting() {
        let config = parse_json(r#"{ "search": { "results": { "sort_predicate": [] } } }"#);

        assert!(!config.supports_sort());
        assert_eq!(config.sort_policy().ok(), Some(SortPolicy::disabled()));
    }

    #[test]
    fn missing_search_section_disables_sorting() {
        let config = parse_json(r#"{ "term": { "url": { "template": "http://example.org/{id}" } } }"#);

        assert!(config.search().is_none());
        assert!(!config.supports_sort());
        assert_eq!(config.sort_policy().ok(), Some(SortPolicy::disabled()));
    }

    #[test]
    fn blank_sort_predicate_is_rejected() {
        let config = parse_json(r#"{ "search": { "results": { "sort_predicate": ["urn:rank", " "] } } }"#);

        let err = config.sort_policy();

        assert!(matches!(err, Err(ConfigError::Ordering(OrderingError::Validation(_)))));
    }

    #[test]
    fn yaml_documents_parse_like_json() {
        let body = format!(
            "search:\n  results:\n    sort_predicate:\n      - {RANK}\n      - {PREF_LABEL}\n"
        );

        let config = match AuthorityConfig::from_yaml_str(&body) {
            Ok(config) => config,
            Err(err) => panic!("yaml config should parse: {err}"),
        };

        assert_eq!(
            config.search().map(SearchConfig::sort_predicates),
            Some([RANK.to_string(), PREF_LABEL.to_string()].as_slice())
        );
    }

    #[test]
    fn malformed_json_reports_json_error() {
        let err = AuthorityConfig::from_json_str("{ \"search\": ");
        assert!(matches!(err, Err(ConfigError::Json(_))));
    }

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("LOD_SORT.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("lod.YML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("lod.yaml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("lod.toml")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("lod")), None);
    }
}
