//! Configuration for the PDF question-answering service

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable pointing at a TOML config file
pub const CONFIG_ENV: &str = "PDF_RAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Upload handling
    pub upload: UploadConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector store configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Read configuration from a TOML file. Missing sections keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.upload.normalize_extensions();
        Ok(config)
    }

    /// Resolve configuration from an explicit path, then `PDF_RAG_CONFIG`, then defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `PDF_RAG_HOST`, `PDF_RAG_PORT` and `OLLAMA_BASE_URL`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("PDF_RAG_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PDF_RAG_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PDF_RAG_PORT: {}", port)))?;
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be greater than 0".to_string()));
        }
        if self.retrieval.k == 0 {
            return Err(Error::Config("retrieval.k must be greater than 0".to_string()));
        }
        if self.retrieval.fetch_k < self.retrieval.k {
            return Err(Error::Config(format!(
                "retrieval.fetch_k ({}) must be at least retrieval.k ({})",
                self.retrieval.fetch_k, self.retrieval.k
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.lambda_mult) {
            return Err(Error::Config(format!(
                "retrieval.lambda_mult ({}) must be within [0, 1]",
                self.retrieval.lambda_mult
            )));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::Config(
                "upload.allowed_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the persisted document registry
    pub fn documents_path(&self) -> PathBuf {
        self.vector_db.storage_path.join("documents.json")
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 16MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            enable_cors: true,
            max_upload_size: 16 * 1024 * 1024,
        }
    }
}

/// Upload handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory uploaded files are saved to
    pub upload_path: PathBuf,
    /// Lowercase extensions accepted for upload
    pub allowed_extensions: BTreeSet<String>,
}

impl UploadConfig {
    /// Lowercase the allowed extensions and strip leading dots
    pub fn normalize_extensions(&mut self) {
        self.allowed_extensions = std::mem::take(&mut self.allowed_extensions)
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_path: PathBuf::from("db"),
            allowed_extensions: BTreeSet::from(["pdf".to_string()]),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Dimensions used when the embedding model cannot be probed at startup
    pub dimensions: usize,
    /// Text embedded once at startup to discover the model's dimensions
    pub probe_text: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768, // nomic-embed-text
            probe_text: "this is some text data".to_string(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Separators tried in order, the empty string splits into characters
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Chat model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2:1b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Directory the store is saved to; its name doubles as the store name
    pub storage_path: PathBuf,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("faiss_db"),
        }
    }
}

/// Retrieval (MMR) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the LLM
    pub k: usize,
    /// Nearest neighbours fetched before MMR reranking
    pub fetch_k: usize,
    /// 1.0 ranks purely by relevance, 0.0 purely by diversity
    pub lambda_mult: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 3,
            fetch_k: 100,
            lambda_mult: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;

    const ENV_VARS: [&str; 4] = [CONFIG_ENV, "PDF_RAG_HOST", "PDF_RAG_PORT", "OLLAMA_BASE_URL"];

    static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

    /// Run `f` with the given variables set and every other config variable unset
    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock();
        let saved: Vec<_> = ENV_VARS.iter().map(|k| (*k, std::env::var_os(k))).collect();

        for key in ENV_VARS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let result = f();

        for (key, value) in saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        result
    }

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.max_upload_size, 16 * 1024 * 1024);
        assert!(config.upload.allowed_extensions.contains("pdf"));
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.retrieval.fetch_k, 100);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml_str(
            r#"
            [server]
            port = 9000

            [chunking]
            chunk_size = 500
            chunk_overlap = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.separators.len(), 4);
        assert_eq!(config.llm.generate_model, "llama3.2:1b");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.retrieval.fetch_k = 1;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.retrieval.lambda_mult = 1.5;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.upload.allowed_extensions.clear();
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.retrieval.k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval.k"));
    }

    #[test]
    fn test_extensions_are_normalized() {
        let config = RagConfig::from_toml_str(
            r#"
            [upload]
            allowed_extensions = ["PDF", ".Pdf", " txt "]
            "#,
        )
        .unwrap();

        let extensions: Vec<_> = config.upload.allowed_extensions.iter().map(String::as_str).collect();
        assert_eq!(extensions, vec!["pdf", "txt"]);
    }

    #[test]
    fn test_load_prefers_explicit_path() {
        let explicit = toml_file("[server]\nport = 7001\n");
        let from_env = toml_file("[server]\nport = 7002\n");
        let env_path = from_env.path().to_str().unwrap();

        let config = with_env(&[(CONFIG_ENV, env_path)], || {
            RagConfig::load(Some(explicit.path())).unwrap()
        });
        assert_eq!(config.server.port, 7001);

        let config = with_env(&[(CONFIG_ENV, env_path)], || RagConfig::load(None).unwrap());
        assert_eq!(config.server.port, 7002);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = with_env(&[], || RagConfig::load(None).unwrap());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = with_env(&[(CONFIG_ENV, "/nonexistent/pdf-rag.toml")], || {
            RagConfig::load(None).unwrap_err()
        });
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let file = toml_file("[server]\nhost = \"10.0.0.1\"\nport = 7001\n");

        let config = with_env(
            &[
                ("PDF_RAG_HOST", "0.0.0.0"),
                ("PDF_RAG_PORT", "8081"),
                ("OLLAMA_BASE_URL", "http://ollama:11434"),
            ],
            || RagConfig::load(Some(file.path())).unwrap(),
        );

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.llm.base_url, "http://ollama:11434");
    }

    #[test]
    fn test_invalid_port_override() {
        let err = with_env(&[("PDF_RAG_PORT", "not-a-port")], || {
            RagConfig::default().apply_env_overrides().unwrap_err()
        });
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("PDF_RAG_PORT"));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config =
            RagConfig::from_toml_str(include_str!("../pdf-rag.example.toml")).unwrap();
        let defaults = RagConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.chunking.separators, defaults.chunking.separators);
        assert_eq!(config.llm.embed_model, defaults.llm.embed_model);
        assert_eq!(config.vector_db.storage_path, defaults.vector_db.storage_path);
        assert_eq!(config.retrieval.fetch_k, defaults.retrieval.fetch_k);
    }

    #[test]
    fn test_invalid_toml() {
        let err = RagConfig::from_toml_str("server = 3").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
