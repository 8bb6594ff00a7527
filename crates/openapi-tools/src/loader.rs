//! Spec loading: source classification, fetching, hash verification, parsing and lint.

use crate::config::{HashPolicy, SpecLoadOptions};
use crate::error::{OpenApiToolsError, Result};
use crate::operation::HttpMethod;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// Where the text of a spec comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Url(Url),
    File(PathBuf),
    Inline(String),
}

impl SpecSource {
    /// Classify a `spec` string.
    ///
    /// `http(s)://` is a URL and `file://` a file; text that starts with `{` or spans several
    /// lines is an inline document; anything else is a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL-looking location does not parse.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|e| {
                OpenApiToolsError::OpenApi(format!("Invalid OpenAPI spec URL '{trimmed}': {e}"))
            })?;
            return Ok(SpecSource::Url(url));
        }
        if trimmed.starts_with("file://") {
            let url = Url::parse(trimmed).map_err(|e| {
                OpenApiToolsError::OpenApi(format!(
                    "Invalid OpenAPI spec file URL '{trimmed}': {e}"
                ))
            })?;
            let path = url.to_file_path().map_err(|()| {
                OpenApiToolsError::OpenApi(format!(
                    "Invalid file URL (cannot convert to path): {trimmed}"
                ))
            })?;
            return Ok(SpecSource::File(path));
        }
        if trimmed.starts_with('{') || spec.contains('\n') {
            return Ok(SpecSource::Inline(spec.to_string()));
        }
        Ok(SpecSource::File(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecSource::Url(url) => write!(f, "{url}"),
            SpecSource::File(path) => write!(f, "{}", path.display()),
            SpecSource::Inline(_) => f.write_str("<inline spec>"),
        }
    }
}

/// Fetches spec documents from URLs and files under size and time limits.
#[derive(Debug, Clone)]
pub struct SpecFetcher {
    client: Client,
    options: SpecLoadOptions,
}

impl SpecFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: SpecLoadOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.fetch_timeout)
            .build()
            .map_err(|e| {
                OpenApiToolsError::OpenApi(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, options })
    }

    #[must_use]
    pub fn options(&self) -> &SpecLoadOptions {
        &self.options
    }

    /// Raw text of a spec source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be fetched or read, or exceeds the size limit.
    pub async fn read_source(&self, source: &SpecSource) -> Result<String> {
        match source {
            SpecSource::Url(url) => {
                info!("Fetching OpenAPI spec from {url}");
                self.fetch_url(url).await
            }
            SpecSource::File(path) => {
                info!("Loading OpenAPI spec from {}", path.display());
                self.read_file(path)
            }
            SpecSource::Inline(text) => {
                self.check_size(text.len(), "<inline spec>")?;
                Ok(text.clone())
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::SpecFetch`] on transport errors, non-success status codes,
    /// oversized or non-UTF-8 bodies.
    pub async fn fetch_url(&self, url: &Url) -> Result<String> {
        let fetch_error = |message: String| OpenApiToolsError::SpecFetch {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let max = self.options.max_spec_bytes;
        if let Some(len) = response.content_length()
            && len > max as u64
        {
            return Err(fetch_error(format!(
                "response too large: {len} bytes (limit {max})"
            )));
        }

        let mut out: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
        {
            if out.len().saturating_add(chunk.len()) > max {
                return Err(fetch_error(format!("response too large: exceeded {max} bytes")));
            }
            out.extend_from_slice(&chunk);
        }

        String::from_utf8(out).map_err(|_| fetch_error("response is not valid UTF-8".into()))
    }

    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::SpecReadFile`] if the file cannot be read, or an error if
    /// it exceeds the size limit.
    pub fn read_file(&self, path: &Path) -> Result<String> {
        let text =
            std::fs::read_to_string(path).map_err(|e| OpenApiToolsError::SpecReadFile {
                path: path.display().to_string(),
                source: e,
            })?;
        self.check_size(text.len(), &path.display().to_string())?;
        Ok(text)
    }

    fn check_size(&self, len: usize, location: &str) -> Result<()> {
        let max = self.options.max_spec_bytes;
        if len > max {
            return Err(OpenApiToolsError::OpenApi(format!(
                "spec '{location}' is too large: {len} bytes (limit {max})"
            )));
        }
        Ok(())
    }
}

/// `sha256:<hex>` of the raw spec text.
#[must_use]
pub fn spec_hash(text: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(text.as_bytes())))
}

/// Compare the spec text against an expected hash under `policy`.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::SpecHashMismatch`] on a mismatch under [`HashPolicy::Fail`].
pub fn verify_spec_hash(
    text: &str,
    expected: Option<&str>,
    policy: HashPolicy,
    location: &str,
) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    if policy == HashPolicy::Ignore {
        return Ok(());
    }

    let actual = spec_hash(text);
    if actual == expected {
        return Ok(());
    }
    match policy {
        HashPolicy::Fail => Err(OpenApiToolsError::SpecHashMismatch {
            expected: expected.to_string(),
            actual,
        }),
        HashPolicy::Warn => {
            warn!(
                "Spec hash mismatch for '{}'. Expected: {}, Got: {}",
                location, expected, actual
            );
            Ok(())
        }
        HashPolicy::Ignore => Ok(()),
    }
}

/// Parse JSON or YAML text into a JSON value (JSON is a subset of YAML).
///
/// # Errors
///
/// Returns [`OpenApiToolsError::SpecParse`] if the text is neither.
pub fn parse_document(text: &str, location: &str) -> Result<Value> {
    serde_yaml::from_str(text).map_err(|e| OpenApiToolsError::SpecParse {
        location: location.to_string(),
        source: e,
    })
}

/// Non-fatal findings from [`lint_document`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub warnings: Vec<String>,
}

/// Check the document structure the pipeline depends on.
///
/// Warnings are collected (and logged), never fatal.
///
/// # Errors
///
/// Returns an error for Swagger 2.x documents, a missing or non-3.x `openapi` version, or a
/// missing `paths` object.
pub fn lint_document(document: &Value) -> Result<LintReport> {
    let Some(root) = document.as_object() else {
        return Err(OpenApiToolsError::Lint(
            "document root is not an object".to_string(),
        ));
    };

    if let Some(swagger) = root.get("swagger") {
        return Err(OpenApiToolsError::UnsupportedVersion(format!(
            "swagger {}",
            version_text(swagger)
        )));
    }

    // An unquoted `openapi: 3.1` parses as a YAML number.
    let version = match root.get("openapi") {
        Some(v @ (Value::String(_) | Value::Number(_))) => version_text(v),
        Some(other) => return Err(OpenApiToolsError::UnsupportedVersion(version_text(other))),
        None => {
            return Err(OpenApiToolsError::Lint(
                "missing 'openapi' version field".to_string(),
            ));
        }
    };
    if !version.starts_with("3.") {
        return Err(OpenApiToolsError::UnsupportedVersion(version));
    }

    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        return Err(OpenApiToolsError::Lint(
            "missing or non-object 'paths'".to_string(),
        ));
    };

    let mut report = LintReport::default();

    let info = root.get("info");
    for field in ["title", "version"] {
        if info.and_then(|i| i.get(field)).is_none() {
            report.warnings.push(format!("missing 'info.{field}'"));
        }
    }

    if root.contains_key("servers") {
        report
            .warnings
            .push("'servers' is ignored and will be removed".to_string());
    }

    for (path, item) in paths {
        if !path.starts_with('/') {
            report
                .warnings
                .push(format!("path \"{path}\" does not start with '/'"));
        }
        for method in HttpMethod::ALL {
            if let Some(op) = item.get(method.as_str())
                && op.get("responses").is_none()
            {
                report.warnings.push(format!(
                    "operation \"{} {path}\" has no responses",
                    method.as_str().to_uppercase()
                ));
            }
        }
    }

    // The typed model only covers 3.0.x; legacy constructs (e.g. `in: body`) fail it but are
    // still handled by the pipeline.
    if version.starts_with("3.0")
        && let Err(e) = serde_json::from_value::<openapiv3::OpenAPI>(document.clone())
    {
        report
            .warnings
            .push(format!("document does not match the OpenAPI 3.0 model: {e}"));
    }

    for warning in &report.warnings {
        warn!("OpenAPI lint: {warning}");
    }
    Ok(report)
}

fn version_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Remove `servers` from the document, every path item and every operation.
pub fn strip_servers(document: &mut Value) {
    let Some(root) = document.as_object_mut() else {
        return;
    };
    root.remove("servers");

    let Some(Value::Object(paths)) = root.get_mut("paths") else {
        return;
    };
    for item in paths.values_mut() {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        item.remove("servers");
        for method in HttpMethod::ALL {
            if let Some(Value::Object(op)) = item.get_mut(method.as_str()) {
                op.remove("servers");
            }
        }
    }
}
