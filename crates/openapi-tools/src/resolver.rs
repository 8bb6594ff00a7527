//! `OpenAPI` `$ref` resolver.
//!
//! Real-world specs frequently rely on references split across files (or URLs). This resolver
//! supports:
//! - Local refs (`#/...`)
//! - File refs (`./common.yaml#/...`, `/abs/path/spec.yaml#/...`, `file:///...#/...`)
//! - URL refs (`https://example.com/common.yaml#/...`)
//!
//! Key detail: `$ref` resolution is **relative to the document that contains the `$ref`**.
//!
//! Every referenced document is loaded up front by [`RefResolver::preload`]; the two views
//! ([`RefResolver::bundle`] and [`RefResolver::dereference`]) are then computed without I/O.

use crate::error::{OpenApiToolsError, Result};
use crate::loader::{SpecFetcher, SpecSource, parse_document};
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    Url(Url),
    File(PathBuf),
    /// Inline spec text; relative refs resolve against the working directory.
    Inline,
}

impl DocId {
    #[must_use]
    pub fn from_source(source: &SpecSource) -> Self {
        match source {
            SpecSource::Url(url) => DocId::Url(strip_fragment(url.clone())),
            SpecSource::File(path) => DocId::File(canonicalize_best_effort(path.clone())),
            SpecSource::Inline(_) => DocId::Inline,
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Url(u) => write!(f, "{u}"),
            DocId::File(p) => write!(f, "{}", p.display()),
            DocId::Inline => f.write_str("<inline spec>"),
        }
    }
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn canonicalize_best_effort(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefMode {
    /// Inline refs into other documents; keep refs into the root document.
    Bundle,
    /// Inline every ref.
    Dereference,
}

#[derive(Debug)]
pub struct RefResolver<'a> {
    root: DocId,
    fetcher: &'a SpecFetcher,
    docs: RwLock<HashMap<DocId, Arc<Value>>>,
}

impl<'a> RefResolver<'a> {
    /// Create a resolver for an already parsed root document.
    #[must_use]
    pub fn new(root: DocId, document: Value, fetcher: &'a SpecFetcher) -> Self {
        let mut docs = HashMap::new();
        docs.insert(root.clone(), Arc::new(document));
        Self {
            root,
            fetcher,
            docs: RwLock::new(docs),
        }
    }

    #[must_use]
    pub fn root(&self) -> &DocId {
        &self.root
    }

    /// Number of loaded documents, including the root.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.docs.read().len()
    }

    /// Load every document reachable through `$ref`s from the root.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference is malformed or a referenced document cannot be loaded
    /// or parsed.
    pub async fn preload(&self) -> Result<()> {
        let mut visited: HashSet<DocId> = HashSet::from([self.root.clone()]);
        let mut queue = vec![self.root.clone()];

        while let Some(doc) = queue.pop() {
            let value = self.load_doc(&doc).await?;
            let mut refs = Vec::new();
            collect_refs(&value, &mut refs);
            for reference in refs {
                let (target, _) = parse_ref(&doc, reference)?;
                if visited.insert(target.clone()) {
                    debug!(from = %doc, to = %target, "Queueing referenced document");
                    queue.push(target);
                }
            }
        }
        Ok(())
    }

    /// Root document with external refs inlined and local refs kept.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference cannot be resolved against the loaded documents.
    pub fn bundle(&self) -> Result<Value> {
        self.expand_root(RefMode::Bundle)
    }

    /// Root document with every ref inlined (circular refs are left in place).
    ///
    /// # Errors
    ///
    /// Returns an error if a reference cannot be resolved against the loaded documents.
    pub fn dereference(&self) -> Result<Value> {
        self.expand_root(RefMode::Dereference)
    }

    fn expand_root(&self, mode: RefMode) -> Result<Value> {
        let root = self.doc(&self.root)?;
        let mut stack = Vec::new();
        self.expand(&self.root, &root, mode, &mut stack)
    }

    fn expand(
        &self,
        doc: &DocId,
        value: &Value,
        mode: RefMode,
        stack: &mut Vec<String>,
    ) -> Result<Value> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.expand_ref(doc, reference, map, mode, stack);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    out.insert(key.clone(), self.expand(doc, child, mode, stack)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.expand(doc, item, mode, stack))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn expand_ref(
        &self,
        doc: &DocId,
        reference: &str,
        map: &Map<String, Value>,
        mode: RefMode,
        stack: &mut Vec<String>,
    ) -> Result<Value> {
        let (target_doc, pointer) = parse_ref(doc, reference)?;
        let into_root = target_doc == self.root;
        let local = format!("#{}", pointer.as_deref().unwrap_or_default());

        if mode == RefMode::Bundle && into_root {
            let mut out = Map::with_capacity(map.len());
            out.insert("$ref".to_string(), Value::String(local));
            self.overlay_siblings(doc, map, &mut out, mode, stack)?;
            return Ok(Value::Object(out));
        }

        let key = canonical_ref_key(&target_doc, pointer.as_deref());
        if stack.contains(&key) {
            warn!(reference, doc = %doc, "Circular $ref left unresolved");
            let mut out = map.clone();
            if into_root {
                out.insert("$ref".to_string(), Value::String(local));
            }
            return Ok(Value::Object(out));
        }

        let target_value = self.doc(&target_doc)?;
        let target = match pointer.as_deref() {
            Some(ptr) => target_value.pointer(ptr).ok_or_else(|| {
                OpenApiToolsError::Ref(format!(
                    "Unresolved $ref '{reference}' (doc {target_doc}, missing pointer '{ptr}')"
                ))
            })?,
            None => target_value.as_ref(),
        };

        stack.push(key);
        let expanded = self.expand(&target_doc, target, mode, stack);
        stack.pop();
        let mut expanded = expanded?;

        if let Value::Object(out) = &mut expanded {
            self.overlay_siblings(doc, map, out, mode, stack)?;
        }
        Ok(expanded)
    }

    /// Keys next to a `$ref` win over the referenced target's keys.
    fn overlay_siblings(
        &self,
        doc: &DocId,
        map: &Map<String, Value>,
        out: &mut Map<String, Value>,
        mode: RefMode,
        stack: &mut Vec<String>,
    ) -> Result<()> {
        for (key, value) in map.iter().filter(|(k, _)| *k != "$ref") {
            out.insert(key.clone(), self.expand(doc, value, mode, stack)?);
        }
        Ok(())
    }

    fn doc(&self, doc: &DocId) -> Result<Arc<Value>> {
        self.docs.read().get(doc).cloned().ok_or_else(|| {
            OpenApiToolsError::Ref(format!("referenced document {doc} was not loaded"))
        })
    }

    async fn load_doc(&self, doc: &DocId) -> Result<Arc<Value>> {
        // Fast path: cache hit.
        if let Some(v) = self.docs.read().get(doc).cloned() {
            return Ok(v);
        }

        let content = match doc {
            DocId::File(path) => self.fetcher.read_file(path).map_err(|e| {
                OpenApiToolsError::Ref(format!(
                    "Failed to read referenced file {}: {e}",
                    path.display()
                ))
            })?,
            DocId::Url(url) => self.fetcher.fetch_url(url).await.map_err(|e| {
                OpenApiToolsError::Ref(format!("Failed to fetch referenced URL {url}: {e}"))
            })?,
            DocId::Inline => {
                return Err(OpenApiToolsError::Ref(
                    "inline spec is not available for reference".to_string(),
                ));
            }
        };

        let parsed = Arc::new(parse_document(&content, &doc.to_string())?);
        self.docs.write().insert(doc.clone(), Arc::clone(&parsed));
        Ok(parsed)
    }
}

fn collect_refs<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                out.push(reference);
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

fn parse_ref(current_doc: &DocId, reference: &str) -> Result<(DocId, Option<String>)> {
    let (doc_part, frag_part) = match reference.split_once('#') {
        Some((d, f)) => (d, Some(f)),
        None => (reference, None),
    };

    let target_doc = resolve_doc(current_doc, doc_part)?;

    let ptr = match frag_part {
        Some("") | None => None,
        Some(frag) if frag.starts_with('/') => Some(percent_decode(frag)),
        Some(_) => {
            return Err(OpenApiToolsError::Ref(format!(
                "Unsupported $ref fragment (expected JSON pointer starting with '/'): {reference}",
            )));
        }
    };

    Ok((target_doc, ptr))
}

fn resolve_doc(current_doc: &DocId, doc_part: &str) -> Result<DocId> {
    if doc_part.is_empty() {
        return Ok(current_doc.clone());
    }

    // Absolute URL refs.
    if doc_part.starts_with("http://") || doc_part.starts_with("https://") {
        let url = Url::parse(doc_part)
            .map_err(|e| OpenApiToolsError::Ref(format!("Bad $ref URL '{doc_part}': {e}")))?;
        return Ok(DocId::Url(strip_fragment(url)));
    }

    // file:// URL refs.
    if doc_part.starts_with("file://") {
        let url = Url::parse(doc_part).map_err(|e| {
            OpenApiToolsError::Ref(format!("Bad $ref file URL '{doc_part}': {e}"))
        })?;
        let path = url.to_file_path().map_err(|()| {
            OpenApiToolsError::Ref(format!("Bad $ref file URL (not a path): {doc_part}"))
        })?;
        return Ok(DocId::File(canonicalize_best_effort(path)));
    }

    let relative_to_dir = |dir: &Path| {
        // Absolute paths should remain absolute.
        let resolved = if Path::new(doc_part).is_absolute() {
            PathBuf::from(doc_part)
        } else {
            dir.join(doc_part)
        };
        DocId::File(canonicalize_best_effort(resolved))
    };

    match current_doc {
        DocId::Url(base) => {
            let joined = base.join(doc_part).map_err(|e| {
                OpenApiToolsError::Ref(format!(
                    "Failed to resolve relative $ref '{doc_part}' against base {base}: {e}",
                ))
            })?;
            Ok(DocId::Url(strip_fragment(joined)))
        }
        DocId::File(base) => Ok(relative_to_dir(
            base.parent().unwrap_or_else(|| Path::new(".")),
        )),
        DocId::Inline => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Ok(relative_to_dir(&cwd))
        }
    }
}

fn canonical_ref_key(target_doc: &DocId, pointer: Option<&str>) -> String {
    let mut key = match target_doc {
        DocId::Url(u) => format!("url:{u}"),
        DocId::File(p) => format!("file:{}", p.display()),
        DocId::Inline => "inline:".to_string(),
    };
    if let Some(ptr) = pointer {
        key.push('#');
        key.push_str(ptr);
    }
    key
}

/// Decode `%XX` escapes in a URI fragment; malformed escapes are kept verbatim.
fn percent_decode(input: &str) -> String {
    percent_decode_str(input)
        .decode_utf8()
        .map_or_else(|_| input.to_string(), |decoded| decoded.into_owned())
}
