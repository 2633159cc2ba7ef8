//! Retrieves and parses the documents named by LOAD.
//!
//! Local paths and `file:` URLs are read from disk. `http(s):` URLs are fetched with a weighted
//! `Accept` header; the serialization is taken from the `Content-Type`, then the URL extension,
//! then a peek at the payload. A document is fully parsed before it is handed back, so a failed
//! LOAD never leaves a partially filled graph behind.

use crate::config::Config;
use crate::errors::OfflineRetrievalError;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, Triple};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use url::Url;

/// Loads an RDF document into an in-memory graph.
pub trait DocumentLoader {
    fn load(&self, source: &str) -> Result<Graph>;
}

/// Where a LOAD source lives once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(Url),
}

/// The default loader, driven by [`Config`].
#[derive(Debug, Clone, Default)]
pub struct RdfDocumentLoader {
    config: Config,
}

impl RdfDocumentLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves a source locator, joining relative locators onto the configured base IRI.
    ///
    /// Absolute local paths are never joined.
    pub fn resolve(&self, source: &str) -> Result<Source> {
        if Path::new(source).is_absolute() {
            return Ok(Source::File(PathBuf::from(source)));
        }
        let url = match Url::parse(source) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.config.base_iri {
                Some(base) => Url::parse(base)
                    .with_context(|| format!("Invalid base IRI {}", base))?
                    .join(source)?,
                None => return Ok(Source::File(PathBuf::from(source))),
            },
            // windows drive letters and other oddities are treated as paths
            Err(_) => return Ok(Source::File(PathBuf::from(source))),
        };
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Source::File)
                .map_err(|_| anyhow!("Cannot convert {} to a local path", url)),
            "http" | "https" => Ok(Source::Url(url)),
            // a single-letter scheme is a drive letter
            s if s.len() == 1 => Ok(Source::File(PathBuf::from(source))),
            s => Err(anyhow!("Unsupported scheme {} in {}", s, source)),
        }
    }

    fn load_file(&self, path: &Path) -> Result<Graph> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(RdfFormat::from_extension)
            .unwrap_or(RdfFormat::Turtle);
        debug!("Reading {} as {}", path.display(), format);
        let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
        let base = match &self.config.base_iri {
            Some(base) => Some(base.clone()),
            None => std::fs::canonicalize(path)
                .ok()
                .and_then(|p| Url::from_file_path(p).ok())
                .map(|u| u.to_string()),
        };
        parse_graph(BufReader::new(file), format, base.as_deref())
    }

    fn load_url(&self, url: &Url) -> Result<Graph> {
        if self.config.offline {
            return Err(anyhow!(OfflineRetrievalError {
                file: url.to_string()
            }));
        }
        let client = Client::builder()
            .timeout(self.config.fetch_timeout())
            .build()?;
        let accept = build_accept(&self.config.accept_order);
        debug!("Fetching {} with Accept: {}", url, accept);
        let resp = client.get(url.as_str()).header(ACCEPT, accept).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Fetching {} returned {}", url, status));
        }
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes()?.to_vec();
        if looks_like_html(content_type.as_deref(), &bytes) {
            return Err(anyhow!("{} returned HTML instead of RDF", final_url));
        }
        let format = content_type
            .as_deref()
            .and_then(detect_format)
            .or_else(|| detect_format_from_url(&final_url))
            .or_else(|| sniff_format(&bytes))
            .unwrap_or(RdfFormat::Turtle);
        debug!("Parsing {} as {}", final_url, format);
        let base = self.config.base_iri.as_deref().unwrap_or(&final_url);
        parse_graph(bytes.as_slice(), format, Some(base))
    }
}

impl DocumentLoader for RdfDocumentLoader {
    fn load(&self, source: &str) -> Result<Graph> {
        let graph = match self.resolve(source)? {
            Source::File(path) => self.load_file(&path)?,
            Source::Url(url) => self.load_url(&url)?,
        };
        info!("Loaded {} triples from {}", graph.len(), source);
        Ok(graph)
    }
}

/// Parses a whole document; only default-graph content is kept.
fn parse_graph(reader: impl Read, format: RdfFormat, base: Option<&str>) -> Result<Graph> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base) = base {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| anyhow!("Invalid base IRI {}: {}", base, e))?;
    }
    let mut graph = Graph::new();
    let mut skipped = 0usize;
    for quad in parser.for_reader(reader) {
        let quad = quad?;
        if !quad.graph_name.is_default_graph() {
            skipped += 1;
            continue;
        }
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    if skipped > 0 {
        warn!("Ignored {} quads in named graphs", skipped);
    }
    Ok(graph)
}

fn detect_format(ct: &str) -> Option<RdfFormat> {
    // drop parameters such as charset
    let media_type = ct.split(';').next().unwrap_or(ct);
    RdfFormat::from_media_type(media_type.trim())
}

/// Builds a weighted `Accept` header string honoring the provided priority order.
fn build_accept(accept_order: &[String]) -> String {
    if accept_order.is_empty() {
        return "*/*".to_string();
    }
    let mut parts = Vec::new();
    let mut q = 1.0f32;
    for t in accept_order {
        parts.push(format!("{t}; q={:.2}", q));
        q = (q - 0.1f32).max(0.1f32);
    }
    parts.push("*/*; q=0.05".to_string());
    parts.join(", ")
}

fn detect_format_from_url(url: &str) -> Option<RdfFormat> {
    let trimmed = url.split('#').next().unwrap_or(url);
    let path = trimmed.split('?').next().unwrap_or(trimmed);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
}

/// Last-resort guess at the serialization from the first bytes of the payload.
fn sniff_format(bytes: &[u8]) -> Option<RdfFormat> {
    let sample_len = bytes.len().min(4096);
    let sample = std::str::from_utf8(&bytes[..sample_len]).ok()?;
    let trimmed = sample.trim_start();

    if trimmed.starts_with('{') && sample.contains("\"@context\"") {
        return detect_format("application/ld+json");
    }
    if trimmed.starts_with('<') && (sample.contains("<rdf:RDF") || sample.contains("xmlns:rdf"))
    {
        return Some(RdfFormat::RdfXml);
    }
    if sample.contains("@prefix") || sample.contains("@base") || sample.contains("PREFIX ") {
        return Some(RdfFormat::Turtle);
    }
    if sample.contains("GRAPH") && sample.contains('{') {
        return Some(RdfFormat::TriG);
    }
    None
}

fn looks_like_html(content_type: Option<&str>, bytes: &[u8]) -> bool {
    if let Some(ct) = content_type {
        let lc = ct.to_ascii_lowercase();
        if lc.contains("text/html") || lc.contains("application/xhtml") {
            return true;
        }
    }
    let prefix_len = bytes.len().min(512);
    match std::str::from_utf8(&bytes[..prefix_len]) {
        Ok(snippet) => {
            let lower = snippet.to_ascii_lowercase();
            lower.contains("<html") || lower.contains("<!doctype html")
        }
        Err(_) => false,
    }
}
