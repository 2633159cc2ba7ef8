//! Defines the graph store interface the update engine mutates, with in-memory and
//! file-backed implementations over an Oxigraph store.

use crate::consts::GRAPH_LIST_SUFFIX;
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{
    GraphName, GraphNameRef, NamedNode, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef,
    Triple,
};
use oxigraph::store::Store;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub num_graphs: usize,
    pub num_triples: usize,
}

/// A multi-graph store: one default graph plus any number of named graphs.
///
/// Named graphs are created implicitly when triples are added to them; deleting from a graph
/// that does not exist is a no-op.
pub trait GraphStore {
    /// Returns a reference to the underlying store
    fn store(&self) -> &Store;

    /// Returns true if the store contains the named graph
    fn contains_graph(&self, name: NamedOrBlankNodeRef<'_>) -> Result<bool> {
        Ok(self.store().contains_named_graph(name)?)
    }

    /// Returns an owned snapshot of the named graph identifiers, safe to hold while mutating.
    fn graph_names(&self) -> Result<Vec<NamedOrBlankNode>> {
        let mut names = Vec::new();
        for name in self.store().named_graphs() {
            names.push(name?);
        }
        Ok(names)
    }

    /// Creates an empty named graph
    fn add_graph(&mut self, name: NamedOrBlankNodeRef<'_>) -> Result<()> {
        self.store().insert_named_graph(name)?;
        Ok(())
    }

    /// Removes the named graph and all of its triples
    fn remove_graph(&mut self, name: NamedOrBlankNodeRef<'_>) -> Result<()> {
        self.store().remove_named_graph(name)?;
        Ok(())
    }

    /// Removes every triple from the graph; the graph itself stays in the store
    fn clear_graph(&mut self, graph: GraphNameRef<'_>) -> Result<()> {
        self.store().clear_graph(graph)?;
        Ok(())
    }

    /// Adds all triples to the graph in a single batch
    fn add_triples(&mut self, graph: GraphNameRef<'_>, triples: &[Triple]) -> Result<()> {
        let graph_name = graph.into_owned();
        let quads = triples.iter().map(|t| {
            Quad::new(
                t.subject.clone(),
                t.predicate.clone(),
                t.object.clone(),
                graph_name.clone(),
            )
        });
        let mut loader = self.store().bulk_loader();
        loader.load_quads(quads)?;
        loader.commit()?;
        Ok(())
    }

    /// Deletes all triples from the graph
    fn delete_triples(&mut self, graph: GraphNameRef<'_>, triples: &[Triple]) -> Result<()> {
        for t in triples {
            self.store().remove(QuadRef::new(
                t.subject.as_ref(),
                t.predicate.as_ref(),
                t.object.as_ref(),
                graph,
            ))?;
        }
        Ok(())
    }

    fn add_quad(&mut self, quad: QuadRef<'_>) -> Result<()> {
        self.store().insert(quad)?;
        Ok(())
    }

    fn delete_quad(&mut self, quad: QuadRef<'_>) -> Result<()> {
        self.store().remove(quad)?;
        Ok(())
    }

    /// Returns the triples of one graph
    fn triples(&self, graph: GraphNameRef<'_>) -> Result<Vec<Triple>> {
        let mut triples = Vec::new();
        for quad in self
            .store()
            .quads_for_pattern(None, None, None, Some(graph))
        {
            let quad = quad?;
            triples.push(Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(triples)
    }

    /// Returns the size of the underlying store.
    fn size(&self) -> Result<StoreStats> {
        let num_graphs = self.graph_names()?.len();
        let num_triples = self.store().len()?;
        Ok(StoreStats {
            num_graphs,
            num_triples,
        })
    }

    /// Persists pending changes; a no-op for stores without a backing file.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A purely in-memory graph store.
pub struct MemoryGraphStore {
    store: Store,
}

impl MemoryGraphStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            store: Store::new()?,
        })
    }

    /// Builds a store holding the given quads.
    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Result<Self> {
        let store = Store::new()?;
        let mut loader = store.bulk_loader();
        loader.load_quads(quads)?;
        loader.commit()?;
        Ok(Self { store })
    }
}

impl GraphStore for MemoryGraphStore {
    fn store(&self) -> &Store {
        &self.store
    }
}

/// A graph store hydrated from a dataset file and written back to it on [`GraphStore::flush`].
///
/// The serialization is chosen from the file extension. Triple-only formats are read into the
/// default graph; writing a store with named graphs to a triple-only format is refused.
///
/// Quad formats cannot express a named graph without triples, so the names of all named graphs
/// are also kept in a JSON list next to the dataset (`data.nq` -> `data.nq.graphs`).
pub struct FileGraphStore {
    store: Store,
    path: PathBuf,
    format: RdfFormat,
    dirty: bool,
}

impl FileGraphStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = format_for_path(&path);
        let store = Store::new()?;
        if path.exists() {
            debug!("Reading dataset {} as {}", path.display(), format);
            let file = File::open(&path)?;
            let quads = RdfParser::from_format(format)
                .for_reader(BufReader::new(file))
                .collect::<Result<Vec<_>, _>>()?;
            let mut loader = store.bulk_loader();
            loader.load_quads(quads)?;
            loader.commit()?;
            info!(
                "Opened dataset {} with {} quads",
                path.display(),
                store.len()?
            );
        } else {
            info!("Dataset {} does not exist yet; starting empty", path.display());
        }
        let graph_list = graph_list_path(&path);
        if graph_list.exists() {
            let file = File::open(&graph_list)?;
            let names: Vec<String> = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to read graph list {}", graph_list.display()))?;
            for name in names {
                let graph = NamedNode::new(name)?;
                store.insert_named_graph(graph.as_ref())?;
            }
        }
        Ok(Self {
            store,
            path,
            format,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn write_to_file(&self) -> Result<()> {
        if !self.format.supports_datasets() && !self.graph_names()?.is_empty() {
            return Err(anyhow!(
                "Cannot write named graphs to {}: {} only holds a single graph",
                self.path.display(),
                self.format
            ));
        }
        let file = File::create(&self.path)?;
        let mut serializer =
            RdfSerializer::from_format(self.format).for_writer(BufWriter::new(file));
        for quad in self.store.iter() {
            serializer.serialize_quad(&quad?)?;
        }
        serializer.finish()?;
        self.write_graph_list()
    }

    fn write_graph_list(&self) -> Result<()> {
        let graph_list = graph_list_path(&self.path);
        // blank-node graphs only survive through their quads
        let graphs = self.graph_names()?;
        let names: Vec<&str> = graphs
            .iter()
            .filter_map(|name| match name {
                NamedOrBlankNode::NamedNode(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        if names.is_empty() {
            if graph_list.exists() {
                std::fs::remove_file(&graph_list)?;
            }
            return Ok(());
        }
        debug!("Writing {} graph names to {}", names.len(), graph_list.display());
        let mut writer = BufWriter::new(File::create(&graph_list)?);
        serde_json::to_writer_pretty(&mut writer, &names)?;
        writer.flush()?;
        Ok(())
    }
}

fn graph_list_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(GRAPH_LIST_SUFFIX);
    PathBuf::from(name)
}

impl GraphStore for FileGraphStore {
    fn store(&self) -> &Store {
        &self.store
    }

    fn add_graph(&mut self, name: NamedOrBlankNodeRef<'_>) -> Result<()> {
        self.dirty = true;
        self.store.insert_named_graph(name)?;
        Ok(())
    }

    fn remove_graph(&mut self, name: NamedOrBlankNodeRef<'_>) -> Result<()> {
        self.dirty = true;
        self.store.remove_named_graph(name)?;
        Ok(())
    }

    fn clear_graph(&mut self, graph: GraphNameRef<'_>) -> Result<()> {
        self.dirty = true;
        self.store.clear_graph(graph)?;
        Ok(())
    }

    fn add_triples(&mut self, graph: GraphNameRef<'_>, triples: &[Triple]) -> Result<()> {
        self.dirty = true;
        let graph_name: GraphName = graph.into_owned();
        for t in triples {
            self.store.insert(QuadRef::new(
                t.subject.as_ref(),
                t.predicate.as_ref(),
                t.object.as_ref(),
                graph_name.as_ref(),
            ))?;
        }
        Ok(())
    }

    fn delete_triples(&mut self, graph: GraphNameRef<'_>, triples: &[Triple]) -> Result<()> {
        self.dirty = true;
        for t in triples {
            self.store.remove(QuadRef::new(
                t.subject.as_ref(),
                t.predicate.as_ref(),
                t.object.as_ref(),
                graph,
            ))?;
        }
        Ok(())
    }

    fn add_quad(&mut self, quad: QuadRef<'_>) -> Result<()> {
        self.dirty = true;
        self.store.insert(quad)?;
        Ok(())
    }

    fn delete_quad(&mut self, quad: QuadRef<'_>) -> Result<()> {
        self.dirty = true;
        self.store.remove(quad)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        info!("Writing dataset to {}", self.path.display());
        self.write_to_file()?;
        self.dirty = false;
        Ok(())
    }
}

/// Picks a serialization from the file extension, defaulting to N-Quads.
pub fn format_for_path(path: &Path) -> RdfFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
        .unwrap_or(RdfFormat::NQuads)
}
