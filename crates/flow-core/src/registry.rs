use std::collections::HashMap;

use crate::error::{FlowError, Result};
use crate::io_ext::{BoxedReader, BoxedWriter};
use crate::model::{is_reserved, EndpointModel, STDIN_ID, STDOUT_ID};
use crate::plan::{ConnectionRecord, ConnectionWriter, FanOutWriter, SharedWriter};

/// A declared reader → writer edge, before any endpoint has been opened.
#[derive(Debug, Clone)]
pub struct Edge {
    pub reader_id: String,
    pub writer_id: String,
}

/// Holds every declared endpoint, validates and opens them, and resolves a
/// list of edges into the [`ConnectionRecord`]s the forwarder loop drives.
///
/// `stdin`/`stdout` are supplied by the caller rather than reached for
/// globally (`std::io::stdin()`/`stdout()`), so the same registry works
/// against real process handles in production and an in-memory pipe pair
/// in tests.
pub struct EndpointRegistry {
    models: HashMap<String, Box<dyn EndpointModel>>,
    stdin: Option<BoxedReader>,
    stdout: Option<BoxedWriter>,
}

impl EndpointRegistry {
    /// Builds the registry from the declared endpoints, rejecting duplicate
    /// IDs (including collisions with the reserved `stdin`/`stdout` names)
    /// and running each endpoint's own validation.
    pub fn new(
        endpoints: Vec<Box<dyn EndpointModel>>,
        stdin: BoxedReader,
        stdout: BoxedWriter,
    ) -> Result<Self> {
        let mut models = HashMap::new();
        for mut endpoint in endpoints {
            let id = endpoint.id().to_string();
            if is_reserved(&id) {
                return Err(FlowError::ConfigValidation(format!(
                    "endpoint id [{id}] collides with the reserved \"{STDIN_ID}\" or \"{STDOUT_ID}\" name"
                )));
            }
            if models.contains_key(&id) {
                return Err(FlowError::ConfigValidation(format!(
                    "duplicate endpoint id [{id}]"
                )));
            }
            endpoint
                .validate()
                .map_err(|e| FlowError::ConfigValidation(format!("{id}: {e}")))?;
            models.insert(id, endpoint);
        }

        Ok(Self {
            models,
            stdin: Some(stdin),
            stdout: Some(stdout),
        })
    }

    /// Opens every reader and writer referenced by `edges` and folds them
    /// into connection records, one per distinct reader ID. Readers are
    /// opened before writers across the whole edge list so a TCP/IPC
    /// endpoint that both listens and is dialed by another edge has its
    /// listener bound before anything tries to connect to it.
    pub fn resolve(&mut self, edges: &[Edge]) -> Result<Vec<ConnectionRecord>> {
        let mut readers: HashMap<String, BoxedReader> = HashMap::new();
        readers.insert(
            STDIN_ID.to_string(),
            self.stdin.take().expect("stdin already resolved"),
        );

        let mut writers: HashMap<String, SharedWriter> = HashMap::new();
        writers.insert(
            STDOUT_ID.to_string(),
            SharedWriter::new(self.stdout.take().expect("stdout already resolved")),
        );

        for edge in edges {
            if readers.contains_key(&edge.reader_id) {
                continue;
            }
            if let Some(model) = self.models.get_mut(&edge.reader_id) {
                let reader = model.open_reader().map_err(|e| FlowError::EndpointOpen {
                    id: edge.reader_id.clone(),
                    source: e,
                })?;
                readers.insert(edge.reader_id.clone(), reader);
            }
        }

        for edge in edges {
            if writers.contains_key(&edge.writer_id) {
                continue;
            }
            if let Some(model) = self.models.get_mut(&edge.writer_id) {
                let writer = model.open_writer().map_err(|e| FlowError::EndpointOpen {
                    id: edge.writer_id.clone(),
                    source: e,
                })?;
                writers.insert(edge.writer_id.clone(), SharedWriter::new(writer));
            }
        }

        Ok(build_records(edges, readers, writers))
    }
}

fn build_records(
    edges: &[Edge],
    mut readers: HashMap<String, BoxedReader>,
    writers: HashMap<String, SharedWriter>,
) -> Vec<ConnectionRecord> {
    let mut seen_readers = std::collections::HashSet::new();
    let mut records = Vec::new();

    for edge in edges {
        if !seen_readers.insert(edge.reader_id.clone()) {
            continue;
        }

        let matched: Vec<(String, SharedWriter)> = edges
            .iter()
            .filter(|e| e.reader_id == edge.reader_id)
            .filter_map(|e| writers.get(&e.writer_id).map(|w| (e.writer_id.clone(), w.clone())))
            .collect();

        if matched.is_empty() {
            tracing::warn!(reader_id = %edge.reader_id, "resolved no matching writers for reader");
            continue;
        }

        let Some(reader) = readers.remove(&edge.reader_id) else {
            tracing::warn!(reader_id = %edge.reader_id, "reader endpoint failed to open, skipping edge");
            continue;
        };

        let writer_ids: Vec<String> = matched.iter().map(|(id, _)| id.clone()).collect();
        let writer = if matched.len() == 1 {
            ConnectionWriter::Single(matched.into_iter().next().unwrap().1)
        } else {
            ConnectionWriter::FanOut(FanOutWriter::new(matched))
        };

        records.push(ConnectionRecord::new(
            edge.reader_id.clone(),
            reader,
            writer,
            writer_ids,
        ));
    }

    records
}
