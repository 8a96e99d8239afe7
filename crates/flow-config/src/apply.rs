use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use eyre::Context;
use flow_core::io_ext::{BoxedReader, BoxedWriter, ReadClose};
use flow_core::plan::ConnectionWriter;
use flow_core::registry::{Edge, EndpointRegistry};
use flow_core::{ConnectionRecord, FlowError, ForwarderLoop, StopReason};

use crate::endpoints::build_endpoints;
use crate::schema::Config;

/// Validates `config`, opens every endpoint it reaches, and drives the
/// forwarder loop until `shutdown` is set or the configured idle timeout
/// elapses.
///
/// `stdin`/`stdout` are passed in rather than reached for globally, so the
/// same entry point drives both the real process streams (`flow-cli`) and
/// an in-memory pipe pair (tests).
pub fn run(
    config: &Config,
    stdin: BoxedReader,
    stdout: BoxedWriter,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<StopReason> {
    let endpoints = build_endpoints(config);
    let mut registry = EndpointRegistry::new(endpoints, stdin, stdout)
        .wrap_err("validating declared endpoints")?;

    let edges: Vec<Edge> = config
        .connections
        .iter()
        .map(|c| Edge {
            reader_id: c.reader_id.clone(),
            writer_id: c.writer_id.clone(),
        })
        .collect();

    let records = registry
        .resolve(&edges)
        .wrap_err("opening endpoints and resolving the connection graph")?;

    let mut forwarder = ForwarderLoop::new(records, config.settings.idle_timeout_seconds, shutdown);
    let reason = forwarder.run();

    let records = forwarder.into_records();
    if let Err(e) = close_all(records) {
        tracing::warn!(error = %e, "error closing one or more endpoints during shutdown");
    }

    Ok(reason)
}

/// Closes every endpoint reachable from `records`: writers first, then
/// readers. A writer shared by more than one record
/// (a fan-in target, or a reader whose writer is also targeted by another
/// edge) is closed exactly once. The first error encountered is returned;
/// closing continues regardless.
fn close_all(records: Vec<ConnectionRecord>) -> flow_core::Result<()> {
    let mut first_err = None;
    let mut closed = HashSet::new();

    for record in &records {
        for writer in writer_members(&record.writer) {
            if !closed.insert(writer.identity()) {
                continue;
            }
            if let Err(e) = writer.close() {
                first_err.get_or_insert(e);
            }
        }
    }

    for mut record in records {
        if let Err(e) = record.reader.close() {
            first_err.get_or_insert(e);
        }
    }

    match first_err {
        Some(e) => Err(FlowError::CloseError(e)),
        None => Ok(()),
    }
}

fn writer_members(writer: &ConnectionWriter) -> Vec<&flow_core::plan::SharedWriter> {
    writer.members()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConnectionConfig, FileConfig, Nodes, Settings};
    use flow_core::io_ext::{ReadClose, WriteClose};
    use std::io::{self, Read, Write};

    struct EmptyReader;
    impl Read for EmptyReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }
    impl ReadClose for EmptyReader {
        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct SinkWriter;
    impl Write for SinkWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    impl WriteClose for SinkWriter {
        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn file_to_file_forwards_bytes_and_respects_idle_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("a.txt");
        let output_path = dir.path().join("b.txt");
        std::fs::write(&input_path, b"Wow some great content to write").unwrap();

        let config = Config {
            connections: vec![ConnectionConfig {
                reader_id: "InputFile".into(),
                writer_id: "OutputFile".into(),
            }],
            nodes: Nodes {
                files: vec![
                    FileConfig {
                        id: "InputFile".into(),
                        path: input_path,
                        trunc: false,
                    },
                    FileConfig {
                        id: "OutputFile".into(),
                        path: output_path.clone(),
                        trunc: false,
                    },
                ],
                ports: vec![],
                sockets: vec![],
                ipcs: vec![],
            },
            settings: Settings {
                idle_timeout_seconds: 1,
            },
        };

        let start = std::time::Instant::now();
        let reason = run(
            &config,
            Box::new(EmptyReader),
            Box::new(SinkWriter),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(reason, StopReason::IdleTimeout);
        assert!(start.elapsed().as_secs_f64() >= 1.0);
        let contents = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(contents, "Wow some great content to write");
    }

    #[test]
    fn shutdown_flag_ends_the_loop_even_with_no_timeout() {
        let config = Config {
            connections: vec![],
            nodes: Nodes::default(),
            settings: Settings {
                idle_timeout_seconds: 0,
            },
        };
        let shutdown = Arc::new(AtomicBool::new(true));
        let reason = run(
            &config,
            Box::new(EmptyReader),
            Box::new(SinkWriter),
            shutdown,
        )
        .unwrap();
        assert_eq!(reason, StopReason::Signalled);
    }
}
