use std::io::Read;
use std::path::{Path, PathBuf};

use eyre::Context;
use serde::{Deserialize, Serialize};

/// The declarative configuration document: a list of reader→writer edges,
/// the endpoints those IDs may refer to, and one global setting. Field
/// casing on the wire (`ReaderID`, `Path`, `Trunc`, ...) is kept separate
/// from the struct fields underneath, which stay snake_case and idiomatic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub nodes: Nodes,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    #[serde(rename = "ReaderID")]
    pub reader_id: String,
    #[serde(rename = "WriterID")]
    pub writer_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Nodes {
    #[serde(default)]
    pub files: Vec<FileConfig>,
    #[serde(default)]
    pub ports: Vec<PortConfig>,
    #[serde(default)]
    pub sockets: Vec<SocketConfig>,
    #[serde(default)]
    pub ipcs: Vec<IpcConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct FileConfig {
    #[serde(rename = "ID")]
    pub id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub trunc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PortConfig {
    #[serde(rename = "ID")]
    pub id: String,
    pub channel: String,
    pub mode: SerialMode,
    #[serde(default, rename = "ReadTimeout")]
    pub read_timeout_ms: u64,
}

/// The `Mode` block: baud rate plus the line settings `serialport` itself
/// models as enums. `stop_bits` is carried as the `1`/`2` the schema
/// documents (not a bool) so a config file reads the way a human would
/// write it; [`crate::endpoints`] maps it onto `flow_core`'s
/// `two_stop_bits` flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SerialMode {
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: String,
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_stop_bits() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SocketConfig {
    #[serde(rename = "ID")]
    pub id: String,
    pub protocol: Protocol,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct IpcConfig {
    #[serde(rename = "ID")]
    pub id: String,
    pub channel: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    #[serde(default, rename = "Timeout")]
    pub idle_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 0,
        }
    }
}

/// Parses a [`Config`] out of an already-open reader's contents.
pub fn load(mut r: impl Read) -> eyre::Result<Config> {
    let mut contents = String::new();
    r.read_to_string(&mut contents)
        .wrap_err("reading configuration contents")?;
    serde_yaml::from_str(&contents).wrap_err("parsing YAML configuration")
}

/// Opens and parses the config document at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> eyre::Result<Config> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .wrap_err_with(|| format!("opening configuration file {}", path.display()))?;
    load(file).wrap_err_with(|| format!("loading configuration from {}", path.display()))
}

/// Serializes a [`Config`] back to the same YAML shape it was loaded from.
pub fn to_yaml(config: &Config) -> eyre::Result<String> {
    serde_yaml::to_string(config).wrap_err("serializing configuration to YAML")
}
