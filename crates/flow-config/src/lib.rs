pub mod apply;
pub mod endpoints;
pub mod schema;

pub use apply::run;
pub use schema::{
    load, load_from_path, to_yaml, Config, ConnectionConfig, FileConfig, IpcConfig, Nodes,
    PortConfig, Protocol, SerialMode, Settings, SocketConfig,
};
