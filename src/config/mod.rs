//! Settings for the promtail sidecar.
//!
//! Values default to the pinned promtail release and fixed sidecar paths.
//! Each one can be overridden through the environment (or a `.env` file
//! loaded by the binary).

mod helpers;
mod proxy;

pub use proxy::{
    BINARY_DIR, BINARY_ZIP_PATH, CONFIG_PATH, DEFAULT_RELATION_NAME, GRPC_LISTEN_PORT,
    HTTP_LISTEN_PORT, POSITIONS_FILENAME, PROMTAIL_BINARY_SHA256, PROMTAIL_BINARY_ZIP_URL,
    PUSH_API_PORT, ProxySettings, SERVICE_NAME, WORKLOAD_BINARY_PATH,
};
