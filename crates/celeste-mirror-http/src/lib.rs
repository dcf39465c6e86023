pub mod manifest_client;
pub mod storage_client;
pub mod wire;

pub use manifest_client::{ManifestClient, ManifestClientConfig};
pub use storage_client::{HttpMirrorStorage, HttpMirrorStorageConfig};

pub(crate) const USER_AGENT: &str = "celeste-mirror";
