//! NFS server proxy: publishes an externally managed NFS export to
//! orchestration-managed NFS clients.
//!
//! The operator configures a `host:path` endpoint; on every lifecycle event
//! the relay validates it, writes it into each `nfs-share` relation's
//! application bucket, and reports the unit status.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod hook;
pub mod relation;
pub mod relay;
pub mod status;

pub use config::{CharmConfig, DEFAULT_INTEGRATION, HookToolsConfig, ProxyConfig};
pub use endpoint::{Endpoint, EndpointError, HostKind, validate};
pub use error::{ProxyError, Result};
pub use event::{HookEvent, RelationEventKind};
pub use hook::tools::HookTools;
pub use hook::{Runtime, run_hook};
pub use relation::{Databag, ENDPOINT_KEY, RelationHandle, RelationId, ShareRequest};
pub use relay::{EndpointRelay, PublishReport, Snapshot};
pub use status::{StatusPool, StatusReport, UnitStatus};
