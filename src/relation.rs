//! The `nfs-share` integration: relation handles, their application data
//! buckets, and the keys each side writes.
//!
//! The proxy side writes [`ENDPOINT_KEY`]. The client side may write a share
//! request (`name`, `allowlist`, `size`), which the proxy can only log since
//! the export is managed outside the model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ProxyError;

/// Key the proxy writes into its application bucket.
pub const ENDPOINT_KEY: &str = "endpoint";

const SHARE_NAME_KEY: &str = "name";
const SHARE_ALLOWLIST_KEY: &str = "allowlist";
const SHARE_SIZE_KEY: &str = "size";

/// Allowlist clients send when they do not restrict access.
const OPEN_ALLOWLIST: &str = "0.0.0.0";

/// Flat key/value application data bucket.
pub type Databag = BTreeMap<String, String>;

/// Identifier of one relation instance, rendered as `name:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId {
    name: String,
    id: u32,
}

impl RelationId {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

impl FromStr for RelationId {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProxyError::Decode("relation id".to_string(), format!("'{}'", s));
        let (name, id) = s.rsplit_once(':').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        let id = id.parse::<u32>().map_err(|_| invalid())?;
        Ok(RelationId::new(name, id))
    }
}

/// Snapshot of one joined relation and both application buckets.
///
/// Writes go to the local bucket in memory; the hook runtime flushes the
/// buckets marked dirty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationHandle {
    pub id: RelationId,
    /// Remote application name, when the runtime reports one.
    pub remote_app: Option<String>,
    local: Databag,
    remote: Databag,
    dirty: bool,
}

impl RelationHandle {
    pub fn new(
        id: RelationId,
        remote_app: Option<String>,
        local: Databag,
        remote: Databag,
    ) -> Self {
        Self {
            id,
            remote_app,
            local,
            remote,
            dirty: false,
        }
    }

    /// Local application bucket (written by this side).
    pub fn local_data(&self) -> &Databag {
        &self.local
    }

    /// Remote application bucket (written by the client).
    pub fn remote_data(&self) -> &Databag {
        &self.remote
    }

    /// Set a key in the local bucket. Returns true if the bucket changed.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        if self.local.get(key).map(String::as_str) == Some(value) {
            return false;
        }
        self.local.insert(key.to_string(), value.to_string());
        self.dirty = true;
        true
    }

    /// Whether the local bucket has writes that have not been flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_flushed(&mut self) {
        self.dirty = false;
    }

    /// The share the client asked for, if it asked.
    pub fn share_request(&self) -> Option<ShareRequest> {
        ShareRequest::from_databag(&self.remote)
    }
}

/// Share parameters a client writes into its application bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub name: String,
    pub allowlist: Vec<String>,
    /// Requested size in gigabytes; `None` for unlimited (`-1`) or absent.
    pub size_gb: Option<u64>,
}

impl ShareRequest {
    /// Parse a request from a client bucket. `None` when no `name` is set.
    pub fn from_databag(bag: &Databag) -> Option<Self> {
        let name = bag.get(SHARE_NAME_KEY)?.clone();
        let allowlist = bag
            .get(SHARE_ALLOWLIST_KEY)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let size_gb = bag
            .get(SHARE_SIZE_KEY)
            .and_then(|size| size.trim().parse::<i64>().ok())
            .and_then(|size| u64::try_from(size).ok());
        Some(ShareRequest {
            name,
            allowlist,
            size_gb,
        })
    }

    /// Whether the client asked for anything beyond an open, unlimited share.
    pub fn is_restricted(&self) -> bool {
        let open = self.allowlist.iter().all(|addr| addr == OPEN_ALLOWLIST);
        !open || self.size_gb.is_some()
    }
}
