//! Connection handle for one configured Redis database.
//!
//! [`RedisDatabase`] holds the seed URL of a database. Discovering its
//! primaries issues `CLUSTER NODES`; a server answering with an error
//! (cluster support disabled, or the command is unavailable) is treated
//! as a standalone database whose only primary is the seed itself.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ErrorKind};
use rebulk_core::types::DatabaseId;
use rebulk_engine::{BulkActionError, ConnectionHandle, PrimaryNode};

use crate::error::RedisWorkerError;
use crate::topology::parse_cluster_nodes;

/// A configured Redis database, standalone or cluster.
#[derive(Debug, Clone)]
pub struct RedisDatabase {
    id: DatabaseId,
    client: redis::Client,
}

impl RedisDatabase {
    /// Validate `url` and build the handle. No connection is made yet.
    pub fn open(id: impl Into<DatabaseId>, url: &str) -> Result<Self, RedisWorkerError> {
        Ok(Self {
            id: id.into(),
            client: redis::Client::open(url)?,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Open a multiplexed connection to the seed node.
    pub async fn connect(&self) -> Result<MultiplexedConnection, RedisWorkerError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    pub fn seed_client(&self) -> redis::Client {
        self.client.clone()
    }

    /// The seed server described as a standalone primary.
    pub fn seed_node(&self) -> PrimaryNode {
        match &self.client.get_connection_info().addr {
            ConnectionAddr::Tcp(host, port) => PrimaryNode::standalone(host.clone(), *port),
            ConnectionAddr::TcpTls { host, port, .. } => {
                PrimaryNode::standalone(host.clone(), *port)
            }
            other => PrimaryNode::standalone(other.to_string(), 0),
        }
    }

    /// Client for one primary node, reusing the seed's credentials, TLS
    /// settings and logical database. Standalone nodes reuse the seed client.
    pub fn node_client(&self, node: &PrimaryNode) -> Result<redis::Client, RedisWorkerError> {
        if node.standalone {
            return Ok(self.seed_client());
        }

        let mut info = self.client.get_connection_info().clone();
        if let ConnectionAddr::TcpTls { host, port, .. } = &mut info.addr {
            *host = node.host.clone();
            *port = node.port;
        } else {
            info.addr = ConnectionAddr::Tcp(node.host.clone(), node.port);
        }
        Ok(redis::Client::open(info)?)
    }

    async fn discover(&self) -> Result<Vec<PrimaryNode>, RedisWorkerError> {
        let mut conn = self.connect().await?;
        let reply: redis::RedisResult<String> =
            redis::cmd("CLUSTER").arg("NODES").query_async(&mut conn).await;

        match reply {
            Ok(output) => {
                let seed = self.seed_node();
                let nodes = parse_cluster_nodes(&output, &seed.host)?;
                if nodes.is_empty() {
                    return Err(RedisWorkerError::Topology("No primary nodes found".into()));
                }
                Ok(nodes)
            }
            Err(e) if e.kind() == ErrorKind::ResponseError => {
                tracing::debug!(database_id = %self.id, error = %e, "Using standalone topology");
                Ok(vec![self.seed_node()])
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ConnectionHandle for RedisDatabase {
    async fn primary_nodes(&self) -> Result<Vec<PrimaryNode>, BulkActionError> {
        let nodes = self
            .discover()
            .await
            .map_err(|e| BulkActionError::Connection(e.to_string()))?;

        tracing::debug!(database_id = %self.id, nodes = nodes.len(), "Discovered primary nodes");
        Ok(nodes)
    }
}
