//! Link session layer: liveness detection, topic bridging with loop
//! prevention and block lists, and the async service driving it all.
pub mod config;
pub mod link_service;
pub mod link_session;
pub mod topic_filter;

pub use config::{DomainToken, LinkConfig, LinkConfigBuilder};
pub use link_service::{
    LinkHandle, LinkMessages, LinkRequest, LinkRunner, LinkService, LinkServiceParts,
};
pub use link_session::{BusMessage, Connection, LinkSession, Tick};
pub use topic_filter::{topic_matches, BlockInsert, BlockList};
