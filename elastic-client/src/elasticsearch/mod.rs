//! Elasticsearch implementation of the search client.

mod client;
pub(crate) mod connection;
pub(crate) mod response;

pub use client::ElasticClient;
