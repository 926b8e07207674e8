//! HTTP-layer building blocks: agent/connector construction and header
//! assembly. Higher-level operations (metadata, tarball, search) live in
//! their own top-level modules and compose these.

pub mod agent;
pub mod connector;
pub mod headers;
