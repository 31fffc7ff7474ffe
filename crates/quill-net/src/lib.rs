// HTTP layer for talking to a node: one blocking client, bearer auth,
// JSON in and out.

pub mod endpoints;
pub mod transport;

pub use transport::{NetError, Transport};
