//! Records exchanged with the metadata collaborator and the presentation layer.

mod endpoint;
mod matches;
mod stream;

pub use endpoint::EndpointId;
pub use matches::{Match, MatchSource};
pub use stream::Stream;
