pub mod client;
pub mod error;
pub mod mock_client;
pub mod stream;

pub use client::{ApiClient, ByteStream, CompletionService};
pub use error::TransportError;
pub use mock_client::{MockCompletionService, MockReply};
pub use stream::ChunkDecoder;
