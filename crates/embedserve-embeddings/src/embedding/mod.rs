pub mod device;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod model;
pub mod service;
pub mod traits;

pub use device::{Backend, BackendAvailability, SelectedDevice, select_device};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockEmbeddingProvider;
pub use model::EmbeddingModel;
pub use service::{BatchEmbedding, EmbeddingService, ServiceStats, SingleEmbedding};
pub use traits::EmbeddingProvider;
