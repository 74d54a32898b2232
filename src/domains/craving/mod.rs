pub mod repository;
pub mod service;
pub mod types;

pub use repository::{CravingRepository, SqliteCravingRepository};
pub use service::{CravingService, CravingServiceImpl};
pub use types::{CravingRecord, CravingResponse, NewCraving};
