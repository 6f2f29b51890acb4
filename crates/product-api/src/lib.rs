pub mod config;
pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod local;
pub mod request;
pub mod response;
pub mod telemetry;

pub use handlers::ProductService;
pub use response::Envelope;
