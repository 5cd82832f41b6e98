pub mod cancellation;

pub use cancellation::CancelToken;
