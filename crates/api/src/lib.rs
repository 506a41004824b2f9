#![forbid(unsafe_code)]

pub mod gateway;
pub mod http;

pub use gateway::{ApiError, ExamGateway, GradeReceipt, InMemoryGateway, PaperFetch};
pub use http::{HttpGateway, HttpGatewayConfig};
