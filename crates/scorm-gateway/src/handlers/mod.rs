//! HTTP request handlers

pub mod chunk;
pub mod folders;
pub mod service;
pub mod upload;

pub use chunk::*;
pub use folders::*;
pub use service::*;
pub use upload::*;
