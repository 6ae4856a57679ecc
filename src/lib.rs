pub mod client;
pub mod config;
pub mod describe;
pub mod download;
pub mod entity;
pub mod error;
pub mod fs_util;
pub mod http;
pub mod models;
pub mod pagination;
pub mod workflow;

pub use client::Api;
pub use config::{Config, ConfigLoader};
pub use download::Downloadable;
pub use entity::{Entity, Reference, Resource};
pub use error::RefineError;
pub use models::*;
pub use pagination::{Filters, PaginatedList};
