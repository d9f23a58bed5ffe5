//! 领域层

pub mod aggregate;
pub mod event;
pub mod model;
pub mod repository;
pub mod service;
pub mod value_object;
