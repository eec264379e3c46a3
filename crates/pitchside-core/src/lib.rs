// Library root: squad model, mock data loading and the mock squad service.

pub mod registry;
pub mod service;
pub mod squad;
