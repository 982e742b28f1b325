//! Repository implementations using SeaORM

pub mod category_repository;
pub mod service_repository;

pub use category_repository::SeaOrmCategoryRepository;
pub use service_repository::SeaOrmServiceRepository;
