// Folio library.
// Portfolio and blog backend: a cached view of an account's GitHub repositories
// next to a small SQLite-backed blog.

pub mod blog;
pub mod config;
pub mod error;
pub mod github;
pub mod projects;
pub mod routes;
