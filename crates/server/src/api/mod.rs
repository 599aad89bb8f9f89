pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod statifications;

pub use routes::create_router;
