mod error;
mod request;
mod routes;
mod wrapper;

pub use routes::{AuthToken, router};
