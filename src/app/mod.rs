mod backend;
mod errors;
mod factory;
mod local;
mod remote;

pub use backend::*;
pub use errors::AppError;
pub use factory::{AppFactory, AppPaths};
pub use local::AppLocal;
pub use remote::AppRemote;
