mod config;
mod jwt;
mod token;
mod traits;

pub use config::*;
pub use jwt::*;
pub use token::*;
pub use traits::*;
