mod clock;
mod device_identity;
mod result;

pub use clock::*;
pub use device_identity::*;
pub use result::*;
