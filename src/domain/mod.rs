pub mod clock;
pub mod message;
pub mod record;
pub mod series;

pub use clock::*;
pub use message::*;
pub use record::*;
pub use series::*;
