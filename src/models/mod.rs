pub mod enums;
pub mod record;
pub mod temporal;
pub mod encounter;
pub mod patient;
pub mod reference;
pub mod events;
pub mod profile;
pub mod narrative;

pub use enums::*;
pub use record::*;
pub use temporal::*;
pub use encounter::*;
pub use patient::*;
pub use reference::*;
pub use events::*;
pub use profile::*;
pub use narrative::*;
