pub mod config;
pub mod fields;
pub mod reading;

pub use config::{Capacity, Config, Signatory, DEFAULT_BAUD_RATE};
pub use fields::FieldKey;
pub use reading::Reading;
