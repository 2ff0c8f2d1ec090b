pub mod dates;

pub use dates::remaining_days;
