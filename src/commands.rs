pub mod load_profile;
pub mod read;
pub mod registers;
pub mod write;
