pub mod commands;
pub mod connection;
pub mod crc;
pub mod modbus;
pub mod output;
pub mod profile;
pub mod registers;
