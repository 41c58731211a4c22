pub mod kill;
pub mod ports;
