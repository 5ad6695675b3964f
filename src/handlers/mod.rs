pub mod records;
pub mod selftest;
