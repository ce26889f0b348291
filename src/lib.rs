pub mod interval;
pub mod oasis;
