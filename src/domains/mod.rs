pub mod craving;
pub mod sync;
