pub mod recent;
pub mod sync;
pub mod top;
