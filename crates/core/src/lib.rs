pub mod camera;
pub mod detection;
pub mod imaging;
pub mod pipeline;
pub mod rendering;
pub mod shared;
