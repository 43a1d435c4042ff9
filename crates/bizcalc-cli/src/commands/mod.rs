pub mod mortgage;
pub mod roi;
pub mod segmentation;
