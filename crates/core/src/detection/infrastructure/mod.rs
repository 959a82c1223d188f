pub mod haar_cascade;
pub mod integral_image;
pub mod math;
pub mod rect_grouping;
