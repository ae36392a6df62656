pub mod batch;
pub mod formats;
pub mod image_converter;
pub mod image_export;
pub mod selection;
