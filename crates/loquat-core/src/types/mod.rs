mod blob;
mod geo;
mod soft_delete;

pub use blob::Blob;
pub use geo::GeoPoint;
pub use soft_delete::SoftDelete;
