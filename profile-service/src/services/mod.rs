pub mod profile_picture;

pub use profile_picture::{PictureUpload, ProfilePictureService};
