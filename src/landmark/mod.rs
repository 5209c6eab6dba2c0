pub mod keypoint;
pub mod sample;
pub mod snapshot;

pub use keypoint::{HandLandmark, Landmark, PoseLandmark};
pub use snapshot::{HandLandmarks, Handedness, LandmarkSnapshot};
