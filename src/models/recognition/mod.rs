pub mod crnn;
pub mod slanet;

pub use crnn::CrnnRecognizer;
pub use slanet::SlanetModel;
