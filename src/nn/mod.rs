pub mod activations;
pub mod layers;
pub mod loss;
pub mod model;
mod tests;

pub use activations::Activation;
pub use layers::FeedForwardLayer;
pub use loss::{l1_loss, l2_loss};
pub use model::Sequential;
