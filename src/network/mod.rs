pub mod network;
pub mod spec;

pub use network::{ForwardTrace, Gradients, Network};
pub use spec::{NetworkSpec, LayerSpec};
