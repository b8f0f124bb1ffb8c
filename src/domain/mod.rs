// Domain layer: core models and ports. No dependencies on the outer layers.

pub mod model;
pub mod ports;
