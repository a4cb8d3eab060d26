// Domain layer: core models and ports (interfaces). No browser or HTTP types leak in here.

pub mod model;
pub mod ports;
