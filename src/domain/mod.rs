// Domain layer: core models and ports (interfaces) implemented by adapters and core services.

pub mod model;
pub mod ports;
