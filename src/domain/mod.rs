// Domain layer: records, run summaries and the datastore port.

pub mod model;
pub mod ports;
