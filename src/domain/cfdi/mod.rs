pub mod entity;

pub use entity::{
    meta, CfdiArtifacts, CfdiEnvironment, CfdiRecord, CfdiResult, InvoiceState, IssuedCfdi,
};
