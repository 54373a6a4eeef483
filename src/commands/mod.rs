pub mod qc;
pub mod status;
