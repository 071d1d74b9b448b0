pub mod taskpool;
