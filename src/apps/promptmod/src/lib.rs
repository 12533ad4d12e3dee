// Library interface for the promptmod harness
// The binary is a thin wrapper so integration tests can drive the same code

pub mod cli;
