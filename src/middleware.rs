pub mod public_gate;
