//! examples of usage of RustedAMR
/// AMR control pipeline examples
pub mod amr_examples;
