//! Front panel glue: the colour indicator and the keyboard stand in for the
//! LED and the button of the pedal build.

pub mod indicator;
pub mod keys;
