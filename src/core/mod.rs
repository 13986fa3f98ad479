//! Clinical formula library.
//!
//! Everything here is a pure function of its inputs; the calculators in
//! `tools` adapt forms to these functions and render the results.

pub mod acid_base;
pub mod electrolytes;
pub mod gamma;
pub mod hemodynamics;
pub mod presets;
pub mod renal;
