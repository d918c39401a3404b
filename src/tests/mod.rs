//! Cross-component tests for mapped cubes, views and conversion.
//!
//! These tests write small cubes to temporary files and check that every
//! interleave presents the same samples, that writes reach the file, and that
//! conversions preserve every sample exactly.


mod conversion_tests;
mod invariance_tests;
