//! Unit-level tests of the public API, one module per component.

mod unit;
