//! Text presentation of dashboard panels.

pub mod panels;
