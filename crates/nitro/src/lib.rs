//! A collection of parsers for Nintendo DS (Nitro) file formats.

pub mod fnt;
pub mod sjis;
pub mod tree;

pub use binrw;
