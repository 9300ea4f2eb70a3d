//! Compact inference format: conversion from a trained `Network` and a small
//! interpreter that runs the result.

pub mod format;
pub mod ops;
pub mod converter;
pub mod interpreter;

pub use format::{DType, FormatError, LiteModel, OpNode, TensorInfo};
pub use converter::Converter;
pub use interpreter::Interpreter;
