//! # Prompt Template Modules
//!
//! This module organizes the prompt templates used by the extraction pipeline.
//! Each data domain owns a pair of prompts (one for images, one for plain text);
//! the shared output contract lives in [`core`].

pub mod core;
pub mod finance;
pub mod health;
