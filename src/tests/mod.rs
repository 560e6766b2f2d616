//! Unit tests for the x86_hook crate.

mod opcode_table;
