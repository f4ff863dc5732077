pub mod context;
pub mod frame;
pub mod opcode;
