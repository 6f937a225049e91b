pub mod addr;
pub mod addr_space;
pub mod analyzer;
pub mod branch;
pub mod cart;
pub mod decode;
pub mod hwreg;
pub mod opcode;
pub mod token;
