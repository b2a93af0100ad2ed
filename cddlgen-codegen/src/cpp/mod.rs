//! C++ code generation modules.

pub mod header;
pub mod naming;
pub mod source;
pub mod types;
pub mod validation;

pub use types::{CppFieldType, CppSymbolTable, CppType, CppTypeKind, WireKind, build_cpp_types};
pub use validation::validate_cpp_types;
