//! Main code generator.
//!
//! Runs the emit steps in their fixed order and collects the header and
//! source text. Nothing is returned unless every step succeeds.

use crate::cpp::naming::{include_guard, is_cpp_namespace};
use crate::cpp::types::CppSymbolTable;
use crate::cpp::{header, source};
use crate::error::CodegenError;
use std::fmt;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "msgs";

/// Header include path used when none is configured.
pub const DEFAULT_HEADER_INCLUDE: &str = "messages.h";

/// Everything an emit step can read.
#[derive(Debug, Clone)]
pub struct EmitContext<'a> {
    /// Types to emit, in dependency order.
    pub table: &'a CppSymbolTable,
    /// C++ namespace, possibly nested with `::`.
    pub namespace: &'a str,
    /// Path the source file uses to include the header.
    pub header_include: &'a str,
    /// Include guard macro.
    pub header_guard: String,
}

/// Output buffer an emit step appends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFile {
    /// The `.h` file.
    Header,
    /// The `.cc` file.
    Source,
}

/// Signature shared by all emit steps.
pub type EmitFn = fn(&EmitContext<'_>, &mut dyn fmt::Write) -> Result<(), CodegenError>;

/// One ordered section of generated code.
#[derive(Debug, Clone, Copy)]
pub struct EmitStep {
    /// Step name, used in error messages.
    pub name: &'static str,
    /// Buffer the step writes to.
    pub output: OutputFile,
    /// Step function.
    pub run: EmitFn,
}

/// Emit steps in execution order.
pub const EMIT_STEPS: [EmitStep; 9] = [
    EmitStep {
        name: "write_header_prologue",
        output: OutputFile::Header,
        run: header::write_header_prologue,
    },
    EmitStep {
        name: "write_type_definitions",
        output: OutputFile::Header,
        run: header::write_type_definitions,
    },
    EmitStep {
        name: "write_function_declarations",
        output: OutputFile::Header,
        run: header::write_function_declarations,
    },
    EmitStep {
        name: "write_header_epilogue",
        output: OutputFile::Header,
        run: header::write_header_epilogue,
    },
    EmitStep {
        name: "write_source_prologue",
        output: OutputFile::Source,
        run: source::write_source_prologue,
    },
    EmitStep {
        name: "write_encoders",
        output: OutputFile::Source,
        run: source::write_encoders,
    },
    EmitStep {
        name: "write_decoders",
        output: OutputFile::Source,
        run: source::write_decoders,
    },
    EmitStep {
        name: "write_equality_operators",
        output: OutputFile::Source,
        run: source::write_equality_operators,
    },
    EmitStep {
        name: "write_source_epilogue",
        output: OutputFile::Source,
        run: source::write_source_epilogue,
    },
];

/// Generated header and source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Header file contents.
    pub header: String,
    /// Source file contents.
    pub source: String,
}

/// Main code generator.
pub struct Generator<'a> {
    table: &'a CppSymbolTable,
    namespace: String,
    header_include: String,
}

impl<'a> Generator<'a> {
    /// Creates a new generator for the given types.
    ///
    /// # Arguments
    /// * `table` - Validated C++ types in dependency order
    #[must_use]
    pub fn new(table: &'a CppSymbolTable) -> Self {
        Self {
            table,
            namespace: DEFAULT_NAMESPACE.to_string(),
            header_include: DEFAULT_HEADER_INCLUDE.to_string(),
        }
    }

    /// Sets the C++ namespace of the generated code.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the path the source file uses to include the header. The include
    /// guard is derived from it too.
    #[must_use]
    pub fn with_header_include(mut self, header_include: impl Into<String>) -> Self {
        self.header_include = header_include.into();
        self
    }

    /// Returns the configured namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the configured header include path.
    #[must_use]
    pub fn header_include(&self) -> &str {
        &self.header_include
    }

    /// Generates the header and source text.
    ///
    /// # Returns
    /// Both files, or the error of the first failing step.
    ///
    /// # Errors
    /// Returns `CodegenError` if the configuration is invalid or a step
    /// fails; step failures are wrapped in `CodegenError::Step`.
    pub fn generate(&self) -> Result<GeneratedCode, CodegenError> {
        self.generate_steps(&EMIT_STEPS)
    }

    /// Runs `steps` in order against the configured types.
    pub(crate) fn generate_steps(
        &self,
        steps: &[EmitStep],
    ) -> Result<GeneratedCode, CodegenError> {
        if !is_cpp_namespace(&self.namespace) {
            return Err(CodegenError::generation(format!(
                "invalid C++ namespace '{}'",
                self.namespace
            )));
        }
        if self.header_include.trim().is_empty() || self.header_include.contains('"') {
            return Err(CodegenError::generation(format!(
                "invalid header include path '{}'",
                self.header_include
            )));
        }

        let context = EmitContext {
            table: self.table,
            namespace: &self.namespace,
            header_include: &self.header_include,
            header_guard: include_guard(&self.header_include),
        };

        let mut code = GeneratedCode::default();
        for step in steps {
            let output: &mut String = match step.output {
                OutputFile::Header => &mut code.header,
                OutputFile::Source => &mut code.source,
            };
            (step.run)(&context, output).map_err(|e| e.in_step(step.name))?;
            tracing::debug!(step = step.name, "emit step complete");
        }

        tracing::debug!(
            header_bytes = code.header.len(),
            source_bytes = code.source.len(),
            "generated C++ code"
        );
        Ok(code)
    }
}
