// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// How `PRINT` statements reach the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintMode {
    /// `printf(fmt, args...)` from the C library. Destinations are ignored.
    #[default]
    Printf,
    /// `brt_print(dest, fmt, args...)` from the BASIC runtime.
    Runtime,
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    pub module_name: String,
    pub print_mode: PrintMode,
    /// Give every generated function the variadic calling convention.
    pub variadic_functions: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            module_name: "qbasic".to_string(),
            print_mode: PrintMode::default(),
            variadic_functions: false,
        }
    }
}
