//! JVM launch arguments derived from the effective heap and user arguments.

/// Argument list handed to the java process, heap first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaArguments(Vec<String>);

impl JavaArguments {
    /// `-Xmx{memory_mb}m` followed by `extra`, minus any user `-Xmx` so the heap has one source.
    #[must_use]
    pub fn build(memory_mb: u32, extra: &str) -> Self {
        let mut args = vec![format!("-Xmx{memory_mb}m")];
        args.extend(
            extra
                .split_whitespace()
                .filter(|a| !a.starts_with("-Xmx"))
                .map(String::from),
        );
        Self(args)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.0.join(" ")
    }
}
