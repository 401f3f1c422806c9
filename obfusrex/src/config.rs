//! Options shared by the parser and the obfuscation engine

/// Default cap on the number of members a class may expand into
pub const DEFAULT_MAX_CLASS_EXPANSION: usize = 256;

/// Configuration for one obfuscation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Whether `.` also matches `\n` outside any inline `s` modifier
    pub dot_all: bool,
    /// Largest number of characters a non-negated class is enumerated into
    /// before it is kept as a class instead
    pub max_class_expansion: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            dot_all: false,
            max_class_expansion: DEFAULT_MAX_CLASS_EXPANSION,
        }
    }
}

impl Options {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set dot-all mode
    pub fn with_dot_all(mut self, dot_all: bool) -> Self {
        self.dot_all = dot_all;
        self
    }

    /// Set the class expansion cap
    pub fn with_max_class_expansion(mut self, max: usize) -> Self {
        self.max_class_expansion = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::new();
        assert!(!options.dot_all);
        assert_eq!(options.max_class_expansion, DEFAULT_MAX_CLASS_EXPANSION);
    }

    #[test]
    fn test_builders() {
        let options = Options::new().with_dot_all(true).with_max_class_expansion(8);
        assert_eq!(
            options,
            Options {
                dot_all: true,
                max_class_expansion: 8
            }
        );
    }
}
