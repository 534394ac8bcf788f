use std::fmt;

/// Generational handle: `(index, generation)`.
///
/// A handle stays unique for the lifetime of its arena. Reusing a slot bumps
/// the generation, so stale handles never alias a newer value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::Handle;

    #[test]
    fn display_includes_generation() {
        assert_eq!(Handle::new(7, 2).to_string(), "7v2");
    }
}
